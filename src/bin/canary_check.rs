use anyhow::{bail, Context, Result};
use canary_runner::aws::{self, CloudFormationOutputs, SyntheticsService};
use canary_runner::config::DEFAULT_CONFIG_PATH;
use canary_runner::logging::init_logging;
use canary_runner::{
    discover_canary_names, run_all, CanaryOrchestrator, CanaryOutcome, RunnerConfig,
};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "canary-check")]
#[command(about = "Run every canary of a deployed stack and report whether all passed")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Stack whose outputs list the canaries
    #[arg(long, env = "STACK_NAME")]
    stack_name: Option<String>,

    /// Canary to run; repeat to run several and skip stack discovery
    #[arg(long = "canary", value_name = "NAME")]
    canaries: Vec<String>,

    /// Keep going after a canary errors
    #[arg(long)]
    keep_going: bool,

    /// Print each result as a JSON line instead of a summary
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("# Canary runner configuration");
        println!("{}", RunnerConfig::default().to_toml()?);
        return Ok(());
    }

    let mut config = RunnerConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    init_logging(
        &config
            .logging
            .with_overrides(args.log_format.as_deref(), args.debug),
    )?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        bail!("Configuration validation failed: {}", e);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    if args.stack_name.is_some() {
        config.harness.stack_name = args.stack_name.clone();
    }
    if args.keep_going {
        config.harness.fail_fast = false;
    }

    let sdk_config = aws::load_sdk_config(&config.aws).await;

    let canary_names = if args.canaries.is_empty() {
        let Some(stack_name) = config.harness.stack_name.as_deref() else {
            bail!("STACK_NAME environment variable not set");
        };
        let outputs = CloudFormationOutputs::new(&sdk_config);
        discover_canary_names(&outputs, stack_name, &config.harness).await?
    } else {
        args.canaries.clone()
    };

    let correlation_id = Uuid::new_v4().to_string();
    info!(%correlation_id, "Checking {} canaries", canary_names.len());

    let service = Arc::new(SyntheticsService::new(&sdk_config));
    let orchestrator = CanaryOrchestrator::from_config(service, &config);

    let report = run_all(
        &orchestrator,
        &canary_names,
        config.harness.fail_fast,
        &correlation_id,
    )
    .await;

    for outcome in &report.outcomes {
        match outcome {
            _ if args.json => println!("{}", outcome.to_json()),
            CanaryOutcome::Completed(result) => println!(
                "{} {} ({})",
                if result.passed { "✓" } else { "✗" },
                result.canary_name,
                result.timestamp.to_rfc3339()
            ),
            CanaryOutcome::Errored {
                canary_name,
                message,
            } => println!("✗ {} errored: {}", canary_name, message),
        }
    }

    for canary_name in &report.skipped {
        if args.json {
            println!("{}", json!({ "canaryName": canary_name, "skipped": true }));
        } else {
            println!("- {} skipped", canary_name);
        }
    }

    if !report.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}
