use canary_runner::aws::{self, SyntheticsService};
use canary_runner::logging::init_logging;
use canary_runner::{handle_event, CanaryOrchestrator, CanaryRequest, RunnerConfig};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RunnerConfig::load_validated()?;
    init_logging(&config.logging)?;

    info!("Starting canary runner v{}", env!("CARGO_PKG_VERSION"));

    let sdk_config = aws::load_sdk_config(&config.aws).await;
    let service = Arc::new(SyntheticsService::new(&sdk_config));
    let orchestrator = Arc::new(CanaryOrchestrator::from_config(service, &config));

    run(service_fn(move |event: LambdaEvent<CanaryRequest>| {
        let orchestrator = Arc::clone(&orchestrator);
        async move { handle_event(&orchestrator, event).await }
    }))
    .await
}
