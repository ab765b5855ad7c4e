use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "canary-runner.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunnerConfig {
    pub polling: PollingConfig,
    pub orchestration: OrchestrationConfig,
    pub aws: AwsConfig,
    pub harness: HarnessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollingConfig {
    /// Delay between two state queries, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum number of queries per wait (0 = wait forever)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrchestrationConfig {
    /// Fail when the canary has never run instead of treating every run as new
    #[serde(default = "default_require_previous_run")]
    pub require_previous_run: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AwsConfig {
    /// Region override; the default provider chain is used when unset
    pub region: Option<String>,

    /// Endpoint override, e.g. for a local service emulator
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HarnessConfig {
    /// Stack whose outputs list the canaries to check
    pub stack_name: Option<String>,

    /// Output key holding the canary names
    #[serde(default = "default_output_key")]
    pub output_key: String,

    /// Separator between canary names in the output value
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Abort the batch on the first canary that errors
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Level applied to this crate when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, pretty or compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl LoggingConfig {
    /// Apply command line overrides on top of the configured values
    pub fn with_overrides(&self, format: Option<&str>, debug: bool) -> Self {
        Self {
            level: if debug {
                "debug".to_string()
            } else {
                self.level.clone()
            },
            format: format.map_or_else(|| self.format.clone(), str::to_string),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Attempt bound, `None` when polling is unbounded
    pub fn attempt_limit(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }
}

impl RunnerConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("polling.interval_ms", default_interval_ms())?
            .set_default("polling.max_attempts", default_max_attempts())?
            .set_default(
                "orchestration.require_previous_run",
                default_require_previous_run(),
            )?
            .set_default("harness.output_key", default_output_key())?
            .set_default("harness.delimiter", default_delimiter())?
            .set_default("harness.fail_fast", default_fail_fast())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(&path_str).required(false))
            // CANARY_RUNNER_POLLING__INTERVAL_MS=500 -> polling.interval_ms
            .add_source(
                Environment::with_prefix("CANARY_RUNNER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: RunnerConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Load from default sources and reject invalid values
    pub fn load_validated() -> crate::error::Result<Self> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Polling interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.harness.output_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "Harness output_key must not be empty".to_string(),
            ));
        }

        if self.harness.delimiter.is_empty() {
            return Err(ConfigError::Message(
                "Harness delimiter must not be empty".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty" | "compact") {
            return Err(ConfigError::Message(format!(
                "Unknown log format '{}', expected json, pretty or compact",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            polling: PollingConfig {
                interval_ms: default_interval_ms(),
                max_attempts: default_max_attempts(),
            },
            orchestration: OrchestrationConfig {
                require_previous_run: default_require_previous_run(),
            },
            aws: AwsConfig::default(),
            harness: HarnessConfig {
                stack_name: None,
                output_key: default_output_key(),
                delimiter: default_delimiter(),
                fail_fast: default_fail_fast(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}

// Default value functions
fn default_interval_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    900
} // 15 minutes at the default interval, the Lambda ceiling

fn default_require_previous_run() -> bool {
    false
}

fn default_output_key() -> String {
    "CanaryNames".to_string()
}
fn default_delimiter() -> String {
    ",".to_string()
}
fn default_fail_fast() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.polling.interval(), Duration::from_secs(1));
        assert_eq!(config.polling.attempt_limit(), Some(900));
        assert!(!config.orchestration.require_previous_run);
        assert_eq!(config.harness.output_key, "CanaryNames");
    }

    #[test]
    fn test_zero_attempts_means_unbounded() {
        let mut config = RunnerConfig::default();
        config.polling.max_attempts = 0;

        assert_eq!(config.polling.attempt_limit(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::default();

        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());
        config.polling.interval_ms = 250;
        assert!(config.validate().is_ok());

        config.harness.delimiter = String::new();
        assert!(config.validate().is_err());
        config.harness.delimiter = " ".to_string();
        assert!(config.validate().is_ok());

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_overrides_fall_back_to_config() {
        let mut config = RunnerConfig::default();
        config.logging.format = "compact".to_string();

        let logging = config.logging.with_overrides(None, false);
        assert_eq!(logging.format, "compact");
        assert_eq!(logging.level, "info");

        let logging = config.logging.with_overrides(Some("pretty"), true);
        assert_eq!(logging.format, "pretty");
        assert_eq!(logging.level, "debug");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[polling]
interval_ms = 250

[orchestration]
require_previous_run = true

[harness]
stack_name = "monitoring-stack"
delimiter = " "
"#
        )
        .unwrap();

        let config = RunnerConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.polling.max_attempts, 900);
        assert!(config.orchestration.require_previous_run);
        assert_eq!(config.harness.stack_name.as_deref(), Some("monitoring-stack"));
        assert_eq!(config.harness.delimiter, " ");
        assert_eq!(config.harness.output_key, "CanaryNames");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[polling]\ninterval_ms = 0").unwrap();

        let config = RunnerConfig::load_from_file(file.path()).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::load_from_file(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.polling.interval_ms, 1000);
        assert!(config.harness.fail_fast);
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = RunnerConfig::default().to_toml().unwrap();

        assert!(rendered.contains("[polling]"));
        assert!(rendered.contains("interval_ms = 1000"));
        assert!(rendered.contains("output_key = \"CanaryNames\""));
    }
}
