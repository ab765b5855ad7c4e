//! Batch checking of every canary a deployed stack declares.
//!
//! The stack publishes its canary names as one delimited output value. The
//! harness resolves that list, invokes each canary in turn through the same
//! path as the Lambda handler, and summarises the verdicts.

use crate::canary::{CanaryOrchestrator, CanaryRunResult};
use crate::config::HarnessConfig;
use crate::error::{CanaryError, Result};
use crate::handler::{self, CanaryRequest};
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Source of stack output values
#[async_trait::async_trait]
pub trait StackOutputs: Send + Sync {
    async fn output_value(&self, stack_name: &str, output_key: &str) -> Result<Option<String>>;
}

/// Verdict for one canary of the batch
#[derive(Debug, Clone)]
pub enum CanaryOutcome {
    Completed(CanaryRunResult),
    Errored { canary_name: String, message: String },
}

impl CanaryOutcome {
    pub fn canary_name(&self) -> &str {
        match self {
            Self::Completed(result) => &result.canary_name,
            Self::Errored { canary_name, .. } => canary_name,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Self::Completed(result) if result.passed)
    }

    /// One JSON object per outcome: the run result, or the name and error
    pub fn to_json(&self) -> Value {
        match self {
            Self::Completed(result) => json!({
                "canaryName": result.canary_name,
                "passed": result.passed,
                "timestamp": result.timestamp,
            }),
            Self::Errored {
                canary_name,
                message,
            } => json!({ "canaryName": canary_name, "error": message }),
        }
    }
}

/// Summary of a harness run
#[derive(Debug, Clone)]
pub struct HarnessReport {
    pub correlation_id: String,
    pub outcomes: Vec<CanaryOutcome>,
    /// Canaries never invoked because an earlier one errored in fail-fast mode
    pub skipped: Vec<String>,
}

impl HarnessReport {
    /// True when every canary ran and passed
    pub fn all_passed(&self) -> bool {
        !self.outcomes.is_empty()
            && self.skipped.is_empty()
            && self.outcomes.iter().all(CanaryOutcome::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CanaryOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed())
    }
}

/// Split a delimited output value into canary names
pub fn parse_canary_names(value: &str, delimiter: &str) -> Vec<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the canary names published by `stack_name`
pub async fn discover_canary_names(
    outputs: &dyn StackOutputs,
    stack_name: &str,
    config: &HarnessConfig,
) -> Result<Vec<String>> {
    let value = outputs
        .output_value(stack_name, &config.output_key)
        .await?
        .ok_or_else(|| {
            CanaryError::harness(format!("Could not get canary names for stack {}", stack_name))
        })?;

    let names = parse_canary_names(&value, &config.delimiter);
    if names.is_empty() {
        return Err(CanaryError::harness(format!(
            "Output {} of stack {} lists no canaries",
            config.output_key, stack_name
        )));
    }

    info!(stack_name, count = names.len(), "Discovered canaries");
    Ok(names)
}

/// Run each canary in order.
///
/// Errors are recorded as outcomes. With `fail_fast` the first errored
/// invocation stops the batch and the remaining canaries are listed as
/// skipped; otherwise they still run. A failed verdict never stops the batch.
pub async fn run_all(
    orchestrator: &CanaryOrchestrator,
    canary_names: &[String],
    fail_fast: bool,
    correlation_id: &str,
) -> HarnessReport {
    let mut outcomes = Vec::with_capacity(canary_names.len());
    let mut skipped = Vec::new();

    for (index, canary_name) in canary_names.iter().enumerate() {
        let request = CanaryRequest::new(canary_name.clone());

        match handler::handle(orchestrator, request, Some(correlation_id)).await {
            Ok(result) => outcomes.push(CanaryOutcome::Completed(result)),
            Err(e) => {
                outcomes.push(CanaryOutcome::Errored {
                    canary_name: canary_name.clone(),
                    message: e.to_string(),
                });

                if fail_fast {
                    skipped = canary_names[index + 1..].to_vec();
                    if !skipped.is_empty() {
                        warn!(
                            correlation_id,
                            "Stopping batch after error in canary {}, skipping {}",
                            canary_name,
                            skipped.join(", ")
                        );
                    }
                    break;
                }

                warn!("Continuing after error in canary {}: {}", canary_name, e);
            }
        }
    }

    let report = HarnessReport {
        correlation_id: correlation_id.to_string(),
        outcomes,
        skipped,
    };

    if report.all_passed() {
        info!(correlation_id, "All {} canaries passed", report.outcomes.len());
    } else {
        for outcome in report.failed() {
            error!(correlation_id, "Canary {} did not pass", outcome.canary_name());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canary::{
        CanaryRun, CanaryRunState, CanaryState, MockSynthetics, Poller, SimulatedCanary,
    };
    use crate::config::RunnerConfig;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct StaticOutputs(HashMap<(String, String), String>);

    impl StaticOutputs {
        fn with(stack: &str, key: &str, value: &str) -> Self {
            let mut outputs = HashMap::new();
            outputs.insert((stack.to_string(), key.to_string()), value.to_string());
            Self(outputs)
        }
    }

    #[async_trait::async_trait]
    impl StackOutputs for StaticOutputs {
        async fn output_value(&self, stack_name: &str, output_key: &str) -> Result<Option<String>> {
            Ok(self
                .0
                .get(&(stack_name.to_string(), output_key.to_string()))
                .cloned())
        }
    }

    fn simulated(name: &str, outcome: CanaryRunState) -> SimulatedCanary {
        SimulatedCanary::new(name)
            .last_run(CanaryRun::new("run-1", CanaryRunState::Passed))
            .outcome(outcome)
    }

    fn create_test_orchestrator(mock: MockSynthetics) -> CanaryOrchestrator {
        CanaryOrchestrator::new(Arc::new(mock), Poller::new(Duration::from_secs(1), Some(30)))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_parse_canary_names() {
        assert_eq!(
            parse_canary_names("login, checkout ,,search", ","),
            names(&["login", "checkout", "search"])
        );
        assert_eq!(
            parse_canary_names("login checkout", " "),
            names(&["login", "checkout"])
        );
        assert!(parse_canary_names("", ",").is_empty());
    }

    #[tokio::test]
    async fn test_discover_canary_names() {
        let outputs = StaticOutputs::with("monitoring", "CanaryNames", "login,checkout");
        let config = RunnerConfig::default().harness;

        let discovered = discover_canary_names(&outputs, "monitoring", &config)
            .await
            .unwrap();

        assert_eq!(discovered, names(&["login", "checkout"]));
    }

    #[tokio::test]
    async fn test_discover_fails_without_output() {
        let outputs = StaticOutputs::with("monitoring", "OtherOutput", "login");
        let config = RunnerConfig::default().harness;

        let result = discover_canary_names(&outputs, "monitoring", &config).await;

        match result {
            Err(CanaryError::Harness { message }) => {
                assert_eq!(message, "Could not get canary names for stack monitoring");
            }
            other => panic!("Expected harness error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_discover_fails_on_empty_list() {
        let outputs = StaticOutputs::with("monitoring", "CanaryNames", " , ");
        let config = RunnerConfig::default().harness;

        let result = discover_canary_names(&outputs, "monitoring", &config).await;

        assert!(matches!(result, Err(CanaryError::Harness { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_canaries_pass() {
        let mock = MockSynthetics::new()
            .with_canary(simulated("login", CanaryRunState::Passed))
            .with_canary(simulated("checkout", CanaryRunState::Passed).state(CanaryState::Running));
        let orchestrator = create_test_orchestrator(mock);

        let report = run_all(&orchestrator, &names(&["login", "checkout"]), true, "batch-1").await;

        assert!(report.all_passed());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.correlation_id, "batch-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_verdict_does_not_abort_batch() {
        let mock = MockSynthetics::new()
            .with_canary(simulated("login", CanaryRunState::Failed))
            .with_canary(simulated("checkout", CanaryRunState::Passed));
        let orchestrator = create_test_orchestrator(mock);

        let report = run_all(&orchestrator, &names(&["login", "checkout"]), true, "batch-2").await;

        assert!(!report.all_passed());
        assert_eq!(report.outcomes.len(), 2);
        let failed: Vec<_> = report.failed().map(CanaryOutcome::canary_name).collect();
        assert_eq!(failed, vec!["login"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_stops_on_error() {
        let mock = MockSynthetics::new()
            .with_canary(simulated("login", CanaryRunState::Passed).start_status(500))
            .with_canary(simulated("checkout", CanaryRunState::Passed));
        let mock = Arc::new(mock);
        let orchestrator =
            CanaryOrchestrator::new(mock.clone(), Poller::new(Duration::from_secs(1), Some(30)));

        let report =
            run_all(&orchestrator, &names(&["login", "checkout"]), true, "batch-3").await;

        assert!(!report.all_passed());
        assert_eq!(report.outcomes.len(), 1);
        match &report.outcomes[0] {
            CanaryOutcome::Errored { canary_name, message } => {
                assert_eq!(canary_name, "login");
                assert!(message.contains("StartCanary"));
            }
            other => panic!("Expected errored outcome, got {:?}", other),
        }
        assert_eq!(report.skipped, names(&["checkout"]));
        assert!(mock.commands_for("checkout").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_keeps_verdicts_gathered_before_error() {
        let mock = MockSynthetics::new()
            .with_canary(simulated("login", CanaryRunState::Passed))
            .with_canary(
                simulated("checkout", CanaryRunState::Passed)
                    .state(CanaryState::Running)
                    .stop_status(500),
            )
            .with_canary(simulated("search", CanaryRunState::Passed));
        let orchestrator = create_test_orchestrator(mock);

        let report = run_all(
            &orchestrator,
            &names(&["login", "checkout", "search"]),
            true,
            "batch-6",
        )
        .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].passed());
        assert_eq!(report.outcomes[1].canary_name(), "checkout");
        assert!(!report.outcomes[1].passed());
        assert_eq!(report.skipped, names(&["search"]));
        assert!(!report.all_passed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_recorded_without_fail_fast() {
        let mock = MockSynthetics::new()
            .with_canary(simulated("login", CanaryRunState::Passed).start_status(500))
            .with_canary(simulated("checkout", CanaryRunState::Passed));
        let orchestrator = create_test_orchestrator(mock);

        let report =
            run_all(&orchestrator, &names(&["login", "checkout"]), false, "batch-4").await;

        assert!(!report.all_passed());
        assert!(matches!(
            &report.outcomes[0],
            CanaryOutcome::Errored { canary_name, .. } if canary_name == "login"
        ));
        assert!(report.outcomes[1].passed());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_outcomes_render_as_json_objects() {
        let completed = CanaryOutcome::Completed(CanaryRunResult::new("login", true));
        let errored = CanaryOutcome::Errored {
            canary_name: "checkout".to_string(),
            message: "Command StartCanary for canary checkout failed with status 500"
                .to_string(),
        };

        let completed = completed.to_json();
        assert_eq!(completed["canaryName"], "login");
        assert_eq!(completed["passed"], true);
        assert!(completed["timestamp"].is_string());

        let errored = errored.to_json();
        assert_eq!(errored["canaryName"], "checkout");
        assert!(errored["error"].as_str().unwrap().contains("status 500"));
        assert!(errored.get("passed").is_none());
    }

    #[test]
    fn test_empty_report_is_not_a_pass() {
        let report = HarnessReport {
            correlation_id: "batch-5".to_string(),
            outcomes: Vec::new(),
            skipped: Vec::new(),
        };

        assert!(!report.all_passed());
    }
}
