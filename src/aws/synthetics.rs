use crate::canary::{CanaryRun, CanaryRunState, CanaryState, CommandStatus, SyntheticsApi};
use crate::error::{CanaryError, Result};
use aws_config::SdkConfig;
use aws_sdk_synthetics::error::{DisplayErrorContext, SdkError};
use aws_sdk_synthetics::types;
use aws_sdk_synthetics::Client;
use tracing::debug;

/// CloudWatch Synthetics backed implementation of [`SyntheticsApi`]
#[derive(Clone)]
pub struct SyntheticsService {
    client: Client,
}

impl SyntheticsService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait::async_trait]
impl SyntheticsApi for SyntheticsService {
    async fn canary_state(&self, canary_name: &str) -> Result<Option<CanaryState>> {
        let output = self
            .client
            .get_canary()
            .name(canary_name)
            .send()
            .await
            .map_err(|e| query_error("GetCanary", e))?;

        Ok(output
            .canary()
            .and_then(|canary| canary.status())
            .and_then(|status| status.state())
            .map(canary_state_from_sdk))
    }

    async fn last_run(&self, canary_name: &str) -> Result<Option<CanaryRun>> {
        let output = self
            .client
            .describe_canaries_last_run()
            .names(canary_name)
            .max_results(1)
            .send()
            .await
            .map_err(|e| query_error("DescribeCanariesLastRun", e))?;

        Ok(output
            .canaries_last_run()
            .iter()
            .find(|last_run| last_run.canary_name() == Some(canary_name))
            .and_then(|last_run| last_run.last_run())
            .map(run_from_sdk))
    }

    async fn start_canary(&self, canary_name: &str) -> Result<CommandStatus> {
        let result = self.client.start_canary().name(canary_name).send().await;
        command_status("StartCanary", result)
    }

    async fn stop_canary(&self, canary_name: &str) -> Result<CommandStatus> {
        let result = self.client.stop_canary().name(canary_name).send().await;
        command_status("StopCanary", result)
    }
}

fn canary_state_from_sdk(state: &types::CanaryState) -> CanaryState {
    match state {
        types::CanaryState::Running => CanaryState::Running,
        types::CanaryState::Starting => CanaryState::Starting,
        types::CanaryState::Stopped => CanaryState::Stopped,
        types::CanaryState::Stopping => CanaryState::Stopping,
        other => CanaryState::Other(other.as_str().to_string()),
    }
}

fn run_state_from_sdk(state: &types::CanaryRunState) -> CanaryRunState {
    match state {
        types::CanaryRunState::Running => CanaryRunState::Running,
        types::CanaryRunState::Passed => CanaryRunState::Passed,
        types::CanaryRunState::Failed => CanaryRunState::Failed,
        other => CanaryRunState::Other(other.as_str().to_string()),
    }
}

fn run_from_sdk(run: &types::CanaryRun) -> CanaryRun {
    let status = run.status();

    CanaryRun {
        id: run.id().map(str::to_string),
        state: status.and_then(|s| s.state()).map(run_state_from_sdk),
        state_reason: status.and_then(|s| s.state_reason()).map(str::to_string),
    }
}

fn query_error<E, R>(operation: &str, error: SdkError<E, R>) -> CanaryError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    CanaryError::service(
        operation.to_string(),
        DisplayErrorContext(&error).to_string(),
    )
}

/// Service responses become a status the orchestrator validates; failures
/// without any HTTP response are errors in their own right.
fn command_status<T, E>(
    operation: &str,
    result: std::result::Result<T, SdkError<E, aws_sdk_synthetics::config::http::HttpResponse>>,
) -> Result<CommandStatus>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match result {
        Ok(_) => Ok(CommandStatus::OK),
        Err(error) => match error.raw_response() {
            Some(response) => {
                let status = response.status().as_u16();
                debug!(
                    operation,
                    status,
                    error = %DisplayErrorContext(&error),
                    "Command rejected by service"
                );
                Ok(CommandStatus(status))
            }
            None => Err(query_error(operation, error)),
        },
    }
}
