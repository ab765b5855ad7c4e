use super::types::{CanaryRun, CanaryState};
use crate::error::Result;

/// HTTP status returned by a state-changing command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus(pub u16);

impl CommandStatus {
    pub const OK: CommandStatus = CommandStatus(200);

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

/// Operations consumed from the synthetic monitoring service
#[async_trait::async_trait]
pub trait SyntheticsApi: Send + Sync {
    /// Current lifecycle state of the canary
    async fn canary_state(&self, canary_name: &str) -> Result<Option<CanaryState>>;

    /// Most recent run of the canary
    async fn last_run(&self, canary_name: &str) -> Result<Option<CanaryRun>>;

    /// Request a new run of the canary
    async fn start_canary(&self, canary_name: &str) -> Result<CommandStatus>;

    /// Request the canary to stop
    async fn stop_canary(&self, canary_name: &str) -> Result<CommandStatus>;
}
