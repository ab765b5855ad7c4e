use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canary lifecycle states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanaryState {
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Any other upstream state (CREATING, READY, ERROR, ...)
    Other(String),
}

impl fmt::Display for CanaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("STOPPED"),
            Self::Starting => f.write_str("STARTING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Stopping => f.write_str("STOPPING"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// State of a single canary run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanaryRunState {
    Running,
    Passed,
    Failed,
    Other(String),
}

impl CanaryRunState {
    /// Whether the run has finished executing
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for CanaryRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("RUNNING"),
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// Most recent run of a canary as reported by the service.
///
/// Fields are optional because the service does not guarantee them; the
/// orchestrator decides which absences are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanaryRun {
    pub id: Option<String>,
    pub state: Option<CanaryRunState>,
    pub state_reason: Option<String>,
}

impl CanaryRun {
    pub fn new<S: Into<String>>(id: S, state: CanaryRunState) -> Self {
        Self {
            id: Some(id.into()),
            state: Some(state),
            state_reason: None,
        }
    }
}

/// Outcome of one orchestrated canary run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanaryRunResult {
    pub canary_name: String,
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
}

impl CanaryRunResult {
    pub fn new<S: Into<String>>(canary_name: S, passed: bool) -> Self {
        Self {
            canary_name: canary_name.into(),
            passed,
            timestamp: Utc::now(),
        }
    }
}
