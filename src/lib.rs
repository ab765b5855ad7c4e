pub mod aws;
pub mod canary;
pub mod config;
pub mod error;
pub mod handler;
pub mod harness;
pub mod logging;

pub use canary::{
    CanaryOrchestrator, CanaryRun, CanaryRunResult, CanaryRunState, CanaryState, CommandStatus,
    MockSynthetics, Poller, SimulatedCanary, SyntheticsApi,
};
pub use config::RunnerConfig;
pub use error::{CanaryError, Result};
pub use handler::{handle, handle_event, CanaryRequest};
pub use harness::{
    discover_canary_names, parse_canary_names, run_all, CanaryOutcome, HarnessReport,
    StackOutputs,
};
