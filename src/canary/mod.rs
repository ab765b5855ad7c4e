mod mock;
mod orchestrator;
mod poll;
mod service;
mod types;

pub use mock::{CommandKind, IssuedCommand, MockSynthetics, SimulatedCanary};
pub use orchestrator::CanaryOrchestrator;
pub use poll::Poller;
pub use service::{CommandStatus, SyntheticsApi};
pub use types::{CanaryRun, CanaryRunResult, CanaryRunState, CanaryState};
