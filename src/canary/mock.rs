use super::service::{CommandStatus, SyntheticsApi};
use super::types::{CanaryRun, CanaryRunState, CanaryState};
use crate::error::{CanaryError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// State-changing command received by the mock service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Stop,
}

/// A command together with the canary state it was issued against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCommand {
    pub canary: String,
    pub kind: CommandKind,
    pub observed: CanaryState,
}

/// One canary simulated by [`MockSynthetics`].
///
/// Transitional states (STARTING, STOPPING) settle after `transition_lag`
/// state queries. Reaching RUNNING creates a new run that stays RUNNING for
/// `run_duration` last-run queries before taking `outcome`.
#[derive(Debug, Clone)]
pub struct SimulatedCanary {
    name: String,
    state: CanaryState,
    settle_in: u32,
    last_run: Option<CanaryRun>,
    runs_started: u32,
    run_remaining: u32,
    outcome: CanaryRunState,
    transition_lag: u32,
    run_duration: u32,
    start_status: u16,
    stop_status: u16,
    report_state: bool,
    report_run_id: bool,
}

impl SimulatedCanary {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            state: CanaryState::Stopped,
            settle_in: 0,
            last_run: None,
            runs_started: 0,
            run_remaining: 0,
            outcome: CanaryRunState::Passed,
            transition_lag: 1,
            run_duration: 1,
            start_status: 200,
            stop_status: 200,
            report_state: true,
            report_run_id: true,
        }
    }

    /// Initial lifecycle state; transitional states settle after the lag
    pub fn state(mut self, state: CanaryState) -> Self {
        if matches!(state, CanaryState::Starting | CanaryState::Stopping) {
            self.settle_in = self.transition_lag;
        }
        self.state = state;
        self
    }

    /// Run reported before any new run starts
    pub fn last_run(mut self, run: CanaryRun) -> Self {
        if run.state == Some(CanaryRunState::Running) {
            self.run_remaining = self.run_duration;
        }
        self.last_run = Some(run);
        self.runs_started = 1;
        self
    }

    /// Final state of runs started by the simulation
    pub fn outcome(mut self, outcome: CanaryRunState) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn transition_lag(mut self, queries: u32) -> Self {
        self.transition_lag = queries;
        if matches!(self.state, CanaryState::Starting | CanaryState::Stopping) {
            self.settle_in = queries;
        }
        self
    }

    pub fn run_duration(mut self, queries: u32) -> Self {
        self.run_duration = queries;
        self
    }

    pub fn start_status(mut self, status: u16) -> Self {
        self.start_status = status;
        self
    }

    pub fn stop_status(mut self, status: u16) -> Self {
        self.stop_status = status;
        self
    }

    /// Report no lifecycle state at all
    pub fn without_state(mut self) -> Self {
        self.report_state = false;
        self
    }

    /// Report runs without their id
    pub fn without_run_ids(mut self) -> Self {
        self.report_run_id = false;
        self
    }

    fn query_state(&mut self) -> CanaryState {
        if matches!(self.state, CanaryState::Starting | CanaryState::Stopping) {
            self.settle_in = self.settle_in.saturating_sub(1);
            if self.settle_in == 0 {
                self.settle();
            }
        }
        self.state.clone()
    }

    fn settle(&mut self) {
        match self.state {
            CanaryState::Starting => {
                self.state = CanaryState::Running;
                self.runs_started += 1;
                self.run_remaining = self.run_duration;
                self.last_run = Some(CanaryRun::new(
                    format!("run-{}", self.runs_started),
                    CanaryRunState::Running,
                ));
                debug!(canary = %self.name, "Simulated canary started a new run");
            }
            CanaryState::Stopping => self.state = CanaryState::Stopped,
            _ => {}
        }
    }

    fn query_last_run(&mut self) -> Option<CanaryRun> {
        let outcome = self.outcome.clone();
        let run = self.last_run.as_mut()?;

        if run.state == Some(CanaryRunState::Running) {
            self.run_remaining = self.run_remaining.saturating_sub(1);
            if self.run_remaining == 0 {
                run.state = Some(outcome);
            }
        }

        let mut reported = run.clone();
        if !self.report_run_id {
            reported.id = None;
        }
        Some(reported)
    }

    fn begin_transition(&mut self, next: CanaryState) {
        self.state = next;
        self.settle_in = self.transition_lag;
        if self.settle_in == 0 {
            self.settle();
        }
    }
}

/// In-memory stand-in for the synthetic monitoring service
#[derive(Default)]
pub struct MockSynthetics {
    canaries: Mutex<HashMap<String, SimulatedCanary>>,
    commands: Mutex<Vec<IssuedCommand>>,
}

impl MockSynthetics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canary(self, canary: SimulatedCanary) -> Self {
        self.canaries.lock().insert(canary.name.clone(), canary);
        self
    }

    /// All commands received so far, in order
    pub fn commands(&self) -> Vec<IssuedCommand> {
        self.commands.lock().clone()
    }

    pub fn commands_for(&self, canary_name: &str) -> Vec<IssuedCommand> {
        self.commands
            .lock()
            .iter()
            .filter(|command| command.canary == canary_name)
            .cloned()
            .collect()
    }

    /// Current state without advancing the simulation
    pub fn state_of(&self, canary_name: &str) -> Option<CanaryState> {
        self.canaries
            .lock()
            .get(canary_name)
            .map(|canary| canary.state.clone())
    }

    fn not_found(operation: &str, canary_name: &str) -> CanaryError {
        CanaryError::service(
            operation.to_string(),
            format!("Canary {} not found", canary_name),
        )
    }

    fn command(&self, canary_name: &str, kind: CommandKind) -> CommandStatus {
        let mut canaries = self.canaries.lock();
        let Some(canary) = canaries.get_mut(canary_name) else {
            return CommandStatus(404);
        };

        self.commands.lock().push(IssuedCommand {
            canary: canary_name.to_string(),
            kind,
            observed: canary.state.clone(),
        });

        let (status, required, next) = match kind {
            CommandKind::Start => (canary.start_status, CanaryState::Stopped, CanaryState::Starting),
            CommandKind::Stop => (canary.stop_status, CanaryState::Running, CanaryState::Stopping),
        };

        if !CommandStatus(status).is_success() {
            return CommandStatus(status);
        }
        // The service rejects commands that do not fit the current state
        if canary.state != required {
            return CommandStatus(409);
        }

        canary.begin_transition(next);
        CommandStatus(status)
    }
}

#[async_trait::async_trait]
impl SyntheticsApi for MockSynthetics {
    async fn canary_state(&self, canary_name: &str) -> Result<Option<CanaryState>> {
        let mut canaries = self.canaries.lock();
        let canary = canaries
            .get_mut(canary_name)
            .ok_or_else(|| Self::not_found("GetCanary", canary_name))?;

        let state = canary.query_state();
        Ok(canary.report_state.then_some(state))
    }

    async fn last_run(&self, canary_name: &str) -> Result<Option<CanaryRun>> {
        let mut canaries = self.canaries.lock();
        let canary = canaries
            .get_mut(canary_name)
            .ok_or_else(|| Self::not_found("DescribeCanariesLastRun", canary_name))?;

        Ok(canary.query_last_run())
    }

    async fn start_canary(&self, canary_name: &str) -> Result<CommandStatus> {
        Ok(self.command(canary_name, CommandKind::Start))
    }

    async fn stop_canary(&self, canary_name: &str) -> Result<CommandStatus> {
        Ok(self.command(canary_name, CommandKind::Stop))
    }
}
