use super::poll::Poller;
use super::service::{CommandStatus, SyntheticsApi};
use super::types::{CanaryRun, CanaryRunResult, CanaryRunState, CanaryState};
use crate::config::RunnerConfig;
use crate::error::{CanaryError, Result};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Drives a canary through stop, start and a fresh run, then reports its verdict
pub struct CanaryOrchestrator {
    service: Arc<dyn SyntheticsApi>,
    poller: Poller,
    require_previous_run: bool,
}

impl CanaryOrchestrator {
    pub fn new(service: Arc<dyn SyntheticsApi>, poller: Poller) -> Self {
        Self {
            service,
            poller,
            require_previous_run: false,
        }
    }

    pub fn from_config(service: Arc<dyn SyntheticsApi>, config: &RunnerConfig) -> Self {
        Self::new(service, Poller::from_config(&config.polling))
            .with_require_previous_run(config.orchestration.require_previous_run)
    }

    /// Fail instead of accepting any run as new when the canary has never run
    pub fn with_require_previous_run(mut self, require: bool) -> Self {
        self.require_previous_run = require;
        self
    }

    /// Run the canary once and report whether the new run passed
    pub async fn run_canary(&self, canary_name: &str) -> Result<CanaryRunResult> {
        let span = info_span!("canary", canary_name);

        async {
            match self.execute(canary_name).await {
                Ok(passed) => Ok(CanaryRunResult::new(canary_name, passed)),
                Err(e) => {
                    error!("Error running canary {}: {}", canary_name, e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, canary_name: &str) -> Result<bool> {
        info!("Executing canary {}", canary_name);

        self.ensure_stopped(canary_name).await?;

        let baseline = self.last_run_id(canary_name).await?;
        self.ensure_started(canary_name).await?;

        let run = self.wait_for_new_run(canary_name, baseline.as_deref()).await?;
        let passed = run.state == Some(CanaryRunState::Passed);

        if passed {
            info!(run_id = ?run.id, "Canary {} has passed", canary_name);
        } else {
            error!(
                run_id = ?run.id,
                reason = ?run.state_reason,
                "Canary {} has failed",
                canary_name
            );
        }

        Ok(passed)
    }

    /// Bring the canary to STOPPED. Issues no command when it already is.
    pub async fn ensure_stopped(&self, canary_name: &str) -> Result<()> {
        let mut state = self.canary_state(canary_name).await?;

        if state == CanaryState::Stopped {
            info!("Canary {} is stopped", canary_name);
            return Ok(());
        }

        // A starting canary cannot be stopped until it is running
        if state == CanaryState::Starting {
            self.wait_for_state(canary_name, CanaryState::Running).await?;
            state = CanaryState::Running;
        }

        if state != CanaryState::Stopping {
            info!(%state, "Stopping canary {}", canary_name);
            let status = self.service.stop_canary(canary_name).await?;
            check_status("StopCanary", canary_name, status)?;
        }

        self.wait_for_state(canary_name, CanaryState::Stopped).await?;
        info!("Canary {} has stopped", canary_name);
        Ok(())
    }

    /// Bring the canary to RUNNING, starting it if needed
    pub async fn ensure_started(&self, canary_name: &str) -> Result<()> {
        let mut state = self.canary_state(canary_name).await?;

        if state == CanaryState::Running {
            // The completion wait still requires a run id past the baseline
            warn!("Canary {} is already running", canary_name);
            return Ok(());
        }

        if state == CanaryState::Stopping {
            self.wait_for_state(canary_name, CanaryState::Stopped).await?;
            state = CanaryState::Stopped;
        }

        if state != CanaryState::Starting {
            info!(%state, "Starting canary {}", canary_name);
            let status = self.service.start_canary(canary_name).await?;
            check_status("StartCanary", canary_name, status)?;
        }

        self.wait_for_state(canary_name, CanaryState::Running).await?;
        info!("Canary {} has started", canary_name);
        Ok(())
    }

    /// Id of the most recent run, `None` when the canary has never run and
    /// a previous run is not required
    pub async fn last_run_id(&self, canary_name: &str) -> Result<Option<String>> {
        match self.service.last_run(canary_name).await? {
            Some(run) => {
                let id = require(run.id, "ID of last run", canary_name)?;
                info!(run_id = %id, "Recorded baseline run of canary {}", canary_name);
                Ok(Some(id))
            }
            None if self.require_previous_run => {
                Err(CanaryError::missing("Last run", canary_name))
            }
            None => {
                info!("Canary {} has no previous run", canary_name);
                Ok(None)
            }
        }
    }

    /// Wait for a finished run whose id differs from `baseline`
    pub async fn wait_for_new_run(
        &self,
        canary_name: &str,
        baseline: Option<&str>,
    ) -> Result<CanaryRun> {
        info!("Waiting for current run of canary {} to complete", canary_name);

        self.poller
            .wait_for(
                canary_name,
                "new completed run",
                || self.observe_run(canary_name, baseline),
                |observed| observed.is_some(),
            )
            .await?
            .ok_or_else(|| CanaryError::missing("Completed run", canary_name))
    }

    /// One poll of the last run: `Some` once a new run has finished
    async fn observe_run(
        &self,
        canary_name: &str,
        baseline: Option<&str>,
    ) -> Result<Option<CanaryRun>> {
        let run = match self.service.last_run(canary_name).await? {
            Some(run) => run,
            // Nothing to compare against yet; the first run may still be spinning up
            None if baseline.is_none() => return Ok(None),
            None => return Err(CanaryError::missing("Last run", canary_name)),
        };

        let id = require(run.id.as_deref(), "ID of last run", canary_name)?;
        if Some(id) == baseline {
            return Ok(None);
        }

        let state = require(run.state.as_ref(), "State of last run", canary_name)?;
        if !state.is_terminal() {
            return Ok(None);
        }

        Ok(Some(run))
    }

    async fn canary_state(&self, canary_name: &str) -> Result<CanaryState> {
        let state = self.service.canary_state(canary_name).await?;
        require(state, "State", canary_name)
    }

    async fn wait_for_state(&self, canary_name: &str, target: CanaryState) -> Result<()> {
        let what = format!("state {}", target);
        self.poller
            .wait_for(
                canary_name,
                &what,
                || self.canary_state(canary_name),
                |state| *state == target,
            )
            .await?;
        Ok(())
    }
}

fn check_status(command: &str, canary_name: &str, status: CommandStatus) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    Err(CanaryError::CommandFailed {
        command: command.to_string(),
        canary: canary_name.to_string(),
        status: status.0,
    })
}

fn require<T>(value: Option<T>, what: &str, canary_name: &str) -> Result<T> {
    value.ok_or_else(|| CanaryError::missing(what, canary_name))
}
