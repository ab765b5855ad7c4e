use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanaryError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Command {command} for canary {canary} failed with status {status}")]
    CommandFailed {
        command: String,
        canary: String,
        status: u16,
    },

    #[error("Value was missing: {what} of canary {canary}")]
    MissingValue { what: String, canary: String },

    #[error("Gave up waiting for {what} of canary {canary} after {attempts} attempts")]
    PollTimeout {
        what: String,
        canary: String,
        attempts: u32,
    },

    #[error("Service error in {operation}: {message}")]
    Service { operation: String, message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Harness error: {message}")]
    Harness { message: String },
}

impl CanaryError {
    pub fn missing<S: Into<String>>(what: S, canary: S) -> Self {
        Self::MissingValue {
            what: what.into(),
            canary: canary.into(),
        }
    }

    pub fn service<S: Into<String>>(operation: S, message: S) -> Self {
        Self::Service {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn harness<S: Into<String>>(message: S) -> Self {
        Self::Harness {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CanaryError>;
