use thiserror::Error;

/// Every way an execute request can end other than a clean command result.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No command provided")]
    MissingCommand,
    #[error("invalid request body: {0}")]
    BadRequest(String),
    #[error("cd: no such file or directory: {0}")]
    Navigation(String),
    #[error("{0}")]
    Builtin(String),
    #[error("command not allowed: {0}")]
    NotAllowed(String),
    #[error("Command timed out")]
    Timeout,
    #[error("{0}")]
    Unexpected(#[from] std::io::Error),
}

impl BridgeError {
    pub fn status(&self) -> u16 {
        match self {
            BridgeError::MissingCommand | BridgeError::BadRequest(_) => 400,
            // the request was processed; the command itself reported the failure
            BridgeError::Navigation(_) | BridgeError::Builtin(_) => 200,
            BridgeError::NotAllowed(_) => 403,
            BridgeError::Timeout | BridgeError::Unexpected(_) => 500,
        }
    }

    /// Whether the failure happened before a working directory was settled.
    pub fn before_cwd(&self) -> bool {
        matches!(self, BridgeError::MissingCommand | BridgeError::BadRequest(_))
    }
}
