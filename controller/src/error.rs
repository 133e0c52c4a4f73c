use thiserror::Error;

/// Stable, transport-mappable error kinds raised by the controller layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("environment {0:?} is not registered")]
    UnknownEnvironment(String),

    #[error("environment {0:?} already has an action in progress")]
    AnotherActionInProgress(String),

    #[error("environment {0:?} already has a manual action scheduled")]
    ManualAlreadyScheduled(String),

    #[error("environment {0:?} is already registered")]
    EnvironmentAlreadyScheduled(String),
}
