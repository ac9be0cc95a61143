use thiserror::Error;

/// Errors from the fallible edges of the tracker: configuration, providers and sinks.
///
/// The fix pipeline itself never fails; rejected fixes are reported as values.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Location provider failed: {0}")]
    ProviderFailed(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Health data sink error: {0}")]
    SinkFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
