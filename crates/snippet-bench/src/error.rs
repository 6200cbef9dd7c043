use thiserror::Error;

/// Errors that abort a benchmark run.
///
/// No partial results are ever returned alongside one of these.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("No samples collected for snippet '{name}'")]
    MissingData { name: String },

    #[error("Render host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Run counter store failed: {0}")]
    Counter(String),
}

impl BenchError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        BenchError::Configuration(msg.into())
    }

    pub(crate) fn host(err: impl std::fmt::Display) -> Self {
        BenchError::HostUnavailable(err.to_string())
    }
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;
