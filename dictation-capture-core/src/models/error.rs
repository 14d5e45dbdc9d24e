use thiserror::Error;

/// Errors that can occur during audio capture operations.
///
/// Only `start` reports out-of-state misuse (`AlreadyActive`); the other
/// transitions ignore calls made in the wrong state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("a capture is already active")]
    AlreadyActive,

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
