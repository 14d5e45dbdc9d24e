use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Result returned by `CaptureSession::stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    /// Time spent recording, excluding paused intervals.
    pub duration: Duration,
    /// Size of the finalized file, 0 if it does not exist.
    pub file_size_bytes: u64,
}

impl RecordingResult {
    /// Result reported by a stop on an idle session.
    pub fn empty(file_path: PathBuf) -> Self {
        Self {
            file_path,
            duration: Duration::ZERO,
            file_size_bytes: 0,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
