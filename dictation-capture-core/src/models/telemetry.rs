use std::time::Duration;

use super::error::CaptureError;
use super::state::CaptureState;

/// Ephemeral telemetry published while a capture is running.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// RMS loudness of the latest chunk, in `[0, 1]`.
    LoudnessChanged(f32),
    /// Recorded duration, excluding paused intervals.
    DurationChanged(Duration),
    StateChanged(CaptureState),
    Error(CaptureError),
}
