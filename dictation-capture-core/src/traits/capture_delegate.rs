use std::time::Duration;

use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// Threading: `on_loudness_changed` runs on the device's audio thread,
/// `on_duration_changed` on the session's duration timer thread, and
/// `on_state_changed` / `on_error` on whichever thread drove the transition
/// (the caller, or the audio thread when a write fails). Callbacks may run
/// concurrently with each other and are never invoked while the session's
/// internal lock is held. Implementations should marshal to a UI thread if
/// needed; `TelemetryChannel` does this with a queue.
pub trait CaptureDelegate: Send + Sync {
    /// Loudness of the latest recorded chunk, in `[0, 1]`.
    fn on_loudness_changed(&self, loudness: f32);

    /// Recorded duration, republished periodically while recording.
    fn on_duration_changed(&self, duration: Duration);

    fn on_state_changed(&self, _state: &CaptureState) {}

    fn on_error(&self, _error: &CaptureError) {}
}
