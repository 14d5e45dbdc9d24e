use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::models::telemetry::TelemetryEvent;
use crate::traits::capture_delegate::CaptureDelegate;

/// Default queue depth; roughly ten seconds of chunk-rate loudness updates.
pub const DEFAULT_TELEMETRY_CAPACITY: usize = 256;

/// `CaptureDelegate` that queues events for a consumer to drain.
///
/// Events are produced on the audio and timer threads; the consumer reads
/// them from the paired receiver on whatever thread renders them. When the
/// queue is full new events are dropped, since a stale level reading is
/// worthless.
pub struct TelemetryChannel {
    tx: Sender<TelemetryEvent>,
}

impl TelemetryChannel {
    pub fn new() -> (Arc<Self>, Receiver<TelemetryEvent>) {
        Self::with_capacity(DEFAULT_TELEMETRY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Arc<Self>, Receiver<TelemetryEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (Arc::new(Self { tx }), rx)
    }

    fn publish(&self, event: TelemetryEvent) {
        match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                log::trace!("Telemetry queue full, dropping {:?}", event);
            }
        }
    }
}

impl CaptureDelegate for TelemetryChannel {
    fn on_loudness_changed(&self, loudness: f32) {
        self.publish(TelemetryEvent::LoudnessChanged(loudness));
    }

    fn on_duration_changed(&self, duration: Duration) {
        self.publish(TelemetryEvent::DurationChanged(duration));
    }

    fn on_state_changed(&self, state: &CaptureState) {
        self.publish(TelemetryEvent::StateChanged(*state));
    }

    fn on_error(&self, error: &CaptureError) {
        self.publish(TelemetryEvent::Error(error.clone()));
    }
}
