use std::sync::Arc;
use std::time::Duration;

use crate::models::audio_models::{AudioFormat, AudioSource};
use crate::models::error::CaptureError;

/// Callback invoked with each chunk of little-endian PCM16 bytes.
///
/// Fires on the backend's audio thread; keep processing minimal.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// What a capture session asks of a device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub format: AudioFormat,
    /// Audio per callback; backends re-chunk driver buffers to this size.
    pub chunk_duration: Duration,
}

impl InputSpec {
    pub fn chunk_bytes(&self) -> usize {
        self.format.bytes_for(self.chunk_duration).max(self.format.block_align() as usize)
    }
}

/// An open device input stream. Holding it keeps the device acquired.
///
/// Dropping the stream must release the device as well, so an error path
/// that never reaches `stop` still frees the hardware.
pub trait CaptureStream: Send {
    /// Stop delivering chunks and release the device. Safe to call twice.
    fn stop(&mut self) -> Result<(), CaptureError>;
}

/// Interface for platform-specific microphone sources.
///
/// Each `open` acquires the device for one recording segment; the session
/// releases it on pause and opens a fresh stream on resume.
pub trait CaptureProvider: Send + Sync {
    /// Whether an input device is present.
    fn is_available(&self) -> bool;

    /// Open an input stream delivering chunks to `callback` until stopped.
    fn open(&self, spec: &InputSpec, callback: ChunkCallback) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Input devices the user can choose from.
    fn available_sources(&self) -> Result<Vec<AudioSource>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bytes_for_default_input() {
        let spec = InputSpec {
            format: AudioFormat::DICTATION,
            chunk_duration: Duration::from_millis(50),
        };
        assert_eq!(spec.chunk_bytes(), 4_410);
    }

    #[test]
    fn chunk_bytes_never_below_one_frame() {
        let spec = InputSpec {
            format: AudioFormat::DICTATION,
            chunk_duration: Duration::from_nanos(1),
        };
        assert_eq!(spec.chunk_bytes(), 2);
    }
}
