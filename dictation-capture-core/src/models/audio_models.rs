use std::time::Duration;

use serde::Serialize;

/// PCM sample layout written to the capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Mono 44.1 kHz signed 16-bit, the dictation WAV convention.
    pub const DICTATION: AudioFormat = AudioFormat {
        sample_rate: 44_100,
        channels: 1,
        bits_per_sample: 16,
    };

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Bytes covering `duration` of audio, rounded down to whole frames.
    pub fn bytes_for(&self, duration: Duration) -> usize {
        let frames = (duration.as_secs_f64() * self.sample_rate as f64) as usize;
        frames * self.block_align() as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::DICTATION
    }
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    /// Chunks delivered by any device stream since the last start.
    pub chunks_received: u64,
    /// Chunks discarded because the session was not recording.
    pub chunks_dropped: u64,
    /// PCM bytes appended to the capture file.
    pub bytes_written: u64,
    /// Device streams opened (start plus each resume).
    pub segments_opened: u64,
    /// Pause/resume/stop calls ignored because of the current state.
    pub ignored_calls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictation_format_rates() {
        let format = AudioFormat::DICTATION;
        assert_eq!(format.block_align(), 2);
        assert_eq!(format.byte_rate(), 88_200);
    }

    #[test]
    fn bytes_for_rounds_to_frames() {
        let stereo = AudioFormat {
            sample_rate: 48_000,
            channels: 2,
            bits_per_sample: 16,
        };
        assert_eq!(stereo.bytes_for(Duration::from_millis(50)), 9_600);
        assert_eq!(AudioFormat::DICTATION.bytes_for(Duration::from_millis(50)), 4_410);
    }
}
