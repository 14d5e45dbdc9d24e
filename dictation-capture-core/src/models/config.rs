use std::time::Duration;

use super::audio_models::AudioFormat;

/// Configuration for a capture session.
///
/// The output directory is not part of it: callers pass it to
/// `CaptureSession::start` for each capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Sample format requested from the device and written to disk
    /// (default: mono 44.1 kHz 16-bit).
    pub format: AudioFormat,

    /// File name prefix; files are named `<prefix>_YYYYMMDD_HHMMSS.wav`.
    pub file_prefix: String,

    /// Amount of audio delivered per device callback (default: 50ms).
    pub chunk_duration: Duration,

    /// Interval at which the recorded duration is republished (default: 250ms).
    pub duration_tick: Duration,

    /// Rewrite the WAV header after this much audio so an interrupted
    /// capture stays playable (default: 1s, None = only on finalize).
    pub header_refresh: Option<Duration>,

    /// Finalize the file on pause and reopen it for appending on resume.
    pub release_encoder_on_pause: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.format.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.format.bits_per_sample != 16 {
            return Err(format!(
                "unsupported bit depth: {}",
                self.format.bits_per_sample
            ));
        }
        if ![1, 2].contains(&self.format.channels) {
            return Err(format!(
                "unsupported channel count: {}",
                self.format.channels
            ));
        }
        if self.file_prefix.is_empty() {
            return Err("file prefix must not be empty".into());
        }
        if self.file_prefix.contains(['/', '\\']) {
            return Err(format!(
                "file prefix must not contain path separators: {}",
                self.file_prefix
            ));
        }
        if self.chunk_duration.is_zero() {
            return Err("chunk duration must be positive".into());
        }
        if self.duration_tick.is_zero() {
            return Err("duration tick must be positive".into());
        }
        if matches!(self.header_refresh, Some(interval) if interval.is_zero()) {
            return Err("header refresh interval must be positive".into());
        }
        Ok(())
    }

    /// Header refresh interval in data bytes.
    pub fn header_refresh_bytes(&self) -> Option<u64> {
        self.header_refresh
            .map(|interval| self.format.bytes_for(interval).max(1) as u64)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            format: AudioFormat::DICTATION,
            file_prefix: "capture".into(),
            chunk_duration: Duration::from_millis(50),
            duration_tick: Duration::from_millis(250),
            header_refresh: Some(Duration::from_secs(1)),
            release_encoder_on_pause: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(CaptureConfiguration::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_pcm16() {
        let mut config = CaptureConfiguration::default();
        config.format.bits_per_sample = 24;
        assert!(config.validate().unwrap_err().contains("bit depth"));
    }

    #[test]
    fn rejects_prefix_with_separator() {
        let config = CaptureConfiguration {
            file_prefix: "../escape".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_intervals() {
        let config = CaptureConfiguration {
            duration_tick: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CaptureConfiguration {
            header_refresh: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn header_refresh_in_bytes() {
        let config = CaptureConfiguration::default();
        assert_eq!(config.header_refresh_bytes(), Some(88_200));

        let config = CaptureConfiguration {
            header_refresh: None,
            ..Default::default()
        };
        assert_eq!(config.header_refresh_bytes(), None);
    }
}
