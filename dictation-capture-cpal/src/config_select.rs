//! Stream configuration negotiation.
//!
//! Devices rarely offer exactly 44.1 kHz mono i16, so the backend picks the
//! closest supported range and converts in the callback. Selection works on
//! plain descriptions of each range so it can be tested without hardware.

use std::cmp::Reverse;

use cpal::SampleFormat;

use dictation_capture_core::models::audio_models::AudioFormat;

/// One supported input range, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigCandidate {
    pub channels: u16,
    pub min_rate: u32,
    pub max_rate: u32,
    pub format: SampleFormat,
}

impl ConfigCandidate {
    pub fn contains(&self, rate: u32) -> bool {
        (self.min_rate..=self.max_rate).contains(&rate)
    }
}

impl From<&cpal::SupportedStreamConfigRange> for ConfigCandidate {
    fn from(range: &cpal::SupportedStreamConfigRange) -> Self {
        Self {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            format: range.sample_format(),
        }
    }
}

/// The chosen range and how to drive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSelection {
    /// Index into the candidate list.
    pub index: usize,
    pub sample_rate: u32,
    /// Device output already matches the target byte-for-byte.
    pub passthrough: bool,
}

/// Sample formats the backend knows how to convert.
pub fn is_convertible(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::I16 | SampleFormat::U16 | SampleFormat::I32 | SampleFormat::F32 | SampleFormat::F64
    )
}

fn format_rank(format: SampleFormat) -> u8 {
    match format {
        SampleFormat::I16 => 3,
        SampleFormat::F32 => 2,
        _ => 1,
    }
}

/// Pick the best range for `target`.
///
/// Preference order: contains the target rate, same channel count, i16
/// over f32 over the rest, then device order. Mono targets accept any
/// channel count (downmixed); stereo targets need an exact channel and
/// rate match.
pub fn choose_config(candidates: &[ConfigCandidate], target: &AudioFormat) -> Option<ConfigSelection> {
    let rate = target.sample_rate;
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.channels > 0 && is_convertible(c.format))
        .filter(|(_, c)| target.channels == 1 || (c.channels == target.channels && c.contains(rate)))
        .max_by_key(|(i, c)| {
            (
                c.contains(rate),
                c.channels == target.channels,
                format_rank(c.format),
                Reverse(*i),
            )
        })
        .map(|(index, c)| {
            let sample_rate = if c.contains(rate) { rate } else { c.max_rate };
            ConfigSelection {
                index,
                sample_rate,
                passthrough: c.format == SampleFormat::I16
                    && c.channels == target.channels
                    && sample_rate == rate,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(channels: u16, min_rate: u32, max_rate: u32, format: SampleFormat) -> ConfigCandidate {
        ConfigCandidate {
            channels,
            min_rate,
            max_rate,
            format,
        }
    }

    #[test]
    fn exact_i16_match_is_passthrough() {
        let candidates = [
            range(2, 8_000, 96_000, SampleFormat::F32),
            range(1, 8_000, 96_000, SampleFormat::I16),
        ];
        let selection = choose_config(&candidates, &AudioFormat::DICTATION).unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.sample_rate, 44_100);
        assert!(selection.passthrough);
    }

    #[test]
    fn prefers_range_covering_target_rate() {
        let candidates = [
            range(1, 48_000, 48_000, SampleFormat::I16),
            range(2, 44_100, 48_000, SampleFormat::F32),
        ];
        let selection = choose_config(&candidates, &AudioFormat::DICTATION).unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.sample_rate, 44_100);
        assert!(!selection.passthrough);
    }

    #[test]
    fn falls_back_to_highest_rate_for_resampling() {
        let candidates = [
            range(1, 16_000, 16_000, SampleFormat::I16),
            range(1, 48_000, 48_000, SampleFormat::F32),
        ];
        let selection = choose_config(&candidates, &AudioFormat::DICTATION).unwrap();
        // Neither covers 44.1 kHz; i16 ranks above f32 on format alone.
        assert_eq!(selection.index, 0);
        assert_eq!(selection.sample_rate, 16_000);
        assert!(!selection.passthrough);
    }

    #[test]
    fn stereo_target_needs_exact_match() {
        let target = AudioFormat {
            channels: 2,
            ..AudioFormat::DICTATION
        };
        let mono_only = [range(1, 8_000, 96_000, SampleFormat::I16)];
        assert_eq!(choose_config(&mono_only, &target), None);

        let stereo = [
            range(1, 8_000, 96_000, SampleFormat::I16),
            range(2, 8_000, 96_000, SampleFormat::F32),
        ];
        let selection = choose_config(&stereo, &target).unwrap();
        assert_eq!(selection.index, 1);
    }

    #[test]
    fn unsupported_formats_are_skipped() {
        let candidates = [range(1, 8_000, 96_000, SampleFormat::U8)];
        assert_eq!(choose_config(&candidates, &AudioFormat::DICTATION), None);
        assert!(!is_convertible(SampleFormat::U8));
        assert!(is_convertible(SampleFormat::F64));
    }

    #[test]
    fn ties_keep_device_order() {
        let candidates = [
            range(1, 8_000, 96_000, SampleFormat::F32),
            range(1, 8_000, 96_000, SampleFormat::F32),
        ];
        assert_eq!(choose_config(&candidates, &AudioFormat::DICTATION).unwrap().index, 0);
    }
}
