//! WAV file format utilities.
//!
//! Generates the standard 44-byte RIFF/WAVE PCM header and parses it back
//! when a capture file is reopened for appending.

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

const PCM_FORMAT_CODE: u16 = 1;

/// Fields recovered from a 44-byte PCM WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: AudioFormat,
    pub data_size: u32,
}

/// Generate a 44-byte WAV RIFF header.
///
/// Layout (little-endian):
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits / 8
/// [32-33]  block_align = channels * bits / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// Data sizes beyond the 32-bit RIFF limit are clamped.
pub fn generate_wav_header(format: &AudioFormat, data_size: u64) -> [u8; WAV_HEADER_SIZE] {
    let data_size = clamp_u32(data_size);
    let chunk_size = data_size.saturating_add(36);

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Parse a canonical 44-byte PCM WAV header.
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavHeader, CaptureError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(CaptureError::EncodingFailed(format!(
            "header too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(CaptureError::EncodingFailed("not a RIFF/WAVE file".into()));
    }
    if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(CaptureError::EncodingFailed(
            "unsupported chunk layout (expected fmt + data)".into(),
        ));
    }
    let format_code = u16_at(bytes, 20);
    if format_code != PCM_FORMAT_CODE {
        return Err(CaptureError::EncodingFailed(format!(
            "unsupported format code: {}",
            format_code
        )));
    }

    Ok(WavHeader {
        format: AudioFormat {
            channels: u16_at(bytes, 22),
            sample_rate: u32_at(bytes, 24),
            bits_per_sample: u16_at(bytes, 34),
        },
        data_size: u32_at(bytes, 40),
    })
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_riff_magic() {
        let header = generate_wav_header(&AudioFormat::DICTATION, 0);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn header_dictation_format() {
        let header = generate_wav_header(&AudioFormat::DICTATION, 8820);

        assert_eq!(u16_at(&header, 20), 1);
        assert_eq!(u32_at(&header, 16), 16);
        assert_eq!(u16_at(&header, 22), 1);
        assert_eq!(u32_at(&header, 24), 44_100);
        assert_eq!(u32_at(&header, 28), 88_200);
        assert_eq!(u16_at(&header, 32), 2);
        assert_eq!(u16_at(&header, 34), 16);
        assert_eq!(u32_at(&header, 40), 8820);
        assert_eq!(u32_at(&header, 4), 36 + 8820);
    }

    #[test]
    fn oversized_data_is_clamped() {
        let header = generate_wav_header(&AudioFormat::DICTATION, u64::MAX);
        assert_eq!(u32_at(&header, 40), u32::MAX);
        assert_eq!(u32_at(&header, 4), u32::MAX);
    }

    #[test]
    fn parse_recovers_generated_fields() {
        let format = AudioFormat {
            sample_rate: 16_000,
            channels: 2,
            bits_per_sample: 16,
        };
        let parsed = parse_wav_header(&generate_wav_header(&format, 640)).unwrap();
        assert_eq!(parsed.format, format);
        assert_eq!(parsed.data_size, 640);
    }

    #[test]
    fn parse_rejects_foreign_files() {
        assert!(matches!(
            parse_wav_header(b"RIFF"),
            Err(CaptureError::EncodingFailed(_))
        ));

        let mut header = generate_wav_header(&AudioFormat::DICTATION, 0);
        header[8..12].copy_from_slice(b"AVI ");
        assert!(parse_wav_header(&header).is_err());

        let mut header = generate_wav_header(&AudioFormat::DICTATION, 0);
        header[20..22].copy_from_slice(&3u16.to_le_bytes());
        assert!(parse_wav_header(&header).is_err());
    }
}
