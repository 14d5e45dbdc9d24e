/// Instantaneous loudness for live level meters.
///
/// Loudness is the root-mean-square of the chunk's samples normalised to
/// full scale (`sample / 32768`), so silence is 0.0 and a chunk pinned at
/// `i16::MIN` is exactly 1.0. Stateless; safe to call from any thread.
pub struct LoudnessMeter;

impl LoudnessMeter {
    /// RMS loudness of signed 16-bit samples, in `[0, 1]`. Empty input yields 0.
    pub fn compute(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples
            .iter()
            .map(|&s| {
                let n = s as f64 / 32768.0;
                n * n
            })
            .sum();
        let rms = (sum_sq / samples.len() as f64).sqrt();
        rms.clamp(0.0, 1.0) as f32
    }

    /// RMS loudness of little-endian PCM16 bytes as delivered by a device.
    ///
    /// A trailing odd byte is ignored.
    pub fn compute_pcm16_le(bytes: &[u8]) -> f32 {
        let sample_count = bytes.len() / 2;
        if sample_count == 0 {
            return 0.0;
        }
        let sum_sq: f64 = bytes
            .chunks_exact(2)
            .map(|pair| {
                let n = i16::from_le_bytes([pair[0], pair[1]]) as f64 / 32768.0;
                n * n
            })
            .sum();
        let rms = (sum_sq / sample_count as f64).sqrt();
        rms.clamp(0.0, 1.0) as f32
    }
}
