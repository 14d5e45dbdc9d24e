/// Linear-interpolation resampler for one continuous mono signal.
///
/// The read position and the last input sample carry over between calls,
/// so a stream cut into arbitrary buffers resamples exactly like the same
/// audio delivered in one piece: no samples are lost at buffer boundaries
/// and interpolation spans them.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    /// Input samples advanced per output sample.
    step: f64,
    /// Next output position, relative to `last` (or to the first sample of
    /// the next buffer when nothing has been seen yet).
    position: f64,
    last: Option<f32>,
}

impl StreamResampler {
    pub fn new(source_sample_rate: f64, target_sample_rate: f64) -> Self {
        Self {
            step: source_sample_rate / target_sample_rate,
            position: 0.0,
            last: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        (self.step - 1.0).abs() < 1e-9
    }

    /// Resample `input` and append the result to `output`.
    pub fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        if input.is_empty() {
            return;
        }
        if self.is_passthrough() {
            output.extend_from_slice(input);
            return;
        }

        let offset = usize::from(self.last.is_some());
        let last = self.last.unwrap_or(0.0);
        let len = input.len() + offset;
        let at = |i: usize| if i < offset { last } else { input[i - offset] };

        let mut position = self.position;
        while (position as usize) + 1 < len {
            let index = position as usize;
            let fraction = (position - index as f64) as f32;
            output.push(at(index) * (1.0 - fraction) + at(index + 1) * fraction);
            position += self.step;
        }

        self.position = position - (len - 1) as f64;
        self.last = input.last().copied();
    }
}

/// Conversion from device float samples to the capture format.
///
/// Device backends that cannot open the requested format directly deliver
/// interleaved `f32` at the device rate; this downmixes to mono (or keeps
/// the channel layout), resamples each channel and packs little-endian
/// PCM16. One converter serves one stream for its whole life.
#[derive(Debug, Clone)]
pub struct PcmConverter {
    channels: usize,
    mono: bool,
    /// One per output channel.
    resamplers: Vec<StreamResampler>,
}

impl PcmConverter {
    pub fn new(source_sample_rate: f64, target_sample_rate: f64, channels: usize, mono: bool) -> Self {
        let channels = channels.max(1);
        let output_channels = if mono { 1 } else { channels };
        Self {
            channels,
            mono,
            resamplers: (0..output_channels)
                .map(|_| StreamResampler::new(source_sample_rate, target_sample_rate))
                .collect(),
        }
    }

    /// Average interleaved channels per frame.
    pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            return samples.to_vec();
        }
        let scale = 1.0 / channels as f32;
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect()
    }

    /// Convert float samples (`-1.0..=1.0`) to little-endian PCM16 bytes,
    /// clamping out-of-range values.
    pub fn convert_to_int16_pcm(samples: &[f32]) -> Vec<u8> {
        let mut pcm = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            pcm.extend_from_slice(&value.to_le_bytes());
        }
        pcm
    }

    /// Convert the next device buffer of interleaved samples.
    pub fn convert(&mut self, samples: &[f32]) -> Vec<u8> {
        if self.mono {
            let frames = Self::downmix_to_mono(samples, self.channels);
            let mut resampled = Vec::with_capacity(frames.len() + 1);
            self.resamplers[0].process(&frames, &mut resampled);
            return Self::convert_to_int16_pcm(&resampled);
        }

        let channels = self.resamplers.len();
        let whole = samples.len() - samples.len() % channels;
        let mut planes: Vec<Vec<f32>> = Vec::with_capacity(channels);
        for (channel, resampler) in self.resamplers.iter_mut().enumerate() {
            let input: Vec<f32> = samples[..whole]
                .iter()
                .skip(channel)
                .step_by(channels)
                .copied()
                .collect();
            let mut plane = Vec::with_capacity(input.len() + 1);
            resampler.process(&input, &mut plane);
            planes.push(plane);
        }

        let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
        let interleaved: Vec<f32> = (0..frames)
            .flat_map(|frame| planes.iter().map(move |plane| plane[frame]))
            .collect();
        Self::convert_to_int16_pcm(&interleaved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn resample_in_pieces(resampler: &mut StreamResampler, input: &[f32], sizes: &[usize]) -> Vec<f32> {
        let mut output = Vec::new();
        let mut rest = input;
        for &size in sizes.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let take = size.min(rest.len());
            resampler.process(&rest[..take], &mut output);
            rest = &rest[take..];
        }
        output
    }

    #[test]
    fn downmix_stereo_to_mono() {
        let mono = PcmConverter::downmix_to_mono(&[0.2, 0.8, 0.4, 0.6], 2);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(mono[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn downmix_drops_partial_frame() {
        let mono = PcmConverter::downmix_to_mono(&[0.1, 0.3, 0.9], 2);
        assert_eq!(mono.len(), 1);
    }

    #[test]
    fn same_rate_is_passthrough() {
        let mut resampler = StreamResampler::new(44_100.0, 44_100.0);
        assert!(resampler.is_passthrough());
        let mut output = Vec::new();
        resampler.process(&[0.1, 0.2, 0.3], &mut output);
        assert_eq!(output, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn upsample_2x_interpolates_across_calls() {
        let mut resampler = StreamResampler::new(22_050.0, 44_100.0);
        let mut output = Vec::new();
        resampler.process(&[0.0, 1.0], &mut output);
        resampler.process(&[0.0], &mut output);

        assert_eq!(output.len(), 4);
        assert_relative_eq!(output[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(output[1], 0.5, epsilon = 1e-6);
        assert_relative_eq!(output[2], 1.0, epsilon = 1e-6);
        // Midpoint between the last sample of the first buffer and the
        // first sample of the second.
        assert_relative_eq!(output[3], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn small_buffers_keep_total_length() {
        // 94 buffers of 512 frames at 48 kHz.
        let mut resampler = StreamResampler::new(48_000.0, 44_100.0);
        let input = vec![0.25f32; 94 * 512];
        let output = resample_in_pieces(&mut resampler, &input, &[512]);

        let expected = input.len() as f64 * 44_100.0 / 48_000.0;
        assert!(
            (output.len() as f64 - expected).abs() <= 1.0,
            "expected ~{} samples, got {}",
            expected,
            output.len()
        );
    }

    #[test]
    fn odd_sized_buffers_match_single_pass() {
        let input: Vec<f32> = (0..20_000).map(|i| ((i as f32) * 0.01).sin()).collect();

        let mut whole = StreamResampler::new(48_000.0, 44_100.0);
        let mut expected = Vec::new();
        whole.process(&input, &mut expected);

        let mut pieces = StreamResampler::new(48_000.0, 44_100.0);
        let output = resample_in_pieces(&mut pieces, &input, &[1, 441, 37, 1000, 512, 3]);

        assert!(output.len().abs_diff(expected.len()) <= 1);
        for (got, want) in output.iter().zip(&expected) {
            assert_relative_eq!(*got, *want, epsilon = 1e-4);
        }
    }

    #[test]
    fn convert_to_int16_pcm_clamps() {
        let pcm = PcmConverter::convert_to_int16_pcm(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(pcm.len(), 8);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 0);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[4], pcm[5]]), -i16::MAX);
        assert_eq!(i16::from_le_bytes([pcm[6], pcm[7]]), i16::MAX);
    }

    #[test]
    fn convert_downmixes_and_resamples_across_buffers() {
        // Stereo 48 kHz device, mono 44.1 kHz capture.
        let mut converter = PcmConverter::new(48_000.0, 44_100.0, 2, true);
        let buffer = vec![0.5f32; 2 * 480];
        let bytes: usize = (0..100).map(|_| converter.convert(&buffer).len()).sum();

        // One second of input.
        let samples = bytes / 2;
        assert!(samples.abs_diff(44_100) <= 1, "got {} samples", samples);
    }

    #[test]
    fn convert_keeps_stereo_interleaving() {
        let mut converter = PcmConverter::new(44_100.0, 44_100.0, 2, false);
        let pcm = converter.convert(&[1.0, -1.0, 1.0, -1.0]);
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX, i16::MAX, -i16::MAX]);
    }
}
