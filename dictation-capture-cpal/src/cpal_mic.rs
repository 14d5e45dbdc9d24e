//! cpal microphone capture provider.
//!
//! Opens an input stream on the requested device and delivers fixed-size
//! little-endian PCM16 chunks via the `ChunkCallback`.

use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Sample, SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Sender};

use dictation_capture_core::models::audio_models::AudioSource;
use dictation_capture_core::models::error::CaptureError;
use dictation_capture_core::processing::chunk_assembler::ChunkAssembler;
use dictation_capture_core::processing::pcm_converter::PcmConverter;
use dictation_capture_core::traits::capture_provider::{
    CaptureProvider, CaptureStream, ChunkCallback, InputSpec,
};

use crate::config_select::{choose_config, ConfigCandidate};
use crate::device_enumerator::DeviceEnumerator;

/// Microphone capture through cpal.
///
/// `cpal::Stream` is not `Send` on every host, so each opened stream lives
/// on its own thread for its whole life; the returned handle only carries
/// the channel that tells that thread to drop it.
#[derive(Debug, Clone, Default)]
pub struct CpalMicCapture {
    device_name: Option<String>,
}

impl CpalMicCapture {
    /// Capture from whatever the host reports as the default input.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from a specific input, matched by device name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

impl CaptureProvider for CpalMicCapture {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .find_capture_device(self.device_name.as_deref())
            .is_ok()
    }

    fn open(
        &self,
        spec: &InputSpec,
        callback: ChunkCallback,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let device_name = self.device_name.clone();
        let spec = *spec;
        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = match build_stream(device_name.as_deref(), &spec, callback) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
                        "failed to start input stream: {}",
                        e
                    ))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Parked until the handle stops or is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("Input stream closed");
            })
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!("failed to spawn mic thread: {}", e))
            })?;

        let setup = ready_rx.recv().unwrap_or_else(|_| {
            Err(CaptureError::DeviceUnavailable(
                "mic thread exited during setup".into(),
            ))
        });
        match setup {
            Ok(()) => Ok(Box::new(CpalCaptureStream {
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            })),
            Err(e) => {
                let _ = handle.join();
                Err(e)
            }
        }
    }

    fn available_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        DeviceEnumerator::new().list_capture_devices()
    }
}

/// Handle to a playing input stream owned by its capture thread.
pub struct CpalCaptureStream {
    stop_tx: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureStream for CpalCaptureStream {
    fn stop(&mut self) -> Result<(), CaptureError> {
        // Dropping the sender wakes the capture thread.
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| {
                CaptureError::DeviceUnavailable("mic thread panicked".into())
            })?;
        }
        Ok(())
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Failed to close input stream: {}", e);
        }
    }
}

/// Resolve the device, negotiate a config and build a (paused) stream.
///
/// Runs on the capture thread.
fn build_stream(
    device_name: Option<&str>,
    spec: &InputSpec,
    callback: ChunkCallback,
) -> Result<cpal::Stream, CaptureError> {
    let device = DeviceEnumerator::new().find_capture_device(device_name)?;
    let name = device.name().unwrap_or_else(|_| "unknown".into());

    let ranges: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("{}: {}", name, e)))?
        .collect();
    let candidates: Vec<ConfigCandidate> = ranges.iter().map(ConfigCandidate::from).collect();
    let selection = choose_config(&candidates, &spec.format).ok_or_else(|| {
        CaptureError::ConfigurationFailed(format!(
            "{} offers no usable input config for {} Hz / {} ch",
            name, spec.format.sample_rate, spec.format.channels
        ))
    })?;

    let supported = ranges[selection.index]
        .clone()
        .with_sample_rate(cpal::SampleRate(selection.sample_rate));
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    log::info!(
        "Opening {}: {} Hz, {} ch, {:?}{}",
        name,
        config.sample_rate.0,
        config.channels,
        sample_format,
        if selection.passthrough { "" } else { " (converted)" }
    );

    let assembler = ChunkAssembler::new(spec.chunk_bytes());
    let stream = if selection.passthrough {
        build_passthrough_stream(&device, &config, assembler, callback)
    } else {
        let target_rate = spec.format.sample_rate as f64;
        let mono = spec.format.channels == 1;
        match sample_format {
            SampleFormat::I16 => build_converting_stream::<i16>(&device, &config, target_rate, mono, assembler, callback),
            SampleFormat::U16 => build_converting_stream::<u16>(&device, &config, target_rate, mono, assembler, callback),
            SampleFormat::I32 => build_converting_stream::<i32>(&device, &config, target_rate, mono, assembler, callback),
            SampleFormat::F32 => build_converting_stream::<f32>(&device, &config, target_rate, mono, assembler, callback),
            SampleFormat::F64 => build_converting_stream::<f64>(&device, &config, target_rate, mono, assembler, callback),
            other => {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
    };

    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable(format!("{} disappeared", name))
        }
        other => CaptureError::ConfigurationFailed(format!("failed to build input stream: {}", other)),
    })
}

/// Device already delivers the target layout; only re-chunk.
fn build_passthrough_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut assembler: ChunkAssembler,
    callback: ChunkCallback,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let mut bytes = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            bytes.clear();
            bytes.extend(data.iter().flat_map(|s| s.to_le_bytes()));
            assembler.push(&bytes, |chunk| callback(chunk));
        },
        log_stream_error,
        None,
    )
}

/// Convert arbitrary device samples to the target PCM16 layout.
fn build_converting_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    target_rate: f64,
    mono: bool,
    mut assembler: ChunkAssembler,
    callback: ChunkCallback,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    // Resampler state spans callbacks for the life of the stream.
    let mut converter = PcmConverter::new(
        config.sample_rate.0 as f64,
        target_rate,
        config.channels as usize,
        mono,
    );
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
            let pcm = converter.convert(&samples);
            assembler.push(&pcm, |chunk| callback(chunk));
        },
        log_stream_error,
        None,
    )
}

fn log_stream_error(err: cpal::StreamError) {
    log::error!("Input stream error: {}", err);
}
