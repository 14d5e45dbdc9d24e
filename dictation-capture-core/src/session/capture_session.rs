use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::models::audio_models::{AudioFormat, AudioSource, CaptureSessionDiagnostics};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::processing::loudness::LoudnessMeter;
use crate::session::clock::{Clock, SystemClock};
use crate::storage::streaming_encoder::StreamingEncoder;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::{CaptureProvider, CaptureStream, ChunkCallback, InputSpec};

/// Internal mutable session state, shared with the device callback.
///
/// Every state transition and every chunk append happens under this one
/// lock, so a chunk is either written before a pause commits its segment or
/// dropped after it.
struct SessionState {
    state: CaptureState,
    /// Time committed by finished segments.
    accumulated: Duration,
    /// Start of the running segment; `Some` only while recording.
    segment_start: Option<Instant>,
    /// Bumped on every transition; callbacks carry the id they were opened
    /// with and are ignored once it no longer matches.
    segment_id: u64,
    encoder: Option<StreamingEncoder>,
    loudness: f32,
    /// Write failure that aborted the capture on the audio thread.
    fault: Option<CaptureError>,
    diagnostics: CaptureSessionDiagnostics,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            accumulated: Duration::ZERO,
            segment_start: None,
            segment_id: 0,
            encoder: None,
            loudness: 0.0,
            fault: None,
            diagnostics: CaptureSessionDiagnostics::default(),
        }
    }

    fn total_duration(&self, now: Instant) -> Duration {
        match (self.state, self.segment_start) {
            (CaptureState::Recording, Some(start)) => {
                self.accumulated + now.saturating_duration_since(start)
            }
            _ => self.accumulated,
        }
    }

    fn commit_segment(&mut self, now: Instant) {
        if let Some(start) = self.segment_start.take() {
            self.accumulated += now.saturating_duration_since(start);
        }
    }

    fn ignore(&mut self, call: &str) {
        self.diagnostics.ignored_calls += 1;
        log::debug!("{} ignored while {}", call, self.state.as_str());
    }
}

struct DurationTimer {
    stop_tx: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// Single-file microphone capture with pause/resume.
///
/// Data flow:
/// ```text
/// [CaptureProvider stream] → chunk → [StreamingEncoder] → capture_*.wav
///                                  └→ [LoudnessMeter] → delegate.on_loudness_changed
/// [duration timer] ───────────────────────────────────→ delegate.on_duration_changed
/// ```
///
/// The device is acquired per recording segment: `pause` stops and drops
/// the input stream while the encoder stays open, `resume` opens a fresh
/// stream that keeps appending to the same file. Audio during a pause is
/// simply not captured.
///
/// Only `start` reports misuse (`AlreadyActive`); `pause`, `resume` and
/// `stop` in the wrong state are ignored and counted in
/// [`CaptureSessionDiagnostics::ignored_calls`].
pub struct CaptureSession<P: CaptureProvider> {
    provider: P,
    config: CaptureConfiguration,
    clock: Arc<dyn Clock>,
    shared: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    stream: Option<Box<dyn CaptureStream>>,
    timer: Option<DurationTimer>,
    file_path: Option<PathBuf>,
}

impl<P: CaptureProvider> CaptureSession<P> {
    pub fn new(provider: P, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Like `new`, timing segments with `clock`.
    pub fn with_clock(
        provider: P,
        config: CaptureConfiguration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            provider,
            config,
            clock,
            shared: Arc::new(Mutex::new(SessionState::new())),
            delegate: None,
            stream: None,
            timer: None,
            file_path: None,
        })
    }

    /// Register the telemetry subscriber. Takes effect from the next start.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.shared.lock().state
    }

    /// Recorded time so far, excluding pauses. Zero once stopped.
    pub fn duration(&self) -> Duration {
        let now = self.clock.now();
        self.shared.lock().total_duration(now)
    }

    /// Loudness of the last recorded chunk; 0 unless recording.
    pub fn current_loudness(&self) -> f32 {
        self.shared.lock().loudness
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.shared.lock().diagnostics.clone()
    }

    /// Path of the current capture, or the last one after stop.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn available_audio_sources(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.provider.available_sources()
    }

    /// Begin a new capture in `output_directory` and return its file path.
    ///
    /// Transitions: idle → recording.
    pub fn start(&mut self, output_directory: impl AsRef<Path>) -> Result<PathBuf, CaptureError> {
        let output_directory = output_directory.as_ref();
        if !self.shared.lock().state.is_idle() {
            return Err(CaptureError::AlreadyActive);
        }

        // Leftovers of a capture aborted by a write fault.
        self.stop_duration_timer();
        self.release_stream();

        fs::create_dir_all(output_directory).map_err(|e| {
            CaptureError::Io(format!(
                "failed to create {}: {}",
                output_directory.display(),
                e
            ))
        })?;
        let stem = capture_stem(&self.config.file_prefix);
        let encoder = create_capture_file(output_directory, &stem, self.config.format)?
            .with_header_refresh(self.config.header_refresh_bytes());
        let file_path = encoder.file_path().to_path_buf();

        let segment = {
            let mut s = self.shared.lock();
            s.accumulated = Duration::ZERO;
            s.segment_start = None;
            s.segment_id += 1;
            s.encoder = Some(encoder);
            s.loudness = 0.0;
            s.fault = None;
            s.diagnostics = CaptureSessionDiagnostics::default();
            s.segment_id
        };

        // Device open can be slow; the lock is not held across it.
        let stream = match self.open_stream(segment) {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Failed to open input device: {}", e);
                let encoder = self.shared.lock().encoder.take();
                discard_capture(encoder, &file_path);
                return Err(e);
            }
        };

        {
            let mut s = self.shared.lock();
            s.state = CaptureState::Recording;
            s.segment_start = Some(self.clock.now());
            s.diagnostics.segments_opened += 1;
        }
        self.stream = Some(stream);
        self.file_path = Some(file_path.clone());
        self.start_duration_timer();
        self.notify_state(CaptureState::Recording);

        log::info!("Capture started: {}", file_path.display());
        Ok(file_path)
    }

    /// Pause capture, keeping everything recorded so far.
    ///
    /// Transitions: recording → paused. Ignored in any other state.
    pub fn pause(&mut self) {
        let (duration, encoder) = {
            let mut s = self.shared.lock();
            if !s.state.is_recording() {
                s.ignore("pause");
                return;
            }
            let now = self.clock.now();
            s.commit_segment(now);
            s.state = CaptureState::Paused;
            s.segment_id += 1;
            s.loudness = 0.0;
            let encoder = if self.config.release_encoder_on_pause {
                s.encoder.take()
            } else {
                None
            };
            (s.accumulated, encoder)
        };

        self.release_stream();

        if let Some(mut encoder) = encoder {
            if let Err(e) = encoder.finalize() {
                log::warn!("Failed to finalize capture on pause: {}", e);
                self.notify_error(&e);
            }
            self.shared.lock().encoder = Some(encoder);
        }

        self.notify_state(CaptureState::Paused);
        log::info!("Capture paused at {:.2}s", duration.as_secs_f64());
    }

    /// Resume a paused capture, appending to the same file.
    ///
    /// Transitions: paused → recording. Ignored in any other state. If the
    /// device cannot be reopened the session stays paused so the caller can
    /// retry.
    pub fn resume(&mut self) -> Result<(), CaptureError> {
        let (segment, encoder) = {
            let mut s = self.shared.lock();
            if !s.state.is_paused() {
                s.ignore("resume");
                return Ok(());
            }
            s.segment_id += 1;
            let encoder = if self.config.release_encoder_on_pause {
                s.encoder.take()
            } else {
                None
            };
            (s.segment_id, encoder)
        };

        if let Some(mut encoder) = encoder {
            let reopened = encoder.reopen();
            self.shared.lock().encoder = Some(encoder);
            if let Err(e) = reopened {
                log::error!("Failed to reopen capture file, aborting: {}", e);
                self.abort(&e);
                return Err(e);
            }
        }

        let stream = match self.open_stream(segment) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Failed to reopen input device, staying paused: {}", e);
                self.notify_error(&e);
                return Err(e);
            }
        };

        {
            let mut s = self.shared.lock();
            s.state = CaptureState::Recording;
            s.segment_start = Some(self.clock.now());
            s.diagnostics.segments_opened += 1;
        }
        self.stream = Some(stream);
        self.notify_state(CaptureState::Recording);

        log::info!("Capture resumed");
        Ok(())
    }

    /// Stop capture, finalize the file and report what was recorded.
    ///
    /// Transitions: recording/paused → idle. On an idle session this returns
    /// the last known path with zero duration and size and touches nothing,
    /// unless a write fault aborted the previous capture, which is returned
    /// as the error.
    pub fn stop(&mut self) -> Result<RecordingResult, CaptureError> {
        let finished = {
            let mut s = self.shared.lock();
            if s.state.is_idle() {
                None
            } else {
                let now = self.clock.now();
                s.commit_segment(now);
                let duration = s.accumulated;
                s.state = CaptureState::Idle;
                s.segment_id += 1;
                s.accumulated = Duration::ZERO;
                s.loudness = 0.0;
                Some((duration, s.encoder.take()))
            }
        };

        self.stop_duration_timer();
        self.release_stream();

        let file_path = self.file_path.clone().unwrap_or_default();
        let Some((duration, encoder)) = finished else {
            let fault = {
                let mut s = self.shared.lock();
                let fault = s.fault.take();
                if fault.is_none() {
                    s.ignore("stop");
                }
                fault
            };
            return match fault {
                Some(e) => Err(e),
                None => Ok(RecordingResult::empty(file_path)),
            };
        };

        let finalized = match encoder {
            Some(mut encoder) => encoder.finalize().map(|_| ()),
            None => Ok(()),
        };
        let file_size_bytes = file_len(&file_path);
        self.notify_state(CaptureState::Idle);

        if let Err(e) = finalized {
            log::error!("Failed to finalize {}: {}", file_path.display(), e);
            self.notify_error(&e);
            return Err(e);
        }

        log::info!(
            "Capture stopped: {} ({:.2}s, {} bytes)",
            file_path.display(),
            duration.as_secs_f64(),
            file_size_bytes
        );
        Ok(RecordingResult {
            file_path,
            duration,
            file_size_bytes,
        })
    }

    /// Stop if active, then release every owned resource.
    ///
    /// Never fails and may be called any number of times; secondary errors
    /// are logged and swallowed.
    pub fn dispose(&mut self) {
        if self.shared.lock().state.is_active() {
            if let Err(e) = self.stop() {
                log::warn!("Error while stopping disposed capture session: {}", e);
            }
        }
        self.stop_duration_timer();
        self.release_stream();

        let encoder = {
            let mut s = self.shared.lock();
            s.fault = None;
            s.encoder.take()
        };
        if let Some(mut encoder) = encoder {
            if let Err(e) = encoder.finalize() {
                log::warn!("Error while disposing capture file: {}", e);
            }
        }
    }

    // --- Internal helpers ---

    fn open_stream(&self, segment: u64) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let shared = Arc::clone(&self.shared);
        let delegate = self.delegate.clone();

        let callback: ChunkCallback = Arc::new(move |chunk: &[u8]| {
            handle_chunk(&shared, delegate.as_deref(), segment, chunk);
        });

        let spec = InputSpec {
            format: self.config.format,
            chunk_duration: self.config.chunk_duration,
        };
        self.provider.open(&spec, callback)
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                log::warn!("Failed to stop input stream: {}", e);
            }
        }
    }

    /// Abandon the capture after an I/O failure outside the audio thread.
    fn abort(&mut self, error: &CaptureError) {
        let encoder = {
            let mut s = self.shared.lock();
            s.state = CaptureState::Idle;
            s.segment_start = None;
            s.segment_id += 1;
            s.accumulated = Duration::ZERO;
            s.loudness = 0.0;
            s.encoder.take()
        };
        self.stop_duration_timer();
        self.release_stream();
        if let Some(mut encoder) = encoder {
            if let Err(e) = encoder.finalize() {
                log::warn!("Failed to finalize aborted capture: {}", e);
            }
        }
        self.notify_error(error);
        self.notify_state(CaptureState::Idle);
    }

    /// Republish the duration every `duration_tick` while recording.
    fn start_duration_timer(&mut self) {
        let Some(delegate) = self.delegate.clone() else {
            return;
        };
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let tick = self.config.duration_tick;

        let spawned = thread::Builder::new()
            .name("capture-duration-timer".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(tick) {
                    Err(RecvTimeoutError::Timeout) => {
                        let duration = {
                            let s = shared.lock();
                            s.state
                                .is_recording()
                                .then(|| s.total_duration(clock.now()))
                        };
                        if let Some(duration) = duration {
                            delegate.on_duration_changed(duration);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => self.timer = Some(DurationTimer { stop_tx, handle }),
            Err(e) => log::error!("Failed to spawn duration timer, updates disabled: {}", e),
        }
    }

    fn stop_duration_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            drop(timer.stop_tx);
            if timer.handle.join().is_err() {
                log::warn!("Duration timer thread panicked");
            }
        }
    }

    fn notify_state(&self, state: CaptureState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&state);
        }
    }

    fn notify_error(&self, error: &CaptureError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

impl<P: CaptureProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Device callback body: append while recording, then publish loudness.
fn handle_chunk(
    shared: &Mutex<SessionState>,
    delegate: Option<&dyn CaptureDelegate>,
    segment: u64,
    chunk: &[u8],
) {
    let loudness = LoudnessMeter::compute_pcm16_le(chunk);

    let outcome = {
        let mut guard = shared.lock();
        let s = &mut *guard;
        s.diagnostics.chunks_received += 1;
        if !s.state.is_recording() || s.segment_id != segment {
            s.diagnostics.chunks_dropped += 1;
            return;
        }
        let Some(encoder) = s.encoder.as_mut() else {
            s.diagnostics.chunks_dropped += 1;
            return;
        };
        match encoder.append(chunk) {
            Ok(()) => {
                s.diagnostics.bytes_written += chunk.len() as u64;
                s.loudness = loudness;
                Ok(())
            }
            Err(e) => {
                s.state = CaptureState::Idle;
                s.segment_start = None;
                s.segment_id += 1;
                s.accumulated = Duration::ZERO;
                s.loudness = 0.0;
                s.fault = Some(e.clone());
                Err((e, s.encoder.take()))
            }
        }
    };

    match outcome {
        Ok(()) => {
            if let Some(delegate) = delegate {
                delegate.on_loudness_changed(loudness);
            }
        }
        Err((error, encoder)) => {
            log::error!("Capture aborted by write failure: {}", error);
            if let Some(mut encoder) = encoder {
                if let Err(e) = encoder.finalize() {
                    log::warn!("Failed to finalize aborted capture: {}", e);
                }
            }
            if let Some(delegate) = delegate {
                delegate.on_error(&error);
                delegate.on_state_changed(&CaptureState::Idle);
            }
        }
    }
}

/// `<prefix>_YYYYMMDD_HHMMSS` in local time.
fn capture_stem(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Create `<stem>.wav` in `directory`, or `<stem>_1.wav`, `<stem>_2.wav`, ...
/// when taken. Existing files are never opened, let alone truncated.
fn create_capture_file(
    directory: &Path,
    stem: &str,
    format: AudioFormat,
) -> Result<StreamingEncoder, CaptureError> {
    for suffix in 0u32.. {
        let name = if suffix == 0 {
            format!("{}.wav", stem)
        } else {
            format!("{}_{}.wav", stem, suffix)
        };
        let candidate = directory.join(name);
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return StreamingEncoder::from_file(candidate, file, format),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(CaptureError::Io(format!(
                    "failed to create {}: {}",
                    candidate.display(),
                    e
                )))
            }
        }
    }
    Err(CaptureError::Io(format!("no free file name for {}", stem)))
}

/// Best-effort removal of a capture that never recorded.
fn discard_capture(encoder: Option<StreamingEncoder>, file_path: &Path) {
    if let Some(mut encoder) = encoder {
        if let Err(e) = encoder.finalize() {
            log::warn!("Failed to close discarded capture: {}", e);
        }
    }
    if let Err(e) = fs::remove_file(file_path) {
        log::warn!("Failed to remove {}: {}", file_path.display(), e);
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
