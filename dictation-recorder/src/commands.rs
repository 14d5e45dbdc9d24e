use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, unbounded, Receiver};
use serde::Serialize;

use dictation_capture_core::{
    CaptureConfiguration, CaptureProvider, CaptureSession, RecordingResult, TelemetryChannel,
};
use dictation_capture_cpal::{CpalMicCapture, DeviceEnumerator};

use crate::telemetry_view;
use crate::Args;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    TogglePause,
    Stop,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" | "r" | "resume" => Some(Command::TogglePause),
        "s" | "stop" | "q" | "quit" => Some(Command::Stop),
        _ => None,
    }
}

/// Final report for one capture.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingInfo {
    pub file_path: String,
    pub duration_secs: f64,
    pub file_size_bytes: u64,
    pub recorded_at: String,
    pub kept: bool,
}

pub fn default_output_dir() -> PathBuf {
    dirs_next::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DictationApp")
}

pub fn list_devices(json: bool) -> Result<()> {
    let devices = DeviceEnumerator::new().list_capture_devices()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        println!("No input devices found.");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}

pub fn run_recording(args: &Args) -> Result<()> {
    let max_duration = match args.max_duration {
        Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => return Err(format!("--max-duration must be positive, got {}", secs).into()),
        None => None,
    };
    if !args.min_duration.is_finite() || args.min_duration < 0.0 {
        return Err(format!("--min-duration must be >= 0, got {}", args.min_duration).into());
    }

    let mic = match args.device {
        Some(ref name) => CpalMicCapture::with_device(name.clone()),
        None => CpalMicCapture::default_device(),
    };
    if !mic.is_available() {
        return Err(format!(
            "input device '{}' is not available",
            mic.device_name().unwrap_or("default")
        )
        .into());
    }

    let config = CaptureConfiguration {
        file_prefix: "dictation".into(),
        ..Default::default()
    };
    let mut session = CaptureSession::new(mic, config)?;
    let (telemetry, events) = TelemetryChannel::new();
    session.set_delegate(telemetry);

    let output_dir = args.output_dir.clone().unwrap_or_else(default_output_dir);
    let commands = spawn_stdin_reader()?;
    let recorded_at = chrono::Local::now();
    let path = session.start(&output_dir)?;
    eprintln!("Recording to {} (p = pause/resume, s = stop)", path.display());

    let (done_tx, done_rx) = bounded::<()>(1);
    let renderer = telemetry_view::spawn_renderer(events, done_rx)?;

    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(Command::TogglePause) => {
                    if session.state().is_paused() {
                        if let Err(e) = session.resume() {
                            log::warn!("Resume failed: {}", e);
                        }
                    } else {
                        session.pause();
                    }
                }
                Ok(Command::Stop) | Err(_) => break,
            },
            default(POLL_INTERVAL) => {}
        }

        // Aborted underneath us by a write failure.
        if session.state().is_idle() {
            break;
        }
        if let Some(max) = max_duration {
            if session.duration() >= max {
                log::info!("Reached max duration of {:.1}s", max.as_secs_f64());
                break;
            }
        }
    }

    let stopped = session.stop();
    drop(done_tx);
    if renderer.join().is_err() {
        log::warn!("Telemetry view panicked");
    }
    let result = stopped?;

    let kept = keep_or_discard(&result, args.min_duration);
    let info = RecordingInfo {
        file_path: result.file_path.to_string_lossy().into_owned(),
        duration_secs: result.duration_secs(),
        file_size_bytes: result.file_size_bytes,
        recorded_at: recorded_at.to_rfc3339(),
        kept,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else if kept {
        println!(
            "Saved {} ({}, {} bytes)",
            info.file_path,
            telemetry_view::format_duration(result.duration),
            info.file_size_bytes
        );
    } else {
        println!(
            "Discarded {}: shorter than {:.1}s",
            info.file_path, args.min_duration
        );
    }
    Ok(())
}

/// Delete captures too short to be useful. Returns whether the file stays.
fn keep_or_discard(result: &RecordingResult, min_duration_secs: f64) -> bool {
    if result.duration_secs() >= min_duration_secs {
        return true;
    }
    if let Err(e) = fs::remove_file(&result.file_path) {
        log::warn!("Failed to remove {}: {}", result.file_path.display(), e);
    }
    false
}

/// Forward stdin lines as commands; disconnects on end of input.
fn spawn_stdin_reader() -> io::Result<Receiver<Command>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("\nunknown command '{}' (p = pause/resume, s = stop)", line.trim()),
                }
            }
        })?;
    Ok(rx)
}
