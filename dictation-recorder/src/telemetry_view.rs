//! Live status line drawn from capture telemetry.

use std::io::Write;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};

use dictation_capture_core::{CaptureState, TelemetryEvent};

const BAR_WIDTH: usize = 30;

/// `MM:SS`, or `H:MM:SS` from one hour on.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours >= 1 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Fixed-width meter for a loudness in [0, 1].
pub fn loudness_bar(level: f32, width: usize) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}

#[derive(Debug, Default)]
struct StatusLine {
    state: CaptureState,
    duration: Duration,
    loudness: f32,
}

impl StatusLine {
    fn apply(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::LoudnessChanged(level) => self.loudness = level,
            TelemetryEvent::DurationChanged(duration) => self.duration = duration,
            TelemetryEvent::StateChanged(state) => {
                self.state = state;
                if !state.is_recording() {
                    self.loudness = 0.0;
                }
            }
            TelemetryEvent::Error(error) => {
                eprintln!("\nerror: {}", error);
            }
        }
    }

    fn render(&self) -> String {
        format!(
            "\r{:<9} {} {}",
            self.state.as_str(),
            format_duration(self.duration),
            loudness_bar(self.loudness, BAR_WIDTH)
        )
    }
}

/// Draw telemetry on stderr until `done` fires or disconnects.
pub fn spawn_renderer(
    events: Receiver<TelemetryEvent>,
    done: Receiver<()>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("telemetry-view".into())
        .spawn(move || {
            let mut line = StatusLine::default();
            let stderr = std::io::stderr();
            loop {
                select! {
                    recv(events) -> event => match event {
                        Ok(event) => line.apply(event),
                        Err(_) => break,
                    },
                    recv(done) -> _ => break,
                }
                // Coalesce bursts into one redraw.
                for event in events.try_iter() {
                    line.apply(event);
                }
                let mut out = stderr.lock();
                let _ = write!(out, "{}", line.render());
                let _ = out.flush();
            }
            eprintln!();
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_duration(Duration::ZERO), "00:00");
        assert_eq!(format_duration(Duration::from_millis(65_900)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(59 * 60 + 59)), "59:59");
        assert_eq!(format_duration(Duration::from_secs(3600 + 2 * 60 + 3)), "1:02:03");
    }

    #[test]
    fn bar_is_fixed_width_and_clamped() {
        assert_eq!(loudness_bar(0.0, 4), "[    ]");
        assert_eq!(loudness_bar(0.5, 4), "[##  ]");
        assert_eq!(loudness_bar(1.0, 4), "[####]");
        assert_eq!(loudness_bar(7.0, 4), "[####]");
        assert_eq!(loudness_bar(-1.0, 4), "[    ]");
    }

    #[test]
    fn status_line_tracks_events() {
        let mut line = StatusLine::default();
        line.apply(TelemetryEvent::StateChanged(CaptureState::Recording));
        line.apply(TelemetryEvent::LoudnessChanged(1.0));
        line.apply(TelemetryEvent::DurationChanged(Duration::from_secs(75)));
        assert!(line.render().contains("recording"));
        assert!(line.render().contains("01:15"));

        line.apply(TelemetryEvent::StateChanged(CaptureState::Paused));
        assert_eq!(line.loudness, 0.0);
        assert_eq!(line.duration, Duration::from_secs(75));
    }
}
