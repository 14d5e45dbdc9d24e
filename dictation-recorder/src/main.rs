mod commands;
mod telemetry_view;

use std::path::PathBuf;

use clap::Parser;

/// Record dictation from a microphone into a WAV file.
///
/// While recording, type `p` + Enter to pause or resume and `s` (or `q`,
/// or end of input) to stop.
#[derive(Debug, Parser)]
#[command(name = "dictation-recorder", version)]
pub struct Args {
    /// List input devices and exit.
    #[arg(long)]
    pub list_devices: bool,

    /// Input device name (see --list-devices). Defaults to the system input.
    #[arg(long)]
    pub device: Option<String>,

    /// Folder for captures. Defaults to Documents/DictationApp.
    #[arg(long, env = "DICTATION_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Stop automatically after this many seconds of recorded audio.
    #[arg(long, value_name = "SECS")]
    pub max_duration: Option<f64>,

    /// Discard captures shorter than this many seconds.
    #[arg(long, value_name = "SECS", default_value_t = 0.5)]
    pub min_duration: f64,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        return commands::list_devices(args.json);
    }
    commands::run_recording(&args)
}
