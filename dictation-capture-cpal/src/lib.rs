//! # dictation-capture-cpal
//!
//! Cross-platform microphone backend for dictation-capture-core, built on cpal.
//!
//! Provides:
//! - `CpalMicCapture`: microphone capture through the host's default audio API
//! - `DeviceEnumerator`: input device listing and lookup by name
//!
//! ## Usage
//! ```ignore
//! use dictation_capture_cpal::CpalMicCapture;
//! use dictation_capture_core::{CaptureConfiguration, CaptureSession};
//!
//! let mic = CpalMicCapture::default_device();
//! let mut session = CaptureSession::new(mic, CaptureConfiguration::default())?;
//! let path = session.start("/tmp/dictation")?;
//! ```

pub mod config_select;
pub mod cpal_mic;
pub mod device_enumerator;

pub use cpal_mic::CpalMicCapture;
pub use device_enumerator::DeviceEnumerator;
