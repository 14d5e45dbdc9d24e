//! Input device enumeration through the cpal default host.

use cpal::traits::{DeviceTrait, HostTrait};

use dictation_capture_core::models::audio_models::AudioSource;
use dictation_capture_core::models::error::CaptureError;

/// Audio input enumerator over the platform's default host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input devices. Device names double as ids.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let default_name = self.default_capture_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to enumerate inputs: {}", e)))?;

        let mut sources = Vec::new();
        for device in devices {
            let name = match device.name() {
                Ok(n) => n,
                Err(e) => {
                    log::debug!("Skipping input device without a name: {}", e);
                    continue;
                }
            };
            let is_default = default_name.as_deref() == Some(name.as_str());
            sources.push(AudioSource {
                id: name.clone(),
                name,
                is_default,
            });
        }

        log::debug!("Found {} input devices", sources.len());
        Ok(sources)
    }

    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Resolve `name` to an input device, or the default device for `None`.
    pub fn find_capture_device(&self, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        match name {
            None => self
                .host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into())),
            Some(name) => self
                .host
                .input_devices()
                .map_err(|e| {
                    CaptureError::DeviceUnavailable(format!("failed to enumerate inputs: {}", e))
                })?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::DeviceUnavailable(format!("input device '{}' not found", name))
                }),
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
