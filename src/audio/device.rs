// Output device lookup through CPAL

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SampleFormat};

use crate::audio::{AudioError, AudioResult, SAMPLE_RATE};

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    /// Offers 48 kHz in a sample format the transport can write
    pub supports_output_rate: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let Ok(devices) = self.host.output_devices() else {
            return Vec::new();
        };

        devices
            .enumerate()
            .filter_map(|(index, device)| {
                let name = device.name().ok()?;
                Some(AudioDeviceInfo {
                    index,
                    is_default: name == default_name,
                    supports_output_rate: supports_output_rate(&device),
                    name,
                })
            })
            .collect()
    }

    /// Resolves `None` / `"default"` to the default device, otherwise matches
    /// an exact name or a listing index
    pub fn find_output_device(&self, selector: Option<&str>) -> AudioResult<Device> {
        let selector = selector.map(str::trim).filter(|s| !s.is_empty() && *s != "default");

        let Some(selector) = selector else {
            return self.host.default_output_device().ok_or(AudioError::NoDevice);
        };

        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::DeviceNotFound(format!("{} ({})", selector, e)))?;

        let wanted_index = selector.parse::<usize>().ok();
        for (index, device) in devices.enumerate() {
            if wanted_index == Some(index) {
                return Ok(device);
            }
            if let Ok(name) = device.name()
                && name == selector
            {
                return Ok(device);
            }
        }

        Err(AudioError::DeviceNotFound(selector.to_string()))
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_supported_format(format: SampleFormat) -> bool {
    matches!(format, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16)
}

fn supports_output_rate(device: &Device) -> bool {
    device
        .supported_output_configs()
        .map(|mut configs| {
            configs.any(|range| {
                is_supported_format(range.sample_format())
                    && range.min_sample_rate().0 <= SAMPLE_RATE
                    && range.max_sample_rate().0 >= SAMPLE_RATE
            })
        })
        .unwrap_or(false)
}
