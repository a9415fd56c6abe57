//! Input device enumeration over a cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use recorder_core::models::audio_models::AudioDevice;
use recorder_core::models::error::RecorderError;

/// Capture-capable devices of `host`, in host order.
///
/// `index` is the position in the host's full device list (outputs
/// included), so it stays comparable with [`find_device`].
pub fn list_input_devices(host: &cpal::Host) -> Result<Vec<AudioDevice>, RecorderError> {
    let devices = host
        .devices()
        .map_err(|e| RecorderError::DeviceEnumeration(format!("failed to list devices: {}", e)))?;

    Ok(devices
        .enumerate()
        .filter_map(|(index, device)| describe(index, &device))
        .collect())
}

/// Snapshot one device, or `None` if it cannot capture.
fn describe(index: usize, device: &cpal::Device) -> Option<AudioDevice> {
    let name = device.name().unwrap_or_else(|_| format!("Device {}", index));

    let max_input_channels = match device.supported_input_configs() {
        Ok(configs) => configs.map(|c| c.channels()).max().unwrap_or(0),
        Err(e) => {
            log::debug!("Skipping '{}': {}", name, e);
            0
        }
    };
    if max_input_channels == 0 {
        return None;
    }

    let default_sample_rate = match device.default_input_config() {
        Ok(config) => config.sample_rate().0,
        Err(e) => {
            log::debug!("Skipping '{}': no default input config ({})", name, e);
            return None;
        }
    };

    Some(AudioDevice {
        index,
        name,
        max_input_channels,
        default_sample_rate,
    })
}

/// Resolve a snapshot back to a live cpal device.
///
/// Tries the recorded index first and falls back to an exact name match
/// when the device list changed since enumeration.
pub fn find_device(host: &cpal::Host, wanted: &AudioDevice) -> Result<cpal::Device, RecorderError> {
    let has_name = |device: &cpal::Device| device.name().map(|n| n == wanted.name).unwrap_or(false);
    let list_error = |e: cpal::DevicesError| RecorderError::DeviceEnumeration(format!("failed to list devices: {}", e));

    if let Some(device) = host.devices().map_err(list_error)?.nth(wanted.index).filter(|d| has_name(d)) {
        return Ok(device);
    }

    log::debug!("'{}' moved from index {}, searching by name", wanted.name, wanted.index);
    host.devices()
        .map_err(list_error)?
        .find(|d| has_name(d))
        .ok_or_else(|| RecorderError::DeviceNotFound(wanted.name.clone()))
}
