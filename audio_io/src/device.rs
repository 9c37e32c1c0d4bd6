use cpal::traits::{DeviceTrait, HostTrait};
use log::debug;
use room_core::Error;

/// Names of every output device on the default host.
pub fn list_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    match host.output_devices() {
        Ok(devices) => devices.filter_map(|device| device.name().ok()).collect(),
        Err(e) => {
            debug!("Could not enumerate output devices: {}", e);
            Vec::new()
        }
    }
}

/// Find an output device by name, falling back to the host default.
pub(crate) fn find_output_device(name: Option<&str>) -> Result<cpal::Device, Error> {
    let host = cpal::default_host();

    let named = match name {
        Some(wanted) => host
            .output_devices()
            .map_err(|e| Error::Audio(format!("Failed to get output devices: {}", e)))?
            .find(|device| matches!(device.name(), Ok(n) if n == wanted)),
        None => None,
    };

    if let (Some(wanted), None) = (name, named.as_ref()) {
        debug!("Output device {:?} not found, using default", wanted);
    }

    named
        .or_else(|| host.default_output_device())
        .ok_or_else(|| Error::Audio("No output device found".to_string()))
}
