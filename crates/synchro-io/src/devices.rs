//! Host audio device enumeration (C13), shared by the device input/output
//! nodes and the CLI's `devices` subcommand.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

use crate::{Error, Result};

/// One enumerated host audio device.
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    /// Index into the enumeration this device was found at (stable only for
    /// the lifetime of one `list_devices` call - devices may be renumbered
    /// if the host's device list changes between calls).
    pub index: usize,
    /// Host-reported device name.
    pub name: String,
    /// True if the device supports capture.
    pub is_input: bool,
    /// True if the device supports playback.
    pub is_output: bool,
    /// The device's default sample rate, or `0` if it could not be queried.
    pub default_sample_rate: u32,
}

/// Lists every input and output device the default host exposes, input
/// devices first in enumeration order (the order `input_channel`/
/// `output_channel` NodeSpecs' `device` index refers to).
pub fn list_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for (index, device) in inputs.enumerate() {
            let Ok(name) = device.name() else { continue };
            let default_sample_rate = device.default_input_config().map(|c| c.sample_rate().0).unwrap_or(0);
            let is_output = device.default_output_config().is_ok();
            devices.push(AudioDeviceInfo {
                index,
                name,
                is_input: true,
                is_output,
                default_sample_rate,
            });
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for (index, device) in outputs.enumerate() {
            let Ok(name) = device.name() else { continue };
            if devices.iter().any(|d| d.name == name) {
                continue;
            }
            let default_sample_rate = device.default_output_config().map(|c| c.sample_rate().0).unwrap_or(0);
            devices.push(AudioDeviceInfo {
                index,
                name,
                is_input: false,
                is_output: true,
                default_sample_rate,
            });
        }
    }

    Ok(devices)
}

/// Resolves an `input_channel` NodeSpec's `device` index to a cpal [`Device`].
/// A negative index means "the host's default input device".
pub fn input_device_by_index(index: i64) -> Result<Device> {
    let host = cpal::default_host();
    if index < 0 {
        return host.default_input_device().ok_or(Error::NoDevice);
    }
    host.input_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .nth(index as usize)
        .ok_or_else(|| Error::DeviceNotFound(index.to_string()))
}

/// Resolves an `output_channel` NodeSpec's `device` index to a cpal [`Device`].
/// A negative index means "the host's default output device".
pub fn output_device_by_index(index: i64) -> Result<Device> {
    let host = cpal::default_host();
    if index < 0 {
        return host.default_output_device().ok_or(Error::NoDevice);
    }
    host.output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .nth(index as usize)
        .ok_or_else(|| Error::DeviceNotFound(index.to_string()))
}
