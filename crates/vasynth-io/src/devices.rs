//! Output device enumeration.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use crate::{Error, Result};

const FALLBACK_SAMPLE_RATE: u32 = 48000;

pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// An output-capable audio device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub channels: u16,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

fn describe(device: &Device, default_name: Option<&str>) -> Option<AudioDevice> {
    let name = device_name(device).ok()?;
    let (default_sample_rate, channels) = device
        .default_output_config()
        .map(|c| (c.sample_rate(), c.channels()))
        .unwrap_or((FALLBACK_SAMPLE_RATE, 2));
    Some(AudioDevice {
        is_default: default_name == Some(name.as_str()),
        name,
        default_sample_rate,
        channels,
    })
}

pub(crate) fn list_host_devices(host: &Host) -> Result<Vec<AudioDevice>> {
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());
    let outputs = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    let mut devices: Vec<AudioDevice> = Vec::new();
    for device in outputs {
        if let Some(info) = describe(&device, default_name.as_deref())
            && !devices.iter().any(|d| d.name == info.name)
        {
            devices.push(info);
        }
    }
    Ok(devices)
}

pub(crate) fn host_default_device(host: &Host) -> Option<AudioDevice> {
    let device = host.default_output_device()?;
    let mut info = describe(&device, None)?;
    info.is_default = true;
    Some(info)
}

/// List output devices on the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    list_host_devices(&cpal::default_host())
}

/// The default output device on the default host, if any.
pub fn default_output_device() -> Option<AudioDevice> {
    host_default_device(&cpal::default_host())
}
