use anyhow::{Result, anyhow};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Resolves an input device by name, or the host default when no name is given.
pub fn get_or_default_input(device_name: Option<String>) -> Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => host
            .input_devices()?
            .find(|device| device.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow!("No input device named \"{target}\"")),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device available")),
    }
}

/// Resolves an output device by name, or the host default when no name is given.
pub fn get_or_default_output(device_name: Option<String>) -> Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow!("No output device named \"{target}\"")),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device available")),
    }
}

/// One line per input device: name, channels, sample rate, default marker.
pub fn get_available_inputs() -> Result<String> {
    let host = get_host();
    let default_name = host
        .default_input_device()
        .and_then(|device| device.name().ok());

    let mut lines = Vec::new();
    for device in host.input_devices()? {
        let name = device.name()?;
        let config = device.default_input_config()?;
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_name.as_ref() {
            line.push_str(" [default]");
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

/// One line per output device: name, channels, sample rate, default marker.
pub fn get_available_outputs() -> Result<String> {
    let host = get_host();
    let default_name = host
        .default_output_device()
        .and_then(|device| device.name().ok());

    let mut lines = Vec::new();
    for device in host.output_devices()? {
        let name = device.name()?;
        let config = device.default_output_config()?;
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_name.as_ref() {
            line.push_str(" [default]");
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}
