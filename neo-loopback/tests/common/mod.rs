#![allow(dead_code)]

use neo_loopback::{LoopbackConfig, LoopbackFinder};
use rs_neo::{DeviceHandle, NeoApi, NeoConfig, Serial};

pub const FIRE: &str = "CY2285";
pub const VCAN: &str = "RS2259";

pub fn serial(s: &str) -> anyhow::Result<Serial> {
    Ok(s.parse()?)
}

pub fn api_with(config: NeoConfig, devices: LoopbackConfig) -> anyhow::Result<(NeoApi, LoopbackFinder)> {
    let finder = LoopbackFinder::new(devices);
    let api = NeoApi::with_config(finder.clone(), config)?;
    Ok((api, finder))
}

pub fn api() -> anyhow::Result<(NeoApi, LoopbackFinder)> {
    api_with(NeoConfig::default(), LoopbackConfig::default())
}

pub fn find(api: &NeoApi, s: &str) -> anyhow::Result<DeviceHandle> {
    let serial = serial(s)?;
    api.find_all_devices()?
        .into_iter()
        .find(|d| d.serial() == serial)
        .ok_or_else(|| anyhow::anyhow!("device {} not found", s))
}

/// Find, open and start polling the device `s`.
pub fn open(api: &NeoApi, s: &str) -> anyhow::Result<DeviceHandle> {
    let device = find(api, s)?;
    api.open_device(&device)?;
    api.enable_message_polling(&device)?;
    Ok(device)
}
