use std::fs::read_to_string;
use serde::{Deserialize, Serialize};
use rs_neo::{DeviceType, NeoError, NetId, Serial};

use crate::constants::{DEFAULT_TIMESTAMP_RESOLUTION, DEFAULT_TX_BUFFER, LOOPBACK_CONFIG_DEFAULT, LOOPBACK_CONFIG_VAR, LOOPBACK_ENV};

#[inline]
fn default_true() -> bool {
    true
}

#[inline]
fn default_tx_buffer() -> usize {
    DEFAULT_TX_BUFFER
}

#[inline]
fn default_timestamp_resolution() -> u16 {
    DEFAULT_TIMESTAMP_RESOLUTION
}

/// One simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoopbackDeviceConfig {
    pub serial: Serial,
    pub device_type: DeviceType,
    pub networks: Vec<NetId>,
    /// Whether the CAN networks accept CAN FD.
    #[serde(default)]
    pub fd: bool,
    /// Whether the device carries a settings structure.
    #[serde(default = "default_true")]
    pub settings: bool,
    #[serde(default)]
    pub termination_groups: Vec<Vec<NetId>>,
    /// Number of `Misc` digital IO pins.
    #[serde(default)]
    pub misc_io: u32,
    /// Capacity of the transmit buffer.
    #[serde(default = "default_tx_buffer")]
    pub tx_buffer: usize,
    /// Delay of the echo worker after every echoed frame.
    #[serde(default)]
    pub echo_delay_ms: u64,
    #[serde(default = "default_timestamp_resolution")]
    pub timestamp_resolution: u16,
}

impl LoopbackDeviceConfig {
    pub fn new(serial: Serial, device_type: DeviceType, networks: Vec<NetId>) -> Self {
        Self {
            serial,
            device_type,
            networks,
            fd: false,
            settings: true,
            termination_groups: Default::default(),
            misc_io: Default::default(),
            tx_buffer: DEFAULT_TX_BUFFER,
            echo_delay_ms: Default::default(),
            timestamp_resolution: DEFAULT_TIMESTAMP_RESOLUTION,
        }
    }
}

/// The simulated devices, loaded from `loopback.cfg.yaml`.
///
/// ```yaml
/// devices:
///   - serial: CY2285
///     device_type: Fire2
///     networks: [1, 2, 42]
///     fd: true
///     termination_groups: [[1, 2]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoopbackConfig {
    pub devices: Vec<LoopbackDeviceConfig>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        let serial = |s: &str| s.parse::<Serial>();
        let mut devices = Vec::new();

        if let Ok(serial) = serial("CY2285") {
            let mut fire = LoopbackDeviceConfig::new(
                serial,
                DeviceType::Fire2,
                vec![NetId::HSCAN, NetId::MSCAN, NetId::HSCAN2, NetId::LIN, NetId::ETHERNET],
            );
            fire.fd = true;
            fire.termination_groups = vec![vec![NetId::HSCAN, NetId::MSCAN], vec![NetId::HSCAN2]];
            fire.misc_io = 6;
            devices.push(fire);
        }
        if let Ok(serial) = serial("RS2259") {
            devices.push(LoopbackDeviceConfig::new(serial, DeviceType::Vcan42, vec![NetId::HSCAN, NetId::HSCAN2]));
        }

        Self { devices }
    }
}

impl LoopbackConfig {
    /// Load the device list.
    ///
    /// `loopback.env` may point `NEO_LOOPBACK_CONFIG` at the YAML file. Without a
    /// readable file the default devices are simulated.
    pub fn load() -> Result<Self, NeoError> {
        let path = match dotenvy::from_filename(LOOPBACK_ENV) {
            Ok(_) => match std::env::var(LOOPBACK_CONFIG_VAR) {
                Ok(v) => v,
                Err(_) => LOOPBACK_CONFIG_DEFAULT.into(),
            },
            Err(_) => LOOPBACK_CONFIG_DEFAULT.into(),
        };

        match read_to_string(&path) {
            Ok(data) => Self::from_yaml(&data),
            Err(e) => {
                log::debug!("LOOPBACK - simulating default devices, unable to read `{}`: {}", path, e);
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self, NeoError> {
        serde_yaml::from_str(data)
            .map_err(|e| NeoError::config_error(format!("Error parsing YAML: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use rs_neo::{DeviceType, NetId};
    use super::LoopbackConfig;

    #[test]
    fn yaml() -> anyhow::Result<()> {
        let config = LoopbackConfig::from_yaml(
            "devices:\n  - serial: CY2285\n    device_type: Fire3\n    networks: [1, 2]\n    termination_groups: [[1, 2]]\n"
        )?;
        let device = &config.devices[0];
        assert_eq!(device.serial.as_str(), "CY2285");
        assert_eq!(device.device_type, DeviceType::Fire3);
        assert_eq!(device.networks, vec![NetId::HSCAN, NetId::MSCAN]);
        assert!(device.settings);
        assert!(!device.fd);
        assert_eq!(device.tx_buffer, 1024);

        assert!(LoopbackConfig::from_yaml("devices:\n  - serial: \"ab-12\"\n").is_err());
        Ok(())
    }

    #[test]
    fn defaults() {
        let config = LoopbackConfig::default();
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[0].device_type, DeviceType::Fire2);
    }
}
