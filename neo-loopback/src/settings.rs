use rs_neo::{EventType, NeoError, NeoResult, NetId, NetworkType, Serial};

use crate::constants::{DEFAULT_BAUDRATE, DEFAULT_FD_BAUDRATE, SETTINGS_CHANNEL_SIZE, SETTINGS_HEADER_SIZE, SETTINGS_VERSION};

/// Settings of one CAN network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    pub netid: NetId,
    pub termination: bool,
    pub baudrate: u32,
    pub fd_baudrate: u32,
}

/// Decoded settings structure of a loopback device.
///
/// Little-endian, a 4 byte header (version, total length) followed by one
/// 12 byte block per CAN network in device order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsImage {
    pub channels: Vec<ChannelSettings>,
}

impl SettingsImage {
    /// Factory settings for the CAN networks among `networks`.
    pub fn defaults(networks: &[NetId]) -> Self {
        let channels = networks.iter()
            .filter(|n| n.network_type() == NetworkType::Can)
            .map(|&netid| ChannelSettings {
                netid,
                termination: false,
                baudrate: DEFAULT_BAUDRATE,
                fd_baudrate: DEFAULT_FD_BAUDRATE,
            })
            .collect();

        Self { channels }
    }

    #[inline]
    pub fn length(&self) -> usize {
        SETTINGS_HEADER_SIZE + self.channels.len() * SETTINGS_CHANNEL_SIZE
    }

    pub fn channel(&self, netid: NetId) -> Option<&ChannelSettings> {
        self.channels.iter().find(|c| c.netid == netid)
    }

    pub fn channel_mut(&mut self, netid: NetId) -> Option<&mut ChannelSettings> {
        self.channels.iter_mut().find(|c| c.netid == netid)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.length());
        data.extend_from_slice(&SETTINGS_VERSION.to_le_bytes());
        data.extend_from_slice(&(self.length() as u16).to_le_bytes());

        for channel in &self.channels {
            data.extend_from_slice(&channel.netid.0.to_le_bytes());
            data.push(channel.termination as u8);
            data.push(Default::default());
            data.extend_from_slice(&channel.baudrate.to_le_bytes());
            data.extend_from_slice(&channel.fd_baudrate.to_le_bytes());
        }

        data
    }

    /// Decode a structure written by a client, it must describe the same networks as `template`.
    pub fn decode(data: &[u8], template: &Self, serial: Serial) -> NeoResult<Self> {
        let error = |kind| NeoError::device(kind, serial);
        if data.len() != template.length() {
            return Err(error(EventType::SettingsLengthError));
        }

        let version = u16::from_le_bytes([data[0], data[1]]);
        if version != SETTINGS_VERSION {
            return Err(error(EventType::SettingsVersionError));
        }
        let length = u16::from_le_bytes([data[2], data[3]]) as usize;
        if length != data.len() {
            return Err(error(EventType::SettingsLengthError));
        }

        let channels = data[SETTINGS_HEADER_SIZE..]
            .chunks_exact(SETTINGS_CHANNEL_SIZE)
            .zip(&template.channels)
            .map(|(block, expected)| {
                let netid = NetId(u16::from_le_bytes([block[0], block[1]]));
                if netid != expected.netid {
                    log::warn!("LOOPBACK - {} settings block of {} found where {} was expected", serial, netid, expected.netid);
                    return Err(error(EventType::SettingsChecksumError));
                }

                Ok(ChannelSettings {
                    netid,
                    termination: block[2] != 0,
                    baudrate: u32::from_le_bytes([block[4], block[5], block[6], block[7]]),
                    fd_baudrate: u32::from_le_bytes([block[8], block[9], block[10], block[11]]),
                })
            })
            .collect::<NeoResult<Vec<_>>>()?;

        Ok(Self { channels })
    }
}
