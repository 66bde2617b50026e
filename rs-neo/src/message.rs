use std::fmt::{Display, Formatter};
use bitflags::bitflags;
use derive_getters::Getters;

use crate::{NetId, NetworkType};
use crate::utils::length_to_dlc_code;

bitflags! {
    /// The 128-bit status bitfield shared by every message.
    ///
    /// Bits 0..32 form the first status word, the value and long-message bits live in
    /// the second word and the CAN FD bits in the fourth.
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u128 {
        const GLOBAL_ERROR = 1 << 0;
        const TRANSMIT_MESSAGE = 1 << 1;
        const EXTENDED_FRAME = 1 << 2;
        const REMOTE_FRAME = 1 << 3;
        const CRC_ERROR = 1 << 4;
        const CAN_ERROR_PASSIVE = 1 << 5;
        const INCOMPLETE_FRAME = 1 << 6;
        const LOST_ARBITRATION = 1 << 7;
        const UNDEFINED_ERROR = 1 << 8;
        const CAN_BUS_OFF = 1 << 9;
        const CAN_ERROR_WARNING = 1 << 10;
        const CAN_BUS_SHORTED_PLUS = 1 << 11;
        const CAN_BUS_SHORTED_GROUND = 1 << 12;
        const CHECKSUM_ERROR = 1 << 13;
        const BAD_MESSAGE_BIT_TIME_ERROR = 1 << 14;
        const IFR_DATA = 1 << 15;
        const HARDWARE_COMM_ERROR = 1 << 16;
        const EXPECTED_LENGTH_ERROR = 1 << 17;
        const INCOMING_NO_MATCH = 1 << 18;
        const STATUS_BREAK = 1 << 19;
        const AVSI_REC_OVERFLOW = 1 << 20;
        const TEST_TRIGGER = 1 << 21;
        const AUDIO_COMMENT = 1 << 22;
        const GPS_DATA = 1 << 23;
        const ANALOG_DIGITAL_INPUT = 1 << 24;
        const TEXT_COMMENT = 1 << 25;
        const NETWORK_MESSAGE_TYPE = 1 << 26;
        const VSI_TX_UNDERRUN = 1 << 27;
        const VSI_IFR_CRC_BIT = 1 << 28;
        const INIT_MESSAGE = 1 << 29;
        const FLEXRAY_SECOND_STARTUP_FRAME = 1 << 30;
        const EXTENDED = 1 << 31;

        const HAS_VALUE = 1 << 32;
        const VALUE_IS_BOOLEAN = 1 << 33;
        const HIGH_VOLTAGE = 1 << 34;
        const LONG_MESSAGE = 1 << 35;

        /// CAN FD error state indicator.
        const CANFD_ESI = 1 << 96;
        const CANFD_IDE = 1 << 97;
        const CANFD_RTR = 1 << 98;
        /// CAN FD frame format.
        const CANFD_FDF = 1 << 99;
        /// CAN FD bitrate switch.
        const CANFD_BRS = 1 << 100;
    }
}

impl StatusFlags {
    /// The four 32-bit status words of the C layout.
    #[inline]
    pub fn to_words(&self) -> [u32; 4] {
        let bits = self.bits();
        [bits as u32, (bits >> 32) as u32, (bits >> 64) as u32, (bits >> 96) as u32]
    }

    #[inline]
    pub fn from_words(words: [u32; 4]) -> Self {
        let bits = words.iter()
            .rev()
            .fold(0u128, |acc, w| (acc << 32) | *w as u128);
        Self::from_bits_retain(bits)
    }
}

/// Message subtype tag.
#[repr(u16)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    #[default]
    Frame = 0x0000,
    CanErrorCount = 0x0100,
    Invalid = 0x8000,
    RawMessage = 0x8001,
    ReadSettings = 0x8002,
    ResetStatus = 0x8003,
    DeviceVersion = 0x8004,
    Main51 = 0x8005,
    FlexRayControl = 0x8006,
    EthernetPhyRegister = 0x8007,
    LogicalDiskInfo = 0x8008,
    ExtendedResponse = 0x8009,
}

impl From<u16> for MessageType {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Self::Frame,
            0x0100 => Self::CanErrorCount,
            0x8001 => Self::RawMessage,
            0x8002 => Self::ReadSettings,
            0x8003 => Self::ResetStatus,
            0x8004 => Self::DeviceVersion,
            0x8005 => Self::Main51,
            0x8006 => Self::FlexRayControl,
            0x8007 => Self::EthernetPhyRegister,
            0x8008 => Self::LogicalDiskInfo,
            0x8009 => Self::ExtendedResponse,
            _ => Self::Invalid,
        }
    }
}

impl MessageType {
    /// Types at or above `Invalid` are used by the library itself and never reach clients.
    #[inline]
    pub fn is_internal(&self) -> bool {
        *self as u16 >= Self::Invalid as u16
    }
}

/// Fields every message carries.
#[derive(Debug, Default, Clone, PartialEq, Eq, Getters)]
pub struct MessageHeader {
    #[getter(copy)]
    status: StatusFlags,
    /// Device timestamp, in nanoseconds.
    #[getter(copy)]
    timestamp: u64,
    #[getter(copy)]
    reserved_timestamp: u64,
    #[getter(copy)]
    netid: NetId,
    #[getter(copy)]
    network_type: NetworkType,
    #[getter(copy)]
    message_type: MessageType,
}

impl MessageHeader {
    pub fn new(
        status: StatusFlags,
        timestamp: u64,
        reserved_timestamp: u64,
        netid: NetId,
        network_type: NetworkType,
        message_type: MessageType,
    ) -> Self {
        Self { status, timestamp, reserved_timestamp, netid, network_type, message_type }
    }
}

/// Payload part of a message, one variant per message layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Frame {
        header: [u8; 4],
        description: u16,
        data: Vec<u8>,
    },
    Can {
        arbid: u32,
        dlc_on_wire: u8,
        description: u16,
        data: Vec<u8>,
    },
    CanErrorCount {
        transmit: u8,
        receive: u8,
    },
    Ethernet {
        preemption_flags: u8,
        description: u16,
        data: Vec<u8>,
    },
}

/// A decoded traffic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: MessageHeader,
    body: MessageBody,
}

impl Message {
    pub fn new(header: MessageHeader, body: MessageBody) -> Self {
        Self { header, body }
    }

    fn with_netid(netid: NetId, message_type: MessageType, body: MessageBody) -> Self {
        Self {
            header: MessageHeader {
                netid,
                network_type: netid.network_type(),
                message_type,
                ..Default::default()
            },
            body,
        }
    }

    /// A generic frame on any network.
    pub fn frame(netid: NetId, data: &[u8]) -> Self {
        Self::with_netid(netid, MessageType::Frame, MessageBody::Frame {
            header: Default::default(),
            description: Default::default(),
            data: data.to_vec(),
        })
    }

    /// A classic CAN frame, use [`Message::with_fd`] for CAN FD.
    pub fn can(netid: NetId, arbid: u32, data: &[u8]) -> Self {
        Self::with_netid(netid, MessageType::Frame, MessageBody::Can {
            arbid,
            dlc_on_wire: length_to_dlc_code(data.len(), true).unwrap_or(0x0F),
            description: Default::default(),
            data: data.to_vec(),
        })
    }

    pub fn can_error_count(netid: NetId, transmit: u8, receive: u8) -> Self {
        Self::with_netid(netid, MessageType::CanErrorCount, MessageBody::CanErrorCount { transmit, receive })
    }

    pub fn ethernet(netid: NetId, data: &[u8]) -> Self {
        Self::with_netid(netid, MessageType::Frame, MessageBody::Ethernet {
            preemption_flags: Default::default(),
            description: Default::default(),
            data: data.to_vec(),
        })
    }

    pub fn with_extended(mut self, extended: bool) -> Self {
        self.header.status.set(StatusFlags::EXTENDED_FRAME, extended);
        self
    }

    /// Mark the message as CAN FD, optionally with the data phase bitrate switched.
    pub fn with_fd(mut self, brs: bool) -> Self {
        self.header.status.insert(StatusFlags::CANFD_FDF);
        self.header.status.set(StatusFlags::CANFD_BRS, brs);
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    pub fn with_description(mut self, value: u16) -> Self {
        match &mut self.body {
            MessageBody::Frame { description, .. } |
            MessageBody::Can { description, .. } |
            MessageBody::Ethernet { description, .. } => *description = value,
            MessageBody::CanErrorCount { .. } => {},
        }
        self
    }

    #[inline]
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    #[inline]
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    #[inline]
    pub fn into_parts(self) -> (MessageHeader, MessageBody) {
        (self.header, self.body)
    }

    #[inline]
    pub fn netid(&self) -> NetId {
        self.header.netid
    }

    #[inline]
    pub fn network_type(&self) -> NetworkType {
        self.header.network_type
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    #[inline]
    pub fn set_timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.header.timestamp = timestamp;
        self
    }

    #[inline]
    pub fn status(&self) -> StatusFlags {
        self.header.status
    }

    #[inline]
    pub fn set_status(&mut self, flags: StatusFlags, value: bool) -> &mut Self {
        self.header.status.set(flags, value);
        self
    }

    /// Payload bytes, empty for records without a payload.
    pub fn data(&self) -> &[u8] {
        match &self.body {
            MessageBody::Frame { data, .. } |
            MessageBody::Can { data, .. } |
            MessageBody::Ethernet { data, .. } => data,
            MessageBody::CanErrorCount { .. } => &[],
        }
    }

    #[inline]
    pub fn arbid(&self) -> Option<u32> {
        match &self.body {
            MessageBody::Can { arbid, .. } => Some(*arbid),
            _ => None,
        }
    }

    #[inline]
    pub fn is_transmit(&self) -> bool {
        self.header.status.contains(StatusFlags::TRANSMIT_MESSAGE)
    }

    #[inline]
    pub fn is_can_fd(&self) -> bool {
        self.header.status.contains(StatusFlags::CANFD_FDF)
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        self.header.status.contains(StatusFlags::EXTENDED_FRAME)
    }

    /// Whether the message can be handed to a device for transmission.
    #[inline]
    pub fn is_transmittable(&self) -> bool {
        !matches!(self.body, MessageBody::CanErrorCount { .. }) && !self.header.message_type.is_internal()
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let direct = if self.is_transmit() { "Tx" } else { "Rx" };
        // seconds, the timestamp counts nanoseconds
        let secs = self.header.timestamp as f64 / 1_000_000_000.;
        match &self.body {
            MessageBody::Can { arbid, data, .. } => write!(
                f,
                "{:.6} {} {} {} {: >8x} [{}] {}",
                secs,
                self.header.netid,
                if self.is_can_fd() { "CANFD" } else { "CAN" },
                direct,
                arbid,
                data.len(),
                hex::encode(data),
            ),
            MessageBody::CanErrorCount { transmit, receive } => write!(
                f,
                "{:.6} {} CAN error count TEC={} REC={}",
                secs,
                self.header.netid,
                transmit,
                receive,
            ),
            MessageBody::Frame { data, .. } |
            MessageBody::Ethernet { data, .. } => write!(
                f,
                "{:.6} {} {} [{}] {}",
                secs,
                self.header.netid,
                direct,
                data.len(),
                hex::encode(data),
            ),
        }
    }
}
