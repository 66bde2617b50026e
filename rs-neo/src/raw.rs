//! Byte compatible message layouts.
//!
//! [`RawMessage`] is the common 72 byte envelope (on 64-bit targets). It is
//! reinterpreted as one of the overlays depending on its message and network
//! type. Payloads are referenced by pointer, never copied into the envelope.

use std::mem::size_of;

use crate::{EventType, Message, MessageBody, MessageHeader, MessageType, NeoError, NeoResult, NetId, NetworkType, StatusFlags};

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawMessage {
    reserved1: [u8; 16],
    pub timestamp: u64,
    reserved_timestamp: u64,
    reserved2: [u8; size_of::<usize>() * 2 + 7 + size_of::<u16>() + size_of::<u8>()],
    pub message_type: u16,
    reserved3: [u8; 12],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawFrame {
    pub status: [u32; 4],
    pub timestamp: u64,
    pub reserved_timestamp: u64,
    pub data: *const u8,
    pub length: usize,
    pub header: [u8; 4],
    pub netid: u16,
    pub r#type: u8,
    reserved0: u8,
    pub description: u16,
    pub message_type: u16,
    reserved1: [u8; 12],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawCan {
    pub status: [u32; 4],
    pub timestamp: u64,
    pub reserved_timestamp: u64,
    pub data: *const u8,
    pub length: usize,
    pub arbid: u32,
    pub netid: u16,
    pub r#type: u8,
    pub dlc_on_wire: u8,
    pub description: u16,
    pub message_type: u16,
    reserved1: [u8; 12],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawCanError {
    pub status: [u32; 4],
    pub timestamp: u64,
    pub reserved_timestamp: u64,
    reserved2: [usize; 2],
    pub transmit_error_count: u8,
    pub receive_error_count: u8,
    reserved3: [u8; 5],
    pub netid: u16,
    pub r#type: u8,
    pub message_type: u16,
    reserved4: [u8; 12],
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct RawEth {
    pub status: [u32; 4],
    pub timestamp: u64,
    pub reserved_timestamp: u64,
    pub data: *const u8,
    pub length: usize,
    pub preemption_flags: u8,
    reserved_header: [u8; 3],
    pub netid: u16,
    pub r#type: u8,
    reserved0: u8,
    pub description: u16,
    pub message_type: u16,
    reserved1: [u8; 12],
}

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(size_of::<RawMessage>() == 72);
    assert!(size_of::<RawFrame>() == 72);
    assert!(size_of::<RawCan>() == 72);
    assert!(size_of::<RawCanError>() == 72);
    assert!(size_of::<RawEth>() == 72);
};

const _: () = {
    assert!(size_of::<RawFrame>() == size_of::<RawMessage>());
    assert!(size_of::<RawCan>() == size_of::<RawMessage>());
    assert!(size_of::<RawCanError>() == size_of::<RawMessage>());
    assert!(size_of::<RawEth>() == size_of::<RawMessage>());
};

macro_rules! overlay {
    ($($raw:ident => $as:ident;)+) => {
        $(
            impl From<$raw> for RawMessage {
                #[inline]
                fn from(value: $raw) -> Self {
                    // SAFETY: both are plain packed structs of the same size
                    unsafe { std::mem::transmute::<$raw, RawMessage>(value) }
                }
            }

            impl RawMessage {
                #[inline]
                pub fn $as(&self) -> $raw {
                    // SAFETY: both are plain packed structs of the same size
                    unsafe { std::mem::transmute::<RawMessage, $raw>(*self) }
                }
            }
        )+
    };
}

overlay! {
    RawFrame => as_frame;
    RawCan => as_can;
    RawCanError => as_can_error;
    RawEth => as_eth;
}

impl Default for RawMessage {
    fn default() -> Self {
        Self {
            reserved1: Default::default(),
            timestamp: Default::default(),
            reserved_timestamp: Default::default(),
            reserved2: Default::default(),
            message_type: Default::default(),
            reserved3: Default::default(),
        }
    }
}

impl RawMessage {
    /// Build the raw envelope of `message`.
    ///
    /// The payload pointer refers to the buffer of `message`, it is only valid for
    /// as long as `message` is neither dropped nor modified.
    pub fn from_message(message: &Message) -> Self {
        let header = message.header();
        let status = header.status().to_words();
        let timestamp = header.timestamp();
        let reserved_timestamp = header.reserved_timestamp();
        let netid = header.netid().0;
        let r#type = header.network_type() as u8;
        let message_type = header.message_type() as u16;

        match message.body() {
            MessageBody::Frame { header, description, data } => RawFrame {
                status, timestamp, reserved_timestamp,
                data: data.as_ptr(),
                length: data.len(),
                header: *header,
                netid, r#type,
                reserved0: 0,
                description: *description,
                message_type,
                reserved1: Default::default(),
            }.into(),
            MessageBody::Can { arbid, dlc_on_wire, description, data } => RawCan {
                status, timestamp, reserved_timestamp,
                data: data.as_ptr(),
                length: data.len(),
                arbid: *arbid,
                netid, r#type,
                dlc_on_wire: *dlc_on_wire,
                description: *description,
                message_type,
                reserved1: Default::default(),
            }.into(),
            MessageBody::CanErrorCount { transmit, receive } => RawCanError {
                status, timestamp, reserved_timestamp,
                reserved2: Default::default(),
                transmit_error_count: *transmit,
                receive_error_count: *receive,
                reserved3: Default::default(),
                netid, r#type,
                message_type,
                reserved4: Default::default(),
            }.into(),
            MessageBody::Ethernet { preemption_flags, description, data } => RawEth {
                status, timestamp, reserved_timestamp,
                data: data.as_ptr(),
                length: data.len(),
                preemption_flags: *preemption_flags,
                reserved_header: Default::default(),
                netid, r#type,
                reserved0: 0,
                description: *description,
                message_type,
                reserved1: Default::default(),
            }.into(),
        }
    }

    /// Decode the envelope into an owned message.
    ///
    /// The network type is derived from the network id when the record leaves it unset.
    ///
    /// # Safety
    /// Unless the record is a CAN error count, its `data` pointer must be valid for
    /// reads of `length` bytes, or be null with a zero length.
    pub unsafe fn to_message(&self) -> NeoResult<Message> {
        let message_type = MessageType::from(self.message_type);
        if message_type == MessageType::CanErrorCount {
            let raw = self.as_can_error();
            let netid = NetId(raw.netid);
            let header = raw_header(raw.status, raw.timestamp, raw.reserved_timestamp, netid, raw.r#type, message_type);
            return Ok(Message::new(header, MessageBody::CanErrorCount {
                transmit: raw.transmit_error_count,
                receive: raw.receive_error_count,
            }));
        }

        let frame = self.as_frame();
        let netid = NetId(frame.netid);
        let header = raw_header(frame.status, frame.timestamp, frame.reserved_timestamp, netid, frame.r#type, message_type);
        let data = payload(frame.data, frame.length)?;

        let body = match header.network_type() {
            NetworkType::Can | NetworkType::SwCan | NetworkType::LsftCan => {
                let can = self.as_can();
                MessageBody::Can {
                    arbid: can.arbid,
                    dlc_on_wire: can.dlc_on_wire,
                    description: can.description,
                    data,
                }
            },
            NetworkType::Ethernet => {
                let eth = self.as_eth();
                MessageBody::Ethernet {
                    preemption_flags: eth.preemption_flags,
                    description: eth.description,
                    data,
                }
            },
            _ => MessageBody::Frame {
                header: frame.header,
                description: frame.description,
                data,
            },
        };

        Ok(Message::new(header, body))
    }
}

fn raw_header(status: [u32; 4], timestamp: u64, reserved_timestamp: u64, netid: NetId, r#type: u8, message_type: MessageType) -> MessageHeader {
    let network_type = match NetworkType::from(r#type) {
        NetworkType::Invalid => netid.network_type(),
        v => v,
    };

    MessageHeader::new(StatusFlags::from_words(status), timestamp, reserved_timestamp, netid, network_type, message_type)
}

unsafe fn payload(data: *const u8, length: usize) -> NeoResult<Vec<u8>> {
    if length == 0 {
        return Ok(Vec::new());
    }
    if data.is_null() {
        return Err(NeoError::Api(EventType::RequiredParameterNull));
    }

    Ok(std::slice::from_raw_parts(data, length).to_vec())
}

/// Keeps the messages of the last raw drain of a device alive.
///
/// Raw records point into these messages, so the pointers handed out by a drain
/// stay valid until the next raw drain of the same device.
#[derive(Default)]
pub(crate) struct RawArena {
    messages: Vec<Message>,
}

impl RawArena {
    /// Replace the held messages by `messages` and write their envelopes into `out`.
    pub(crate) fn fill(&mut self, messages: Vec<Message>, out: &mut [RawMessage]) -> usize {
        self.messages = messages;
        self.messages.iter()
            .zip(out.iter_mut())
            .for_each(|(msg, raw)| *raw = RawMessage::from_message(msg));

        self.messages.len().min(out.len())
    }
}
