use std::thread;
use std::time::Duration;

use super::{DeviceEntry, NeoApi};
use crate::constants::{MAX_FD_FRAME_SIZE, MAX_FRAME_SIZE, TRANSMIT_RETRY_MS};
use crate::raw::RawMessage;
use crate::{DeviceHandle, EventType, Message, MessageBody, NeoResult, NetId};

impl DeviceEntry {
    /// Check that the device can send `message` right now.
    fn check_transmit(&self, message: &Message, networks: &[NetId]) -> NeoResult<()> {
        if !message.is_transmittable() {
            return Err(self.error(EventType::UnexpectedNetworkType));
        }
        if !networks.contains(&message.netid()) {
            return Err(self.error(EventType::UnsupportedTXNetwork));
        }

        if let MessageBody::Can { data, .. } = message.body() {
            let max = if message.is_can_fd() { MAX_FD_FRAME_SIZE } else { MAX_FRAME_SIZE };
            if data.len() > max {
                return Err(self.error(EventType::MessageMaxLengthExceeded));
            }
        }

        Ok(())
    }

    /// Fails unless the device is open and online, returns whether writes block.
    fn check_online(&self) -> NeoResult<bool> {
        let state = self.state();
        if !state.open {
            return Err(self.error(EventType::DeviceCurrentlyClosed));
        }
        if !state.online {
            return Err(self.error(EventType::DeviceCurrentlyOffline));
        }
        Ok(state.write_blocks)
    }

    /// Queue `message`, a blocking write waits for room with the driver unlocked.
    fn send(&self, message: &Message) -> NeoResult<()> {
        loop {
            let blocking = self.check_online()?;
            let result = self.driver().transmit(message);
            match result {
                Err(e) if blocking && e.event_type() == EventType::TransmitBufferFull => {
                    thread::sleep(Duration::from_millis(TRANSMIT_RETRY_MS));
                },
                result => return result,
            }
        }
    }

    fn transmit(&self, messages: &[Message]) -> NeoResult<()> {
        self.check_online()?;
        let networks = self.driver().networks();
        messages.iter()
            .try_for_each(|message| {
                self.check_transmit(message, &networks)?;
                log::trace!("RUST-NEO - {} transmit: {}", self.serial(), message);
                self.send(message)
            })
    }
}

impl NeoApi {
    /// Send one message on an online device.
    ///
    /// With write blocking enabled (the default) this waits for room in a full
    /// transmit buffer, otherwise it fails with `TransmitBufferFull`.
    pub fn transmit(&self, device: &DeviceHandle, message: &Message) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.transmit(std::slice::from_ref(message)))
    }

    /// Send `messages` in order, stopping at the first failure.
    pub fn transmit_messages(&self, device: &DeviceHandle, messages: &[Message]) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.transmit(messages))
    }

    /// Send raw records.
    ///
    /// # Safety
    /// Every record must be a valid envelope whose payload pointer, if any, points
    /// to at least `length` readable bytes.
    pub unsafe fn transmit_raw(&self, device: &DeviceHandle, records: &[RawMessage]) -> NeoResult<()> {
        let messages = records.iter()
            // SAFETY: upheld by the caller
            .map(|raw| unsafe { raw.to_message() })
            .collect::<NeoResult<Vec<_>>>();
        let messages = self.guard(messages)?;

        self.transmit_messages(device, &messages)
    }

    /// Choose whether transmits wait when the transmit buffer is full.
    pub fn set_write_blocks(&self, device: &DeviceHandle, blocks: bool) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            entry.state().write_blocks = blocks;
            Ok(())
        })
    }
}
