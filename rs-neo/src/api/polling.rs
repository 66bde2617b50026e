use std::time::Duration;

use super::NeoApi;
use crate::constants::INVALID_CALLBACK_ID;
use crate::raw::RawMessage;
use crate::utils::lock;
use crate::{CallbackId, DeviceHandle, EventType, Message, NeoResult, Severity};

impl NeoApi {
    /// Start buffering received messages for [`NeoApi::get_messages`].
    ///
    /// Polling is independent of the open and online states, it may be enabled
    /// before the device is opened.
    pub fn enable_message_polling(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            match entry.queue.set_enabled(true) {
                true => Err(entry.error(EventType::DeviceCurrentlyPolling)),
                false => Ok(()),
            }
        })
    }

    /// Stop buffering, every message still queued is dropped.
    pub fn disable_message_polling(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            match entry.queue.set_enabled(false) {
                true => Ok(()),
                false => Err(entry.error(EventType::DeviceNotCurrentlyPolling)),
            }
        })
    }

    pub fn is_message_polling_enabled(&self, device: &DeviceHandle) -> bool {
        self.with_entry(device, |entry| Ok(entry.queue.is_enabled()))
            .unwrap_or_default()
    }

    /// Take at most `max` buffered messages in arrival order.
    ///
    /// Returns immediately with a zero `timeout`, otherwise waits up to `timeout`
    /// for at least one message.
    pub fn get_messages(&self, device: &DeviceHandle, max: usize, timeout: Duration) -> NeoResult<Vec<Message>> {
        let result = self.entry(device).and_then(|entry| {
            if !entry.queue.is_enabled() {
                return Err(entry.error(EventType::DeviceNotCurrentlyPolling));
            }
            entry.queue.drain(max, timeout)
        });

        self.guard(result)
    }

    /// Like [`NeoApi::get_messages`], filling `out` with raw records.
    ///
    /// The payload pointers of the records stay valid until the next raw drain of
    /// the same device.
    pub fn get_messages_raw(&self, device: &DeviceHandle, out: &mut [RawMessage], timeout: Duration) -> NeoResult<usize> {
        let result = self.entry(device).and_then(|entry| {
            if !entry.queue.is_enabled() {
                return Err(entry.error(EventType::DeviceNotCurrentlyPolling));
            }
            let messages = entry.queue.drain(out.len(), timeout)?;
            Ok(lock(&entry.arena, "raw arena").fill(messages, out))
        });

        self.guard(result)
    }

    /// Number of buffered messages.
    pub fn message_count(&self, device: &DeviceHandle) -> NeoResult<usize> {
        self.with_entry(device, |entry| {
            if !entry.queue.is_enabled() {
                return Err(entry.error(EventType::DeviceNotCurrentlyPolling));
            }
            Ok(entry.queue.count())
        })
    }

    pub fn get_polling_message_limit(&self, device: &DeviceHandle) -> NeoResult<usize> {
        self.with_entry(device, |entry| Ok(entry.queue.limit()))
    }

    /// Change the polling buffer capacity.
    ///
    /// Shrinking below the current depth drops the oldest messages and raises a
    /// `PollingMessageOverflow` warning.
    pub fn set_polling_message_limit(&self, device: &DeviceHandle, limit: usize) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            if entry.queue.set_limit(limit)? {
                self.events.add(EventType::PollingMessageOverflow, Severity::Warning, Some(entry.serial()));
            }
            Ok(())
        })
    }

    /// Register a callback for every message received by `device`.
    ///
    /// Returns [`INVALID_CALLBACK_ID`] when the handle is invalid.
    pub fn add_message_callback<F>(&self, device: &DeviceHandle, callback: F) -> CallbackId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.with_entry(device, |entry| Ok(entry.callbacks.add(callback)))
            .unwrap_or(INVALID_CALLBACK_ID)
    }

    pub fn remove_message_callback(&self, device: &DeviceHandle, id: CallbackId) -> bool {
        self.with_entry(device, |entry| Ok(entry.callbacks.remove(id)))
            .unwrap_or_default()
    }
}
