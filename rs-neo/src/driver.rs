use std::sync::Arc;

use crate::callback::CallbackRegistry;
use crate::queue::MessageQueue;
use crate::{DeviceType, Event, EventManager, EventType, IoType, Message, NeoError, NeoResult, NetId, Serial, Severity};

/// Discovers the devices a transport can reach.
pub trait DeviceFinder: Send + Sync {
    /// Every device currently present.
    fn find(&self) -> NeoResult<Vec<Box<dyn DeviceDriver>>>;
    /// Every device family this transport can drive.
    fn supported_devices(&self) -> Vec<DeviceType>;
}

/// The transport side of one device.
///
/// Optional capabilities report "not available" errors unless overridden.
pub trait DeviceDriver: Send {
    fn device_type(&self) -> DeviceType;
    fn serial(&self) -> Serial;
    #[inline]
    fn product_name(&self) -> String {
        self.device_type().product_name().into()
    }
    /// Start delivering traffic into `sink`.
    fn open(&mut self, sink: MessageSink) -> NeoResult<()>;
    /// Stop delivering traffic and release the transport.
    fn close(&mut self) -> NeoResult<()>;
    fn go_online(&mut self) -> NeoResult<()>;
    fn go_offline(&mut self) -> NeoResult<()>;
    /// Queue a message for sending without waiting.
    ///
    /// Fails with `TransmitBufferFull` when the transmit buffer has no room, the
    /// library retries blocking writes with the device lock released.
    fn transmit(&mut self, message: &Message) -> NeoResult<()>;
    /// Networks the device can transmit on, in device order.
    fn networks(&self) -> Vec<NetId>;
    /// Timestamp resolution in nanoseconds.
    fn timestamp_resolution(&self) -> u16;

    fn read_settings(&self) -> NeoResult<Vec<u8>> {
        Err(NeoError::device(EventType::SettingsNotAvailable, self.serial()))
    }
    fn write_settings(&mut self, _data: &[u8], _persist: bool) -> NeoResult<()> {
        Err(NeoError::device(EventType::SettingsNotAvailable, self.serial()))
    }
    fn default_settings(&self) -> NeoResult<Vec<u8>> {
        Err(NeoError::device(EventType::SettingsNotAvailable, self.serial()))
    }

    // The accessors below decode and edit a settings structure read by
    // `read_settings`, the device is only touched by `write_settings`.

    fn baudrate(&self, _settings: &[u8], _netid: NetId) -> NeoResult<i64> {
        Err(NeoError::device(EventType::CANSettingsNotAvailable, self.serial()))
    }
    fn set_baudrate(&self, _settings: &mut [u8], _netid: NetId, _baudrate: i64) -> NeoResult<()> {
        Err(NeoError::device(EventType::CANSettingsNotAvailable, self.serial()))
    }
    fn fd_baudrate(&self, _settings: &[u8], _netid: NetId) -> NeoResult<i64> {
        Err(NeoError::device(EventType::CANFDSettingsNotAvailable, self.serial()))
    }
    fn set_fd_baudrate(&self, _settings: &mut [u8], _netid: NetId, _baudrate: i64) -> NeoResult<()> {
        Err(NeoError::device(EventType::CANFDSettingsNotAvailable, self.serial()))
    }

    fn digital_io(&self, _io: IoType, _number: u32) -> NeoResult<bool> {
        Err(NeoError::device(EventType::ParameterOutOfRange, self.serial()))
    }
    fn set_digital_io(&mut self, _io: IoType, _number: u32, _value: bool) -> NeoResult<()> {
        Err(NeoError::device(EventType::ParameterOutOfRange, self.serial()))
    }

    /// Sets of networks sharing one termination resource.
    fn termination_groups(&self) -> Vec<Vec<NetId>> {
        Vec::new()
    }
    fn termination_enabled(&self, _settings: &[u8], _netid: NetId) -> NeoResult<bool> {
        Err(NeoError::device(EventType::TerminationNotSupportedDevice, self.serial()))
    }
    fn set_termination(&self, _settings: &mut [u8], _netid: NetId, _enabled: bool) -> NeoResult<()> {
        Err(NeoError::device(EventType::TerminationNotSupportedDevice, self.serial()))
    }
}

/// Where a driver delivers the traffic and events of its device.
///
/// Handed to [`DeviceDriver::open`], cloned freely into I/O threads.
#[derive(Clone)]
pub struct MessageSink {
    serial: Serial,
    queue: Arc<MessageQueue>,
    callbacks: Arc<CallbackRegistry<Message>>,
    events: Arc<EventManager>,
}

impl MessageSink {
    pub(crate) fn new(
        serial: Serial,
        queue: Arc<MessageQueue>,
        callbacks: Arc<CallbackRegistry<Message>>,
        events: Arc<EventManager>,
    ) -> Self {
        Self { serial, queue, callbacks, events }
    }

    #[inline]
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Hand a received message to the message callbacks and the polling buffer.
    ///
    /// Messages used by the library itself are dropped here.
    pub fn deliver(&self, message: Message) {
        if message.message_type().is_internal() {
            log::trace!("RUST-NEO - {} dropped internal message {:?}", self.serial, message.message_type());
            return;
        }

        log::trace!("RUST-NEO - {} received: {}", self.serial, message);
        self.callbacks.dispatch(&message);
        if self.queue.enqueue(message) {
            self.events.add(EventType::PollingMessageOverflow, Severity::Warning, Some(self.serial));
        }
    }

    /// Record an event raised by the device.
    #[inline]
    pub fn report(&self, event_type: EventType, severity: Severity) -> Event {
        self.events.add(event_type, severity, Some(self.serial))
    }

    /// See [`EventManager::downgrade_errors_on_current_thread`].
    #[inline]
    pub fn downgrade_errors_on_current_thread(&self) {
        self.events.downgrade_errors_on_current_thread();
    }

    #[inline]
    pub fn cancel_error_downgrading_on_current_thread(&self) {
        self.events.cancel_error_downgrading_on_current_thread();
    }
}
