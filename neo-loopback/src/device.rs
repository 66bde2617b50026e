use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::mpsc::{channel, sync_channel, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::thread::{self, ThreadId};
use std::time::Duration;
use rs_neo::{
    DeviceDriver, DeviceType, Event, EventType, IoType, Message, MessageSink, NeoError, NeoResult,
    NetId, Serial, Severity, StatusFlags,
};
use rs_neo::utils::system_timestamp;

use crate::constants::{BAUDRATES, FD_BAUDRATES, WORKER_INTERVAL_MS};
use crate::settings::SettingsImage;
use crate::LoopbackDeviceConfig;

/// State that survives closing the device, like the memory of real hardware.
pub(crate) struct Hardware {
    /// Persisted settings structure, loaded on every open.
    eeprom: Vec<u8>,
    /// Settings the device runs with.
    active: SettingsImage,
    misc_io: u32,
    in_use: bool,
    sink: Option<MessageSink>,
}

/// One simulated device, shared by every driver created for it.
pub(crate) struct LoopbackUnit {
    pub(crate) config: LoopbackDeviceConfig,
    hardware: Mutex<Hardware>,
}

impl LoopbackUnit {
    pub(crate) fn new(config: LoopbackDeviceConfig) -> Self {
        let active = SettingsImage::defaults(&config.networks);
        Self {
            hardware: Mutex::new(Hardware {
                eeprom: active.encode(),
                active,
                misc_io: Default::default(),
                in_use: false,
                sink: None,
            }),
            config,
        }
    }

    #[inline]
    pub(crate) fn serial(&self) -> Serial {
        self.config.serial
    }

    pub(crate) fn hardware(&self) -> MutexGuard<'_, Hardware> {
        self.hardware.lock()
            .unwrap_or_else(|e| {
                log::warn!("LOOPBACK - hardware state of {} is poisoned", self.config.serial);
                e.into_inner()
            })
    }

    #[inline]
    fn error(&self, kind: EventType) -> NeoError {
        NeoError::device(kind, self.config.serial)
    }

    /// The sink of the driver that currently has the device open.
    pub(crate) fn sink(&self) -> Option<MessageSink> {
        self.hardware().sink.clone()
    }
}

/// Pushes traffic into a loopback device as if it arrived from the bus.
#[derive(Clone)]
pub struct Injector {
    unit: Arc<LoopbackUnit>,
}

impl Injector {
    pub(crate) fn new(unit: Arc<LoopbackUnit>) -> Self {
        Self { unit }
    }

    /// Deliver `message` as received, `false` when the device is not open.
    pub fn inject(&self, message: Message) -> bool {
        match self.unit.sink() {
            Some(sink) => {
                sink.deliver(message);
                true
            },
            None => false,
        }
    }

    /// Raise an event on behalf of the device, `None` when the device is not open.
    pub fn report(&self, event_type: EventType, severity: Severity) -> Option<Event> {
        self.unit.sink()
            .map(|sink| sink.report(event_type, severity))
    }
}

/// Frames queued by callbacks running on the worker itself, they cannot wait
/// for the channel the worker drains.
type Backlog = Arc<Mutex<VecDeque<Message>>>;

struct EchoWorker {
    sender: SyncSender<Message>,
    backlog: Backlog,
    stop: Sender<()>,
    thread: ThreadId,
}

impl EchoWorker {
    fn start(sink: MessageSink, capacity: usize, delay: Duration) -> Self {
        let (sender, receiver) = sync_channel(capacity);
        let (stop, stopper) = channel();
        let backlog = Backlog::default();
        let pending = backlog.clone();
        let task = thread::spawn(move || Self::echo_loop(sink, receiver, pending, stopper, delay));

        Self { sender, backlog, stop, thread: task.thread().id() }
    }

    fn echo_loop(sink: MessageSink, receiver: Receiver<Message>, backlog: Backlog, stopper: Receiver<()>, delay: Duration) {
        // nobody reads the error slot of this thread
        sink.downgrade_errors_on_current_thread();
        loop {
            let queued = backlog.lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front();
            let message = match queued {
                Some(message) => message,
                None => match receiver.recv_timeout(Duration::from_millis(WORKER_INTERVAL_MS)) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
            };
            // a stopped worker drops what is left
            if let Ok(()) = stopper.try_recv() {
                break;
            }

            Self::echo(&sink, message);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
        log::debug!("LOOPBACK - {} echo worker stopped", sink.serial());
        sink.cancel_error_downgrading_on_current_thread();
    }

    fn echo(sink: &MessageSink, mut message: Message) {
        message.set_status(StatusFlags::TRANSMIT_MESSAGE, true)
            .set_timestamp(system_timestamp());
        sink.deliver(message);
    }

    /// Queue `message` without waiting, `TransmitBufferFull` when the buffer has no room.
    fn send(&self, message: Message, serial: Serial) -> NeoResult<()> {
        if thread::current().id() == self.thread {
            self.backlog.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(message);
            return Ok(());
        }

        let error = |kind| NeoError::device(kind, serial);
        self.sender.try_send(message)
            .map_err(|e| match e {
                TrySendError::Full(_) => error(EventType::TransmitBufferFull),
                TrySendError::Disconnected(_) => error(EventType::FailedToWrite),
            })
    }

    /// Signal the worker to finish, a callback it runs may be waiting on the caller.
    fn stop(self, serial: Serial) {
        if let Err(e) = self.stop.send(()) {
            log::warn!("LOOPBACK - error {} when stopping echo worker of {}", e, serial);
        }
    }
}

/// Driver of a loopback device, every transmitted frame is received back.
pub struct LoopbackDevice {
    unit: Arc<LoopbackUnit>,
    sink: Option<MessageSink>,
    worker: Option<EchoWorker>,
}

impl LoopbackDevice {
    pub(crate) fn new(unit: Arc<LoopbackUnit>) -> Self {
        Self { unit, sink: None, worker: None }
    }

    #[inline]
    fn config(&self) -> &LoopbackDeviceConfig {
        &self.unit.config
    }

    fn check_settings(&self, kind: EventType) -> NeoResult<()> {
        match self.config().settings {
            true => Ok(()),
            false => Err(self.unit.error(kind)),
        }
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop(self.unit.serial());
        }
    }
}

impl Drop for LoopbackDevice {
    fn drop(&mut self) {
        if self.sink.is_some() {
            if let Err(e) = self.close() {
                log::warn!("LOOPBACK - {} when dropping an open device", e);
            }
        }
    }
}

impl DeviceDriver for LoopbackDevice {
    #[inline]
    fn device_type(&self) -> DeviceType {
        self.config().device_type
    }

    #[inline]
    fn serial(&self) -> Serial {
        self.unit.serial()
    }

    fn open(&mut self, sink: MessageSink) -> NeoResult<()> {
        let mut hardware = self.unit.hardware();
        if hardware.in_use {
            return Err(self.unit.error(EventType::DeviceInUse));
        }

        // power on with the persisted settings
        let defaults = SettingsImage::defaults(&self.config().networks);
        let (active, restored) = match SettingsImage::decode(&hardware.eeprom, &defaults, self.serial()) {
            Ok(image) => (image, true),
            Err(e) => {
                log::warn!("LOOPBACK - {}, falling back to the default settings", e);
                (defaults, false)
            }
        };
        hardware.active = active;
        hardware.in_use = true;
        hardware.sink = Some(sink.clone());
        drop(hardware);

        if !restored {
            sink.report(EventType::SettingsDefaultsUsed, Severity::Warning);
        }
        self.sink = Some(sink);

        log::debug!("LOOPBACK - {} opened", self.serial());
        Ok(())
    }

    fn close(&mut self) -> NeoResult<()> {
        self.stop_worker();
        let mut hardware = self.unit.hardware();
        hardware.in_use = false;
        hardware.sink = None;
        self.sink = None;

        log::debug!("LOOPBACK - {} closed", self.serial());
        Ok(())
    }

    fn go_online(&mut self) -> NeoResult<()> {
        let sink = self.sink.clone()
            .ok_or_else(|| self.unit.error(EventType::DeviceCurrentlyClosed))?;
        let config = self.config();
        let worker = EchoWorker::start(sink, config.tx_buffer.max(1), Duration::from_millis(config.echo_delay_ms));
        self.worker = Some(worker);

        Ok(())
    }

    fn go_offline(&mut self) -> NeoResult<()> {
        self.stop_worker();
        Ok(())
    }

    fn transmit(&mut self, message: &Message) -> NeoResult<()> {
        let serial = self.serial();
        if message.is_can_fd() && !self.config().fd {
            return Err(self.unit.error(EventType::CANFDNotSupported));
        }

        let worker = self.worker.as_ref()
            .ok_or_else(|| self.unit.error(EventType::DeviceCurrentlyOffline))?;
        log::trace!("LOOPBACK - {} echo {}", serial, hex::encode(message.data()));
        worker.send(message.clone(), serial)
    }

    fn networks(&self) -> Vec<NetId> {
        self.config().networks.clone()
    }

    #[inline]
    fn timestamp_resolution(&self) -> u16 {
        self.config().timestamp_resolution
    }

    fn read_settings(&self) -> NeoResult<Vec<u8>> {
        self.check_settings(EventType::SettingsNotAvailable)?;
        Ok(self.unit.hardware().active.encode())
    }

    fn write_settings(&mut self, data: &[u8], persist: bool) -> NeoResult<()> {
        self.check_settings(EventType::SettingsNotAvailable)?;
        let mut hardware = self.unit.hardware();
        let image = SettingsImage::decode(data, &hardware.active, self.serial())?;
        hardware.active = image;
        if persist {
            hardware.eeprom = data.to_vec();
        }

        log::debug!("LOOPBACK - {} settings written{}: {}", self.serial(), if persist { " and persisted" } else { "" }, hex::encode(data));
        Ok(())
    }

    fn default_settings(&self) -> NeoResult<Vec<u8>> {
        self.check_settings(EventType::SettingsNotAvailable)?;
        Ok(SettingsImage::defaults(&self.config().networks).encode())
    }

    fn baudrate(&self, settings: &[u8], netid: NetId) -> NeoResult<i64> {
        self.image(settings)?.channel(netid)
            .map(|c| c.baudrate as i64)
            .ok_or_else(|| self.unit.error(EventType::CANSettingsNotAvailable))
    }

    fn set_baudrate(&self, settings: &mut [u8], netid: NetId, baudrate: i64) -> NeoResult<()> {
        let baudrate = u32::try_from(baudrate).ok()
            .filter(|b| BAUDRATES.contains(b))
            .ok_or_else(|| self.unit.error(EventType::BaudrateNotFound))?;

        self.update(settings, |image| {
            let channel = image.channel_mut(netid)
                .ok_or_else(|| self.unit.error(EventType::CANSettingsNotAvailable))?;
            channel.baudrate = baudrate;
            Ok(())
        })
    }

    fn fd_baudrate(&self, settings: &[u8], netid: NetId) -> NeoResult<i64> {
        self.check_fd()?;
        self.image(settings)?.channel(netid)
            .map(|c| c.fd_baudrate as i64)
            .ok_or_else(|| self.unit.error(EventType::CANFDSettingsNotAvailable))
    }

    fn set_fd_baudrate(&self, settings: &mut [u8], netid: NetId, baudrate: i64) -> NeoResult<()> {
        self.check_fd()?;
        let baudrate = u32::try_from(baudrate).ok()
            .filter(|b| FD_BAUDRATES.contains(b))
            .ok_or_else(|| self.unit.error(EventType::BaudrateNotFound))?;

        self.update(settings, |image| {
            let channel = image.channel_mut(netid)
                .ok_or_else(|| self.unit.error(EventType::CANFDSettingsNotAvailable))?;
            channel.fd_baudrate = baudrate;
            Ok(())
        })
    }

    fn digital_io(&self, io: IoType, number: u32) -> NeoResult<bool> {
        let bit = self.misc_pin(io, number)?;
        Ok(self.unit.hardware().misc_io & bit != 0)
    }

    fn set_digital_io(&mut self, io: IoType, number: u32, value: bool) -> NeoResult<()> {
        let bit = self.misc_pin(io, number)?;
        let mut hardware = self.unit.hardware();
        match value {
            true => hardware.misc_io |= bit,
            false => hardware.misc_io &= !bit,
        }
        Ok(())
    }

    fn termination_groups(&self) -> Vec<Vec<NetId>> {
        self.config().termination_groups.clone()
    }

    fn termination_enabled(&self, settings: &[u8], netid: NetId) -> NeoResult<bool> {
        self.image(settings)?.channel(netid)
            .map(|c| c.termination)
            .ok_or_else(|| self.unit.error(EventType::TerminationNotSupportedNetwork))
    }

    fn set_termination(&self, settings: &mut [u8], netid: NetId, enabled: bool) -> NeoResult<()> {
        self.update(settings, |image| {
            let channel = image.channel_mut(netid)
                .ok_or_else(|| self.unit.error(EventType::TerminationNotSupportedNetwork))?;
            channel.termination = enabled;
            Ok(())
        })
    }
}

impl LoopbackDevice {
    fn check_fd(&self) -> NeoResult<()> {
        match self.config().fd {
            true => Ok(()),
            false => Err(self.unit.error(EventType::CANFDSettingsNotAvailable)),
        }
    }

    /// Decode a settings structure of this device.
    fn image(&self, settings: &[u8]) -> NeoResult<SettingsImage> {
        SettingsImage::decode(settings, &SettingsImage::defaults(&self.config().networks), self.serial())
    }

    /// Edit a settings structure of this device in place.
    fn update(&self, settings: &mut [u8], f: impl FnOnce(&mut SettingsImage) -> NeoResult<()>) -> NeoResult<()> {
        let mut image = self.image(settings)?;
        f(&mut image)?;
        // decoding checked the length
        settings.copy_from_slice(&image.encode());
        Ok(())
    }

    /// Bit of the `Misc` pin `number`, pins are numbered from 1.
    fn misc_pin(&self, io: IoType, number: u32) -> NeoResult<u32> {
        match io {
            IoType::Misc if (1..=self.config().misc_io.min(32)).contains(&number) => Ok(1 << (number - 1)),
            _ => Err(self.unit.error(EventType::ParameterOutOfRange)),
        }
    }
}
