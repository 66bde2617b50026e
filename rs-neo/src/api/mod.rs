mod event;
mod hardware;
mod polling;
mod settings;
mod transmit;

use std::sync::{Arc, Mutex, RwLock};

use crate::callback::CallbackRegistry;
use crate::device::DeviceState;
use crate::queue::MessageQueue;
use crate::raw::RawArena;
use crate::registry::Registry;
use crate::settings::Settings;
use crate::utils::{copy_c_string, lock, read, write};
use crate::{
    serial_string_to_num, DeviceDriver, DeviceFinder, DeviceHandle, DeviceType, EventManager,
    EventType, Message, MessageSink, NeoConfig, NeoError, NeoResult, Serial, Severity, Version,
};

/// Everything the library keeps for one discovered device.
pub(crate) struct DeviceEntry {
    handle: DeviceHandle,
    state: Mutex<DeviceState>,
    driver: Mutex<Box<dyn DeviceDriver>>,
    settings: Mutex<Settings>,
    queue: Arc<MessageQueue>,
    callbacks: Arc<CallbackRegistry<Message>>,
    arena: Mutex<RawArena>,
}

impl DeviceEntry {
    fn new(handle: DeviceHandle, driver: Box<dyn DeviceDriver>, config: &NeoConfig) -> Self {
        let serial = handle.serial();
        Self {
            handle,
            state: Mutex::new(DeviceState::new(config.write_blocks())),
            driver: Mutex::new(driver),
            settings: Mutex::new(Settings::new(serial)),
            queue: Arc::new(MessageQueue::new(serial, config.polling_message_limit())),
            callbacks: Arc::new(CallbackRegistry::new("message callbacks")),
            arena: Default::default(),
        }
    }

    #[inline]
    fn serial(&self) -> Serial {
        self.handle.serial()
    }

    #[inline]
    fn error(&self, kind: EventType) -> NeoError {
        NeoError::device(kind, self.serial())
    }

    #[inline]
    fn state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        lock(&self.state, "device state")
    }

    #[inline]
    fn driver(&self) -> std::sync::MutexGuard<'_, Box<dyn DeviceDriver>> {
        lock(&self.driver, "device driver")
    }

    #[inline]
    fn is_open(&self) -> bool {
        self.state().open
    }

    /// Fails with `DeviceCurrentlyClosed` unless the device is open.
    fn ensure_open(&self) -> NeoResult<()> {
        match self.is_open() {
            true => Ok(()),
            false => Err(self.error(EventType::DeviceCurrentlyClosed)),
        }
    }
}

/// Entry point of the library.
///
/// Discovers devices through a [`DeviceFinder`] and drives them through their
/// whole lifecycle. Every fallible call returns a `Result` and also records its
/// error in the calling thread's error slot, see [`NeoApi::get_last_error`].
pub struct NeoApi {
    config: NeoConfig,
    finder: Box<dyn DeviceFinder>,
    devices: RwLock<Registry<Arc<DeviceEntry>>>,
    events: Arc<EventManager>,
}

impl NeoApi {
    /// Create the API with the configuration found by [`NeoConfig::load`].
    pub fn new<F: DeviceFinder + 'static>(finder: F) -> NeoResult<Self> {
        Self::with_config(finder, NeoConfig::load()?)
    }

    pub fn with_config<F: DeviceFinder + 'static>(finder: F, config: NeoConfig) -> NeoResult<Self> {
        let events = EventManager::with_limit(config.event_limit())?;
        log::debug!("RUST-NEO - {:?}", config);

        Ok(Self {
            config,
            finder: Box::new(finder),
            devices: Default::default(),
            events: Arc::new(events),
        })
    }

    #[inline]
    pub fn config(&self) -> &NeoConfig {
        &self.config
    }

    /// Record the error of a failed call in the calling thread's error slot.
    fn guard<T>(&self, result: NeoResult<T>) -> NeoResult<T> {
        if let Err(e) = &result {
            self.events.add_error(e);
        }
        result
    }

    fn entry(&self, device: &DeviceHandle) -> NeoResult<Arc<DeviceEntry>> {
        read(&self.devices, "device registry")
            .get(device)
            .cloned()
            .ok_or(NeoError::Api(EventType::InvalidNeoDevice))
    }

    /// Run `f` on a valid device, recording any error.
    fn with_entry<T>(&self, device: &DeviceHandle, f: impl FnOnce(&DeviceEntry) -> NeoResult<T>) -> NeoResult<T> {
        let result = self.entry(device)
            .and_then(|entry| f(&entry));
        self.guard(result)
    }

    fn warn(&self, kind: EventType, serial: Option<Serial>) {
        self.events.add(kind, Severity::Warning, serial);
    }

    /// Copy `text` into `out` as a C string, a missing buffer only reports the length.
    fn write_text(&self, text: &str, out: Option<&mut [u8]>, serial: Option<Serial>) -> usize {
        match out {
            None => text.len(),
            Some(out) => {
                let (written, truncated) = copy_c_string(text, out);
                if truncated {
                    self.warn(EventType::OutputTruncated, serial);
                }
                written
            }
        }
    }

    /// Discover every present device.
    ///
    /// Devices that were found before but never opened are released first, their
    /// handles become invalid. Open devices keep their handle.
    pub fn find_all_devices(&self) -> NeoResult<Vec<DeviceHandle>> {
        self.free_unconnected_devices();

        let drivers = self.guard(self.finder.find())?;
        let mut devices = write(&self.devices, "device registry");
        let handles = drivers.into_iter()
            .map(|driver| {
                let serial = driver.serial();
                let known = devices.values()
                    .find(|e| e.serial() == serial)
                    .map(|e| e.handle);
                match known {
                    Some(handle) => handle,
                    None => {
                        let device_type = driver.device_type();
                        log::debug!("RUST-NEO - found {} {}", device_type, serial);
                        devices.insert(device_type, serial, |handle| Arc::new(DeviceEntry::new(handle, driver, &self.config)))
                    }
                }
            })
            .collect();

        Ok(handles)
    }

    /// Invalidate the handles of every device that is not open.
    pub fn free_unconnected_devices(&self) {
        let removed = write(&self.devices, "device registry")
            .retain(|e| e.is_open());
        if removed > 0 {
            log::debug!("RUST-NEO - released {} unconnected device(s)", removed);
        }
    }

    /// Handles of every device currently known.
    pub fn devices(&self) -> Vec<DeviceHandle> {
        read(&self.devices, "device registry")
            .values()
            .map(|e| e.handle)
            .collect()
    }

    /// Write the string form of the serial `num` into `out`.
    ///
    /// Without a buffer the length of the serial is returned. A buffer that can not
    /// hold the serial and its terminating NUL is left untouched and the call fails
    /// with `BufferInsufficient`.
    pub fn serial_num_to_string(&self, num: u32, out: Option<&mut [u8]>) -> NeoResult<usize> {
        let serial = self.guard(Serial::try_from(num))?;
        let text = serial.as_str();
        match out {
            None => Ok(text.len()),
            Some(out) if out.len() <= text.len() => self.guard(Err(NeoError::BufferInsufficient {
                provided: out.len(),
                required: text.len() + 1,
            })),
            Some(out) => Ok(copy_c_string(text, out).0),
        }
    }

    /// `0` when `serial` is not a valid serial number.
    #[inline]
    pub fn serial_string_to_num(&self, serial: &str) -> u32 {
        serial_string_to_num(serial)
    }

    /// Whether `device` refers to a device the library still knows.
    #[inline]
    pub fn is_valid_neo_device(&self, device: &DeviceHandle) -> bool {
        read(&self.devices, "device registry").contains(device)
    }

    pub fn open_device(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            let mut state = entry.state();
            if state.open {
                return Err(entry.error(EventType::DeviceCurrentlyOpen));
            }

            log::info!("RUST-NEO - opening device {}", entry.handle);
            let sink = MessageSink::new(entry.serial(), Arc::clone(&entry.queue), Arc::clone(&entry.callbacks), Arc::clone(&self.events));
            let mut driver = entry.driver();
            driver.open(sink)?;

            if let Err(e) = lock(&entry.settings, "device settings").refresh(&**driver) {
                if e.event_type() != EventType::SettingsNotAvailable {
                    self.warn(e.event_type(), Some(entry.serial()));
                }
            }

            state.open = true;
            if self.config.enable_polling_on_open() {
                entry.queue.set_enabled(true);
            }

            Ok(())
        })
    }

    /// Close the device, its handle becomes permanently invalid.
    ///
    /// Drains blocked on the device are woken and fail with `DeviceCurrentlyClosed`.
    pub fn close_device(&self, device: &DeviceHandle) -> NeoResult<()> {
        let result = self.entry(device).and_then(|entry| {
            let was_online = {
                let mut state = entry.state();
                if !state.open {
                    return Err(entry.error(EventType::DeviceCurrentlyClosed));
                }
                state.open = false;
                std::mem::replace(&mut state.online, false)
            };

            log::info!("RUST-NEO - closing device {}", entry.handle);
            entry.queue.close();

            let result = {
                let mut driver = entry.driver();
                if was_online {
                    if let Err(e) = driver.go_offline() {
                        log::warn!("RUST-NEO - {} when going offline before close", e);
                    }
                }
                driver.close()
            };

            write(&self.devices, "device registry").remove(device);
            result
        });

        self.guard(result)
    }

    /// `false` for invalid handles, which also records `InvalidNeoDevice`.
    pub fn is_open(&self, device: &DeviceHandle) -> bool {
        self.with_entry(device, |entry| Ok(entry.is_open()))
            .unwrap_or_default()
    }

    pub fn go_online(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            let mut state = entry.state();
            if !state.open {
                return Err(entry.error(EventType::DeviceCurrentlyClosed));
            }
            if state.online {
                return Err(entry.error(EventType::DeviceCurrentlyOnline));
            }

            entry.driver().go_online()?;
            state.online = true;
            log::info!("RUST-NEO - device {} is online", entry.handle);
            Ok(())
        })
    }

    pub fn go_offline(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            let mut state = entry.state();
            if !state.open {
                return Err(entry.error(EventType::DeviceCurrentlyClosed));
            }
            if !state.online {
                return Err(entry.error(EventType::DeviceCurrentlyOffline));
            }

            entry.driver().go_offline()?;
            state.online = false;
            log::info!("RUST-NEO - device {} is offline", entry.handle);
            Ok(())
        })
    }

    pub fn is_online(&self, device: &DeviceHandle) -> bool {
        self.with_entry(device, |entry| Ok(entry.state().online))
            .unwrap_or_default()
    }

    /// Product name of the device, see [`NeoApi::serial_num_to_string`] for the buffer rules.
    ///
    /// A short buffer receives a truncated name and raises an `OutputTruncated` warning.
    pub fn get_product_name(&self, device: &DeviceHandle, out: Option<&mut [u8]>) -> NeoResult<usize> {
        self.with_entry(device, |entry| {
            let name = entry.driver().product_name();
            Ok(self.write_text(&name, out, Some(entry.serial())))
        })
    }

    pub fn product_name(&self, device: &DeviceHandle) -> NeoResult<String> {
        self.with_entry(device, |entry| Ok(entry.driver().product_name()))
    }

    /// Generic product name of a device family.
    pub fn get_product_name_for_type(&self, device_type: DeviceType, out: Option<&mut [u8]>) -> usize {
        self.write_text(device_type.product_name(), out, None)
    }

    /// `"<product name> <serial>"`, written like [`NeoApi::get_product_name`].
    pub fn describe_device(&self, device: &DeviceHandle, out: Option<&mut [u8]>) -> NeoResult<usize> {
        self.with_entry(device, |entry| {
            let description = format!("{} {}", entry.driver().product_name(), entry.serial());
            Ok(self.write_text(&description, out, Some(entry.serial())))
        })
    }

    pub fn describe(&self, device: &DeviceHandle) -> NeoResult<String> {
        self.with_entry(device, |entry| Ok(format!("{} {}", entry.driver().product_name(), entry.serial())))
    }

    #[inline]
    pub fn get_version() -> Version {
        Version::current()
    }

    pub fn get_supported_devices(&self) -> Vec<DeviceType> {
        self.finder.supported_devices()
    }
}
