use std::sync::MutexGuard;

use super::{DeviceEntry, NeoApi};
use crate::settings::Settings;
use crate::utils::lock;
use crate::{DeviceDriver, DeviceHandle, EventType, NetId, NeoResult};

impl DeviceEntry {
    #[inline]
    pub(super) fn settings(&self) -> MutexGuard<'_, Settings> {
        lock(&self.settings, "device settings")
    }

    /// Run `f` with the driver and the settings copy of an open device.
    pub(super) fn with_settings<T>(&self, f: impl FnOnce(&mut dyn DeviceDriver, &mut Settings) -> NeoResult<T>) -> NeoResult<T> {
        self.ensure_open()?;
        let mut driver = self.driver();
        let mut settings = self.settings();
        f(&mut **driver, &mut settings)
    }
}

impl NeoApi {
    /// Discard the local settings copy and read it back from the device.
    pub fn settings_refresh(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.refresh(driver)))
    }

    /// Write the local settings copy to the device and persist it.
    pub fn settings_apply(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.apply(driver, true)))
    }

    /// Like [`NeoApi::settings_apply`], the device forgets the settings on power cycle.
    pub fn settings_apply_temporary(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.apply(driver, false)))
    }

    pub fn settings_apply_defaults(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.apply_defaults(driver, true)))
    }

    pub fn settings_apply_defaults_temporary(&self, device: &DeviceHandle) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.apply_defaults(driver, false)))
    }

    /// Copy the settings structure into `out`.
    ///
    /// Without a buffer only the structure length is returned. A buffer shorter than
    /// the structure receives its head and raises a `SettingsStructureTruncated` warning.
    pub fn settings_read_structure(&self, device: &DeviceHandle, out: Option<&mut [u8]>) -> NeoResult<usize> {
        self.with_entry(device, |entry| {
            entry.ensure_open()?;
            let (count, truncated) = entry.settings().read_structure(out)?;
            if truncated {
                self.warn(EventType::SettingsStructureTruncated, Some(entry.serial()));
            }
            Ok(count)
        })
    }

    /// Owned copy of the settings structure.
    pub fn settings_structure(&self, device: &DeviceHandle) -> NeoResult<Vec<u8>> {
        self.with_entry(device, |entry| {
            entry.ensure_open()?;
            entry.settings().structure()
        })
    }

    /// Replace the settings with `structure` and persist them.
    ///
    /// `structure` must have exactly the length of the device's structure.
    pub fn settings_apply_structure(&self, device: &DeviceHandle, structure: &[u8]) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.apply_structure(driver, structure, true)))
    }

    pub fn settings_apply_structure_temporary(&self, device: &DeviceHandle, structure: &[u8]) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| settings.apply_structure(driver, structure, false)))
    }

    /// Nominal bit rate of a CAN network in the settings copy, in bits per second.
    pub fn get_baudrate(&self, device: &DeviceHandle, netid: NetId) -> NeoResult<i64> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            settings.read(|data| driver.baudrate(data, netid))
        }))
    }

    /// Change the nominal bit rate in the settings copy, an apply sends it to the device.
    pub fn set_baudrate(&self, device: &DeviceHandle, netid: NetId, baudrate: i64) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            settings.modify(|data| driver.set_baudrate(data, netid, baudrate))
        }))
    }

    /// Data phase bit rate of a CAN FD network in the settings copy, in bits per second.
    pub fn get_fd_baudrate(&self, device: &DeviceHandle, netid: NetId) -> NeoResult<i64> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            settings.read(|data| driver.fd_baudrate(data, netid))
        }))
    }

    pub fn set_fd_baudrate(&self, device: &DeviceHandle, netid: NetId, baudrate: i64) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            settings.modify(|data| driver.set_fd_baudrate(data, netid, baudrate))
        }))
    }
}
