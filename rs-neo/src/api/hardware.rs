use super::{DeviceEntry, NeoApi};
use crate::settings::Settings;
use crate::{network_by_number, DeviceDriver, DeviceHandle, EventType, IoType, NeoResult, NetId, NetworkType};

impl DeviceEntry {
    /// The termination group `netid` belongs to.
    fn termination_group(&self, driver: &dyn DeviceDriver, netid: NetId) -> NeoResult<Vec<NetId>> {
        let groups = driver.termination_groups();
        if groups.is_empty() {
            return Err(self.error(EventType::TerminationNotSupportedDevice));
        }

        groups.into_iter()
            .find(|group| group.contains(&netid))
            .ok_or_else(|| self.error(EventType::TerminationNotSupportedNetwork))
    }

    /// Fails with `AnotherInTerminationGroupEnabled` when a sibling of `netid` is
    /// terminated in the settings copy.
    fn check_termination_group(&self, driver: &dyn DeviceDriver, settings: &Settings, netid: NetId) -> NeoResult<()> {
        for other in self.termination_group(driver, netid)? {
            if other != netid && settings.read(|data| driver.termination_enabled(data, other))? {
                log::debug!("RUST-NEO - {} termination already enabled on {}", self.serial(), other);
                return Err(self.error(EventType::AnotherInTerminationGroupEnabled));
            }
        }

        Ok(())
    }
}

impl NeoApi {
    /// The `number`-th (starting from 1) network of `r#type`, or `NetId::INVALID`.
    pub fn get_network_by_number(&self, device: &DeviceHandle, r#type: NetworkType, number: u32) -> NeoResult<NetId> {
        self.with_entry(device, |entry| {
            let networks = entry.driver().networks();
            Ok(network_by_number(&networks, r#type, number))
        })
    }

    /// Every network the device can use.
    pub fn get_networks(&self, device: &DeviceHandle) -> NeoResult<Vec<NetId>> {
        self.with_entry(device, |entry| Ok(entry.driver().networks()))
    }

    /// Timestamp resolution of the device, in nanoseconds.
    pub fn get_timestamp_resolution(&self, device: &DeviceHandle) -> NeoResult<u16> {
        self.with_entry(device, |entry| Ok(entry.driver().timestamp_resolution()))
    }

    pub fn get_digital_io(&self, device: &DeviceHandle, io: IoType, number: u32) -> NeoResult<bool> {
        self.with_entry(device, |entry| {
            entry.ensure_open()?;
            entry.driver().digital_io(io, number)
        })
    }

    pub fn set_digital_io(&self, device: &DeviceHandle, io: IoType, number: u32, value: bool) -> NeoResult<()> {
        self.with_entry(device, |entry| {
            entry.ensure_open()?;
            entry.driver().set_digital_io(io, number, value)
        })
    }

    /// Whether software selectable termination exists for `netid`.
    pub fn is_termination_supported_for(&self, device: &DeviceHandle, netid: NetId) -> bool {
        self.with_entry(device, |entry| {
            let driver = entry.driver();
            entry.termination_group(&**driver, netid).map(|_| true)
        })
        .unwrap_or_default()
    }

    /// Whether termination of `netid` could be switched on in the settings copy.
    ///
    /// Already terminated networks report `true`.
    pub fn can_termination_be_enabled_for(&self, device: &DeviceHandle, netid: NetId) -> bool {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            entry.check_termination_group(driver, settings, netid)?;
            Ok(true)
        }))
        .unwrap_or_default()
    }

    /// Whether the device currently terminates `netid`, pending edits are not reported.
    pub fn is_termination_enabled_for(&self, device: &DeviceHandle, netid: NetId) -> NeoResult<bool> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            entry.termination_group(driver, netid)?;
            settings.read_active(|data| driver.termination_enabled(data, netid))
        }))
    }

    /// Switch termination of `netid` in the settings copy, at most one network per
    /// group can be terminated. An apply sends the change to the device.
    pub fn set_termination_for(&self, device: &DeviceHandle, netid: NetId, enabled: bool) -> NeoResult<()> {
        self.with_entry(device, |entry| entry.with_settings(|driver, settings| {
            match enabled {
                true => entry.check_termination_group(driver, settings, netid)?,
                false => { entry.termination_group(driver, netid)?; },
            }

            settings.modify(|data| driver.set_termination(data, netid, enabled))?;
            log::debug!("RUST-NEO - {} termination of {} {}", entry.serial(), netid, if enabled { "enabled" } else { "disabled" });
            Ok(())
        }))
    }
}
