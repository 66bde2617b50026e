use crate::{DeviceDriver, EventType, NeoError, NeoResult, Serial};

/// In-memory copy of a device's settings structure.
///
/// The structure is opaque to the library, it is read from the device on open
/// and pushed back whole on every apply. Edits land in the pending copy, the
/// device keeps running with the applied one until the next apply.
pub(crate) struct Settings {
    serial: Serial,
    /// Pending copy, edited by the setters.
    data: Option<Vec<u8>>,
    /// Last structure read from or written to the device.
    active: Option<Vec<u8>>,
}

impl Settings {
    pub(crate) fn new(serial: Serial) -> Self {
        Self { serial, data: None, active: None }
    }

    #[inline]
    fn not_available(&self) -> NeoError {
        NeoError::device(EventType::SettingsNotAvailable, self.serial)
    }

    #[inline]
    pub(crate) fn is_available(&self) -> bool {
        self.data.is_some()
    }

    /// Read the structure back from the device.
    pub(crate) fn refresh(&mut self, driver: &dyn DeviceDriver) -> NeoResult<()> {
        match driver.read_settings() {
            Ok(data) => {
                log::debug!("RUST-NEO - {} settings refreshed, {} bytes", self.serial, data.len());
                self.active = Some(data.clone());
                self.data = Some(data);
                Ok(())
            },
            Err(e) => {
                self.data = None;
                self.active = None;
                Err(e)
            }
        }
    }

    /// Decode a value from the pending copy.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&[u8]) -> NeoResult<R>) -> NeoResult<R> {
        let data = self.data.as_deref().ok_or_else(|| self.not_available())?;
        f(data)
    }

    /// Decode a value from the structure the device runs with.
    pub(crate) fn read_active<R>(&self, f: impl FnOnce(&[u8]) -> NeoResult<R>) -> NeoResult<R> {
        let data = self.active.as_deref().ok_or_else(|| self.not_available())?;
        f(data)
    }

    /// Edit the pending copy, nothing reaches the device before an apply.
    pub(crate) fn modify(&mut self, f: impl FnOnce(&mut [u8]) -> NeoResult<()>) -> NeoResult<()> {
        let serial = self.serial;
        let data = self.data.as_deref_mut()
            .ok_or_else(|| NeoError::device(EventType::SettingsNotAvailable, serial))?;
        f(data)
    }

    /// Copy the structure into `out`, a `None` buffer only reports the structure length.
    ///
    /// Returns the number of bytes written and whether the copy was truncated.
    pub(crate) fn read_structure(&self, out: Option<&mut [u8]>) -> NeoResult<(usize, bool)> {
        let data = self.data.as_ref().ok_or_else(|| self.not_available())?;
        match out {
            None => Ok((data.len(), false)),
            Some(out) => {
                let count = out.len().min(data.len());
                out[..count].copy_from_slice(&data[..count]);
                Ok((count, count < data.len()))
            }
        }
    }

    #[inline]
    pub(crate) fn structure(&self) -> NeoResult<Vec<u8>> {
        self.data.clone().ok_or_else(|| self.not_available())
    }

    /// Push the in-memory copy to the device.
    pub(crate) fn apply(&mut self, driver: &mut dyn DeviceDriver, persist: bool) -> NeoResult<()> {
        let data = self.structure()?;
        self.push(driver, &data, persist)
    }

    /// Replace the in-memory copy by `structure` and push it.
    pub(crate) fn apply_structure(&mut self, driver: &mut dyn DeviceDriver, structure: &[u8], persist: bool) -> NeoResult<()> {
        let expected = self.data.as_ref().ok_or_else(|| self.not_available())?.len();
        if structure.len() != expected {
            log::warn!("RUST-NEO - {} settings structure of {} bytes, expected {}", self.serial, structure.len(), expected);
            return Err(NeoError::device(EventType::SettingsStructureMismatch, self.serial));
        }

        self.data = Some(structure.to_vec());
        self.push(driver, structure, persist)
    }

    /// Replace the in-memory copy by the family defaults and push it.
    pub(crate) fn apply_defaults(&mut self, driver: &mut dyn DeviceDriver, persist: bool) -> NeoResult<()> {
        if !self.is_available() {
            return Err(self.not_available());
        }

        let defaults = driver.default_settings()?;
        self.data = Some(defaults.clone());
        self.push(driver, &defaults, persist)
    }

    fn push(&mut self, driver: &mut dyn DeviceDriver, data: &[u8], persist: bool) -> NeoResult<()> {
        log::debug!("RUST-NEO - {} applying settings, persist: {}", self.serial, persist);
        match driver.write_settings(data, persist) {
            Ok(()) => {
                self.active = Some(data.to_vec());
                Ok(())
            },
            Err(e) => {
                log::warn!("RUST-NEO - {} settings apply failed: {}, refreshing", self.serial, e);
                if let Err(r) = self.refresh(driver) {
                    log::warn!("RUST-NEO - {} settings refresh failed: {}", self.serial, r);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::{DeviceDriver, DeviceType, EventType, Message, MessageSink, NeoError, NeoResult, NetId, Serial};

    struct Eeprom {
        serial: Serial,
        stored: Vec<u8>,
        temporary: Vec<u8>,
        fail_writes: bool,
    }

    impl DeviceDriver for Eeprom {
        fn device_type(&self) -> DeviceType { DeviceType::Fire2 }
        fn serial(&self) -> Serial { self.serial }
        fn open(&mut self, _sink: MessageSink) -> NeoResult<()> { Ok(()) }
        fn close(&mut self) -> NeoResult<()> { Ok(()) }
        fn go_online(&mut self) -> NeoResult<()> { Ok(()) }
        fn go_offline(&mut self) -> NeoResult<()> { Ok(()) }
        fn transmit(&mut self, _message: &Message) -> NeoResult<()> { Ok(()) }
        fn networks(&self) -> Vec<NetId> { vec![NetId::HSCAN] }
        fn timestamp_resolution(&self) -> u16 { 25 }

        fn read_settings(&self) -> NeoResult<Vec<u8>> {
            Ok(self.temporary.clone())
        }
        fn write_settings(&mut self, data: &[u8], persist: bool) -> NeoResult<()> {
            if self.fail_writes {
                return Err(NeoError::device(EventType::FailedToWrite, self.serial));
            }
            self.temporary = data.to_vec();
            if persist {
                self.stored = data.to_vec();
            }
            Ok(())
        }
        fn default_settings(&self) -> NeoResult<Vec<u8>> {
            Ok(vec![0u8; self.stored.len()])
        }
    }

    fn eeprom() -> anyhow::Result<Eeprom> {
        Ok(Eeprom {
            serial: "CY2285".parse()?,
            stored: vec![1, 2, 3, 4],
            temporary: vec![1, 2, 3, 4],
            fail_writes: false,
        })
    }

    #[test]
    fn read_structure() -> anyhow::Result<()> {
        let driver = eeprom()?;
        let mut settings = Settings::new(driver.serial);
        assert_eq!(settings.read_structure(None).map_err(|e| e.event_type()), Err(EventType::SettingsNotAvailable));

        settings.refresh(&driver)?;
        assert_eq!(settings.read_structure(None)?, (4, false));

        let mut short = [0u8; 2];
        assert_eq!(settings.read_structure(Some(&mut short))?, (2, true));
        assert_eq!(short, [1, 2]);
        Ok(())
    }

    #[test]
    fn apply() -> anyhow::Result<()> {
        let mut driver = eeprom()?;
        let mut settings = Settings::new(driver.serial);
        settings.refresh(&driver)?;

        settings.apply_structure(&mut driver, &[9, 9, 9, 9], false)?;
        assert_eq!(driver.temporary, vec![9, 9, 9, 9]);
        assert_eq!(driver.stored, vec![1, 2, 3, 4]);

        let mismatch = settings.apply_structure(&mut driver, &[9, 9], true);
        assert_eq!(mismatch.map_err(|e| e.event_type()), Err(EventType::SettingsStructureMismatch));

        settings.apply_defaults(&mut driver, true)?;
        assert_eq!(driver.stored, vec![0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn failed_apply_refreshes() -> anyhow::Result<()> {
        let mut driver = eeprom()?;
        let mut settings = Settings::new(driver.serial);
        settings.refresh(&driver)?;

        driver.fail_writes = true;
        assert!(settings.apply_structure(&mut driver, &[7, 7, 7, 7], true).is_err());
        // the in-memory copy matches the device again
        assert_eq!(settings.structure()?, vec![1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn pending_edits() -> anyhow::Result<()> {
        let mut driver = eeprom()?;
        let mut settings = Settings::new(driver.serial);
        assert_eq!(settings.modify(|_| Ok(())).map_err(|e| e.event_type()), Err(EventType::SettingsNotAvailable));
        settings.refresh(&driver)?;

        settings.modify(|data| {
            data[0] = 5;
            Ok(())
        })?;
        assert_eq!(settings.read(|data| Ok(data[0]))?, 5);
        assert_eq!(settings.read_active(|data| Ok(data[0]))?, 1);
        assert_eq!(driver.temporary, vec![1, 2, 3, 4]);

        settings.apply(&mut driver, false)?;
        assert_eq!(settings.read_active(|data| Ok(data[0]))?, 5);
        assert_eq!(driver.temporary, vec![5, 2, 3, 4]);

        // a refresh drops edits that were never applied
        settings.modify(|data| {
            data[1] = 6;
            Ok(())
        })?;
        settings.refresh(&driver)?;
        assert_eq!(settings.structure()?, vec![5, 2, 3, 4]);
        Ok(())
    }
}
