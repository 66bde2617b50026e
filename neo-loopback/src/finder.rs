use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use rs_neo::{DeviceDriver, DeviceFinder, DeviceType, NeoResult, Serial};

use crate::device::{Injector, LoopbackDevice, LoopbackUnit};
use crate::LoopbackConfig;

/// Discovers the simulated devices of a [`LoopbackConfig`].
///
/// Clones share the simulated devices.
#[derive(Clone)]
pub struct LoopbackFinder {
    units: Vec<Arc<LoopbackUnit>>,
    /// Devices currently unplugged.
    absent: Arc<Mutex<HashSet<Serial>>>,
}

impl LoopbackFinder {
    pub fn new(config: LoopbackConfig) -> Self {
        let units = config.devices.into_iter()
            .map(|c| Arc::new(LoopbackUnit::new(c)))
            .collect();

        Self { units, absent: Default::default() }
    }

    /// Simulate the devices listed by [`LoopbackConfig::load`].
    pub fn load() -> NeoResult<Self> {
        Ok(Self::new(LoopbackConfig::load()?))
    }

    fn unit(&self, serial: Serial) -> Option<&Arc<LoopbackUnit>> {
        self.units.iter().find(|u| u.serial() == serial)
    }

    /// Feed traffic into the device `serial`.
    pub fn injector(&self, serial: Serial) -> Option<Injector> {
        self.unit(serial)
            .map(|unit| Injector::new(Arc::clone(unit)))
    }

    /// Plug the device in or out, unplugged devices are not discovered.
    pub fn set_present(&self, serial: Serial, present: bool) -> bool {
        if self.unit(serial).is_none() {
            return false;
        }

        let mut absent = self.absent.lock()
            .unwrap_or_else(|e| e.into_inner());
        match present {
            true => absent.remove(&serial),
            false => absent.insert(serial),
        };
        log::debug!("LOOPBACK - {} {}", serial, if present { "plugged in" } else { "unplugged" });
        true
    }
}

impl Default for LoopbackFinder {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

impl DeviceFinder for LoopbackFinder {
    fn find(&self) -> NeoResult<Vec<Box<dyn DeviceDriver>>> {
        let absent = self.absent.lock()
            .unwrap_or_else(|e| e.into_inner());

        Ok(self.units.iter()
            .filter(|u| !absent.contains(&u.serial()))
            .map(|u| Box::new(LoopbackDevice::new(Arc::clone(u))) as Box<dyn DeviceDriver>)
            .collect())
    }

    fn supported_devices(&self) -> Vec<DeviceType> {
        let mut types = Vec::new();
        for unit in &self.units {
            if !types.contains(&unit.config.device_type) {
                types.push(unit.config.device_type);
            }
        }
        types
    }
}
