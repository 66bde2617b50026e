use crate::{DeviceHandle, DeviceType, Serial};

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena of devices.
///
/// A slot is reused once its device is removed, but with a bumped generation,
/// so stale handles never resolve to the new occupant.
pub(crate) struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: Vec::new() }
    }
}

impl<T> Registry<T> {
    pub(crate) fn insert(&mut self, device_type: DeviceType, serial: Serial, build: impl FnOnce(DeviceHandle) -> T) -> DeviceHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot { generation: 0, value: None });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let handle = DeviceHandle::new(index, slot.generation, device_type, serial);
        slot.value = Some(build(handle));
        handle
    }

    pub(crate) fn get(&self, handle: &DeviceHandle) -> Option<&T> {
        self.slots.get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub(crate) fn contains(&self, handle: &DeviceHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Remove a device, every copy of its handle becomes invalid.
    pub(crate) fn remove(&mut self, handle: &DeviceHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);

        Some(value)
    }

    /// Remove every device for which `keep` returns `false`, returns how many were removed.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.as_ref().is_some_and(|v| !keep(v)) {
                slot.value = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                removed += 1;
            }
        }

        removed
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
            .filter_map(|s| s.value.as_ref())
    }
}
