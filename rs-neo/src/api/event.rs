use super::NeoApi;
use crate::{CallbackId, DeviceHandle, Event, EventFilter, EventType, NeoError, NeoResult};

impl NeoApi {
    /// Register a callback invoked for every event, errors included.
    pub fn add_event_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.add_callback(callback)
    }

    pub fn remove_event_callback(&self, id: CallbackId) -> bool {
        self.events.remove_callback(id)
    }

    /// Take at most `max` buffered events, oldest first.
    ///
    /// A `TooManyEvents` marker, if any, comes last.
    #[inline]
    pub fn get_events(&self, max: usize) -> Vec<Event> {
        self.events.events(EventFilter::Any, max)
    }

    #[inline]
    pub fn event_count(&self) -> usize {
        self.events.count(EventFilter::Any)
    }

    fn device_filter(&self, device: Option<&DeviceHandle>) -> NeoResult<EventFilter> {
        let result = match device {
            None => Ok(EventFilter::ApiOnly),
            Some(device) if self.is_valid_neo_device(device) => Ok(EventFilter::Device(device.serial())),
            Some(_) => Err(NeoError::Api(EventType::InvalidNeoDevice)),
        };

        self.guard(result)
    }

    /// Take at most `max` events raised by `device`, or the API level events for `None`.
    pub fn get_device_events(&self, device: Option<&DeviceHandle>, max: usize) -> NeoResult<Vec<Event>> {
        let filter = self.device_filter(device)?;
        Ok(self.events.events(filter, max))
    }

    pub fn device_event_count(&self, device: Option<&DeviceHandle>) -> NeoResult<usize> {
        let filter = self.device_filter(device)?;
        Ok(self.events.count(filter))
    }

    /// Take the last error raised on the calling thread.
    ///
    /// The slot is cleared by the read, a second call returns `None`.
    #[inline]
    pub fn get_last_error(&self) -> Option<Event> {
        self.events.last_error()
    }

    #[inline]
    pub fn discard_all_events(&self) {
        self.events.discard(EventFilter::Any)
    }

    /// Drop the buffered events of `device`, or the API level events for `None`.
    pub fn discard_device_events(&self, device: Option<&DeviceHandle>) -> NeoResult<()> {
        let filter = self.device_filter(device)?;
        self.events.discard(filter);
        Ok(())
    }

    /// Change the event buffer capacity, it must be greater than 10.
    pub fn set_event_limit(&self, limit: usize) -> NeoResult<()> {
        self.guard(self.events.set_event_limit(limit))
    }

    #[inline]
    pub fn get_event_limit(&self) -> usize {
        self.events.event_limit()
    }
}
