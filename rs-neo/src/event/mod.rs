mod kind;
pub use kind::*;
mod queue;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use derive_getters::Getters;

use crate::callback::{CallbackId, CallbackRegistry};
use crate::utils::{lock, system_timestamp};
use crate::{NeoError, NeoResult, Serial};
use self::queue::EventQueue;

/// A diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Event {
    #[getter(copy)]
    event_type: EventType,
    #[getter(copy)]
    severity: Severity,
    #[getter(copy)]
    serial: Option<Serial>,
    /// Unix time in nanoseconds.
    #[getter(copy)]
    timestamp: u64,
    #[getter(copy)]
    number: u64,
}

impl Event {
    pub fn new(event_type: EventType, severity: Severity, serial: Option<Serial>, number: u64) -> Self {
        Self {
            event_type,
            severity,
            serial,
            timestamp: system_timestamp(),
            number,
        }
    }

    #[inline]
    pub fn description(&self) -> &'static str {
        self.event_type.description()
    }

    /// Unix time in seconds.
    #[inline]
    pub fn timestamp_secs(&self) -> u64 {
        self.timestamp / 1_000_000_000
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.serial {
            Some(serial) => write!(f, "{} {}: {}", serial, self.severity, self.event_type),
            None => write!(f, "API {}: {}", self.severity, self.event_type),
        }
    }
}

/// Selects which events a query applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event.
    Any,
    /// Events that are not associated with a device.
    ApiOnly,
    /// Events of a single device.
    Device(Serial),
}

impl EventFilter {
    #[inline]
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Any => true,
            Self::ApiOnly => event.serial.is_none(),
            Self::Device(serial) => event.serial.as_ref() == Some(serial),
        }
    }
}

impl From<Option<Serial>> for EventFilter {
    #[inline]
    fn from(value: Option<Serial>) -> Self {
        match value {
            Some(serial) => Self::Device(serial),
            None => Self::ApiOnly,
        }
    }
}

static NEXT_MANAGER_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// The most recent error of each manager, for the current thread only.
    static ERROR_SLOTS: RefCell<HashMap<usize, Event>> = RefCell::new(HashMap::new());
    /// Managers whose errors are recorded as warnings on the current thread.
    static DOWNGRADED: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Collects every event raised by the API and its devices.
///
/// Informational events and warnings are buffered in a bounded queue shared by
/// all threads. Errors are kept apart: each thread only sees its own most recent
/// error through [`EventManager::last_error`].
pub struct EventManager {
    id: usize,
    queue: Mutex<EventQueue>,
    callbacks: CallbackRegistry<Event>,
    counter: AtomicU64,
}

impl Default for EventManager {
    fn default() -> Self {
        Self {
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            queue: Default::default(),
            callbacks: CallbackRegistry::new("event callbacks"),
            counter: Default::default(),
        }
    }
}

impl EventManager {
    pub fn with_limit(limit: usize) -> NeoResult<Self> {
        let manager = Self::default();
        manager.set_event_limit(limit)?;
        Ok(manager)
    }

    #[inline]
    fn next_number(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    fn too_many_events(&self) -> Event {
        Event::new(EventType::TooManyEvents, Severity::Warning, None, self.next_number())
    }

    /// Record an event and hand it to every event callback.
    pub fn add(&self, event_type: EventType, severity: Severity, serial: Option<Serial>) -> Event {
        let severity = if severity == Severity::Error && self.is_downgrading_current_thread() {
            Severity::Warning
        }
        else {
            severity
        };

        let event = Event::new(event_type, severity, serial, self.next_number());
        match severity {
            Severity::Error => {
                log::warn!("RUST-NEO - {}", event);
                ERROR_SLOTS.with(|slots| slots.borrow_mut().insert(self.id, event.clone()));
            },
            _ => {
                if severity == Severity::Warning {
                    log::warn!("RUST-NEO - {}", event);
                }
                else {
                    log::debug!("RUST-NEO - {}", event);
                }

                let evicted = lock(&self.queue, "event queue")
                    .push(event.clone(), || self.too_many_events());
                if evicted > 0 {
                    log::trace!("RUST-NEO - {} event(s) evicted", evicted);
                }
            },
        }

        self.callbacks.dispatch(&event);
        event
    }

    /// Record the failure of an API call.
    #[inline]
    pub fn add_error(&self, error: &NeoError) -> Event {
        self.add(error.event_type(), Severity::Error, error.serial())
    }

    /// Take the most recent error of the calling thread.
    pub fn last_error(&self) -> Option<Event> {
        ERROR_SLOTS.with(|slots| slots.borrow_mut().remove(&self.id))
    }

    /// Drain at most `max` events selected by `filter`, oldest first.
    ///
    /// The `TooManyEvents` marker is not associated with a device and always comes last.
    pub fn events(&self, filter: EventFilter, max: usize) -> Vec<Event> {
        lock(&self.queue, "event queue").take(&filter, max)
    }

    /// Number of buffered events selected by `filter`.
    pub fn count(&self, filter: EventFilter) -> usize {
        lock(&self.queue, "event queue").count(&filter)
    }

    /// Drop the buffered events selected by `filter`, the error slots are left as they are.
    pub fn discard(&self, filter: EventFilter) {
        let count = lock(&self.queue, "event queue").discard(&filter);
        log::trace!("RUST-NEO - {} event(s) discarded", count);
    }

    #[inline]
    pub fn event_limit(&self) -> usize {
        lock(&self.queue, "event queue").limit()
    }

    /// Change the event limit, it must be greater than 10.
    pub fn set_event_limit(&self, limit: usize) -> NeoResult<()> {
        let evicted = lock(&self.queue, "event queue")
            .set_limit(limit, || self.too_many_events())?;
        if evicted > 0 {
            log::warn!("RUST-NEO - {} event(s) evicted by the new event limit {}", evicted, limit);
        }

        Ok(())
    }

    /// Record errors raised on the calling thread as warnings.
    ///
    /// Used by threads owned by the library, whose error slot nobody reads.
    pub fn downgrade_errors_on_current_thread(&self) {
        DOWNGRADED.with(|set| set.borrow_mut().insert(self.id));
    }

    pub fn cancel_error_downgrading_on_current_thread(&self) {
        DOWNGRADED.with(|set| set.borrow_mut().remove(&self.id));
    }

    #[inline]
    pub fn is_downgrading_current_thread(&self) -> bool {
        DOWNGRADED.with(|set| set.borrow().contains(&self.id))
    }

    pub fn add_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.callbacks.add(callback)
    }

    #[inline]
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        self.callbacks.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use super::{EventFilter, EventManager, EventType, Severity};
    use crate::{NeoError, Serial};

    #[test]
    fn errors_are_thread_local() -> anyhow::Result<()> {
        let manager = Arc::new(EventManager::default());
        manager.add_error(&NeoError::Api(EventType::InvalidNeoDevice));

        let other = Arc::clone(&manager);
        let seen = thread::spawn(move || other.last_error())
            .join()
            .map_err(|_| anyhow::anyhow!("thread panicked"))?;
        assert!(seen.is_none());

        let error = manager.last_error().ok_or(anyhow::anyhow!("no error recorded"))?;
        assert_eq!(error.event_type(), EventType::InvalidNeoDevice);
        assert_eq!(error.severity(), Severity::Error);
        assert!(manager.last_error().is_none());

        // errors never reach the queue
        assert_eq!(manager.count(EventFilter::Any), 0);
        Ok(())
    }

    #[test]
    fn latest_error_wins() {
        let manager = EventManager::default();
        manager.add(EventType::ParameterOutOfRange, Severity::Error, None);
        manager.add(EventType::DeviceCurrentlyClosed, Severity::Error, None);

        assert_eq!(manager.last_error().map(|e| e.event_type()), Some(EventType::DeviceCurrentlyClosed));
        assert!(manager.last_error().is_none());
    }

    #[test]
    fn downgrade() -> anyhow::Result<()> {
        let manager = EventManager::default();
        let serial: Serial = "CY2285".parse()?;

        manager.downgrade_errors_on_current_thread();
        manager.add(EventType::FailedToRead, Severity::Error, Some(serial));
        manager.cancel_error_downgrading_on_current_thread();

        assert!(manager.last_error().is_none());
        let events = manager.events(EventFilter::Device(serial), usize::MAX);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity(), Severity::Warning);
        Ok(())
    }

    #[test]
    fn limit() -> anyhow::Result<()> {
        let manager = EventManager::with_limit(100)?;
        (0..60).for_each(|_| { manager.add(EventType::OutputTruncated, Severity::Warning, None); });

        manager.set_event_limit(30)?;
        let events = manager.events(EventFilter::Any, usize::MAX);
        assert_eq!(events.len(), 30);
        assert_eq!(events[0].number(), 31);
        assert_eq!(events.last().map(|e| e.event_type()), Some(EventType::TooManyEvents));

        assert!(manager.set_event_limit(10).is_err());
        assert_eq!(manager.event_limit(), 30);
        Ok(())
    }

    #[test]
    fn callbacks_see_every_severity() {
        let manager = EventManager::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        let id = manager.add_callback(move |e| s.lock().unwrap().push(e.severity()));
        manager.add(EventType::OutputTruncated, Severity::Warning, None);
        manager.add(EventType::InvalidNeoDevice, Severity::Error, None);
        assert!(manager.remove_callback(id));
        manager.add(EventType::OutputTruncated, Severity::Info, None);

        assert_eq!(*seen.lock().unwrap(), vec![Severity::Warning, Severity::Error]);
    }

    #[test]
    fn device_filter() -> anyhow::Result<()> {
        let manager = EventManager::default();
        let serial: Serial = "RS2259".parse()?;
        manager.add(EventType::PollingMessageOverflow, Severity::Warning, Some(serial));
        manager.add(EventType::OutputTruncated, Severity::Warning, None);

        assert_eq!(manager.count(EventFilter::from(None)), 1);
        manager.discard(EventFilter::Device(serial));
        assert_eq!(manager.count(EventFilter::Any), 1);
        assert_eq!(manager.events(EventFilter::ApiOnly, 10).len(), 1);
        Ok(())
    }
}
