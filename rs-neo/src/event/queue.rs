use std::collections::VecDeque;

use crate::constants::{DEFAULT_EVENT_LIMIT, MIN_EVENT_LIMIT};
use crate::{EventType, NeoError, NeoResult};
use super::{Event, EventFilter};

/// Bounded FIFO of informational and warning events.
///
/// At most `limit - 1` regular events are held, the last slot belongs to the
/// `TooManyEvents` marker which is raised once events had to be dropped.
pub(crate) struct EventQueue {
    events: VecDeque<Event>,
    limit: usize,
    marker: Option<Event>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
            limit: DEFAULT_EVENT_LIMIT,
            marker: None,
        }
    }
}

impl EventQueue {
    #[inline]
    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    /// Change the limit, returns the number of evicted events.
    pub(crate) fn set_limit(&mut self, limit: usize, marker: impl FnOnce() -> Event) -> NeoResult<usize> {
        if limit <= MIN_EVENT_LIMIT {
            return Err(NeoError::Api(EventType::ParameterOutOfRange));
        }

        self.limit = limit;
        Ok(self.enforce_limit(marker))
    }

    /// Append an event, returns the number of evicted events.
    pub(crate) fn push(&mut self, event: Event, marker: impl FnOnce() -> Event) -> usize {
        self.events.push_back(event);
        self.enforce_limit(marker)
    }

    fn enforce_limit(&mut self, marker: impl FnOnce() -> Event) -> usize {
        let capacity = self.limit - 1;
        let excess = self.events.len().saturating_sub(capacity);
        if excess == 0 {
            return 0;
        }

        self.events.drain(..excess);
        if self.marker.is_none() {
            self.marker = Some(marker());
        }

        excess
    }

    fn marker_visible(filter: &EventFilter) -> bool {
        matches!(filter, EventFilter::Any | EventFilter::ApiOnly)
    }

    /// Number of events `filter` would return.
    pub(crate) fn count(&self, filter: &EventFilter) -> usize {
        let marker = usize::from(self.marker.is_some() && Self::marker_visible(filter));
        self.events.iter()
            .filter(|e| filter.matches(e))
            .count() + marker
    }

    /// Remove and return at most `max` matching events, oldest first.
    pub(crate) fn take(&mut self, filter: &EventFilter, max: usize) -> Vec<Event> {
        let mut result = Vec::new();
        let mut kept = VecDeque::with_capacity(self.events.len());
        for event in self.events.drain(..) {
            if result.len() < max && filter.matches(&event) {
                result.push(event);
            }
            else {
                kept.push_back(event);
            }
        }
        self.events = kept;

        if result.len() < max && Self::marker_visible(filter) {
            if let Some(marker) = self.marker.take() {
                result.push(marker);
            }
        }

        result
    }

    /// Drop every matching event, returns how many were dropped.
    pub(crate) fn discard(&mut self, filter: &EventFilter) -> usize {
        let before = self.events.len();
        self.events.retain(|e| !filter.matches(e));

        let mut count = before - self.events.len();
        if Self::marker_visible(filter) && self.marker.take().is_some() {
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::EventQueue;
    use crate::{Event, EventFilter, EventType, Serial, Severity};

    fn event(number: u64, serial: Option<Serial>) -> Event {
        Event::new(EventType::OutputTruncated, Severity::Warning, serial, number)
    }

    fn marker() -> Event {
        Event::new(EventType::TooManyEvents, Severity::Warning, None, u64::MAX)
    }

    #[test]
    fn marker_is_last() {
        let mut queue = EventQueue::default();
        queue.set_limit(11, marker).unwrap();

        let evicted: usize = (0..15).map(|n| queue.push(event(n, None), marker)).sum();
        assert_eq!(evicted, 5);
        assert_eq!(queue.count(&EventFilter::Any), 11);

        let events = queue.take(&EventFilter::Any, usize::MAX);
        assert_eq!(events.len(), 11);
        assert_eq!(events[0].number(), 5);
        assert_eq!(events[10].event_type(), EventType::TooManyEvents);
        assert_eq!(queue.count(&EventFilter::Any), 0);
    }

    #[test]
    fn shrink() {
        let mut queue = EventQueue::default();
        (0..50).for_each(|n| { queue.push(event(n, None), marker); });

        // 50 - (20 - 1) oldest are evicted
        assert_eq!(queue.set_limit(20, marker), Ok(31));
        let events = queue.take(&EventFilter::Any, usize::MAX);
        assert_eq!(events.len(), 20);
        assert_eq!(events.iter().filter(|e| e.event_type() == EventType::TooManyEvents).count(), 1);

        assert!(queue.set_limit(10, marker).is_err());
        assert_eq!(queue.limit(), 20);
    }

    #[test]
    fn filters() -> anyhow::Result<()> {
        let serial: Serial = "CY2285".parse()?;
        let other: Serial = "RS2259".parse()?;
        let mut queue = EventQueue::default();
        queue.push(event(0, None), marker);
        queue.push(event(1, Some(serial)), marker);
        queue.push(event(2, Some(other)), marker);
        queue.push(event(3, Some(serial)), marker);

        assert_eq!(queue.count(&EventFilter::Device(serial)), 2);
        assert_eq!(queue.count(&EventFilter::ApiOnly), 1);

        let events = queue.take(&EventFilter::Device(serial), 1);
        assert_eq!(events[0].number(), 1);
        assert_eq!(queue.discard(&EventFilter::Device(serial)), 1);
        assert_eq!(queue.count(&EventFilter::Any), 2);
        Ok(())
    }
}
