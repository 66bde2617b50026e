use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::{EventType, Message, NeoError, NeoResult, Serial};

struct QueueState {
    messages: VecDeque<Message>,
    limit: usize,
    enabled: bool,
    overflowed: bool,
    closing: bool,
    waiters: usize,
}

impl QueueState {
    /// Drop the oldest messages above the limit, `true` when a new overflow episode starts.
    fn enforce_limit(&mut self) -> bool {
        let excess = self.messages.len().saturating_sub(self.limit);
        if excess == 0 {
            return false;
        }

        self.messages.drain(..excess);
        !std::mem::replace(&mut self.overflowed, true)
    }
}

/// The bounded polling buffer of one device.
///
/// Filled by the device I/O thread and drained by client threads. Once full the
/// oldest message is dropped on every insert; the first drop of an overflow
/// episode is reported to the caller so exactly one overflow event is raised
/// until a drain makes room again.
pub struct MessageQueue {
    serial: Serial,
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl MessageQueue {
    pub fn new(serial: Serial, limit: usize) -> Self {
        Self {
            serial,
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                limit,
                enabled: false,
                overflowed: false,
                closing: false,
                waiters: 0,
            }),
            ready: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
            .unwrap_or_else(|e| {
                log::warn!("RUST-NEO - message queue of {} is poisoned", self.serial);
                e.into_inner()
            })
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Start or stop buffering, stopping drops every queued message.
    ///
    /// Returns the previous setting.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let mut state = self.state();
        let previous = std::mem::replace(&mut state.enabled, enabled);
        if !enabled {
            state.messages.clear();
            state.overflowed = false;
        }

        previous
    }

    /// Append a message, returns `true` when this insert started an overflow episode.
    pub fn enqueue(&self, message: Message) -> bool {
        let mut state = self.state();
        if !state.enabled || state.closing {
            return false;
        }

        state.messages.push_back(message);
        let overflow = state.enforce_limit();
        drop(state);

        self.ready.notify_all();
        overflow
    }

    /// Take at most `max` messages in arrival order.
    ///
    /// With a zero `timeout` this never blocks, otherwise it waits until at least one
    /// message is queued or the timeout elapses. A device being closed interrupts the
    /// wait with `DeviceCurrentlyClosed`.
    pub fn drain(&self, max: usize, timeout: Duration) -> NeoResult<Vec<Message>> {
        let mut state = self.state();
        if state.closing {
            return Err(NeoError::device(EventType::DeviceCurrentlyClosed, self.serial));
        }

        if !timeout.is_zero() && state.messages.is_empty() {
            state.waiters += 1;
            state = match self.ready.wait_timeout_while(state, timeout, |s| s.messages.is_empty() && !s.closing) {
                Ok((guard, _)) => guard,
                Err(e) => {
                    log::warn!("RUST-NEO - message queue of {} is poisoned while waiting", self.serial);
                    e.into_inner().0
                }
            };
            state.waiters -= 1;

            if state.closing {
                drop(state);
                self.ready.notify_all();
                return Err(NeoError::device(EventType::DeviceCurrentlyClosed, self.serial));
            }
        }

        let count = max.min(state.messages.len());
        if count > 0 {
            state.overflowed = false;
        }

        Ok(state.messages.drain(..count).collect())
    }

    /// Instantaneous number of queued messages.
    #[inline]
    pub fn count(&self) -> usize {
        self.state().messages.len()
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.state().limit
    }

    /// Change the capacity, evicting the oldest messages when shrinking below the depth.
    ///
    /// Returns `true` when the eviction started an overflow episode.
    pub fn set_limit(&self, limit: usize) -> NeoResult<bool> {
        if limit == 0 {
            return Err(NeoError::device(EventType::ParameterOutOfRange, self.serial));
        }

        let mut state = self.state();
        state.limit = limit;
        Ok(state.enforce_limit())
    }

    /// Refuse new messages, wake every blocked drain and wait for them to leave.
    pub fn close(&self) {
        let mut state = self.state();
        state.closing = true;
        state.messages.clear();
        self.ready.notify_all();

        if state.waiters > 0 {
            log::debug!("RUST-NEO - waiting for {} blocked drain(s) of {}", state.waiters, self.serial);
        }
        let _state = match self.ready.wait_while(state, |s| s.waiters > 0) {
            Ok(guard) => guard,
            Err(e) => {
                log::warn!("RUST-NEO - message queue of {} is poisoned while closing", self.serial);
                e.into_inner()
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};
    use super::MessageQueue;
    use crate::{EventType, Message, NetId, Serial};

    fn queue(limit: usize) -> anyhow::Result<MessageQueue> {
        let queue = MessageQueue::new("CY2285".parse::<Serial>()?, limit);
        queue.set_enabled(true);
        Ok(queue)
    }

    fn can(id: u32) -> Message {
        Message::can(NetId::HSCAN, id, &[id as u8])
    }

    #[test]
    fn fifo_and_partial_drain() -> anyhow::Result<()> {
        let queue = queue(100)?;
        for id in 0..10 {
            assert!(!queue.enqueue(can(id)));
        }

        let first = queue.drain(4, Duration::ZERO)?;
        assert_eq!(first.iter().filter_map(|m| m.arbid()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(queue.count(), 6);

        let rest = queue.drain(100, Duration::ZERO)?;
        assert_eq!(rest.iter().filter_map(|m| m.arbid()).collect::<Vec<_>>(), vec![4, 5, 6, 7, 8, 9]);
        assert!(queue.drain(100, Duration::ZERO)?.is_empty());
        Ok(())
    }

    #[test]
    fn overflow_keeps_newest() -> anyhow::Result<()> {
        let queue = queue(5)?;
        let overflows = (0..12)
            .filter(|id| queue.enqueue(can(*id)))
            .count();
        assert_eq!(overflows, 1);

        let messages = queue.drain(100, Duration::ZERO)?;
        assert_eq!(messages.iter().filter_map(|m| m.arbid()).collect::<Vec<_>>(), vec![7, 8, 9, 10, 11]);

        // a drain ends the episode
        let overflows = (0..6)
            .filter(|id| queue.enqueue(can(*id)))
            .count();
        assert_eq!(overflows, 1);
        Ok(())
    }

    #[test]
    fn shrink_evicts_oldest() -> anyhow::Result<()> {
        let queue = queue(10)?;
        (0..8).for_each(|id| { queue.enqueue(can(id)); });

        assert!(queue.set_limit(3)?);
        assert_eq!(queue.count(), 3);
        assert_eq!(queue.drain(10, Duration::ZERO)?.first().and_then(|m| m.arbid()), Some(5));

        assert_eq!(queue.set_limit(0).map_err(|e| e.event_type()), Err(EventType::ParameterOutOfRange));
        assert_eq!(queue.limit(), 3);
        Ok(())
    }

    #[test]
    fn disabled_drops() -> anyhow::Result<()> {
        let queue = queue(10)?;
        queue.enqueue(can(1));
        queue.set_enabled(false);
        assert_eq!(queue.count(), 0);
        queue.enqueue(can(2));
        assert_eq!(queue.count(), 0);
        Ok(())
    }

    #[test]
    fn blocking_drain() -> anyhow::Result<()> {
        let queue = Arc::new(queue(10)?);

        let start = Instant::now();
        assert!(queue.drain(10, Duration::from_millis(50))?.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(50));

        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.enqueue(can(0x100));
        });

        let messages = queue.drain(10, Duration::from_secs(5))?;
        assert_eq!(messages.len(), 1);
        handle.join().map_err(|_| anyhow::anyhow!("producer panicked"))?;
        Ok(())
    }

    #[test]
    fn close_wakes_drain() -> anyhow::Result<()> {
        let queue = Arc::new(queue(10)?);

        let consumer = Arc::clone(&queue);
        let handle = thread::spawn(move || consumer.drain(10, Duration::from_secs(30)));

        thread::sleep(Duration::from_millis(20));
        queue.close();

        let result = handle.join().map_err(|_| anyhow::anyhow!("consumer panicked"))?;
        assert_eq!(result.map_err(|e| e.event_type()), Err(EventType::DeviceCurrentlyClosed));
        assert!(!queue.enqueue(can(1)));
        Ok(())
    }
}
