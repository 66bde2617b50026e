use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use crate::utils::lock;

/// Identifier returned when a callback is registered.
pub type CallbackId = i32;

pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

enum Change<T> {
    Add(CallbackId, Callback<T>),
    Remove(CallbackId),
}

struct RegistryState<T> {
    entries: Vec<(CallbackId, Callback<T>)>,
    pending: Vec<Change<T>>,
    dispatcher: Option<ThreadId>,
    deferred: VecDeque<T>,
    next_id: CallbackId,
}

impl<T> RegistryState<T> {
    fn apply_pending(&mut self) {
        for change in std::mem::take(&mut self.pending) {
            match change {
                Change::Add(id, cb) => self.entries.push((id, cb)),
                Change::Remove(id) => self.entries.retain(|(v, _)| *v != id),
            }
        }
    }

    fn is_live(&self, id: CallbackId) -> bool {
        let mut live = self.entries.iter().any(|(v, _)| *v == id);
        for change in &self.pending {
            match change {
                Change::Add(v, _) if *v == id => live = true,
                Change::Remove(v) if *v == id => live = false,
                _ => {},
            }
        }
        live
    }

    /// Next free id, ids still registered are skipped once the counter wraps.
    fn allocate_id(&mut self) -> CallbackId {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.checked_add(1).unwrap_or(0);
            if !self.is_live(id) {
                return id;
            }
        }
    }
}

/// An ordered set of callbacks invoked synchronously on the producing thread.
///
/// Dispatches are serialized. Registering or removing a callback while a
/// dispatch is running is queued and applied once the dispatch finishes; a
/// dispatch started from inside a callback is deferred until the running
/// one completes, so callbacks may freely call back into the registry.
pub struct CallbackRegistry<T> {
    name: &'static str,
    state: Mutex<RegistryState<T>>,
    dispatch_lock: Mutex<()>,
}

impl<T: Clone> CallbackRegistry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(RegistryState {
                entries: Vec::new(),
                pending: Vec::new(),
                dispatcher: None,
                deferred: VecDeque::new(),
                next_id: 0,
            }),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Register a callback, ids are assigned in increasing order.
    pub fn add<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut state = lock(&self.state, self.name);
        let id = state.allocate_id();

        let callback: Callback<T> = Arc::new(callback);
        if state.dispatcher.is_some() {
            log::trace!("RUST-NEO - {} callback {} queued while dispatching", self.name, id);
            state.pending.push(Change::Add(id, callback));
        }
        else {
            state.entries.push((id, callback));
        }

        id
    }

    /// Remove a callback, returns whether it was registered.
    pub fn remove(&self, id: CallbackId) -> bool {
        let mut state = lock(&self.state, self.name);
        if !state.is_live(id) {
            return false;
        }

        if state.dispatcher.is_some() {
            log::trace!("RUST-NEO - {} callback {} removal queued while dispatching", self.name, id);
            state.pending.push(Change::Remove(id));
        }
        else {
            state.entries.retain(|(v, _)| *v != id);
        }

        true
    }

    /// Number of registered callbacks, queued changes included.
    pub fn len(&self) -> usize {
        let state = lock(&self.state, self.name);
        let mut ids: Vec<CallbackId> = state.entries.iter().map(|(id, _)| *id).collect();
        for change in &state.pending {
            match change {
                Change::Add(id, _) => ids.push(*id),
                Change::Remove(id) => ids.retain(|v| v != id),
            }
        }
        ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every callback with `item`, in registration order.
    pub fn dispatch(&self, item: &T) {
        let current = thread::current().id();
        {
            let mut state = lock(&self.state, self.name);
            if state.dispatcher == Some(current) {
                state.deferred.push_back(item.clone());
                return;
            }
            if state.entries.is_empty() && state.pending.is_empty() {
                return;
            }
        }

        let _serial = lock(&self.dispatch_lock, self.name);
        let _guard = DispatchGuard::enter(self, current);

        let mut next = Some(item.clone());
        while let Some(item) = next {
            let callbacks: Vec<Callback<T>> = lock(&self.state, self.name)
                .entries
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect();

            callbacks.iter()
                .for_each(|cb| cb(&item));

            let mut state = lock(&self.state, self.name);
            state.apply_pending();
            next = state.deferred.pop_front();
        }
    }
}

struct DispatchGuard<'a, T: Clone> {
    registry: &'a CallbackRegistry<T>,
}

impl<'a, T: Clone> DispatchGuard<'a, T> {
    fn enter(registry: &'a CallbackRegistry<T>, current: ThreadId) -> Self {
        lock(&registry.state, registry.name).dispatcher = Some(current);
        Self { registry }
    }
}

impl<T: Clone> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = lock(&self.registry.state, self.registry.name);
        state.apply_pending();
        state.deferred.clear();
        state.dispatcher = None;
    }
}
