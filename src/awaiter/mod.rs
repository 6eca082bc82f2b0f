//! Single-flight coalescing for identical in-flight requests
//!
//! A [`TaskAwaiter`] maps request descriptors to one-shot result slots. The
//! first arrival for a key becomes the owner and does the work; everyone else
//! gets a handle to wait on. Resolving a slot removes its key from the map
//! *before* waking the waiters, so the map only ever holds pending work and a
//! later identical request starts fresh (or, far more commonly, finds the
//! result already on disk).


use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ImageFetchError;
use crate::request::ImageRequest;

use parking_lot::{Condvar, Mutex};

enum State<V> {
    Pending,
    Fulfilled(V),
    Failed(ImageFetchError),
}

/// A one-shot result cell
///
/// Transitions exactly once, from pending to either an outcome or a failure,
/// and every waiter observes that same resolution.
pub struct Slot<V> {
    state: Mutex<State<V>>,
    resolved: Condvar,
}

impl<V: Clone> Slot<V> {
    pub(crate) fn pending() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::Pending),
            resolved: Condvar::new(),
        })
    }

    /// A slot born resolved, for results that were already at hand
    pub(crate) fn ready(outcome: Result<V, ImageFetchError>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(match outcome {
                Ok(value) => State::Fulfilled(value),
                Err(err) => State::Failed(err),
            }),
            resolved: Condvar::new(),
        })
    }

    /// Block until the slot resolves and return the shared outcome
    pub fn wait(&self) -> Result<V, ImageFetchError> {
        let mut state = self.state.lock();
        while matches!(*state, State::Pending) {
            self.resolved.wait(&mut state);
        }
        match &*state {
            State::Fulfilled(value) => Ok(value.clone()),
            State::Failed(err) => Err(err.clone()),
            State::Pending => unreachable!("waited out of the pending state"),
        }
    }

    /// The outcome, if the slot has resolved
    pub fn value(&self) -> Option<Result<V, ImageFetchError>> {
        match &*self.state.lock() {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Failed(err) => Some(Err(err.clone())),
        }
    }

    pub(crate) fn resolve(&self, outcome: Result<V, ImageFetchError>) {
        let mut state = self.state.lock();
        // Resolution is one-way and final
        if !matches!(*state, State::Pending) {
            return;
        }
        *state = match outcome {
            Ok(value) => State::Fulfilled(value),
            Err(err) => State::Failed(err),
        };
        drop(state);
        self.resolved.notify_all();
    }
}

/// What `claim` hands back: either the right to produce the value, or a slot
/// someone else is already filling
pub enum Claim<'map, V: Clone> {
    Owner(SlotOwner<'map, V>),
    Waiter(Arc<Slot<V>>),
}

/// The resolution rights for one pending slot
///
/// Consumed by [`fulfill`](Self::fulfill) or [`fail`](Self::fail). If the
/// owner is dropped without resolving (the producing task panicked), the slot
/// fails so waiters never hang.
pub struct SlotOwner<'map, V: Clone> {
    awaiter: &'map TaskAwaiter<V>,
    key: ImageRequest,
    slot: Arc<Slot<V>>,
    resolved: bool,
}

impl<V: Clone> SlotOwner<'_, V> {
    pub fn fulfill(mut self, value: V) {
        self.finish(Ok(value));
    }

    pub fn fail(mut self, err: ImageFetchError) {
        self.finish(Err(err));
    }

    fn finish(&mut self, outcome: Result<V, ImageFetchError>) {
        self.resolved = true;
        // Remove before waking: nobody may coalesce onto a resolved slot
        self.awaiter.map.lock().remove(&self.key);
        self.slot.resolve(outcome);
    }
}

impl<V: Clone> Drop for SlotOwner<'_, V> {
    fn drop(&mut self) {
        if !self.resolved {
            self.finish(Err(ImageFetchError::Abandoned));
        }
    }
}

/// Thread-safe map from request to in-flight result slot
///
/// The lock only guards map insert/remove; producing work and waiting both
/// happen outside it.
pub struct TaskAwaiter<V> {
    map: Mutex<HashMap<ImageRequest, Arc<Slot<V>>>>,
}

impl<V> Default for TaskAwaiter<V> {
    fn default() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> TaskAwaiter<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically look up or insert the pending slot for `key`
    pub fn claim(&self, key: &ImageRequest) -> Claim<'_, V> {
        let mut map = self.map.lock();
        if let Some(slot) = map.get(key) {
            return Claim::Waiter(Arc::clone(slot));
        }
        let slot = Slot::pending();
        map.insert(key.clone(), Arc::clone(&slot));
        Claim::Owner(SlotOwner {
            awaiter: self,
            key: key.clone(),
            slot,
            resolved: false,
        })
    }

    /// Number of keys currently in flight
    pub fn in_flight(&self) -> usize {
        self.map.lock().len()
    }
}
