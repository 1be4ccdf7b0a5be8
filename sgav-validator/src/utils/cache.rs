//! Read-through cache with in-flight deduplication
//!
//! Concurrent callers asking for the same key share one load and all receive
//! its outcome, success or failure. Only successful loads are memoized; a
//! failed load leaves the key empty so the next caller tries again.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

type Outcome<V, E> = Option<Result<V, E>>;

enum Slot<V, E> {
    Ready(V),
    Loading(watch::Receiver<Outcome<V, E>>),
}

/// Process-lifetime memo table keyed by `K`
pub struct ReadThroughCache<K, V, E> {
    slots: Mutex<HashMap<K, Slot<V, E>>>,
}

impl<K, V, E> Default for ReadThroughCache<K, V, E> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V, E> ReadThroughCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized value or run `load` to produce it.
    ///
    /// While one caller is loading, others for the same key wait on it and
    /// receive its outcome. A loader dropped before finishing (its request
    /// timed out) hands the key to the next waiter.
    pub async fn get_or_try_load<F, Fut>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let tx = loop {
            let waiting = {
                let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                match slots.get(key) {
                    Some(Slot::Ready(value)) => return Ok(value.clone()),
                    Some(Slot::Loading(rx)) => rx.clone(),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        slots.insert(key.clone(), Slot::Loading(rx));
                        break tx;
                    }
                }
            };

            if let Some(outcome) = Self::wait_for_leader(waiting.clone()).await {
                return outcome;
            }
            self.forget_abandoned(key, &waiting);
        };

        let outcome = load().await;
        {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match &outcome {
                Ok(value) => {
                    slots.insert(key.clone(), Slot::Ready(value.clone()));
                }
                Err(_) => {
                    slots.remove(key);
                }
            }
        }
        // No receivers left is fine: every waiter already gave up
        let _ = tx.send(Some(outcome.clone()));
        outcome
    }

    /// Outcome published by the current loader, `None` if it was dropped first
    async fn wait_for_leader(mut rx: watch::Receiver<Outcome<V, E>>) -> Outcome<V, E> {
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => None,
        };
        outcome
    }

    /// Drop a `Loading` slot whose loader went away without an outcome
    fn forget_abandoned(&self, key: &K, rx: &watch::Receiver<Outcome<V, E>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(Slot::Loading(current)) = slots.get(key) {
            if current.same_channel(rx) {
                slots.remove(key);
            }
        }
    }

    /// Memoized value, if a load for `key` has completed successfully
    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(key) {
            Some(Slot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Number of memoized values
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
