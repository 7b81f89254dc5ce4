//! Subscription registry.
//!
//! [`SubscriberList`] is the plain append-only list with the lazy topic
//! filter. [`SubscriptionRegistry`] wraps it in the single lock shared by
//! registration handlers (writers) and the dispatcher (reader).
//!
//! The lock is never held across an `.await`: readers take an owned
//! snapshot and deliver from that. A subscriber added while a round is in
//! flight may or may not be part of that round.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::subscriber::SubscriberRecord;

/// Append-only list of verified subscribers. Not synchronized.
#[derive(Debug, Default, Clone)]
pub struct SubscriberList {
    records: Vec<SubscriberRecord>,
}

impl SubscriberList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a verified record. Duplicates are kept.
    pub fn add(&mut self, record: SubscriberRecord) {
        self.records.push(record);
    }

    /// Records whose topic equals `topic` exactly, in insertion order.
    ///
    /// The iterator is lazy and `Clone`, so it can be restarted.
    pub fn matching_topic<'a>(
        &'a self,
        topic: &'a str,
    ) -> impl Iterator<Item = &'a SubscriberRecord> + Clone + 'a {
        self.records.iter().filter(move |r| r.topic == topic)
    }

    /// Number of records, across all topics.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The hub's subscriber list behind one mutex.
///
/// Owned explicitly and shared via `Arc` between the HTTP handlers and the
/// dispatcher.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<SubscriberList>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // The list is only ever appended to, so a guard recovered from a
    // poisoned lock still sees a consistent list.
    fn lock(&self) -> MutexGuard<'_, SubscriberList> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a verified record. Visible to every later `matching_topic`.
    pub fn add(&self, record: SubscriberRecord) {
        let mut list = self.lock();
        list.add(record);
        log::debug!("Registry now holds {} subscriber(s)", list.len());
    }

    /// Snapshot of the records bound to `topic`, in insertion order.
    pub fn matching_topic(&self, topic: &str) -> Vec<SubscriberRecord> {
        self.lock().matching_topic(topic).cloned().collect()
    }

    /// Runs `f` against the list while holding the lock.
    ///
    /// Use for reads that want the lazy iterator without cloning; `f` must
    /// not block.
    pub fn with_list<R>(&self, f: impl FnOnce(&SubscriberList) -> R) -> R {
        let list = self.lock();
        f(&list)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
