//! # Keyed Broadcast Store
//!
//! An observable map from key to value. Any number of readers subscribe to the same key and
//! see the same value, without sharing a parent container or passing state around. Each key
//! is backed by a [`tokio::sync::watch`] slot, so readers can hold a receiver and poll it
//! without a round trip to the owner.
//!
//! The store is owned by exactly one task (the [`MutationTracker`](crate::MutationTracker)), so
//! writes are serialized by construction.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::watch;

/// Observable key-value store with per-key subscription.
///
/// An absent key reads as `V::default()`.
#[derive(Debug)]
pub struct KeyedStore<K, V> {
    slots: HashMap<K, watch::Sender<V>>,
}

impl<K, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Default + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `key`.
    pub fn get(&self, key: &K) -> V {
        self.slots
            .get(key)
            .map(|slot| slot.borrow().clone())
            .unwrap_or_default()
    }

    /// Writes `value` and wakes subscribers of `key` if it changed.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&mut self, key: K, value: V) -> bool {
        match self.slots.get(&key) {
            Some(slot) => slot.send_if_modified(|current| {
                if *current == value {
                    false
                } else {
                    *current = value;
                    true
                }
            }),
            None => {
                let changed = value != V::default();
                let (slot, _) = watch::channel(value);
                self.slots.insert(key, slot);
                changed
            }
        }
    }

    /// Subscribes to `key`, creating the slot if needed.
    pub fn subscribe(&mut self, key: K) -> watch::Receiver<V> {
        self.slots
            .entry(key)
            .or_insert_with(|| watch::channel(V::default()).0)
            .subscribe()
    }

    /// Every key holding a non-default value.
    pub fn entries(&self) -> Vec<(K, V)> {
        let idle = V::default();
        self.slots
            .iter()
            .filter_map(|(key, slot)| {
                let value = slot.borrow().clone();
                (value != idle).then(|| (key.clone(), value))
            })
            .collect()
    }

    /// Keys of every slot, subscribed or not.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.slots.keys()
    }

    /// Drops slots that hold the default value and have no subscribers.
    ///
    /// Returns the number of slots removed.
    pub fn retain_idle(&mut self) -> usize {
        let before = self.slots.len();
        let idle = V::default();
        self.slots
            .retain(|_, slot| slot.receiver_count() > 0 || *slot.borrow() != idle);
        before - self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_default() {
        let store: KeyedStore<&str, u32> = KeyedStore::new();
        assert_eq!(store.get(&"missing"), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn subscribers_of_one_key_share_a_value() {
        let mut store: KeyedStore<&str, u32> = KeyedStore::new();
        let first = store.subscribe("widget");
        let second = store.subscribe("widget");
        let other = store.subscribe("gadget");

        assert!(store.set("widget", 7));

        assert_eq!(*first.borrow(), 7);
        assert_eq!(*second.borrow(), 7);
        assert_eq!(*other.borrow(), 0);
        assert!(first.has_changed().unwrap());
        assert!(!other.has_changed().unwrap());
    }

    #[test]
    fn identical_write_does_not_notify() {
        let mut store: KeyedStore<&str, u32> = KeyedStore::new();
        store.set("widget", 3);
        let mut rx = store.subscribe("widget");
        rx.borrow_and_update();

        assert!(!store.set("widget", 3));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn entries_skip_default_values() {
        let mut store: KeyedStore<&str, u32> = KeyedStore::new();
        store.set("a", 1);
        store.set("b", 0);
        let _rx = store.subscribe("c");

        assert_eq!(store.entries(), vec![("a", 1)]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn retain_idle_keeps_subscribed_and_busy_slots() {
        let mut store: KeyedStore<&str, u32> = KeyedStore::new();
        store.set("busy", 1);
        store.set("idle", 0);
        let watched = store.subscribe("watched");

        assert_eq!(store.retain_idle(), 1);
        assert_eq!(store.len(), 2);

        drop(watched);
        assert_eq!(store.retain_idle(), 1);
        assert_eq!(store.keys().collect::<Vec<_>>(), vec![&"busy"]);
    }
}
