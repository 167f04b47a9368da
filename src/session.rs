//! # Dialog Session Store
//!
//! A concurrency-safe map from recipient key to that recipient's live
//! session. Menus store [`crate::menu::Dialog`]s here, chains store their
//! current step, lists store the session language.
//!
//! ## Locking
//!
//! The map sits behind a single readers-writer lock whose critical sections
//! cover exactly one `get`, `set`, `delete` or read-only iteration. Nothing
//! holds the lock across a transport call.
//!
//! ## Known race
//!
//! A navigation step is read dialog → edit message → write dialog, and that
//! sequence is **not** atomic. Two near-simultaneous selections from the same
//! recipient can both read the same dialog, both edit the message, and the
//! last `set` wins, leaving the stored message handle out of step with what
//! the recipient sees. Callers that need stronger guarantees must serialize
//! events per recipient before handing them to the engine.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
pub struct SessionStore<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> Default for SessionStore<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> SessionStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        self.read().get(key).cloned()
    }

    /// Insert or replace the entry for `key`.
    pub fn set(&self, key: &str, value: V) {
        self.write().insert(key.to_string(), value);
    }

    /// Remove and return the entry for `key`.
    pub fn delete(&self, key: &str) -> Option<V> {
        self.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Recipient keys with a live entry, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    // Entries are plain data, so a writer that panicked mid-insert cannot
    // leave them half-built; recover the guard instead of propagating poison.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, V>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, V>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
