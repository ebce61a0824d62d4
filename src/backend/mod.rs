//! Storage backends for the key-value store.
//!
//! Every backend upholds one invariant: all store operations are mutually exclusive. Each call
//! behaves as if it ran alone, so the net effect of concurrent calls equals some sequential
//! interleaving of them. A single lock is the simplest way to get there, but sharded or
//! actor-based backends are equally valid as long as that holds.

mod arc;
mod memory;

pub use self::memory::InMemory;
use std::iter::FusedIterator;
use std::vec;

/// Operations the service performs against its store.
///
/// None of these operations can fail. The absence of a key is reported as a value rather than an
/// error.
pub trait KvBackend: Send + Sync {
    /// Obtain the value associated with `key`, if any.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Associate `value` with `key`, replacing any previous value.
    ///
    /// Returns `true` if the key was already present, meaning the write was an update.
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool;

    /// Remove `key` from the store.
    ///
    /// Returns `true` if the key existed before the call.
    fn delete(&self, key: &[u8]) -> bool;

    /// Capture every key beginning with `prefix`. An empty prefix matches all keys.
    ///
    /// The snapshot is taken atomically; writes made after this call returns are not reflected in
    /// it.
    fn snapshot_keys(&self, prefix: &[u8]) -> KeySnapshot;

    /// The number of keys currently in the store.
    fn len(&self) -> usize;

    /// Whether the store currently holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A point-in-time view of the keys in a store.
///
/// This is a one-shot iterator: keys are yielded in a fixed order and each key is yielded once.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct KeySnapshot {
    keys: vec::IntoIter<Vec<u8>>,
}

impl KeySnapshot {
    /// Wrap an already-captured list of keys.
    pub fn new(keys: Vec<Vec<u8>>) -> Self {
        Self {
            keys: keys.into_iter(),
        }
    }
}

impl Iterator for KeySnapshot {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.keys.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for KeySnapshot {}

impl FusedIterator for KeySnapshot {}
