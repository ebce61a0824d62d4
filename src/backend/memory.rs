use crate::backend::{KeySnapshot, KvBackend};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::Bound;

/// A backend holding all data in process memory.
///
/// Entries live in an ordered map behind a single mutex, so snapshots are always produced in
/// ascending byte order of the keys. Nothing is persisted; the data is gone once the value is
/// dropped.
#[derive(Debug, Default)]
pub struct InMemory {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemory {
    /// Create an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// Every method holds the lock for exactly one map operation and never awaits with it held.
impl KvBackend for InMemory {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        self.entries.lock().insert(key, value).is_some()
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn snapshot_keys(&self, prefix: &[u8]) -> KeySnapshot {
        let entries = self.entries.lock();
        let keys = entries
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        drop(entries);
        KeySnapshot::new(keys)
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_get_missing() {
        let store = InMemory::new();
        assert_eq!(store.get(b"missing"), None);
        assert_eq!(store.get(b""), None);
    }

    #[test]
    fn test_put_then_get() {
        let store = InMemory::new();
        assert!(!store.put(b"key".to_vec(), b"value".to_vec()));
        assert_eq!(store.get(b"key").as_deref(), Some(&b"value"[..]));
    }

    #[test]
    fn test_put_empty_value() {
        let store = InMemory::new();
        assert!(!store.put(b"key".to_vec(), Vec::new()));
        assert_eq!(store.get(b"key"), Some(Vec::new()));
    }

    #[test]
    fn test_overwrite_reports_update() {
        let store = InMemory::new();
        assert!(!store.put(b"key".to_vec(), b"v1".to_vec()));
        assert!(store.put(b"key".to_vec(), b"v2".to_vec()));
        assert_eq!(store.get(b"key").as_deref(), Some(&b"v2"[..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = InMemory::new();
        assert!(!store.delete(b"key"));
        assert!(store.is_empty());

        store.put(b"key".to_vec(), b"value".to_vec());
        assert!(store.delete(b"key"));
        assert_eq!(store.get(b"key"), None);
        assert!(!store.delete(b"key"));
    }

    #[test]
    fn test_snapshot_prefix() {
        let store = InMemory::new();
        for key in ["user:2", "item:1", "user:1", "user", "users:9"] {
            store.put(key.as_bytes().to_vec(), b"x".to_vec());
        }

        let keys: Vec<_> = store.snapshot_keys(b"user:").collect();
        assert_eq!(keys, [b"user:1".to_vec(), b"user:2".to_vec()]);

        let all = store.snapshot_keys(b"");
        assert_eq!(all.len(), 5);
        let all: Vec<_> = all.collect();
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
    }

    #[test]
    fn test_snapshot_prefix_with_high_bytes() {
        let store = InMemory::new();
        store.put(vec![0xff, 0x00], b"a".to_vec());
        store.put(vec![0xff, 0xff], b"b".to_vec());
        store.put(vec![0xfe], b"c".to_vec());

        let keys: Vec<_> = store.snapshot_keys(&[0xff]).collect();
        assert_eq!(keys, [vec![0xff, 0x00], vec![0xff, 0xff]]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let store = InMemory::new();
        store.put(b"a".to_vec(), b"1".to_vec());
        store.put(b"b".to_vec(), b"2".to_vec());

        let snapshot = store.snapshot_keys(b"");
        store.put(b"c".to_vec(), b"3".to_vec());
        store.delete(b"a");

        let keys: Vec<_> = snapshot.collect();
        assert_eq!(keys, [b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_concurrent_puts_leave_one_written_value() {
        const WRITERS: u32 = 32;

        let store = Arc::new(InMemory::new());
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.put(b"contended".to_vec(), i.to_be_bytes().to_vec()))
            })
            .collect();

        let updates = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|was_update| *was_update)
            .count();
        // Exactly one writer found the key absent.
        assert_eq!(updates, WRITERS as usize - 1);

        let attempted: BTreeSet<_> = (0..WRITERS).map(|i| i.to_be_bytes().to_vec()).collect();
        let value = store.get(b"contended").unwrap();
        assert!(attempted.contains(&value));
    }
}
