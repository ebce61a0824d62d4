use crate::backend::{KeySnapshot, KvBackend};
use std::sync::Arc;

impl<Backend> KvBackend for Arc<Backend>
where
    Backend: KvBackend + ?Sized,
{
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.as_ref().get(key)
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        self.as_ref().put(key, value)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.as_ref().delete(key)
    }

    fn snapshot_keys(&self, prefix: &[u8]) -> KeySnapshot {
        self.as_ref().snapshot_keys(prefix)
    }

    fn len(&self) -> usize {
        self.as_ref().len()
    }

    fn is_empty(&self) -> bool {
        self.as_ref().is_empty()
    }
}
