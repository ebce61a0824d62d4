//! Handler implementations.

mod kv;

pub use self::kv::{KvStore, DEFAULT_LIST_KEYS_BUFFER};
use tonic::Status;

/// Reject keys that cannot be stored. Only writes are validated; lookups of an empty key simply
/// find nothing.
pub(crate) fn validate_key(key: &[u8]) -> Result<(), Status> {
    if key.is_empty() {
        Err(Status::invalid_argument("key must not be empty"))
    } else {
        Ok(())
    }
}
