//! A key-value handler.

use crate::backend::{InMemory, KvBackend};
use crate::handler::validate_key;
use crate::proto::kv::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, ListKeysRequest, ListKeysResponse,
    PutMultipleResponse, PutRequest, PutResponse,
};
use crate::server::{KvRpc, KvServer};
use crate::stream::{emit_keys, ingest_pairs, SessionStats};
use crate::tracing_shim::{debug, debug_span, Instrument as _};
use crate::{RpcResponse, StreamingRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

/// The number of `ListKeys` messages buffered ahead of a consumer unless configured otherwise.
pub const DEFAULT_LIST_KEYS_BUFFER: usize = 16;

/// A key-value store.
///
/// Both keys and values are arbitrary byte strings. Keys written through the service must be
/// non-empty; values may be empty. Every operation maps to exactly one call on the backend, so
/// the atomicity of each operation is that of the backend.
#[must_use]
#[derive(Debug)]
pub struct KvStore<Backend> {
    backend: Backend,
    list_keys_buffer: usize,
    stats: Arc<SessionStats>,
}

impl<Backend> KvStore<Backend> {
    /// Serve the given backend.
    #[inline]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            list_keys_buffer: DEFAULT_LIST_KEYS_BUFFER,
            stats: Arc::default(),
        }
    }

    /// Set how many `ListKeys` messages may be queued ahead of a slow consumer before the emitter
    /// waits. Values below one are treated as one.
    #[inline]
    pub fn with_list_keys_buffer(mut self, capacity: usize) -> Self {
        self.list_keys_buffer = capacity.max(1);
        self
    }

    /// The backend this store serves.
    #[inline]
    pub const fn backend(&self) -> &Backend {
        &self.backend
    }

    /// How the streaming calls served so far have ended. The handle stays valid after the store
    /// is moved into a service.
    #[inline]
    pub fn session_stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Wrap the store in a gRPC service ready to be added to a `tonic` server.
    #[inline]
    pub fn into_service(self) -> KvServer<Self>
    where
        Backend: KvBackend + 'static,
    {
        KvServer::new(self)
    }
}

impl KvStore<InMemory> {
    /// Create an empty in-memory store.
    #[inline]
    pub fn in_memory() -> Self {
        Self::new(InMemory::new())
    }
}

#[tonic::async_trait]
impl<Backend> KvRpc for KvStore<Backend>
where
    Backend: KvBackend + 'static,
{
    type ListKeysStream = ReceiverStream<Result<ListKeysResponse, Status>>;

    async fn get(&self, request: Request<GetRequest>) -> RpcResponse<GetResponse> {
        let GetRequest { key } = request.into_inner();
        let value = self.backend.get(&key);
        debug!(key_len = key.len(), found = value.is_some(), "get");

        Ok(Response::new(GetResponse {
            found: value.is_some(),
            value,
        }))
    }

    async fn put(&self, request: Request<PutRequest>) -> RpcResponse<PutResponse> {
        let PutRequest { key, value } = request.into_inner();
        validate_key(&key)?;
        debug!(key_len = key.len(), value_len = value.len(), "put");
        let was_update = self.backend.put(key, value);

        Ok(Response::new(PutResponse {
            success: true,
            was_update,
        }))
    }

    async fn delete(&self, request: Request<DeleteRequest>) -> RpcResponse<DeleteResponse> {
        let DeleteRequest { key } = request.into_inner();
        let existed = self.backend.delete(&key);
        debug!(key_len = key.len(), existed, "delete");

        Ok(Response::new(DeleteResponse {
            success: true,
            existed,
        }))
    }

    async fn list_keys(
        &self,
        request: Request<ListKeysRequest>,
    ) -> RpcResponse<Self::ListKeysStream> {
        let ListKeysRequest { prefix } = request.into_inner();
        // The backend is not touched again once the snapshot exists.
        let snapshot = self.backend.snapshot_keys(&prefix);
        debug!(prefix_len = prefix.len(), keys = snapshot.len(), "list_keys");

        let (tx, rx) = mpsc::channel(self.list_keys_buffer);
        let guard = self.stats.track();
        let _emitter = tokio::spawn(
            async move {
                let outcome = emit_keys(snapshot, tx).await;
                guard.finish(&outcome);
            }
            .instrument(debug_span!("list_keys")),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn put_multiple(
        &self,
        request: StreamingRequest<PutRequest>,
    ) -> RpcResponse<PutMultipleResponse> {
        let guard = self.stats.track();
        let outcome = ingest_pairs(&self.backend, request.into_inner()).await;
        guard.finish(&outcome);
        let count = outcome.into_result()?;
        debug!(count, "put_multiple");

        Ok(Response::new(PutMultipleResponse { count }))
    }
}
