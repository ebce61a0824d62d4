//! A client for the key-value service.
//!
//! [`Client`] wraps the generated [`KvClient`] with one method per operation. Every failure is
//! returned to the caller as a [`ClientError`]; nothing is retried automatically.

pub use crate::proto::kv::kv_client::KvClient;
use crate::proto::kv::{
    DeleteRequest, DeleteResponse, GetRequest, GetResponse, ListKeysRequest, ListKeysResponse,
    PutMultipleResponse, PutRequest, PutResponse,
};
use futures::{stream, Stream};
use std::fmt;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Streaming};

/// An error returned by [`Client`].
#[derive(Debug)]
pub enum ClientError {
    /// The connection to the server could not be established.
    Transport(tonic::transport::Error),
    /// The call reached the server, or was attempted, and ended with a non-OK status.
    Status(tonic::Status),
}

impl ClientError {
    /// Whether the call was cancelled rather than failing outright.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Status(status) if status.code() == Code::Cancelled)
    }

    /// The gRPC status code, if the error carries one.
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Transport(_) => None,
            Self::Status(status) => Some(status.code()),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "transport error: {err}"),
            Self::Status(status) => write!(f, "{:?}: {}", status.code(), status.message()),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Status(status) => Some(status),
        }
    }
}

impl From<tonic::transport::Error> for ClientError {
    fn from(err: tonic::transport::Error) -> Self {
        Self::Transport(err)
    }
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        Self::Status(status)
    }
}

/// The value found by [`Client::get`].
pub type Lookup = Option<Vec<u8>>;

/// A client for the key-value service.
///
/// Cloning is cheap and clones share the underlying connection, so a single client can be used
/// from many tasks at once.
#[derive(Debug, Clone)]
pub struct Client {
    inner: KvClient<Channel>,
}

impl Client {
    /// Connect to a server at the given endpoint, such as `http://[::1]:50051`.
    pub async fn connect<D>(endpoint: D) -> Result<Self, ClientError>
    where
        D: TryInto<Endpoint>,
        D::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Ok(Self::new(KvClient::connect(endpoint).await?))
    }

    /// Wrap an existing generated client.
    #[must_use]
    pub const fn new(inner: KvClient<Channel>) -> Self {
        Self { inner }
    }

    /// Access the generated client for calls the facade does not cover.
    pub fn inner_mut(&mut self) -> &mut KvClient<Channel> {
        &mut self.inner
    }

    /// Obtain the value associated with `key`. A missing key is `Ok(None)`, not an error.
    pub async fn get(&mut self, key: impl Into<Vec<u8>>) -> Result<Lookup, ClientError> {
        let GetResponse { found, value } = self
            .inner
            .get(GetRequest { key: key.into() })
            .await?
            .into_inner();

        Ok(if found {
            Some(value.unwrap_or_default())
        } else {
            None
        })
    }

    /// Associate `value` with `key`. Returns `true` if this replaced an existing value.
    pub async fn put(
        &mut self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<bool, ClientError> {
        let PutResponse {
            success,
            was_update,
        } = self
            .inner
            .put(PutRequest {
                key: key.into(),
                value: value.into(),
            })
            .await?
            .into_inner();

        if success {
            Ok(was_update)
        } else {
            Err(tonic::Status::internal("server reported an unsuccessful put").into())
        }
    }

    /// Remove `key`. Returns `true` if the key existed.
    pub async fn delete(&mut self, key: impl Into<Vec<u8>>) -> Result<bool, ClientError> {
        let DeleteResponse { success, existed } = self
            .inner
            .delete(DeleteRequest { key: key.into() })
            .await?
            .into_inner();

        if success {
            Ok(existed)
        } else {
            Err(tonic::Status::internal("server reported an unsuccessful delete").into())
        }
    }

    /// Collect every key beginning with `prefix`, in the order the server sent them.
    pub async fn list_keys(
        &mut self,
        prefix: impl Into<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, ClientError> {
        let mut stream = self.list_keys_stream(prefix).await?;

        let mut keys = Vec::new();
        while let Some(ListKeysResponse { key }) = stream.message().await? {
            keys.push(key);
        }
        Ok(keys)
    }

    /// Start enumerating every key beginning with `prefix`.
    ///
    /// Dropping the returned stream before it is exhausted detaches from the call, and the server
    /// stops sending.
    pub async fn list_keys_stream(
        &mut self,
        prefix: impl Into<Vec<u8>>,
    ) -> Result<Streaming<ListKeysResponse>, ClientError> {
        Ok(self
            .inner
            .list_keys(ListKeysRequest {
                prefix: prefix.into(),
            })
            .await?
            .into_inner())
    }

    /// Write every pair, then signal end-of-input. Returns the number of pairs applied.
    ///
    /// The pairs are applied one at a time. If the call fails partway through, the pairs applied
    /// before the failure remain, so blindly retrying may apply some pairs twice.
    pub async fn put_multiple<I, K, V>(&mut self, pairs: I) -> Result<u64, ClientError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        let requests: Vec<_> = pairs
            .into_iter()
            .map(|(key, value)| PutRequest {
                key: key.into(),
                value: value.into(),
            })
            .collect();
        self.put_multiple_stream(stream::iter(requests)).await
    }

    /// Write every request produced by `requests`. End-of-input is signaled when the stream ends.
    pub async fn put_multiple_stream<S>(&mut self, requests: S) -> Result<u64, ClientError>
    where
        S: Stream<Item = PutRequest> + Send + 'static,
    {
        let PutMultipleResponse { count } = self.inner.put_multiple(requests).await?.into_inner();
        Ok(count)
    }
}

impl From<KvClient<Channel>> for Client {
    fn from(inner: KvClient<Channel>) -> Self {
        Self::new(inner)
    }
}
