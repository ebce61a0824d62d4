//! A concurrent in-memory key-value store served over gRPC.
//!
//! The service exposes five operations on a single shared store:
//!
//! - `Get`, `Put` and `Delete` are unary calls.
//! - `ListKeys` streams every key with a given prefix from a point-in-time snapshot.
//! - `PutMultiple` accepts a stream of writes and reports how many were applied.
//!
//! [`handler::KvStore`] implements the service on top of any [`backend::KvBackend`].
//! [`client::Client`] is the matching client facade, and [`transitive`] wires the two together
//! in-process without opening a socket.

pub mod backend;
pub mod client;
pub mod handler;
pub mod proto;
pub mod stream;
pub mod transitive;
mod tracing_shim;

/// The response type of every RPC handled by the service.
pub type RpcResponse<T> = Result<tonic::Response<T>, tonic::Status>;
/// A request whose body is a stream of messages.
pub type StreamingRequest<T> = tonic::Request<tonic::Streaming<T>>;

/// The server half of the gRPC service.
pub mod server {
    pub use crate::proto::kv::kv_server::{Kv as KvRpc, KvServer};
}
