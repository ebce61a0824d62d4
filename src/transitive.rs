//! An in-process server and client pair.
//!
//! The server runs on a spawned task and talks to the client over an in-memory duplex pipe, so
//! every call still goes through the full gRPC stack without binding a socket. The server stops
//! when the client, along with every clone of it, is dropped.

use crate::backend::KvBackend;
use crate::client::{Client, KvClient};
use crate::handler::KvStore;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::io;
use std::ops::{Deref, DerefMut};
use tokio::io::DuplexStream;
use tonic::transport::{Channel, Endpoint, Server, Uri};

/// Bytes buffered in each direction of the in-process pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// A client connected to a server running in the same process.
#[derive(Debug, Clone)]
pub struct Transitive<T> {
    client: T,
}

impl<T> Transitive<T> {
    /// Take the client out of the wrapper.
    pub fn into_inner(self) -> T {
        self.client
    }
}

impl<T> Deref for Transitive<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl<T> DerefMut for Transitive<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client
    }
}

/// Serve `store` in-process and return a client connected to it.
///
/// Take a handle from [`KvStore::session_stats`] first to observe the streaming calls the
/// returned client makes.
pub async fn kv_client_for<Backend>(
    store: KvStore<Backend>,
) -> Result<Transitive<Client>, tonic::transport::Error>
where
    Backend: KvBackend + 'static,
{
    let pipe = spawn_server(store);
    let channel = connect_pipe(pipe).await?;

    Ok(Transitive {
        client: Client::new(KvClient::new(channel)),
    })
}

/// Start a server for `store` that accepts exactly one connection: the server end of a fresh
/// pipe. The client end is returned.
fn spawn_server<Backend>(store: KvStore<Backend>) -> DuplexStream
where
    Backend: KvBackend + 'static,
{
    let (client_end, server_end) = tokio::io::duplex(PIPE_CAPACITY);
    let incoming = tokio_stream::once(Ok::<_, io::Error>(server_end));

    let _server = tokio::spawn(
        Server::builder()
            .add_service(store.into_service())
            .serve_with_incoming(incoming),
    );

    client_end
}

/// Open a channel whose only connection is `pipe`. Reconnect attempts fail, as the pipe cannot be
/// handed out twice.
async fn connect_pipe(pipe: DuplexStream) -> Result<Channel, tonic::transport::Error> {
    let pipe = Mutex::new(Some(pipe));
    let connector = tower::service_fn(move |_: Uri| {
        let pipe = pipe.lock().take();
        async move {
            pipe.map(TokioIo::new)
                .ok_or_else(|| io::Error::other("in-process connection already used"))
        }
    });

    // The authority is never resolved.
    Endpoint::from_static("http://in-process.memkv")
        .connect_with_connector(connector)
        .await
}

/// Serve `backend` in-process with default settings and return a client connected to it.
pub async fn kv_client<Backend>(
    backend: Backend,
) -> Result<Transitive<Client>, tonic::transport::Error>
where
    Backend: KvBackend + 'static,
{
    kv_client_for(KvStore::new(backend)).await
}
