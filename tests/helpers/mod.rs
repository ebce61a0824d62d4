#![allow(dead_code)]

use anyhow::Result;
use memkv::backend::{InMemory, KeySnapshot, KvBackend};
use memkv::handler::KvStore;
use memkv::stream::SessionStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

/// An in-memory store that counts the writes reaching it.
#[derive(Debug, Default)]
pub(crate) struct CountingBackend {
    inner: InMemory,
    puts: AtomicU64,
}

impl CountingBackend {
    pub(crate) fn puts(&self) -> u64 {
        self.puts.load(Ordering::Acquire)
    }
}

impl KvBackend for CountingBackend {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        let _previous = self.puts.fetch_add(1, Ordering::AcqRel);
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.inner.delete(key)
    }

    fn snapshot_keys(&self, prefix: &[u8]) -> KeySnapshot {
        self.inner.snapshot_keys(prefix)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// A server listening on an ephemeral local port.
pub(crate) struct TestServer {
    pub(crate) endpoint: String,
    pub(crate) backend: Arc<CountingBackend>,
    pub(crate) stats: Arc<SessionStats>,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) async fn spawn_server(list_keys_buffer: usize) -> Result<TestServer> {
    let backend = Arc::new(CountingBackend::default());
    let store = KvStore::new(Arc::clone(&backend)).with_list_keys_buffer(list_keys_buffer);
    let stats = store.session_stats();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(
        Server::builder()
            .add_service(store.into_service())
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );

    Ok(TestServer {
        endpoint: format!("http://{addr}"),
        backend,
        stats,
        handle,
    })
}

pub(crate) fn bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub(crate) fn keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<Vec<u8>> {
    keys.into_iter().map(bytes).collect()
}

/// Poll `condition` until it holds, giving up after about a second.
pub(crate) async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
