mod helpers;

use crate::helpers::{bytes, eventually, spawn_server};
use anyhow::Result;
use memkv::backend::KvBackend as _;
use memkv::client::{Client, ClientError};
use memkv::proto::kv::PutRequest;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[tokio::test]
async fn test_roundtrip_over_tcp() -> Result<()> {
    let server = spawn_server(4).await?;
    let mut client = Client::connect(server.endpoint.clone()).await?;

    assert!(!client.put("name", "Alice").await?);
    assert_eq!(client.get("name").await?, Some(bytes("Alice")));
    assert_eq!(client.put_multiple([("a", "1"), ("b", "2")]).await?, 2);
    assert_eq!(client.list_keys("").await?.len(), 3);
    assert!(client.delete("name").await?);
    assert_eq!(server.backend.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_list_keys_consumer_detaches() -> Result<()> {
    let server = spawn_server(1).await?;
    let mut client = Client::connect(server.endpoint.clone()).await?;

    let pairs: Vec<_> = (0..500).map(|idx| (format!("key:{idx:03}"), "x")).collect();
    assert_eq!(client.put_multiple(pairs).await?, 500);

    let mut stream = client.list_keys_stream("key:").await?;
    let first = stream.message().await?.map(|response| response.key);
    assert_eq!(first, Some(bytes("key:000")));
    drop(stream);

    // The emitter notices the detach and stops instead of waiting on the full channel.
    let stats = &server.stats;
    assert!(eventually(|| stats.counts().cancelled == 1 && stats.counts().active == 0).await);
    assert_eq!(stats.counts().completed, 1);

    // Other calls are unaffected and the store is intact.
    assert_eq!(client.get("key:499").await?, Some(bytes("x")));
    assert_eq!(client.list_keys("key:1").await?.len(), 100);
    assert_eq!(server.backend.len(), 500);
    assert!(eventually(|| stats.counts().completed == 2).await);

    Ok(())
}

#[tokio::test]
async fn test_put_multiple_connection_break_keeps_applied_writes() -> Result<()> {
    let server = spawn_server(4).await?;

    // The uploader gets its own runtime so that shutting it down closes its connection without
    // the call ever signaling end-of-input.
    let uploader = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let endpoint = server.endpoint.clone();
    let (tx, rx) = mpsc::channel(8);
    let _call = uploader.spawn(async move {
        let mut client = Client::connect(endpoint).await?;
        client.put_multiple_stream(ReceiverStream::new(rx)).await
    });

    for key in ["a", "b", "c"] {
        tx.send(PutRequest {
            key: bytes(key),
            value: bytes("1"),
        })
        .await?;
    }
    let backend = &server.backend;
    let stats = &server.stats;
    assert!(eventually(|| backend.puts() == 3).await);
    assert_eq!(stats.counts().active, 1);

    uploader.shutdown_background();
    drop(tx);

    assert!(eventually(|| stats.counts().cancelled == 1 && stats.counts().active == 0).await);
    assert_eq!(stats.counts().completed, 0);
    assert_eq!(stats.counts().failed, 0);
    assert_eq!(backend.puts(), 3);

    let mut client = Client::connect(server.endpoint.clone()).await?;
    assert_eq!(client.get("a").await?, Some(bytes("1")));
    assert_eq!(client.get("c").await?, Some(bytes("1")));
    assert!(!client.put("d", "2").await?);
    assert_eq!(backend.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_connect_failure_is_reported() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let err = Client::connect(format!("http://{addr}")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(err.code(), None);
    assert!(!err.is_cancelled());

    Ok(())
}
