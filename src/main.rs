//! A command-line interface for running and talking to a memkv server.
//!
//! For usage, run `cargo run --features binary -- --help`.

mod cli;

use crate::cli::{Args, Command, KvArgs, KvCommand, RunArgs};
use clap::Parser as _;
use memkv::client::Client;
use memkv::handler::KvStore;
use std::process::ExitCode;
use tokio::io::{self, AsyncWriteExt as _};
use tonic::transport::Server;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Args { command } = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let future = async {
        match command {
            Command::Run(args) => run(args).await,
            Command::Kv(args) => kv(args).await,
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}

/// Run memkv as a server. This function will block until the server receives Ctrl-C.
///
/// # Parameters
///
/// - `addr`: The address to bind the server to.
/// - `list_keys_buffer`: How many `ListKeys` messages may be queued ahead of a slow consumer.
async fn run(
    RunArgs {
        addr,
        list_keys_buffer,
    }: RunArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = KvStore::in_memory().with_list_keys_buffer(list_keys_buffer);

    tracing::info!(%addr, list_keys_buffer, "listening");
    Server::builder()
        .add_service(store.into_service())
        .serve_with_shutdown(addr, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "failed to listen for Ctrl-C");
            }
        })
        .await?;
    tracing::info!("shut down");

    Ok(ExitCode::SUCCESS)
}

/// Perform operations against a running server.
///
/// # stdout
///
/// When obtaining a value for a key, the value is written to stdout. When listing keys, the keys
/// are separated by a null byte (`\0`). When storing multiple pairs, the number applied is
/// written. Nothing is written for other operations.
async fn kv(
    KvArgs { endpoint, command }: KvArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut client = Client::connect(endpoint).await?;
    let mut stdout = io::stdout();

    match command {
        KvCommand::Get { key } => match client.get(key).await? {
            Some(value) => stdout.write_all(&value).await?,
            None => return Ok(ExitCode::FAILURE),
        },
        KvCommand::Put { key, value } => {
            let _was_update = client.put(key, value).await?;
        }
        KvCommand::Delete { key } => {
            if !client.delete(key).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        KvCommand::List { prefix } => {
            let keys = client.list_keys(prefix).await?;
            for (idx, key) in keys.iter().enumerate() {
                if idx != 0 {
                    stdout.write_all(&[0]).await?;
                }
                stdout.write_all(key).await?;
            }
        }
        KvCommand::PutMany { pairs } => {
            let count = client.put_multiple(pairs).await?;
            stdout.write_all(format!("{count}\n").as_bytes()).await?;
        }
    }
    stdout.flush().await?;

    Ok(ExitCode::SUCCESS)
}
