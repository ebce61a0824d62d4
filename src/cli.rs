//! Command-line interface for memkv.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

/// Command-line arguments for memkv.
#[derive(Debug, Parser)]
#[command(version, propagate_version = true)]
pub(crate) struct Args {
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// What operation to perform.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run memkv as a server.
    ///
    /// This will start a gRPC server holding an empty in-memory store. The server will listen on
    /// the given address until it receives Ctrl-C. All data is lost when it exits.
    #[clap(alias = "serve")]
    Run(RunArgs),
    /// Perform operations against a running server.
    #[clap(aliases = ["key-value", "k-v"])]
    Kv(KvArgs),
}

/// Run memkv as a server.
#[derive(Debug, Parser)]
pub(crate) struct RunArgs {
    /// The address to listen on.
    #[clap(default_value = "[::1]:50051")]
    pub(crate) addr: SocketAddr,
    /// How many `ListKeys` messages may be queued ahead of a slow consumer.
    #[clap(long, default_value_t = memkv::handler::DEFAULT_LIST_KEYS_BUFFER)]
    pub(crate) list_keys_buffer: usize,
}

/// Arguments for performing operations against a running server.
#[derive(Debug, Parser)]
pub(crate) struct KvArgs {
    /// The server to connect to.
    #[arg(short, long, default_value = "http://[::1]:50051")]
    pub(crate) endpoint: String,
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: KvCommand,
}

/// Perform an operation on the key-value store.
#[derive(Debug, Subcommand)]
pub(crate) enum KvCommand {
    /// Get the value associated with the given key.
    ///
    /// The value is written to stdout as-is. If the key is not present, nothing is written and
    /// the process exits with a failure status code.
    #[clap(alias = "fetch")]
    Get {
        /// The key to get the value for.
        key: String,
    },
    /// Set a value for a given key.
    ///
    /// If the key already exists, the value is updated.
    #[clap(aliases = ["set", "save", "store"])]
    Put {
        /// The key to be inserted.
        key: String,
        /// The value to be associated with the key.
        value: String,
    },
    /// Delete a value for a given key.
    ///
    /// If the key did not exist, the process exits with a failure status code.
    #[clap(aliases = ["remove", "rm"])]
    Delete {
        /// The key to delete.
        key: String,
    },
    /// List every key beginning with the given prefix.
    ///
    /// Keys are written to stdout separated by a null byte (`\0`).
    #[clap(aliases = ["ls", "keys"])]
    List {
        /// Only keys beginning with this prefix are listed. Lists every key if omitted.
        #[clap(default_value = "")]
        prefix: String,
    },
    /// Store several key-value pairs in one streaming call.
    ///
    /// The number of pairs applied is written to stdout.
    #[clap(aliases = ["put-multiple", "mput"])]
    PutMany {
        /// The pairs to store, each written as `KEY=VALUE`.
        #[clap(required = true, value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
}

/// Parse a `KEY=VALUE` argument. The key ends at the first `=`.
fn parse_pair(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) => Ok((key.to_owned(), value.to_owned())),
        None => Err(format!("expected KEY=VALUE, found `{arg}`")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("a=b=c"),
            Ok(("a".to_owned(), "b=c".to_owned()))
        );
        assert_eq!(parse_pair("a="), Ok(("a".to_owned(), String::new())));
        assert!(parse_pair("novalue").is_err());
    }

    #[test]
    fn test_args() {
        use clap::CommandFactory as _;
        Args::command().debug_assert();
    }
}
