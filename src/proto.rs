//! Protobuf messages and generated gRPC plumbing.

/// Messages and service definitions for the key-value store.
#[allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    unreachable_pub,
    unused_qualifications,
    unused_results,
    clippy::all,
    clippy::nursery
)]
pub mod kv {
    tonic::include_proto!("memkv.kv");
}
