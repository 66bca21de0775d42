//! A small Redis-compatible server.
//!
//! Clients talk RESP over TCP and can use:
//!
//! - Key-value operations with optional millisecond expiry (GET, SET ... PX)
//! - Server commands (PING, ECHO, INFO replication)
//! - The master side of replication (REPLCONF, PSYNC with a full resync)
//!
//! When started with `--replicaof` the server also performs the replica
//! handshake against its master. Every connection runs in its own Tokio task
//! and all of them share one key-value store.

pub mod commands;
pub mod config;
pub mod connection;
pub mod handshake;
pub mod key_value_store;
pub mod rdb;
pub mod resp;
pub mod server;
