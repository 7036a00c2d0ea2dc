//! Redis Copier - move a single key between two Redis servers
//!
//! This crate provides:
//! - A RESP client for talking to Redis-compatible servers
//! - Connection profiles for a source and a destination endpoint, reloadable at runtime
//! - A migration engine that copies strings, lists, sets, sorted sets and hashes with their TTL
//! - An interactive control loop that recovers from unreachable endpoints

pub mod cli;
pub mod client;
pub mod config;
pub mod connection;
pub mod control;
pub mod migration;
pub mod protocol;
pub mod storage;

pub use client::TcpClient;
pub use config::{ConfigError, ConnectionProfile, ProfileStore, Role};
pub use connection::{ConnectionManager, Connector, TcpConnector, Verification};
pub use control::{ControlLoop, StdConsole};
pub use migration::{CopyOutcome, KeyRecord, Kind, MigrationEngine};
pub use protocol::{Command, Parser, Response};
pub use storage::{KeyValueStore, MemoryStore};

/// Result type for redis-copier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for redis-copier
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
