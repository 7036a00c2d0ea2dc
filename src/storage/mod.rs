//! Storage module: the key-value capabilities a migration needs

pub mod memory_store;

pub use memory_store::MemoryStore;

use crate::Result;
use async_trait::async_trait;

/// Operations a Redis-like store must offer to act as a copy endpoint.
///
/// Every call completes (or fails) before returning; callers never overlap
/// requests on the same handle.
#[async_trait]
pub trait KeyValueStore: Send {
    /// Liveness check.
    async fn ping(&mut self) -> Result<()>;

    async fn exists(&mut self, key: &str) -> Result<bool>;

    /// Type tag as reported by `TYPE` (`string`, `list`, `set`, `zset`, `hash`, ...).
    async fn key_type(&mut self, key: &str) -> Result<String>;

    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn list_range_all(&mut self, key: &str) -> Result<Vec<Vec<u8>>>;

    async fn set_members(&mut self, key: &str) -> Result<Vec<Vec<u8>>>;

    /// Members in ascending score order.
    async fn scored_range_all(&mut self, key: &str) -> Result<Vec<(Vec<u8>, f64)>>;

    async fn map_entries(&mut self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Overwrites any existing value and clears its expiry.
    async fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn delete(&mut self, key: &str) -> Result<bool>;

    async fn append_list(&mut self, key: &str, values: Vec<Vec<u8>>) -> Result<()>;

    async fn add_set_members(&mut self, key: &str, members: Vec<Vec<u8>>) -> Result<()>;

    async fn add_scored_members(&mut self, key: &str, members: Vec<(Vec<u8>, f64)>) -> Result<()>;

    async fn write_map_entries(&mut self, key: &str, entries: Vec<(Vec<u8>, Vec<u8>)>)
        -> Result<()>;

    /// Remaining time to live in seconds; `None` when the key has no expiry or does not exist.
    async fn ttl(&mut self, key: &str) -> Result<Option<u64>>;

    /// Returns whether the timeout was applied (false when the key does not exist).
    async fn expire(&mut self, key: &str, seconds: u64) -> Result<bool>;
}
