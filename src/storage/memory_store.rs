//! In-memory storage implementation

use crate::storage::KeyValueStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    /// Kept sorted by (score, member).
    ZSet(Vec<(Vec<u8>, f64)>),
    /// Field order is insertion order.
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::ZSet(_) => "zset",
            Value::Hash(_) => "hash",
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Debug)]
struct Inner {
    data: HashMap<String, Entry>,
    online: bool,
}

/// In-memory key-value store with Redis semantics for the five core types.
///
/// Clones share the same data, so a clone behaves like a second connection
/// to the same server.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create new empty memory store
    pub fn new() -> Self {
        MemoryStore {
            inner: Arc::new(RwLock::new(Inner {
                data: HashMap::new(),
                online: true,
            })),
        }
    }

    /// Simulate the server going away (or coming back). While offline every
    /// operation fails with a connection error.
    pub async fn set_online(&self, online: bool) {
        self.inner.write().await.online = online;
    }

    /// Get number of live keys in store
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner
            .data
            .values()
            .filter(|entry| entry.expires_at.map_or(true, |at| at > now))
            .count()
    }

    /// Check if store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Run `f` against the live map after purging `key` if it has expired.
    async fn with_key<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, Entry>) -> Result<T> + Send,
    ) -> Result<T> {
        let mut inner = self.inner.write().await;
        if !inner.online {
            return Err(Error::Connection("store is offline".to_string()));
        }

        let expired = inner
            .data
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            debug!("Expired key {}", key);
            inner.data.remove(key);
        }

        f(&mut inner.data)
    }
}

fn read_value<'a>(data: &'a HashMap<String, Entry>, key: &str) -> Option<&'a Value> {
    data.get(key).map(|entry| &entry.value)
}

/// Fetch the value at `key`, creating it with `empty` if absent.
fn value_or_insert<'a>(
    data: &'a mut HashMap<String, Entry>,
    key: &str,
    empty: Value,
) -> &'a mut Value {
    &mut data
        .entry(key.to_string())
        .or_insert(Entry {
            value: empty,
            expires_at: None,
        })
        .value
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&mut self) -> Result<()> {
        let inner = self.inner.read().await;
        if inner.online {
            Ok(())
        } else {
            Err(Error::Connection("store is offline".to_string()))
        }
    }

    async fn exists(&mut self, key: &str) -> Result<bool> {
        self.with_key(key, |data| Ok(data.contains_key(key))).await
    }

    async fn key_type(&mut self, key: &str) -> Result<String> {
        self.with_key(key, |data| {
            Ok(read_value(data, key)
                .map_or("none", Value::type_name)
                .to_string())
        })
        .await
    }

    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_key(key, |data| match read_value(data, key) {
            None => Ok(None),
            Some(Value::Str(bytes)) => Ok(Some(bytes.clone())),
            Some(_) => Err(Error::Server(WRONGTYPE.to_string())),
        })
        .await
    }

    async fn list_range_all(&mut self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.with_key(key, |data| match read_value(data, key) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => Ok(items.clone()),
            Some(_) => Err(Error::Server(WRONGTYPE.to_string())),
        })
        .await
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.with_key(key, |data| match read_value(data, key) {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(Error::Server(WRONGTYPE.to_string())),
        })
        .await
    }

    async fn scored_range_all(&mut self, key: &str) -> Result<Vec<(Vec<u8>, f64)>> {
        self.with_key(key, |data| match read_value(data, key) {
            None => Ok(Vec::new()),
            Some(Value::ZSet(members)) => Ok(members.clone()),
            Some(_) => Err(Error::Server(WRONGTYPE.to_string())),
        })
        .await
    }

    async fn map_entries(&mut self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.with_key(key, |data| match read_value(data, key) {
            None => Ok(Vec::new()),
            Some(Value::Hash(entries)) => Ok(entries.clone()),
            Some(_) => Err(Error::Server(WRONGTYPE.to_string())),
        })
        .await
    }

    async fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        debug!("SET {} ({} bytes)", key, value.len());
        self.with_key(key, |data| {
            data.insert(
                key.to_string(),
                Entry {
                    value: Value::Str(value),
                    expires_at: None,
                },
            );
            Ok(())
        })
        .await
    }

    async fn delete(&mut self, key: &str) -> Result<bool> {
        let deleted = self
            .with_key(key, |data| Ok(data.remove(key).is_some()))
            .await?;
        debug!("DEL {} = {}", key, deleted as u8);
        Ok(deleted)
    }

    async fn append_list(&mut self, key: &str, values: Vec<Vec<u8>>) -> Result<()> {
        self.with_key(key, |data| {
            match value_or_insert(data, key, Value::List(Vec::new())) {
                Value::List(items) => {
                    items.extend(values);
                    Ok(())
                }
                _ => Err(Error::Server(WRONGTYPE.to_string())),
            }
        })
        .await
    }

    async fn add_set_members(&mut self, key: &str, members: Vec<Vec<u8>>) -> Result<()> {
        self.with_key(key, |data| {
            match value_or_insert(data, key, Value::Set(BTreeSet::new())) {
                Value::Set(set) => {
                    set.extend(members);
                    Ok(())
                }
                _ => Err(Error::Server(WRONGTYPE.to_string())),
            }
        })
        .await
    }

    async fn add_scored_members(&mut self, key: &str, members: Vec<(Vec<u8>, f64)>) -> Result<()> {
        self.with_key(key, |data| {
            match value_or_insert(data, key, Value::ZSet(Vec::new())) {
                Value::ZSet(zset) => {
                    for (member, score) in members {
                        zset.retain(|(existing, _)| *existing != member);
                        zset.push((member, score));
                    }
                    zset.sort_by(|(ma, sa), (mb, sb)| sa.total_cmp(sb).then_with(|| ma.cmp(mb)));
                    Ok(())
                }
                _ => Err(Error::Server(WRONGTYPE.to_string())),
            }
        })
        .await
    }

    async fn write_map_entries(
        &mut self,
        key: &str,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<()> {
        self.with_key(key, |data| {
            match value_or_insert(data, key, Value::Hash(Vec::new())) {
                Value::Hash(hash) => {
                    for (field, value) in entries {
                        match hash.iter_mut().find(|(existing, _)| *existing == field) {
                            Some(slot) => slot.1 = value,
                            None => hash.push((field, value)),
                        }
                    }
                    Ok(())
                }
                _ => Err(Error::Server(WRONGTYPE.to_string())),
            }
        })
        .await
    }

    async fn ttl(&mut self, key: &str) -> Result<Option<u64>> {
        self.with_key(key, |data| {
            let now = Instant::now();
            Ok(data.get(key).and_then(|entry| entry.expires_at).map(|at| {
                // Rounded to the nearest second, as Redis reports it.
                let millis = at.saturating_duration_since(now).as_millis() as u64;
                (millis + 500) / 1000
            }))
        })
        .await
    }

    async fn expire(&mut self, key: &str, seconds: u64) -> Result<bool> {
        self.with_key(key, |data| {
            if seconds == 0 {
                return Ok(data.remove(key).is_some());
            }
            match data.get_mut(key) {
                Some(entry) => {
                    entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[tokio::test]
    async fn set_get_and_type() {
        let mut store = MemoryStore::new();
        store.set("user:1001", b("alice")).await.unwrap();

        assert!(store.exists("user:1001").await.unwrap());
        assert_eq!(store.key_type("user:1001").await.unwrap(), "string");
        assert_eq!(store.get("user:1001").await.unwrap(), Some(b("alice")));
        assert_eq!(store.key_type("missing").await.unwrap(), "none");
    }

    #[tokio::test]
    async fn clones_share_data() {
        let mut first = MemoryStore::new();
        let mut second = first.clone();

        first.append_list("l", vec![b("a"), b("b")]).await.unwrap();
        second.append_list("l", vec![b("c")]).await.unwrap();

        assert_eq!(
            first.list_range_all("l").await.unwrap(),
            vec![b("a"), b("b"), b("c")]
        );
        assert_eq!(second.len().await, 1);
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let mut store = MemoryStore::new();
        store.set("k", b("v")).await.unwrap();

        let err = store.append_list("k", vec![b("x")]).await.unwrap_err();
        assert!(matches!(err, Error::Server(ref msg) if msg.starts_with("WRONGTYPE")));
        assert!(store.map_entries("k").await.is_err());
    }

    #[tokio::test]
    async fn sorted_set_orders_by_score_and_updates_in_place() {
        let mut store = MemoryStore::new();
        store
            .add_scored_members("z", vec![(b("b"), 2.0), (b("a"), 3.0), (b("c"), 1.0)])
            .await
            .unwrap();
        store.add_scored_members("z", vec![(b("a"), 0.5)]).await.unwrap();

        assert_eq!(
            store.scored_range_all("z").await.unwrap(),
            vec![(b("a"), 0.5), (b("c"), 1.0), (b("b"), 2.0)]
        );
    }

    #[tokio::test]
    async fn hash_upserts_fields_in_insertion_order() {
        let mut store = MemoryStore::new();
        store
            .write_map_entries("h", vec![(b("a"), b("1")), (b("b"), b("2"))])
            .await
            .unwrap();
        store
            .write_map_entries("h", vec![(b("a"), b("9"))])
            .await
            .unwrap();

        assert_eq!(
            store.map_entries("h").await.unwrap(),
            vec![(b("a"), b("9")), (b("b"), b("2"))]
        );
    }

    #[tokio::test]
    async fn ttl_lifecycle() {
        let mut store = MemoryStore::new();
        store.set("k", b("v")).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), None);

        assert!(store.expire("k", 120).await.unwrap());
        let ttl = store.ttl("k").await.unwrap().unwrap();
        assert!(ttl > 0 && ttl <= 120);

        store.set("k", b("w")).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), None);

        assert!(!store.expire("missing", 10).await.unwrap());
        assert!(store.expire("k", 0).await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn expired_keys_disappear() {
        let mut store = MemoryStore::new();
        store.set("k", b("v")).await.unwrap();
        {
            let mut inner = store.inner.write().await;
            inner.data.get_mut("k").unwrap().expires_at = Some(Instant::now());
        }

        assert!(!store.exists("k").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let mut store = MemoryStore::new();
        store.set_online(false).await;

        assert!(matches!(store.ping().await, Err(Error::Connection(_))));
        assert!(store.exists("k").await.is_err());

        store.set_online(true).await;
        store.ping().await.unwrap();
    }
}
