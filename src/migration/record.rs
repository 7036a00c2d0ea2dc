//! The unit of migration: one key, its typed payload and its TTL

use crate::storage::KeyValueStore;
use crate::Result;
use std::fmt;
use std::str::FromStr;

/// Value representations the engine knows how to copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar,
    List,
    Set,
    ScoredSet,
    Map,
}

impl Kind {
    /// Type tag as reported by the Redis `TYPE` command
    pub fn type_name(&self) -> &'static str {
        match self {
            Kind::Scalar => "string",
            Kind::List => "list",
            Kind::Set => "set",
            Kind::ScoredSet => "zset",
            Kind::Map => "hash",
        }
    }
}

impl FromStr for Kind {
    /// The unrecognized tag
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Kind::Scalar),
            "list" => Ok(Kind::List),
            "set" => Ok(Kind::Set),
            "zset" => Ok(Kind::ScoredSet),
            "hash" => Ok(Kind::Map),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Key contents, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Scalar(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    /// (member, score) in ascending score order
    ScoredSet(Vec<(Vec<u8>, f64)>),
    Map(Vec<(Vec<u8>, Vec<u8>)>),
}

impl Payload {
    pub fn kind(&self) -> Kind {
        match self {
            Payload::Scalar(_) => Kind::Scalar,
            Payload::List(_) => Kind::List,
            Payload::Set(_) => Kind::Set,
            Payload::ScoredSet(_) => Kind::ScoredSet,
            Payload::Map(_) => Kind::Map,
        }
    }

    /// Number of elements; a scalar always counts as one.
    pub fn len(&self) -> usize {
        match self {
            Payload::Scalar(_) => 1,
            Payload::List(items) | Payload::Set(items) => items.len(),
            Payload::ScoredSet(members) => members.len(),
            Payload::Map(entries) => entries.len(),
        }
    }

    /// True for a collection with no elements. Scalars are never empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub name: String,
    pub payload: Payload,
    /// Remaining seconds; `None` means no expiry.
    pub ttl: Option<u64>,
}

impl KeyRecord {
    pub fn kind(&self) -> Kind {
        self.payload.kind()
    }

    /// Read the value of `name` from `store`, interpreting it as `kind`.
    ///
    /// Returns `None` when a scalar disappeared between the type check and
    /// the read. The TTL is left unset.
    pub async fn read<S>(store: &mut S, name: &str, kind: Kind) -> Result<Option<Self>>
    where
        S: KeyValueStore + ?Sized,
    {
        let payload = match kind {
            Kind::Scalar => match store.get(name).await? {
                Some(value) => Payload::Scalar(value),
                None => return Ok(None),
            },
            Kind::List => Payload::List(store.list_range_all(name).await?),
            Kind::Set => Payload::Set(store.set_members(name).await?),
            Kind::ScoredSet => Payload::ScoredSet(store.scored_range_all(name).await?),
            Kind::Map => Payload::Map(store.map_entries(name).await?),
        };

        Ok(Some(KeyRecord {
            name: name.to_string(),
            payload,
            ttl: None,
        }))
    }

    /// Replace the destination key with this record's value.
    ///
    /// Collections delete the destination key first so the result is exactly
    /// the source contents rather than a union with what was there.
    pub async fn write<D>(&self, store: &mut D) -> Result<()>
    where
        D: KeyValueStore + ?Sized,
    {
        let name = self.name.as_str();
        match &self.payload {
            Payload::Scalar(value) => store.set(name, value.clone()).await,
            Payload::List(items) => {
                store.delete(name).await?;
                store.append_list(name, items.clone()).await
            }
            Payload::Set(members) => {
                store.delete(name).await?;
                store.add_set_members(name, members.clone()).await
            }
            Payload::ScoredSet(members) => {
                store.delete(name).await?;
                store.add_scored_members(name, members.clone()).await
            }
            Payload::Map(entries) => {
                store.delete(name).await?;
                store.write_map_entries(name, entries.clone()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_redis_type_tags() {
        assert_eq!("string".parse::<Kind>(), Ok(Kind::Scalar));
        assert_eq!("ZSET".parse::<Kind>(), Ok(Kind::ScoredSet));
        assert_eq!("hash".parse::<Kind>(), Ok(Kind::Map));
        assert_eq!("stream".parse::<Kind>(), Err("stream".to_string()));
        assert_eq!("none".parse::<Kind>(), Err("none".to_string()));
    }

    #[test]
    fn kind_display_round_trips() {
        for kind in [Kind::Scalar, Kind::List, Kind::Set, Kind::ScoredSet, Kind::Map] {
            assert_eq!(kind.to_string().parse::<Kind>(), Ok(kind));
        }
    }

    #[test]
    fn payload_kind_and_emptiness() {
        assert_eq!(Payload::Scalar(Vec::new()).kind(), Kind::Scalar);
        assert!(!Payload::Scalar(Vec::new()).is_empty());
        assert!(Payload::List(Vec::new()).is_empty());
        assert!(Payload::Map(Vec::new()).is_empty());
        assert_eq!(Payload::ScoredSet(vec![(b"a".to_vec(), 1.0)]).len(), 1);
    }
}
