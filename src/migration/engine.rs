//! Type-dispatched copy of one key from source to destination

use crate::migration::{KeyRecord, Kind};
use crate::storage::KeyValueStore;
use crate::Result;
use std::fmt;
use tracing::{error, info, warn};

/// What happened to one key
#[derive(Debug, Clone, PartialEq)]
pub enum CopyOutcome {
    /// Value written; `ttl` is the expiry applied to the destination, if any.
    Copied { kind: Kind, ttl: Option<u64> },
    SkippedNotFound,
    /// The collection had no elements; the destination was not touched.
    SkippedEmpty(Kind),
    /// The source reported a type tag the engine cannot copy.
    SkippedUnsupported(String),
    Failed(String),
}

impl CopyOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, CopyOutcome::Copied { .. })
    }
}

/// A key paired with its outcome, rendered for the operator
#[derive(Debug, Clone, PartialEq)]
pub struct CopyReport<'a> {
    pub key: &'a str,
    pub outcome: &'a CopyOutcome,
}

impl fmt::Display for CopyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.key;
        match self.outcome {
            CopyOutcome::Copied { kind, ttl } => {
                writeln!(f, "Copied key '{}' of type '{}'.", key, kind)?;
                if let Some(seconds) = ttl {
                    writeln!(f, "TTL copied: {} seconds", seconds)?;
                }
                write!(
                    f,
                    "✓ Successfully copied key '{}' from source to destination Redis.",
                    key
                )
            }
            CopyOutcome::SkippedNotFound => write!(
                f,
                "Key '{}' does not exist in source Redis database.",
                key
            ),
            CopyOutcome::SkippedEmpty(kind) => write!(
                f,
                "Key '{}' of type '{}' has no elements; destination left unchanged.",
                key, kind
            ),
            CopyOutcome::SkippedUnsupported(tag) => {
                write!(f, "Unsupported key type: {}", tag)
            }
            CopyOutcome::Failed(reason) => {
                write!(f, "✗ Error copying key '{}': {}", key, reason)
            }
        }
    }
}

pub struct MigrationEngine;

impl MigrationEngine {
    /// Copy `key` from `source` to `destination`, value first, then TTL.
    ///
    /// Errors never escape: they are folded into [`CopyOutcome::Failed`].
    /// Partial destination writes are not rolled back.
    pub async fn copy<S, D>(source: &mut S, destination: &mut D, key: &str) -> CopyOutcome
    where
        S: KeyValueStore + ?Sized,
        D: KeyValueStore + ?Sized,
    {
        match Self::try_copy(source, destination, key).await {
            Ok(outcome) => {
                match &outcome {
                    CopyOutcome::Copied { kind, ttl } => {
                        info!("Copied key '{}' ({}, ttl {:?})", key, kind, ttl)
                    }
                    CopyOutcome::SkippedUnsupported(tag) => {
                        warn!("Skipped key '{}' with unsupported type '{}'", key, tag)
                    }
                    other => info!("Key '{}': {:?}", key, other),
                }
                outcome
            }
            Err(e) => {
                error!("Error copying key {}: {}", key, e);
                CopyOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_copy<S, D>(source: &mut S, destination: &mut D, key: &str) -> Result<CopyOutcome>
    where
        S: KeyValueStore + ?Sized,
        D: KeyValueStore + ?Sized,
    {
        if !source.exists(key).await? {
            return Ok(CopyOutcome::SkippedNotFound);
        }

        let tag = source.key_type(key).await?;
        let kind = match tag.parse::<Kind>() {
            Ok(kind) => kind,
            Err(tag) if tag == "none" => return Ok(CopyOutcome::SkippedNotFound),
            Err(tag) => return Ok(CopyOutcome::SkippedUnsupported(tag)),
        };
        info!("Copying key '{}' of type '{}'", key, kind);

        let Some(mut record) = KeyRecord::read(&mut *source, key, kind).await? else {
            return Ok(CopyOutcome::SkippedNotFound);
        };
        if record.payload.is_empty() {
            return Ok(CopyOutcome::SkippedEmpty(kind));
        }

        record.write(&mut *destination).await?;

        record.ttl = source.ttl(key).await?.filter(|&seconds| seconds > 0);
        if let Some(seconds) = record.ttl {
            destination.expire(key, seconds).await?;
        }

        Ok(CopyOutcome::Copied {
            kind: record.kind(),
            ttl: record.ttl,
        })
    }
}
