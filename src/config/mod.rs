//! Configuration module: connection profiles and the files they come from

pub mod profile;
pub mod properties;

pub use profile::{ConnectionProfile, ProfileStore, Role};

use std::path::PathBuf;

/// Errors raised while loading connection profiles
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read configuration file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
