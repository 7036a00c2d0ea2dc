//! Connection profiles for the source and destination endpoints

use crate::config::{properties, ConfigError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_SOURCE_PORT: u16 = 6379;
const DEFAULT_DESTINATION_PORT: u16 = 6380;
const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Which side of the copy an endpoint is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Source,
    Destination,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Source, Role::Destination];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Source => "source",
            Role::Destination => "destination",
        }
    }

    /// Capitalized name for operator messages
    pub fn title(&self) -> &'static str {
        match self {
            Role::Source => "Source",
            Role::Destination => "Destination",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters needed to open a connection to one endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub database: u32,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl ConnectionProfile {
    fn default_for(role: Role) -> Self {
        ConnectionProfile {
            host: DEFAULT_HOST.to_string(),
            port: match role {
                Role::Source => DEFAULT_SOURCE_PORT,
                Role::Destination => DEFAULT_DESTINATION_PORT,
            },
            database: 0,
            password: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// `host:port` for socket connects
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Display form; never includes the password
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }

    /// Build the profile for `role` from `props`, falling back to `base` for
    /// keys the properties do not mention.
    fn overlay(
        base: &ConnectionProfile,
        role: Role,
        props: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut profile = base.clone();

        if let Some((key, host)) = lookup(props, role, "host") {
            if host.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: host.to_string(),
                    reason: "host must not be empty".to_string(),
                });
            }
            profile.host = host.to_string();
        }

        if let Some((key, raw)) = lookup(props, role, "port") {
            profile.port = match raw.parse::<u16>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        key,
                        value: raw.to_string(),
                        reason: "expected a port between 1 and 65535".to_string(),
                    })
                }
                Ok(port) => port,
            };
        }

        if let Some((key, raw)) = lookup(props, role, "database") {
            profile.database = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
                reason: "expected a non-negative database index".to_string(),
            })?;
        }

        if let Some((_, password)) = lookup(props, role, "password") {
            profile.password = if password.trim().is_empty() {
                None
            } else {
                Some(password.to_string())
            };
        }

        if let Some((key, raw)) = lookup(props, role, "timeout") {
            let millis: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
                reason: "expected a timeout in milliseconds".to_string(),
            })?;
            profile.timeout = Duration::from_millis(millis);
        }

        Ok(profile)
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Find `{role}.{field}`, also accepting the `redis.{role}.{field}` spelling.
/// Returns the key actually used, for error messages.
fn lookup<'a>(
    props: &'a BTreeMap<String, String>,
    role: Role,
    field: &str,
) -> Option<(String, &'a str)> {
    let prefixed = format!("redis.{}.{}", role, field);
    let short = format!("{}.{}", role, field);

    if let Some(value) = props.get(&prefixed) {
        return Some((prefixed, value.trim()));
    }
    props.get(&short).map(|value| (short, value.trim()))
}

/// The current connection profiles for both endpoints.
///
/// Replaced as a whole on reload; never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStore {
    source: ConnectionProfile,
    destination: ConnectionProfile,
}

impl Default for ProfileStore {
    fn default() -> Self {
        ProfileStore {
            source: ConnectionProfile::default_for(Role::Source),
            destination: ConnectionProfile::default_for(Role::Destination),
        }
    }
}

impl ProfileStore {
    pub fn new(source: ConnectionProfile, destination: ConnectionProfile) -> Self {
        ProfileStore {
            source,
            destination,
        }
    }

    /// Built-in defaults overlaid with the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut store = ProfileStore::default();
        store.reload(path)?;
        Ok(store)
    }

    pub fn profile(&self, role: Role) -> &ConnectionProfile {
        match role {
            Role::Source => &self.source,
            Role::Destination => &self.destination,
        }
    }

    /// Profiles that result from layering `props` over the current ones.
    pub fn overlay(&self, props: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        Ok(ProfileStore {
            source: ConnectionProfile::overlay(&self.source, Role::Source, props)?,
            destination: ConnectionProfile::overlay(&self.destination, Role::Destination, props)?,
        })
    }

    /// Read `path` and swap in the resulting profiles. On error the current
    /// profiles are left exactly as they were.
    pub fn reload(&mut self, path: &Path) -> Result<(), ConfigError> {
        let props = properties::read(path)?;
        let next = self.overlay(&props)?;
        *self = next;

        info!(
            "Loaded connection profiles from {}: source {}, destination {}",
            path.display(),
            self.source.url(),
            self.destination.url()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn props_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_point_at_local_servers() {
        let store = ProfileStore::default();

        assert_eq!(store.profile(Role::Source).url(), "redis://localhost:6379/0");
        assert_eq!(store.profile(Role::Destination).url(), "redis://localhost:6380/0");
        assert_eq!(store.profile(Role::Source).timeout, Duration::from_millis(2000));
    }

    #[test]
    fn loads_both_key_spellings() {
        let file = props_file(
            "redis.source.host=src.internal\n\
             redis.source.port=7000\n\
             redis.source.database=3\n\
             redis.source.password=hunter2\n\
             destination.host=dst.internal\n\
             destination.port=7001\n\
             destination.timeout=500\n",
        );

        let store = ProfileStore::load(file.path()).unwrap();
        let source = store.profile(Role::Source);
        let destination = store.profile(Role::Destination);

        assert_eq!(source.address(), "src.internal:7000");
        assert_eq!(source.database, 3);
        assert_eq!(source.password.as_deref(), Some("hunter2"));
        assert_eq!(destination.url(), "redis://dst.internal:7001/0");
        assert_eq!(destination.password, None);
        assert_eq!(destination.timeout, Duration::from_millis(500));
    }

    #[test]
    fn empty_password_means_no_auth() {
        let file = props_file("source.password=   \n");
        let store = ProfileStore::load(file.path()).unwrap();

        assert_eq!(store.profile(Role::Source).password, None);
    }

    #[test]
    fn rejects_malformed_numbers() {
        for (contents, bad_key) in [
            ("source.port=abc\n", "source.port"),
            ("redis.destination.port=0\n", "redis.destination.port"),
            ("source.port=70000\n", "source.port"),
            ("destination.database=-1\n", "destination.database"),
            ("source.timeout=soon\n", "source.timeout"),
        ] {
            let file = props_file(contents);
            match ProfileStore::load(file.path()) {
                Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, bad_key),
                other => panic!("expected invalid value for {}, got {:?}", bad_key, other),
            }
        }
    }

    #[test]
    fn failed_reload_keeps_current_profiles() {
        let good = props_file("source.host=first\n");
        let bad = props_file("source.host=second\nsource.port=nope\n");

        let mut store = ProfileStore::load(good.path()).unwrap();
        let before = store.clone();

        assert!(store.reload(bad.path()).is_err());
        assert_eq!(store, before);

        assert!(matches!(
            store.reload(Path::new("/definitely/not/here.properties")),
            Err(ConfigError::NotFound(_))
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn reload_layers_over_current_values() {
        let first = props_file("source.host=alpha\nsource.port=7000\n");
        let second = props_file("source.host=beta\n");

        let mut store = ProfileStore::load(first.path()).unwrap();
        store.reload(second.path()).unwrap();

        assert_eq!(store.profile(Role::Source).address(), "beta:7000");
    }

    #[test]
    fn debug_output_hides_password() {
        let file = props_file("source.password=hunter2\n");
        let store = ProfileStore::load(file.path()).unwrap();

        let rendered = format!("{:?}", store);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
        assert!(!store.profile(Role::Source).url().contains("hunter2"));
    }
}
