//! Building, probing, and owning the two endpoint handles

use crate::client::TcpClient;
use crate::config::{ConnectionProfile, ProfileStore, Role};
use crate::storage::KeyValueStore;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};

/// Opens a live handle from a connection profile
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: KeyValueStore;

    async fn open(&self, role: Role, profile: &ConnectionProfile) -> Result<Self::Handle>;
}

/// Opens RESP connections over TCP, authenticating and selecting the database
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Handle = TcpClient;

    async fn open(&self, role: Role, profile: &ConnectionProfile) -> Result<TcpClient> {
        debug!("Opening {} connection to {}", role, profile.url());
        let mut client = TcpClient::connect(&profile.address(), profile.timeout).await?;

        if let Some(password) = &profile.password {
            client.auth(password).await?;
        }
        if profile.database != 0 {
            client.select(profile.database).await?;
        }

        Ok(client)
    }
}

/// Result of checking one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Connected,
    /// The handle could not be built (connect, auth or select failed).
    Unavailable(String),
    /// The handle was built but did not answer the liveness check.
    Unresponsive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub role: Role,
    pub address: String,
    pub reachability: Reachability,
}

impl EndpointStatus {
    pub fn is_connected(&self) -> bool {
        self.reachability == Reachability::Connected
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reachability {
            Reachability::Connected => {
                write!(f, "✓ {} Redis connected: {}", self.role.title(), self.address)
            }
            Reachability::Unavailable(reason) => write!(
                f,
                "✗ Failed to connect to {} Redis: {}\n  Reason: {}",
                self.role, self.address, reason
            ),
            Reachability::Unresponsive => write!(
                f,
                "✗ Failed to connect to {} Redis: {}\n  Reason: no reply to PING",
                self.role, self.address
            ),
        }
    }
}

/// Outcome of [`ConnectionManager::verify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub source: EndpointStatus,
    pub destination: EndpointStatus,
}

impl Verification {
    /// True only when both endpoints answered.
    pub fn is_ok(&self) -> bool {
        self.source.is_connected() && self.destination.is_connected()
    }

    pub fn statuses(&self) -> [&EndpointStatus; 2] {
        [&self.source, &self.destination]
    }

    /// One line per unreachable endpoint, for reporting a failed copy.
    pub fn failure_summary(&self) -> String {
        self.statuses()
            .iter()
            .filter(|status| !status.is_connected())
            .map(|status| match &status.reachability {
                Reachability::Unavailable(reason) => {
                    format!("{} unreachable at {}: {}", status.role, status.address, reason)
                }
                _ => format!("{} not responding at {}", status.role, status.address),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Owns the source and destination handles.
///
/// Handles are rebuilt from the current profiles on every [`verify`](Self::verify);
/// nothing is pooled or reused between calls.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    source: Option<C::Handle>,
    destination: Option<C::Handle>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C) -> Self {
        ConnectionManager {
            connector,
            source: None,
            destination: None,
        }
    }

    /// Construct a handle for one endpoint. Failures are returned, never panicked.
    pub async fn build(&self, role: Role, profile: &ConnectionProfile) -> Result<C::Handle> {
        self.connector.open(role, profile).await
    }

    /// Liveness check; any error counts as not alive.
    pub async fn probe(handle: &mut C::Handle) -> bool {
        match handle.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Ping failed: {}", e);
                false
            }
        }
    }

    /// Drop any existing handles, build both endpoints afresh from `profiles`
    /// and probe each one independently.
    pub async fn verify(&mut self, profiles: &ProfileStore) -> Verification {
        self.source = None;
        self.destination = None;

        let (source, source_status) = self.check(Role::Source, profiles.profile(Role::Source)).await;
        let (destination, destination_status) = self
            .check(Role::Destination, profiles.profile(Role::Destination))
            .await;

        self.source = source;
        self.destination = destination;

        let verification = Verification {
            source: source_status,
            destination: destination_status,
        };
        info!("Connection check: ok={}", verification.is_ok());
        verification
    }

    async fn check(
        &self,
        role: Role,
        profile: &ConnectionProfile,
    ) -> (Option<C::Handle>, EndpointStatus) {
        let address = profile.url();

        let (handle, reachability) = match self.build(role, profile).await {
            Ok(mut handle) => {
                if Self::probe(&mut handle).await {
                    (Some(handle), Reachability::Connected)
                } else {
                    (Some(handle), Reachability::Unresponsive)
                }
            }
            Err(e) => {
                debug!("{} Redis connection failed: {}", role.title(), e);
                (None, Reachability::Unavailable(e.to_string()))
            }
        };

        (
            handle,
            EndpointStatus {
                role,
                address,
                reachability,
            },
        )
    }

    /// Both handles, if both were built by the last [`verify`](Self::verify).
    pub fn endpoints(&mut self) -> Option<(&mut C::Handle, &mut C::Handle)> {
        match (self.source.as_mut(), self.destination.as_mut()) {
            (Some(source), Some(destination)) => Some((source, destination)),
            _ => None,
        }
    }

    /// Release both handles.
    pub fn disconnect(&mut self) {
        self.source = None;
        self.destination = None;
    }
}
