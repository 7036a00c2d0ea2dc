//! Connection module: endpoint handles and reachability checks

pub mod manager;

pub use manager::{
    ConnectionManager, Connector, EndpointStatus, Reachability, TcpConnector, Verification,
};
