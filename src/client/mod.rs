//! Client module for connecting to Redis servers

pub mod tcp_client;

pub use tcp_client::TcpClient;
