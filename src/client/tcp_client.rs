//! TCP client for talking RESP to a Redis server

use crate::protocol::command::parse_score;
use crate::protocol::{Command, Parser, Response};
use crate::storage::KeyValueStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// TCP client for Redis using split read/write halves.
pub struct TcpClient {
    reader: BufReader<tokio::io::ReadHalf<TcpStream>>,
    writer: BufWriter<tokio::io::WriteHalf<TcpStream>>,
    timeout: Duration,
}

impl TcpClient {
    /// Connect to a Redis server, giving up after `limit`.
    pub async fn connect(addr: &str, limit: Duration) -> Result<Self> {
        let socket = match timeout(limit, TcpStream::connect(addr)).await {
            Ok(socket) => socket?,
            Err(_) => return Err(Error::Timeout(limit.as_millis() as u64)),
        };
        socket.set_nodelay(true)?;
        let (reader, writer) = tokio::io::split(socket);

        Ok(TcpClient {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            timeout: limit,
        })
    }

    /// Execute a command and get the raw response.
    ///
    /// Server error replies come back as [`Response::Error`]; use
    /// [`TcpClient::request`] to turn them into [`Error::Server`].
    pub async fn execute(&mut self, command: Command) -> Result<Response> {
        let limit = self.timeout;
        match timeout(limit, self.round_trip(&command)).await {
            Ok(response) => response,
            Err(_) => Err(Error::Timeout(limit.as_millis() as u64)),
        }
    }

    async fn round_trip(&mut self, command: &Command) -> Result<Response> {
        debug!("Sending: {} {}", command.name(), command.key().unwrap_or(""));
        self.writer.write_all(&command.to_resp()).await?;
        self.writer.flush().await?;

        Parser::read_response(&mut self.reader).await
    }

    /// Execute a command, mapping `-ERR` replies to [`Error::Server`].
    pub async fn request(&mut self, command: Command) -> Result<Response> {
        match self.execute(command).await? {
            Response::Error(message) => Err(Error::Server(message)),
            response => Ok(response),
        }
    }

    pub async fn auth(&mut self, password: &str) -> Result<()> {
        let response = self
            .request(Command::Auth {
                password: password.to_string(),
            })
            .await?;
        expect_ok("AUTH", response)
    }

    pub async fn select(&mut self, database: u32) -> Result<()> {
        let response = self.request(Command::Select { database }).await?;
        expect_ok("SELECT", response)
    }

    async fn integer(&mut self, command: Command) -> Result<i64> {
        let name = command.name();
        match self.request(command).await? {
            Response::Integer(n) => Ok(n),
            other => Err(unexpected(name, &other)),
        }
    }

    async fn bulk_list(&mut self, command: Command) -> Result<Vec<Vec<u8>>> {
        let name = command.name();
        match self.request(command).await? {
            Response::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Response::Bulk(bytes) => Ok(bytes),
                    other => Err(unexpected(name, &other)),
                })
                .collect(),
            Response::Nil => Ok(Vec::new()),
            other => Err(unexpected(name, &other)),
        }
    }

    async fn bulk_pairs(&mut self, command: Command) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let name = command.name();
        let flat = self.bulk_list(command).await?;
        if flat.len() % 2 != 0 {
            return Err(Error::Protocol(format!(
                "{} returned an odd number of elements",
                name
            )));
        }

        let mut pairs = Vec::with_capacity(flat.len() / 2);
        let mut items = flat.into_iter();
        while let (Some(first), Some(second)) = (items.next(), items.next()) {
            pairs.push((first, second));
        }
        Ok(pairs)
    }
}

fn expect_ok(name: &str, response: Response) -> Result<()> {
    match response {
        Response::Simple(ref status) if status == "OK" => Ok(()),
        other => Err(unexpected(name, &other)),
    }
}

fn unexpected(name: &str, response: &Response) -> Error {
    Error::Protocol(format!("Unexpected reply to {}: {:?}", name, response))
}

#[async_trait]
impl KeyValueStore for TcpClient {
    async fn ping(&mut self) -> Result<()> {
        match self.request(Command::Ping).await? {
            Response::Simple(ref pong) if pong == "PONG" => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }

    async fn exists(&mut self, key: &str) -> Result<bool> {
        let count = self.integer(Command::Exists { key: key.to_string() }).await?;
        Ok(count > 0)
    }

    async fn key_type(&mut self, key: &str) -> Result<String> {
        match self.request(Command::Type { key: key.to_string() }).await? {
            Response::Simple(tag) => Ok(tag),
            other => Err(unexpected("TYPE", &other)),
        }
    }

    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.request(Command::Get { key: key.to_string() }).await? {
            Response::Bulk(bytes) => Ok(Some(bytes)),
            Response::Nil => Ok(None),
            other => Err(unexpected("GET", &other)),
        }
    }

    async fn list_range_all(&mut self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.bulk_list(Command::LRange {
            key: key.to_string(),
            start: 0,
            stop: -1,
        })
        .await
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.bulk_list(Command::SMembers { key: key.to_string() })
            .await
    }

    async fn scored_range_all(&mut self, key: &str) -> Result<Vec<(Vec<u8>, f64)>> {
        let pairs = self
            .bulk_pairs(Command::ZRangeWithScores {
                key: key.to_string(),
                start: 0,
                stop: -1,
            })
            .await?;

        pairs
            .into_iter()
            .map(|(member, raw)| match parse_score(&raw) {
                Some(score) => Ok((member, score)),
                None => Err(Error::Parse(format!(
                    "Invalid score {:?}",
                    String::from_utf8_lossy(&raw)
                ))),
            })
            .collect()
    }

    async fn map_entries(&mut self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.bulk_pairs(Command::HGetAll { key: key.to_string() })
            .await
    }

    async fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        let response = self
            .request(Command::Set {
                key: key.to_string(),
                value,
            })
            .await?;
        expect_ok("SET", response)
    }

    async fn delete(&mut self, key: &str) -> Result<bool> {
        let removed = self.integer(Command::Del { key: key.to_string() }).await?;
        Ok(removed > 0)
    }

    async fn append_list(&mut self, key: &str, values: Vec<Vec<u8>>) -> Result<()> {
        self.integer(Command::RPush {
            key: key.to_string(),
            values,
        })
        .await
        .map(|_| ())
    }

    async fn add_set_members(&mut self, key: &str, members: Vec<Vec<u8>>) -> Result<()> {
        self.integer(Command::SAdd {
            key: key.to_string(),
            members,
        })
        .await
        .map(|_| ())
    }

    async fn add_scored_members(&mut self, key: &str, members: Vec<(Vec<u8>, f64)>) -> Result<()> {
        self.integer(Command::ZAdd {
            key: key.to_string(),
            members,
        })
        .await
        .map(|_| ())
    }

    async fn write_map_entries(
        &mut self,
        key: &str,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<()> {
        self.integer(Command::HSet {
            key: key.to_string(),
            entries,
        })
        .await
        .map(|_| ())
    }

    async fn ttl(&mut self, key: &str) -> Result<Option<u64>> {
        // -2: no such key, -1: no expiry
        let ttl = self.integer(Command::Ttl { key: key.to_string() }).await?;
        Ok(u64::try_from(ttl).ok())
    }

    async fn expire(&mut self, key: &str, seconds: u64) -> Result<bool> {
        let applied = self
            .integer(Command::Expire {
                key: key.to_string(),
                seconds,
            })
            .await?;
        Ok(applied == 1)
    }
}
