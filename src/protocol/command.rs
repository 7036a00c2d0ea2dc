//! Command definitions and RESP request encoding

/// Redis commands needed to inspect, read, and rewrite a single key
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Auth { password: String },
    Select { database: u32 },
    Ping,
    Exists { key: String },
    Type { key: String },
    Get { key: String },
    LRange { key: String, start: i64, stop: i64 },
    SMembers { key: String },
    ZRangeWithScores { key: String, start: i64, stop: i64 },
    HGetAll { key: String },
    Set { key: String, value: Vec<u8> },
    Del { key: String },
    RPush { key: String, values: Vec<Vec<u8>> },
    SAdd { key: String, members: Vec<Vec<u8>> },
    ZAdd { key: String, members: Vec<(Vec<u8>, f64)> },
    HSet { key: String, entries: Vec<(Vec<u8>, Vec<u8>)> },
    Ttl { key: String },
    Expire { key: String, seconds: u64 },
}

/// Response from command execution
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Nil,
    Array(Vec<Response>),
}

impl Command {
    /// Get command name as string
    pub fn name(&self) -> &'static str {
        match self {
            Command::Auth { .. } => "AUTH",
            Command::Select { .. } => "SELECT",
            Command::Ping => "PING",
            Command::Exists { .. } => "EXISTS",
            Command::Type { .. } => "TYPE",
            Command::Get { .. } => "GET",
            Command::LRange { .. } => "LRANGE",
            Command::SMembers { .. } => "SMEMBERS",
            Command::ZRangeWithScores { .. } => "ZRANGE",
            Command::HGetAll { .. } => "HGETALL",
            Command::Set { .. } => "SET",
            Command::Del { .. } => "DEL",
            Command::RPush { .. } => "RPUSH",
            Command::SAdd { .. } => "SADD",
            Command::ZAdd { .. } => "ZADD",
            Command::HSet { .. } => "HSET",
            Command::Ttl { .. } => "TTL",
            Command::Expire { .. } => "EXPIRE",
        }
    }

    /// Key the command operates on, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Auth { .. } | Command::Select { .. } | Command::Ping => None,
            Command::Exists { key }
            | Command::Type { key }
            | Command::Get { key }
            | Command::LRange { key, .. }
            | Command::SMembers { key }
            | Command::ZRangeWithScores { key, .. }
            | Command::HGetAll { key }
            | Command::Set { key, .. }
            | Command::Del { key }
            | Command::RPush { key, .. }
            | Command::SAdd { key, .. }
            | Command::ZAdd { key, .. }
            | Command::HSet { key, .. }
            | Command::Ttl { key }
            | Command::Expire { key, .. } => Some(key),
        }
    }

    /// Arguments following the command name, in wire order
    fn args(&self) -> Vec<Vec<u8>> {
        let key_arg = |key: &str| key.as_bytes().to_vec();

        match self {
            Command::Auth { password } => vec![password.as_bytes().to_vec()],
            Command::Select { database } => vec![database.to_string().into_bytes()],
            Command::Ping => Vec::new(),
            Command::Exists { key }
            | Command::Type { key }
            | Command::Get { key }
            | Command::SMembers { key }
            | Command::HGetAll { key }
            | Command::Del { key }
            | Command::Ttl { key } => vec![key_arg(key)],
            Command::LRange { key, start, stop } => vec![
                key_arg(key),
                start.to_string().into_bytes(),
                stop.to_string().into_bytes(),
            ],
            Command::ZRangeWithScores { key, start, stop } => vec![
                key_arg(key),
                start.to_string().into_bytes(),
                stop.to_string().into_bytes(),
                b"WITHSCORES".to_vec(),
            ],
            Command::Set { key, value } => vec![key_arg(key), value.clone()],
            Command::RPush { key, values: items } | Command::SAdd { key, members: items } => {
                let mut args = Vec::with_capacity(items.len() + 1);
                args.push(key_arg(key));
                args.extend(items.iter().cloned());
                args
            }
            Command::ZAdd { key, members } => {
                let mut args = Vec::with_capacity(members.len() * 2 + 1);
                args.push(key_arg(key));
                for (member, score) in members {
                    args.push(format_score(*score).into_bytes());
                    args.push(member.clone());
                }
                args
            }
            Command::HSet { key, entries } => {
                let mut args = Vec::with_capacity(entries.len() * 2 + 1);
                args.push(key_arg(key));
                for (field, value) in entries {
                    args.push(field.clone());
                    args.push(value.clone());
                }
                args
            }
            Command::Expire { key, seconds } => {
                vec![key_arg(key), seconds.to_string().into_bytes()]
            }
        }
    }

    /// Convert command to RESP format (an array of bulk strings).
    pub fn to_resp(&self) -> Vec<u8> {
        let args = self.args();
        let mut out = Vec::new();

        out.extend_from_slice(format!("*{}\r\n", args.len() + 1).as_bytes());
        push_bulk(&mut out, self.name().as_bytes());
        for arg in &args {
            push_bulk(&mut out, arg);
        }

        out
    }
}

fn push_bulk(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
}

/// Render a sorted set score the way Redis accepts it back.
pub fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        score.to_string()
    }
}

/// Parse a score string returned by ZRANGE WITHSCORES.
pub fn parse_score(raw: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(raw).ok()?;
    match text.to_ascii_lowercase().as_str() {
        "inf" | "+inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_set_as_bulk_array() {
        let cmd = Command::Set {
            key: "user:1001".to_string(),
            value: b"alice".to_vec(),
        };

        assert_eq!(
            cmd.to_resp(),
            b"*3\r\n$3\r\nSET\r\n$9\r\nuser:1001\r\n$5\r\nalice\r\n".to_vec()
        );
    }

    #[test]
    fn encodes_ping_without_arguments() {
        assert_eq!(Command::Ping.to_resp(), b"*1\r\n$4\r\nPING\r\n".to_vec());
    }

    #[test]
    fn zadd_puts_score_before_member() {
        let cmd = Command::ZAdd {
            key: "board".to_string(),
            members: vec![(b"bob".to_vec(), 1.5), (b"eve".to_vec(), f64::INFINITY)],
        };

        let expected = b"*6\r\n$4\r\nZADD\r\n$5\r\nboard\r\n$3\r\n1.5\r\n$3\r\nbob\r\n$4\r\n+inf\r\n$3\r\neve\r\n";
        assert_eq!(cmd.to_resp(), expected.to_vec());
    }

    #[test]
    fn zrange_requests_scores() {
        let cmd = Command::ZRangeWithScores {
            key: "z".to_string(),
            start: 0,
            stop: -1,
        };
        let encoded = String::from_utf8(cmd.to_resp()).unwrap();

        assert!(encoded.starts_with("*5\r\n$6\r\nZRANGE\r\n"));
        assert!(encoded.ends_with("$2\r\n-1\r\n$10\r\nWITHSCORES\r\n"));
    }

    #[test]
    fn bulk_lengths_count_bytes_not_chars() {
        let cmd = Command::Get {
            key: "clé".to_string(),
        };

        assert_eq!(cmd.to_resp(), "*2\r\n$3\r\nGET\r\n$4\r\nclé\r\n".as_bytes().to_vec());
    }

    #[test]
    fn key_is_none_for_connection_commands() {
        assert_eq!(Command::Ping.key(), None);
        assert_eq!(Command::Select { database: 3 }.key(), None);
        assert_eq!(
            Command::Ttl {
                key: "k".to_string()
            }
            .key(),
            Some("k")
        );
    }

    #[test]
    fn scores_round_trip_through_text() {
        for score in [0.0, -2.25, 1e-7, 12345678.0, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(parse_score(format_score(score).as_bytes()), Some(score));
        }
        assert_eq!(parse_score(b"inf"), Some(f64::INFINITY));
        assert_eq!(parse_score(b"abc"), None);
    }
}
