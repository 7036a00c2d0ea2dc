//! Parser for Redis protocol replies

use crate::protocol::Response;
use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest bulk string a Redis server will send (proto-max-bulk-len).
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Upper bound on array preallocation; longer arrays grow as items arrive.
const ARRAY_PREALLOC: usize = 1024;

type ReplyFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

pub struct Parser;

impl Parser {
    /// Read one complete RESP2 reply from the stream.
    pub fn read_response<'a, R>(reader: &'a mut R) -> ReplyFuture<'a>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        // Arrays nest, so the future is boxed to allow recursion.
        Box::pin(async move {
            let line = Self::read_line(&mut *reader).await?;
            let (prefix, body) = match line.chars().next() {
                Some(prefix) => (prefix, &line[prefix.len_utf8()..]),
                None => return Err(Error::Parse("Empty reply line".to_string())),
            };

            match prefix {
                '+' => Ok(Response::Simple(body.to_string())),
                '-' => Ok(Response::Error(body.to_string())),
                ':' => Self::parse_integer(body).map(Response::Integer),
                '$' => Self::read_bulk(&mut *reader, body).await,
                '*' => {
                    let len = Self::parse_integer(body)?;
                    if len < 0 {
                        return Ok(Response::Nil);
                    }

                    let mut items = Vec::with_capacity((len as usize).min(ARRAY_PREALLOC));
                    for _ in 0..len {
                        items.push(Self::read_response(&mut *reader).await?);
                    }
                    Ok(Response::Array(items))
                }
                other => Err(Error::Parse(format!("Invalid reply prefix: {:?}", other))),
            }
        })
    }

    async fn read_line<R>(reader: &mut R) -> Result<String>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(Error::Connection("Connection closed by server".into()));
        }

        if !line.ends_with("\r\n") {
            return Err(Error::Protocol("Reply line not terminated by CRLF".to_string()));
        }
        line.truncate(line.len() - 2);
        Ok(line)
    }

    async fn read_bulk<R>(reader: &mut R, header: &str) -> Result<Response>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let len = Self::parse_integer(header)?;
        if len < 0 {
            return Ok(Response::Nil);
        }

        let len = len as usize;
        if len > MAX_BULK_LEN {
            return Err(Error::Protocol(format!(
                "Bulk string of {} bytes exceeds the {} byte limit",
                len, MAX_BULK_LEN
            )));
        }
        let mut buffer = vec![0; len + 2]; // +2 for trailing \r\n
        reader.read_exact(&mut buffer).await?;

        if &buffer[len..] != b"\r\n" {
            return Err(Error::Protocol("Bulk string length mismatch".to_string()));
        }
        buffer.truncate(len);
        Ok(Response::Bulk(buffer))
    }

    fn parse_integer(text: &str) -> Result<i64> {
        text.parse::<i64>()
            .map_err(|_| Error::Parse(format!("Invalid integer in reply: {:?}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn parse(input: &[u8]) -> Result<Response> {
        let mut reader = BufReader::new(input);
        Parser::read_response(&mut reader).await
    }

    #[tokio::test]
    async fn parses_scalar_replies() {
        assert_eq!(
            parse(b"+PONG\r\n").await.unwrap(),
            Response::Simple("PONG".to_string())
        );
        assert_eq!(parse(b":-2\r\n").await.unwrap(), Response::Integer(-2));
        assert_eq!(
            parse(b"-WRONGTYPE Operation against a key\r\n").await.unwrap(),
            Response::Error("WRONGTYPE Operation against a key".to_string())
        );
    }

    #[tokio::test]
    async fn bulk_strings_are_binary_safe() {
        let reply = parse(b"$6\r\na\r\nb\x00c\r\n").await.unwrap();
        assert_eq!(reply, Response::Bulk(b"a\r\nb\x00c".to_vec()));
        assert_eq!(parse(b"$0\r\n\r\n").await.unwrap(), Response::Bulk(Vec::new()));
    }

    #[tokio::test]
    async fn null_bulk_and_null_array_are_nil() {
        assert_eq!(parse(b"$-1\r\n").await.unwrap(), Response::Nil);
        assert_eq!(parse(b"*-1\r\n").await.unwrap(), Response::Nil);
    }

    #[tokio::test]
    async fn parses_nested_arrays() {
        let reply = parse(b"*3\r\n$3\r\nbob\r\n$3\r\n1.5\r\n*2\r\n:1\r\n$-1\r\n")
            .await
            .unwrap();

        assert_eq!(
            reply,
            Response::Array(vec![
                Response::Bulk(b"bob".to_vec()),
                Response::Bulk(b"1.5".to_vec()),
                Response::Array(vec![Response::Integer(1), Response::Nil]),
            ])
        );
    }

    #[tokio::test]
    async fn reads_consecutive_replies_from_one_stream() {
        let mut reader = BufReader::new(&b"+OK\r\n:7\r\n"[..]);

        assert_eq!(
            Parser::read_response(&mut reader).await.unwrap(),
            Response::Simple("OK".to_string())
        );
        assert_eq!(
            Parser::read_response(&mut reader).await.unwrap(),
            Response::Integer(7)
        );
    }

    #[tokio::test]
    async fn rejects_malformed_replies() {
        assert!(matches!(parse(b"?what\r\n").await, Err(Error::Parse(_))));
        assert!(matches!(parse(b":abc\r\n").await, Err(Error::Parse(_))));
        assert!(matches!(parse(b"$3\r\nabcd\r\n").await, Err(Error::Protocol(_))));
        assert!(matches!(parse(b"+OK").await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn oversized_bulk_header_is_rejected_before_reading() {
        assert!(matches!(
            parse(b"$9223372036854775807\r\n").await,
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            parse(b"$536870913\r\nabc\r\n").await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn huge_array_header_fails_on_missing_items() {
        assert!(matches!(
            parse(b"*9223372036854775807\r\n:1\r\n").await,
            Err(Error::Connection(_))
        ));
    }

    #[tokio::test]
    async fn closed_stream_is_a_connection_error() {
        assert!(matches!(parse(b"").await, Err(Error::Connection(_))));
        assert!(matches!(parse(b"$5\r\nab").await, Err(Error::Io(_))));
    }
}
