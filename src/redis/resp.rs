//! Minimal RESP2 codec: enough to send `AUTH`/`INFO` and read their replies.

use super::error::ProtocolError;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest bulk string accepted, matching the server's `proto-max-bulk-len` default.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK\r\n`
    Simple(String),
    /// `-ERR message\r\n`
    Error(String),
    /// `:1000\r\n`
    Integer(i64),
    /// `$6\r\nfoobar\r\n`, `None` for `$-1\r\n`
    Bulk(Option<Vec<u8>>),
}

impl Reply {
    /// Interpret a bulk reply as text, turning error replies into `ProtocolError::Server`.
    ///
    /// # Errors
    ///
    /// Returns an error for error replies, simple/nil/integer replies and invalid UTF-8.
    pub fn into_text(self) -> Result<String, ProtocolError> {
        match self {
            Self::Bulk(Some(data)) => String::from_utf8(data).map_err(|_| ProtocolError::InvalidUtf8),
            Self::Error(e) => Err(ProtocolError::Server(e)),
            other => Err(ProtocolError::Unexpected(format!("{other:?}"))),
        }
    }
}

/// Encode a command as a RESP array of bulk strings.
#[must_use]
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());

    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }

    buf
}

/// Read exactly one reply.
///
/// # Errors
///
/// Returns an error on I/O failure, EOF, or a malformed/unsupported reply.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed").into());
    }

    let line = line.trim_end_matches(['\r', '\n']);
    let mut chars = line.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ProtocolError::Unexpected("empty reply line".to_string()))?;
    let content = chars.as_str();

    match kind {
        '+' => Ok(Reply::Simple(content.to_string())),
        '-' => Ok(Reply::Error(content.to_string())),
        ':' => content
            .parse::<i64>()
            .map(Reply::Integer)
            .map_err(|_| ProtocolError::Unexpected(format!("invalid integer {content:?}"))),
        '$' => {
            let len: i64 = content
                .parse()
                .map_err(|_| ProtocolError::Unexpected(format!("invalid bulk length {content:?}")))?;

            let Ok(len) = usize::try_from(len) else {
                return Ok(Reply::Bulk(None));
            };

            if len > MAX_BULK_LEN {
                return Err(ProtocolError::Unexpected(format!(
                    "bulk length {len} exceeds {MAX_BULK_LEN}"
                )));
            }

            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data).await?;

            if !data.ends_with(b"\r\n") {
                return Err(ProtocolError::Unexpected(
                    "bulk string not terminated by CRLF".to_string(),
                ));
            }
            data.truncate(len);

            Ok(Reply::Bulk(Some(data)))
        }
        other => Err(ProtocolError::Unexpected(format!(
            "unsupported reply type {other:?}"
        ))),
    }
}
