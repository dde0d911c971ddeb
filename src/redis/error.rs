use std::io;
use thiserror::Error;

/// Failure of a single cycle's link to the target. Never fatal to the process.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("dial redis {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("redis {addr} INFO: {source}")]
    Request {
        addr: String,
        #[source]
        source: ProtocolError,
    },
}

impl SessionError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Request { .. } => "request",
        }
    }
}

/// RESP level errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("server error: {0}")]
    Server(String),

    #[error("unexpected reply: {0}")]
    Unexpected(String),

    #[error("reply is not valid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Collapse into an `io::Error`, keeping the kind of transport failures.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        match self {
            Self::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
