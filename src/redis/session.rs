use super::error::{ProtocolError, SessionError};
use super::resp::{Reply, encode_command, read_reply};
use super::target::Target;
use secrecy::ExposeSecret;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

/// Bound applied to connect, every write and every read.
///
/// A stuck server holds the cycle lock until this fires, so it is the
/// effective liveness bound of the whole exporter.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

type Connection = BufStream<TcpStream>;

/// Owns the link to one Redis target across collection cycles.
///
/// The connection is dialed lazily, reused while healthy and dropped on the
/// first failed request so the next cycle starts from a fresh dial.
pub struct Session {
    target: Target,
    timeout: Duration,
    conn: Option<Connection>,
}

impl Session {
    #[must_use]
    pub const fn new(target: Target, timeout: Duration) -> Self {
        Self {
            target,
            timeout,
            conn: None,
        }
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Check the connection out of the session, dialing (and authenticating)
    /// if there is none.
    ///
    /// The session stays empty until the connection is handed back with
    /// [`Session::release`], so a request abandoned midway never leaves a
    /// half-read reply on a pooled connection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Connect` if the dial, or the `AUTH` exchange on a
    /// fresh connection, fails or times out; the session stays empty.
    pub async fn acquire(&mut self) -> Result<Connection, SessionError> {
        match self.conn.take() {
            Some(conn) => Ok(conn),
            None => self.dial().await,
        }
    }

    /// Return a connection whose last request completed cleanly.
    pub fn release(&mut self, conn: Connection) {
        self.conn = Some(conn);
    }

    /// Close and forget the current connection.
    pub fn invalidate(&mut self) {
        if self.conn.take().is_some() {
            debug!(addr = %self.target.addr(), "dropped redis connection");
        }
    }

    /// Run `INFO all` over the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Connect` if no connection could be made and
    /// `SessionError::Request` if the request failed; in the latter case the
    /// connection has been closed.
    #[instrument(skip(self), level = "debug", fields(addr = %self.target.addr()))]
    pub async fn info(&mut self) -> Result<String, SessionError> {
        let mut conn = self.acquire().await?;

        let args = [b"INFO".as_slice(), b"all".as_slice()];
        let result = roundtrip(&mut conn, &args, self.timeout)
            .await
            .and_then(Reply::into_text);

        match result {
            Ok(text) => {
                debug!(bytes = text.len(), "received INFO report");
                self.release(conn);
                Ok(text)
            }
            Err(source) => {
                error!(addr = %self.target.addr(), error = %source, "redis INFO failed");
                drop(conn);
                Err(SessionError::Request {
                    addr: self.target.addr().to_string(),
                    source,
                })
            }
        }
    }

    async fn dial(&self) -> Result<Connection, SessionError> {
        let addr = self.target.addr();

        let stream = match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(self.connect_failed(source)),
            Err(_) => return Err(self.connect_failed(timed_out(self.timeout))),
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(addr, error = %e, "could not set TCP_NODELAY");
        }

        let mut conn = BufStream::new(stream);
        debug!(addr, "connected to redis");

        // A rejected AUTH is not fatal here: it surfaces as a NOAUTH error on INFO.
        // A transport failure is: the AUTH reply may still be in flight.
        if let Some(password) = self.target.credential() {
            let args = [b"AUTH".as_slice(), password.expose_secret().as_bytes()];
            match roundtrip(&mut conn, &args, self.timeout).await {
                Ok(Reply::Error(e)) => warn!(addr, error = %e, "redis AUTH rejected"),
                Ok(_) => debug!(addr, "redis AUTH accepted"),
                Err(e) => {
                    warn!(addr, error = %e, "redis AUTH failed");
                    return Err(self.connect_failed(e.into_io()));
                }
            }
        }

        Ok(conn)
    }

    fn connect_failed(&self, source: io::Error) -> SessionError {
        error!(addr = %self.target.addr(), error = %source, "dial redis failed");
        SessionError::Connect {
            addr: self.target.addr().to_string(),
            source,
        }
    }
}

fn timed_out(limit: Duration) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("timed out after {limit:?}"))
}

async fn roundtrip(
    conn: &mut Connection,
    args: &[&[u8]],
    limit: Duration,
) -> Result<Reply, ProtocolError> {
    let request = encode_command(args);

    timeout(limit, async {
        conn.write_all(&request).await?;
        conn.flush().await
    })
    .await
    .map_err(|_| timed_out(limit))??;

    timeout(limit, read_reply(conn))
        .await
        .map_err(|_| ProtocolError::Io(timed_out(limit)))?
}
