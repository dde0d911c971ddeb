//! Link to the Redis target: address parsing, RESP framing and the session.

mod error;
pub mod resp;
pub mod session;
pub mod target;

pub use error::{ProtocolError, SessionError};
pub use session::{DEFAULT_TIMEOUT, Session};
pub use target::Target;
