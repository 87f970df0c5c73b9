//! Error hierarchy shared by every layer of the client.
//!
//! Raw server replies are translated into this hierarchy at the protocol
//! boundary: an `-ERR ...` line never reaches callers as a string they have
//! to sniff. Redirects (`MOVED`/`ASK`) get their own variants because the
//! cluster layer acts on them rather than reporting them.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a server-side error, parsed from the reply prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServerErrorKind {
    /// `ERR` - generic failure
    Generic,
    /// `WRONGTYPE` - operation against a key holding the wrong kind of value
    WrongType,
    /// `NOSCRIPT` - EVALSHA for a script the server has not cached
    NoScript,
    /// `BUSY` - a script is running
    Busy,
    /// `OOM` - maxmemory reached
    OutOfMemory,
    /// `READONLY` - write against a read-only replica
    ReadOnly,
    /// `NOAUTH` - authentication required
    NoAuth,
    /// `NOPERM` - ACL denies the command
    NoPermission,
    /// `LOADING` - dataset still loading from disk
    Loading,
    /// `MASTERDOWN` - replica has lost its master
    MasterDown,
    /// `CLUSTERDOWN` - cluster cannot serve the slot
    ClusterDown,
    /// `CROSSSLOT` - multi-key operation spanning hash slots
    CrossSlot,
    /// `TRYAGAIN` - keys of a multi-key operation are being migrated
    TryAgain,
    /// `EXECABORT` - EXEC rejected because a queued command failed to queue
    ExecAbort,
    /// Any code this client does not classify
    Other,
}

/// A server error reply, classified but with the full message preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Classification parsed from the leading error code.
    pub kind: ServerErrorKind,
    /// The complete message as sent by the server.
    pub message: String,
}

impl ServerError {
    /// Classify a raw error line (without the leading `-`).
    pub fn parse(message: impl Into<String>) -> Self {
        let message = message.into();
        let code = message.split_whitespace().next().unwrap_or("");
        let kind = match code {
            "ERR" => ServerErrorKind::Generic,
            "WRONGTYPE" => ServerErrorKind::WrongType,
            "NOSCRIPT" => ServerErrorKind::NoScript,
            "BUSY" => ServerErrorKind::Busy,
            "OOM" => ServerErrorKind::OutOfMemory,
            "READONLY" => ServerErrorKind::ReadOnly,
            "NOAUTH" => ServerErrorKind::NoAuth,
            "NOPERM" => ServerErrorKind::NoPermission,
            "LOADING" => ServerErrorKind::Loading,
            "MASTERDOWN" => ServerErrorKind::MasterDown,
            "CLUSTERDOWN" => ServerErrorKind::ClusterDown,
            "CROSSSLOT" => ServerErrorKind::CrossSlot,
            "TRYAGAIN" => ServerErrorKind::TryAgain,
            "EXECABORT" => ServerErrorKind::ExecAbort,
            _ => ServerErrorKind::Other,
        };
        Self { kind, message }
    }

    /// The leading error code, if the message carries one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.message
            .split_whitespace()
            .next()
            .filter(|code| !code.is_empty() && code.chars().all(|c| c.is_ascii_uppercase()))
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

enum RedirectKind {
    Moved,
    Ask,
}

/// Common error hierarchy for all client operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO failure on the socket
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or unexpected wire data
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Error reply from the server, classified
    #[error("server error: {0}")]
    Server(ServerError),

    /// Permanent cluster redirect
    #[error("MOVED: slot {slot} is served by {host}:{port}")]
    Moved {
        /// Hash slot the key belongs to
        slot: u16,
        /// Host now serving the slot
        host: String,
        /// Port now serving the slot
        port: u16,
    },

    /// One-shot cluster redirect during slot migration
    #[error("ASK: slot {slot} redirected to {host}:{port}")]
    Ask {
        /// Hash slot the key belongs to
        slot: u16,
        /// Host to ask
        host: String,
        /// Port to ask
        port: u16,
    },

    /// Connection establishment or lifecycle failure
    #[error("connection error: {0}")]
    Connection(String),

    /// A configured deadline elapsed
    #[error("operation timed out")]
    Timeout,

    /// Reply could not be converted to the requested native type
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Cluster bookkeeping failure outside redirects
    #[error("cluster error: {0}")]
    Cluster(String),

    /// Sentinel discovery failure
    #[error("sentinel error: {0}")]
    Sentinel(String),

    /// Authentication handshake failure
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Pool exhausted or shut down
    #[error("pool error: {0}")]
    Pool(String),

    /// EXEC returned nil: a watched key changed before the transaction ran
    #[error("transaction aborted: a watched key was modified")]
    TransactionAborted,

    /// A deferred handle was read before its batch completed
    #[error("deferred result read before the batch was flushed")]
    ResultPending,

    /// The batch owning a deferred handle was dropped without completing
    #[error("batch was discarded before its results arrived")]
    BatchDiscarded,

    /// Redirect chain exceeded the configured bound
    #[error("maximum redirect attempts ({0}) exceeded")]
    MaxRedirects(usize),
}

impl Error {
    /// Translate a raw error reply line into the hierarchy.
    ///
    /// Redirects become [`Error::Moved`]/[`Error::Ask`]; everything else is
    /// classified into [`Error::Server`].
    #[must_use]
    pub fn from_error_reply(message: &str) -> Self {
        if let Some(redirect) = Self::parse_redirect(message) {
            return redirect;
        }
        Self::Server(ServerError::parse(message))
    }

    fn parse_redirect(message: &str) -> Option<Self> {
        let (kind, rest) = if let Some(rest) = message.strip_prefix("MOVED ") {
            (RedirectKind::Moved, rest)
        } else if let Some(rest) = message.strip_prefix("ASK ") {
            (RedirectKind::Ask, rest)
        } else {
            return None;
        };

        let mut parts = rest.split_whitespace();
        let slot = parts.next()?.parse::<u16>().ok()?;
        let (host, port) = parts.next()?.rsplit_once(':')?;
        let port = port.parse::<u16>().ok()?;
        let host = host.to_string();

        Some(match kind {
            RedirectKind::Moved => Self::Moved { slot, host, port },
            RedirectKind::Ask => Self::Ask { slot, host, port },
        })
    }

    /// Whether this error is a cluster redirect.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        matches!(self, Self::Moved { .. } | Self::Ask { .. })
    }

    /// Target address of a redirect error.
    #[must_use]
    pub fn redirect_target(&self) -> Option<(&str, u16)> {
        match self {
            Self::Moved { host, port, .. } | Self::Ask { host, port, .. } => {
                Some((host.as_str(), *port))
            }
            _ => None,
        }
    }

    /// Slot of a redirect error.
    #[must_use]
    pub const fn redirect_slot(&self) -> Option<u16> {
        match self {
            Self::Moved { slot, .. } | Self::Ask { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    /// Whether the connection that produced this error should be discarded.
    #[must_use]
    pub const fn is_connection_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Connection(_) | Self::Timeout)
    }

    /// Produce an equivalent error for fan-out to several deferred handles.
    ///
    /// `io::Error` is not `Clone`, so a batch failure that has to reach every
    /// outstanding handle is replicated by message instead.
    #[must_use]
    pub fn replicate(&self) -> Self {
        match self {
            Self::Io(e) => Self::Connection(e.to_string()),
            Self::Protocol(m) => Self::Protocol(m.clone()),
            Self::Server(e) => Self::Server(e.clone()),
            Self::Moved { slot, host, port } => Self::Moved {
                slot: *slot,
                host: host.clone(),
                port: *port,
            },
            Self::Ask { slot, host, port } => Self::Ask {
                slot: *slot,
                host: host.clone(),
                port: *port,
            },
            Self::Connection(m) => Self::Connection(m.clone()),
            Self::Timeout => Self::Timeout,
            Self::Conversion(m) => Self::Conversion(m.clone()),
            Self::Config(m) => Self::Config(m.clone()),
            Self::Cluster(m) => Self::Cluster(m.clone()),
            Self::Sentinel(m) => Self::Sentinel(m.clone()),
            Self::Auth(m) => Self::Auth(m.clone()),
            Self::Pool(m) => Self::Pool(m.clone()),
            Self::TransactionAborted => Self::TransactionAborted,
            Self::ResultPending => Self::ResultPending,
            Self::BatchDiscarded => Self::BatchDiscarded,
            Self::MaxRedirects(n) => Self::MaxRedirects(*n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_codes() {
        let e =
            ServerError::parse("WRONGTYPE Operation against a key holding the wrong kind of value");
        assert_eq!(e.kind, ServerErrorKind::WrongType);
        assert_eq!(e.code(), Some("WRONGTYPE"));

        let e = ServerError::parse("NOSCRIPT No matching script.");
        assert_eq!(e.kind, ServerErrorKind::NoScript);

        let e = ServerError::parse("ERR unknown command 'FOO'");
        assert_eq!(e.kind, ServerErrorKind::Generic);

        let e = ServerError::parse("SOMENEWCODE details");
        assert_eq!(e.kind, ServerErrorKind::Other);
    }

    #[test]
    fn lowercase_prefix_is_not_a_code() {
        let e = ServerError::parse("unexpected eof");
        assert_eq!(e.kind, ServerErrorKind::Other);
        assert_eq!(e.code(), None);
    }

    #[test]
    fn parses_moved_redirect() {
        let e = Error::from_error_reply("MOVED 3999 127.0.0.1:6381");
        assert!(e.is_redirect());
        assert_eq!(e.redirect_slot(), Some(3999));
        assert_eq!(e.redirect_target(), Some(("127.0.0.1", 6381)));
        assert!(matches!(e, Error::Moved { .. }));
    }

    #[test]
    fn parses_ask_redirect_with_ipv6_style_host() {
        let e = Error::from_error_reply("ASK 42 ::1:7000");
        assert_eq!(e.redirect_target(), Some(("::1", 7000)));
        assert!(matches!(e, Error::Ask { .. }));
    }

    #[test]
    fn malformed_redirect_falls_back_to_server_error() {
        let e = Error::from_error_reply("MOVED notaslot 1.2.3.4:7000");
        assert!(matches!(e, Error::Server(_)));
    }

    #[test]
    fn replicate_preserves_shape() {
        let original =
            Error::from_error_reply("CROSSSLOT Keys in request don't hash to the same slot");
        match original.replicate() {
            Error::Server(e) => assert_eq!(e.kind, ServerErrorKind::CrossSlot),
            other => panic!("unexpected replica: {other:?}"),
        }

        let io = Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(matches!(io.replicate(), Error::Connection(_)));
    }
}
