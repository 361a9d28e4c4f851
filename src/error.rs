//! Error types for mcshard

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

use crate::item::Item;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum Error {
    /// The item was not present on the server.
    #[error("cache miss")]
    CacheMiss,

    /// A compare-and-swap failed because the value was modified between the
    /// retrieve and the swap. If the value was evicted rather than replaced,
    /// `CacheMiss` is returned instead.
    #[error("compare-and-swap conflict")]
    CasConflict,

    /// A conditional store (`add` or `cas`) failed because its condition was
    /// not satisfied.
    #[error("item not stored")]
    NotStored,

    /// The key is empty, longer than 250 bytes, or contains whitespace or
    /// control characters.
    #[error("malformed key: keys must be 1-250 printable ASCII bytes without whitespace")]
    MalformedKey,

    /// No servers are configured or available.
    #[error("no servers configured or available")]
    NoServers,

    /// The server returned no statistics.
    #[error("no statistics available")]
    NoStats,

    /// Dialing the server took longer than the configured timeout.
    #[error("connect timeout to {addr}")]
    ConnectTimeout { addr: SocketAddr },

    /// The server rejected an increment or decrement with `CLIENT_ERROR`.
    #[error("client error: {0}")]
    Client(String),

    /// The server response violated the protocol.
    #[error("server error: {0}")]
    Server(#[from] ProtocolError),

    /// Network failure, including a tripped I/O deadline.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// At least one shard of a fan-out retrieve failed. `items` holds every
    /// item parsed from the shards that did respond; `source` is the last
    /// sub-task error observed.
    #[error("fan-out retrieve failed on at least one shard: {source}")]
    Fanout {
        #[source]
        source: Box<Error>,
        items: HashMap<String, Item>,
    },
}

impl Error {
    /// Returns true if this is only a protocol-level cache error that leaves
    /// the connection in a reusable state. Any other error means the
    /// connection must be closed, since half-consumed framing would poison
    /// the next operation.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Error::CacheMiss | Error::CasConflict | Error::NotStored | Error::MalformedKey
        )
    }
}

/// Response parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unexpected response line: {0:?}")]
    UnexpectedLine(String),

    #[error("corrupt value read: payload not terminated by CRLF")]
    CorruptValue,

    #[error("invalid value header in retrieve response: {0:?}")]
    BadValueHeader(String),

    #[error("invalid line in stats response: {0:?}")]
    BadStatLine(String),

    #[error("invalid numeric reply: {0:?}")]
    BadNumeric(String),
}

pub type Result<T> = std::result::Result<T, Error>;
