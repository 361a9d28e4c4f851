//! The unit of cache content

/// An item to be stored in or retrieved from a memcached server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    /// The item's key (1-250 printable ASCII bytes, no whitespace).
    pub key: String,

    /// The item's value.
    pub value: Vec<u8>,

    /// Server-opaque flags stored alongside the value; their semantics are
    /// entirely up to the application.
    pub flags: u32,

    /// Expiration time in seconds: either a relative time from now (up to
    /// 30 days) or an absolute Unix epoch time. Zero means no expiration.
    /// Passed through to the server unchanged.
    pub expiration: i32,

    /// Compare-and-swap token. Populated only by retrieval; required for
    /// [`compare_and_swap`](crate::Client::compare_and_swap).
    pub(crate) casid: u64,
}

impl Item {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Item {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_expiration(mut self, expiration: i32) -> Self {
        self.expiration = expiration;
        self
    }
}
