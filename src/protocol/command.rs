//! Request-side encoding for the memcached ASCII protocol

use bytes::BytesMut;
use itoa::Buffer;

/// Maximum key length (memcached spec)
pub const MAX_KEY_LENGTH: usize = 250;

/// Check if a key is legal: 1-250 bytes, printable ASCII, no whitespace
/// or control characters.
pub fn legal_key(key: &str) -> bool {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return false;
    }
    key.bytes().all(|b| b > 0x20 && b <= 0x7e)
}

/// Request writer for the memcached ASCII protocol.
///
/// Composes a complete request (command line plus any payload) so it can be
/// flushed to the socket in a single write.
pub struct RequestWriter {
    buf: BytesMut,
}

impl RequestWriter {
    /// Create a new request writer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the internal buffer
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Write a CAS-enabled retrieve request
    /// Format: gets <key>*\r\n
    pub fn gets<S: AsRef<str>>(&mut self, keys: &[S]) {
        self.buf.extend_from_slice(b"gets");
        for key in keys {
            self.buf.extend_from_slice(b" ");
            self.buf.extend_from_slice(key.as_ref().as_bytes());
        }
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Write a store request
    /// Format: <verb> <key> <flags> <exptime> <bytes>[ <casid>]\r\n<data>\r\n
    pub fn store(
        &mut self,
        verb: &str,
        key: &str,
        flags: u32,
        expiration: i32,
        value: &[u8],
        casid: Option<u64>,
    ) {
        let mut itoa_buf = Buffer::new();
        self.buf.extend_from_slice(verb.as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf.extend_from_slice(itoa_buf.format(flags).as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf
            .extend_from_slice(itoa_buf.format(expiration).as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf
            .extend_from_slice(itoa_buf.format(value.len()).as_bytes());
        if let Some(casid) = casid {
            self.buf.extend_from_slice(b" ");
            self.buf.extend_from_slice(itoa_buf.format(casid).as_bytes());
        }
        self.buf.extend_from_slice(b"\r\n");
        self.buf.extend_from_slice(value);
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Write a delete request
    /// Format: delete <key>\r\n
    pub fn delete(&mut self, key: &str) {
        self.buf.extend_from_slice(b"delete ");
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Write an increment or decrement request
    /// Format: incr|decr <key> <delta>\r\n
    pub fn incr_decr(&mut self, verb: &str, key: &str, delta: u64) {
        let mut itoa_buf = Buffer::new();
        self.buf.extend_from_slice(verb.as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.extend_from_slice(b" ");
        self.buf.extend_from_slice(itoa_buf.format(delta).as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Write a statistics request
    /// Format: stats[ <argument>]\r\n
    pub fn stats(&mut self, argument: Option<&str>) {
        self.buf.extend_from_slice(b"stats");
        if let Some(argument) = argument {
            self.buf.extend_from_slice(b" ");
            self.buf.extend_from_slice(argument.as_bytes());
        }
        self.buf.extend_from_slice(b"\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_key() {
        assert!(legal_key("valid_key"));
        assert!(legal_key("key-with-dashes"));
        assert!(legal_key("key:with:colons"));
        assert!(legal_key(&"a".repeat(250)));
        assert!(!legal_key(""));
        assert!(!legal_key(&"a".repeat(251)));
        assert!(!legal_key("key with space"));
        assert!(!legal_key("key\twith\ttab"));
        assert!(!legal_key("key\u{7f}del"));
    }

    #[test]
    fn test_gets() {
        let mut writer = RequestWriter::new(64);
        writer.gets(&["foo", "bar", "baz"]);
        assert_eq!(writer.buffer(), b"gets foo bar baz\r\n");
    }

    #[test]
    fn test_store_without_cas() {
        let mut writer = RequestWriter::new(64);
        writer.store("set", "mykey", 42, 3600, b"hello", None);
        assert_eq!(writer.buffer(), b"set mykey 42 3600 5\r\nhello\r\n");
    }

    #[test]
    fn test_store_with_cas() {
        let mut writer = RequestWriter::new(64);
        writer.store("cas", "mykey", 0, 0, b"hi", Some(77));
        assert_eq!(writer.buffer(), b"cas mykey 0 0 2 77\r\nhi\r\n");
    }

    #[test]
    fn test_store_negative_expiration() {
        let mut writer = RequestWriter::new(64);
        writer.store("set", "k", 0, -1, b"", None);
        assert_eq!(writer.buffer(), b"set k 0 -1 0\r\n\r\n");
    }

    #[test]
    fn test_delete() {
        let mut writer = RequestWriter::new(64);
        writer.delete("mykey");
        assert_eq!(writer.buffer(), b"delete mykey\r\n");
    }

    #[test]
    fn test_incr_decr() {
        let mut writer = RequestWriter::new(64);
        writer.incr_decr("incr", "counter", 5);
        assert_eq!(writer.buffer(), b"incr counter 5\r\n");

        let mut writer = RequestWriter::new(64);
        writer.incr_decr("decr", "counter", 100);
        assert_eq!(writer.buffer(), b"decr counter 100\r\n");
    }

    #[test]
    fn test_stats() {
        let mut writer = RequestWriter::new(64);
        writer.stats(None);
        assert_eq!(writer.buffer(), b"stats\r\n");

        let mut writer = RequestWriter::new(64);
        writer.stats(Some("items"));
        assert_eq!(writer.buffer(), b"stats items\r\n");
    }
}
