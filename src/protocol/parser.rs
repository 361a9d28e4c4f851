//! Incremental parsing of memcached ASCII responses
//!
//! Parsers operate on a byte buffer that may hold a partial response and
//! report how many bytes they consumed. The connection layer reads more
//! data on `NeedMoreData` and splits off consumed bytes on `Complete`, so
//! multi-record responses are surfaced one record at a time without ever
//! buffering the whole response.

use crate::error::ProtocolError;
use crate::item::Item;

/// Result of parsing one reply or record
#[derive(Debug)]
pub enum ParseResult<T> {
    /// Reply fully parsed; the second field is the number of bytes consumed
    Complete(T, usize),
    /// Need more data to complete parsing
    NeedMoreData,
    /// Parse error; the connection is no longer usable
    Error(ProtocolError),
}

/// One record of a `gets` response stream
#[derive(Debug)]
pub enum GetRecord {
    /// A VALUE record with its payload
    Value(Item),
    /// The END terminator
    End,
}

/// Single-line reply to a store or delete command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    Stored,
    NotStored,
    Exists,
    NotFound,
    Deleted,
}

impl CommandReply {
    /// The wire form of this reply, without the terminator
    pub fn as_line(&self) -> &'static str {
        match self {
            CommandReply::Stored => "STORED",
            CommandReply::NotStored => "NOT_STORED",
            CommandReply::Exists => "EXISTS",
            CommandReply::NotFound => "NOT_FOUND",
            CommandReply::Deleted => "DELETED",
        }
    }
}

/// Reply to an incr or decr command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncrDecrReply {
    /// The new value after the operation
    Value(u64),
    NotFound,
    /// CLIENT_ERROR with the message from the rest of the line
    ClientError(String),
}

/// One record of a stats response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatRecord {
    Stat { name: String, value: Vec<u8> },
    End,
}

/// Find \r\n in buffer using SIMD-accelerated search
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    memchr::memchr(b'\r', buf).filter(|&i| buf.get(i + 1) == Some(&b'\n'))
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn parse_ascii<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Parse the next record of a retrieve response.
///
/// A record is either `END\r\n` or a value header in one of two forms,
/// dispatched on field count:
///
/// ```text
/// VALUE <key> <flags> <bytes> <casid>\r\n<data>\r\n
/// VALUE <key> <flags> <bytes>\r\n<data>\r\n
/// ```
///
/// Exactly `<bytes> + 2` payload bytes are consumed; a payload whose final
/// two bytes are not `\r\n` is a corrupt read.
pub fn parse_get_record(buf: &[u8]) -> ParseResult<GetRecord> {
    let line_end = match find_crlf(buf) {
        Some(pos) => pos,
        None => return ParseResult::NeedMoreData,
    };
    let line = &buf[..line_end];

    if line == b"END" {
        return ParseResult::Complete(GetRecord::End, line_end + 2);
    }

    let mut parts = line.split(|&b| b == b' ');
    if parts.next() != Some(b"VALUE".as_slice()) {
        return ParseResult::Error(ProtocolError::UnexpectedLine(lossy(line)));
    }
    let fields: Vec<&[u8]> = parts.collect();
    if fields.len() != 3 && fields.len() != 4 {
        return ParseResult::Error(ProtocolError::BadValueHeader(lossy(line)));
    }

    let key = match std::str::from_utf8(fields[0]) {
        Ok(key) => key.to_owned(),
        Err(_) => return ParseResult::Error(ProtocolError::BadValueHeader(lossy(line))),
    };
    let (flags, size) = match (parse_ascii::<u32>(fields[1]), parse_ascii::<usize>(fields[2])) {
        (Some(flags), Some(size)) => (flags, size),
        _ => return ParseResult::Error(ProtocolError::BadValueHeader(lossy(line))),
    };
    let casid = match fields.get(3) {
        Some(field) => match parse_ascii::<u64>(field) {
            Some(casid) => casid,
            None => return ParseResult::Error(ProtocolError::BadValueHeader(lossy(line))),
        },
        None => 0,
    };

    let data_start = line_end + 2;
    let total = data_start + size + 2;
    if buf.len() < total {
        return ParseResult::NeedMoreData;
    }
    if buf[total - 2] != b'\r' || buf[total - 1] != b'\n' {
        return ParseResult::Error(ProtocolError::CorruptValue);
    }

    let item = Item {
        key,
        value: buf[data_start..data_start + size].to_vec(),
        flags,
        expiration: 0,
        casid,
    };
    ParseResult::Complete(GetRecord::Value(item), total)
}

/// Parse the single-line reply to a store or delete command.
pub fn parse_command_reply(buf: &[u8]) -> ParseResult<CommandReply> {
    let line_end = match find_crlf(buf) {
        Some(pos) => pos,
        None => return ParseResult::NeedMoreData,
    };
    let reply = match &buf[..line_end] {
        b"STORED" => CommandReply::Stored,
        b"NOT_STORED" => CommandReply::NotStored,
        b"EXISTS" => CommandReply::Exists,
        b"NOT_FOUND" => CommandReply::NotFound,
        b"DELETED" => CommandReply::Deleted,
        line => return ParseResult::Error(ProtocolError::UnexpectedLine(lossy(line))),
    };
    ParseResult::Complete(reply, line_end + 2)
}

/// Parse the single-line reply to an incr or decr command: `NOT_FOUND`,
/// `CLIENT_ERROR <message>`, or the new value as a decimal u64.
pub fn parse_incr_decr_reply(buf: &[u8]) -> ParseResult<IncrDecrReply> {
    const CLIENT_ERROR_PREFIX: &[u8] = b"CLIENT_ERROR ";

    let line_end = match find_crlf(buf) {
        Some(pos) => pos,
        None => return ParseResult::NeedMoreData,
    };
    let line = &buf[..line_end];

    if line == b"NOT_FOUND" {
        return ParseResult::Complete(IncrDecrReply::NotFound, line_end + 2);
    }
    if let Some(message) = line.strip_prefix(CLIENT_ERROR_PREFIX) {
        return ParseResult::Complete(IncrDecrReply::ClientError(lossy(message)), line_end + 2);
    }
    match parse_ascii::<u64>(line) {
        Some(value) => ParseResult::Complete(IncrDecrReply::Value(value), line_end + 2),
        None => ParseResult::Error(ProtocolError::BadNumeric(lossy(line))),
    }
}

/// Parse the next record of a stats response: `STAT <name> <value>\r\n`
/// or the `END\r\n` terminator.
pub fn parse_stat_record(buf: &[u8]) -> ParseResult<StatRecord> {
    let line_end = match find_crlf(buf) {
        Some(pos) => pos,
        None => return ParseResult::NeedMoreData,
    };
    let line = &buf[..line_end];

    if line == b"END" {
        return ParseResult::Complete(StatRecord::End, line_end + 2);
    }

    let mut parts = line.splitn(3, |&b| b == b' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(b"STAT"), Some(name), Some(value)) if !name.is_empty() => {
            let name = match std::str::from_utf8(name) {
                Ok(name) => name.to_owned(),
                Err(_) => return ParseResult::Error(ProtocolError::BadStatLine(lossy(line))),
            };
            ParseResult::Complete(
                StatRecord::Stat {
                    name,
                    value: value.to_vec(),
                },
                line_end + 2,
            )
        }
        _ => ParseResult::Error(ProtocolError::BadStatLine(lossy(line))),
    }
}
