//! One live connection to a backend server
//!
//! A `Conn` owns the TCP stream, a read buffer that feeds the incremental
//! response parsers, and an absolute I/O deadline. The deadline is set on
//! dial and refreshed on pool checkout; it is deliberately not refreshed
//! between reads within a single response, so a server that stalls
//! mid-response trips it.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use crate::error::{Error, Result};
use crate::protocol::ParseResult;

pub(crate) struct Conn {
    stream: TcpStream,
    addr: SocketAddr,
    rbuf: BytesMut,
    deadline: Instant,
}

impl Conn {
    pub(crate) fn new(
        stream: TcpStream,
        addr: SocketAddr,
        read_buffer_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            stream,
            addr,
            rbuf: BytesMut::with_capacity(read_buffer_size),
            deadline: Instant::now() + timeout,
        }
    }

    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Set the absolute I/O deadline to now + timeout
    pub(crate) fn extend_deadline(&mut self, timeout: Duration) {
        self.deadline = Instant::now() + timeout;
    }

    /// Write a complete request to the server
    pub(crate) async fn send(&mut self, request: &[u8]) -> Result<()> {
        match timeout_at(self.deadline, self.stream.write_all(request)).await {
            Ok(result) => result.map_err(Error::Io),
            Err(_) => Err(Error::Io(deadline_exceeded())),
        }
    }

    /// Drive a parser over the read buffer until it completes one reply,
    /// reading more bytes as needed. Consumed bytes are split off, so
    /// leftover data stays available for the next record of a multi-record
    /// response.
    pub(crate) async fn read_reply<T>(
        &mut self,
        parse: impl Fn(&[u8]) -> ParseResult<T>,
    ) -> Result<T> {
        loop {
            match parse(&self.rbuf) {
                ParseResult::Complete(reply, consumed) => {
                    let _ = self.rbuf.split_to(consumed);
                    return Ok(reply);
                }
                ParseResult::NeedMoreData => {}
                ParseResult::Error(e) => return Err(Error::Server(e)),
            }

            let read = timeout_at(self.deadline, self.stream.read_buf(&mut self.rbuf)).await;
            match read {
                Ok(Ok(0)) => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed mid-response",
                    )));
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_) => return Err(Error::Io(deadline_exceeded())),
            }
        }
    }
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "i/o deadline exceeded")
}
