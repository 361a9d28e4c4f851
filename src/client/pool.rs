//! Per-address connection pooling and dialing
//!
//! The pool is a plain address-keyed list of idle connections: LIFO to
//! favor warm sockets, bounded per address, no waiting. Dialing a fresh
//! connection is the overflow path; the only lock is held for list
//! manipulation and never across I/O.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::connection::Conn;
use crate::error::{Error, Result};

pub(crate) struct ConnPool {
    idle: Mutex<HashMap<SocketAddr, Vec<Conn>>>,
    max_idle_per_addr: usize,
}

impl ConnPool {
    pub(crate) fn new(max_idle_per_addr: usize) -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
            max_idle_per_addr,
        }
    }

    /// Pop the most recently returned idle connection for `addr`, if any
    pub(crate) fn checkout(&self, addr: SocketAddr) -> Option<Conn> {
        let mut idle = self.idle.lock().expect("pool lock poisoned");
        idle.get_mut(&addr).and_then(|list| list.pop())
    }

    /// Return a connection to the idle list. When the per-address cap is
    /// already reached the connection is dropped instead, closing the
    /// stream. Returns true if the connection was kept.
    pub(crate) fn checkin(&self, conn: Conn) -> bool {
        let addr = conn.addr();
        let mut idle = self.idle.lock().expect("pool lock poisoned");
        let list = idle.entry(addr).or_default();
        if list.len() >= self.max_idle_per_addr {
            debug!(%addr, "idle list full, dropping connection");
            return false;
        }
        list.push(conn);
        true
    }

    /// Drop every idle connection
    pub(crate) fn clear(&self) {
        self.idle.lock().expect("pool lock poisoned").clear();
    }

    #[cfg(test)]
    pub(crate) fn idle_count(&self, addr: SocketAddr) -> usize {
        let idle = self.idle.lock().expect("pool lock poisoned");
        idle.get(&addr).map_or(0, Vec::len)
    }
}

/// Dial `addr`, giving up after `timeout`.
///
/// The dial runs in a background task raced against a timer. When the timer
/// wins, the task keeps running and a reaper closes whatever stream it
/// eventually produces, so a late connect never leaks a socket.
pub(crate) async fn dial(addr: SocketAddr, timeout: Duration) -> Result<TcpStream> {
    let mut pending = tokio::spawn(TcpStream::connect(addr));
    tokio::select! {
        joined = &mut pending => {
            let stream = match joined {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(e) => return Err(Error::Io(io::Error::other(e))),
            };
            // Disable Nagle to keep request latency low for small payloads
            if let Err(e) = stream.set_nodelay(true) {
                warn!("failed to set TCP_NODELAY: {}", e);
            }
            Ok(stream)
        }
        _ = sleep(timeout) => {
            tokio::spawn(async move {
                if let Ok(Ok(stream)) = pending.await {
                    drop(stream);
                }
            });
            debug!(%addr, "connect timed out");
            Err(Error::ConnectTimeout { addr })
        }
    }
}
