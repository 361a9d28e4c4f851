//! Server selection for sharded deployments

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{Error, Result};

/// Maps a key to the backend server that owns it.
///
/// Implementations must be deterministic: the same key must map to the same
/// address for at least the duration of one `get_multi` call, which groups
/// keys by the returned address.
pub trait ServerSelector: Send + Sync {
    /// Returns the address of the server that should hold `key`.
    ///
    /// Fails with [`Error::NoServers`] when no servers are configured.
    fn pick_server(&self, key: &str) -> Result<SocketAddr>;
}

/// A fixed list of servers with hash-based key distribution.
///
/// Keys are routed by hashing modulo the server count. A single server
/// receives every key. Applications that need consistent hashing or
/// weighted distribution can provide their own [`ServerSelector`].
#[derive(Debug, Clone)]
pub struct ServerList {
    addrs: Vec<SocketAddr>,
}

impl ServerList {
    /// Resolves each `host:port` string and builds the list. Fails with
    /// [`Error::NoServers`] when a name resolves to nothing.
    pub fn new<S: AsRef<str>>(servers: &[S]) -> Result<Self> {
        let mut addrs = Vec::with_capacity(servers.len());
        for server in servers {
            match server.as_ref().to_socket_addrs()?.next() {
                Some(addr) => addrs.push(addr),
                None => return Err(Error::NoServers),
            }
        }
        Ok(Self { addrs })
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }
}

impl ServerSelector for ServerList {
    fn pick_server(&self, key: &str) -> Result<SocketAddr> {
        match self.addrs.len() {
            0 => Err(Error::NoServers),
            1 => Ok(self.addrs[0]),
            n => Ok(self.addrs[(fnv1a(key.as_bytes()) % n as u64) as usize]),
        }
    }
}

/// 64-bit FNV-1a over the key bytes.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_returns_no_servers() {
        let list = ServerList::new::<&str>(&[]).unwrap();
        match list.pick_server("key") {
            Err(Error::NoServers) => {}
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_single_server_always_selected() {
        let list = ServerList::new(&["127.0.0.1:11211"]).unwrap();
        let addr = list.pick_server("any-key").unwrap();
        assert_eq!(addr, "127.0.0.1:11211".parse().unwrap());
        assert_eq!(list.pick_server("").unwrap(), addr);
    }

    #[test]
    fn test_deterministic_routing() {
        let list =
            ServerList::new(&["127.0.0.1:11211", "127.0.0.1:11212", "127.0.0.1:11213"]).unwrap();
        for key in ["foo", "bar", "a-much-longer-key-with-structure:42"] {
            assert_eq!(
                list.pick_server(key).unwrap(),
                list.pick_server(key).unwrap()
            );
        }
    }

    #[test]
    fn test_keys_spread_across_servers() {
        let list =
            ServerList::new(&["127.0.0.1:11211", "127.0.0.1:11212", "127.0.0.1:11213"]).unwrap();
        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            let key = format!("key{i}");
            seen.insert(list.pick_server(&key).unwrap());
        }
        assert_eq!(seen.len(), 3, "200 keys should hit all three servers");
    }
}
