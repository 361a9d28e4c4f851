//! Client handle and cache operations
//!
//! Every single-key operation follows the same shape: validate the key, ask
//! the selector for an address, acquire a connection (pooled or freshly
//! dialed), run the protocol exchange, then conditionally release the
//! connection based on the operation's final error.

mod connection;
mod pool;

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::config::ClientConfig;
use crate::error::{Error, ProtocolError, Result};
use crate::item::Item;
use crate::metrics::ClientMetrics;
use crate::protocol::{
    self, CommandReply, GetRecord, IncrDecrReply, RequestWriter, StatRecord,
};
use crate::selector::{ServerList, ServerSelector};
use crate::stats::{GeneralStats, RawStats, SettingsStats, SlabKey, SlabStats};
use connection::Conn;
use pool::ConnPool;

struct Inner {
    config: ClientConfig,
    selector: Arc<dyn ServerSelector>,
    pool: ConnPool,
    metrics: ClientMetrics,
}

/// A sharded memcached client.
///
/// Cloning is cheap and clones share the connection pool. A `Client` is safe
/// for concurrent use from any number of tasks; operations on different
/// connections proceed in parallel.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Create a client for the given `host:port` servers, sharded by a
    /// [`ServerList`].
    pub fn new<S: AsRef<str>>(servers: &[S]) -> Result<Self> {
        Ok(Self::from_selector(ServerList::new(servers)?))
    }

    /// Create a client using the provided selector and default configuration.
    pub fn from_selector(selector: impl ServerSelector + 'static) -> Self {
        Self::with_config(selector, ClientConfig::default())
    }

    /// Create a client using the provided selector and configuration.
    pub fn with_config(selector: impl ServerSelector + 'static, config: ClientConfig) -> Self {
        let pool = ConnPool::new(config.max_idle_per_addr);
        Self {
            inner: Arc::new(Inner {
                config,
                selector: Arc::new(selector),
                pool,
                metrics: ClientMetrics::default(),
            }),
        }
    }

    /// Client activity counters.
    pub fn metrics(&self) -> &ClientMetrics {
        &self.inner.metrics
    }

    /// Drop all idle pooled connections. In-flight operations are unaffected
    /// and their connections may repopulate the pool afterwards.
    pub fn close_idle(&self) {
        self.inner.pool.clear();
    }

    /// Get the item for the given key. A miss is reported as
    /// [`Error::CacheMiss`].
    pub async fn get(&self, key: &str) -> Result<Item> {
        self.inner.metrics.inc_cmd_get();
        if !protocol::legal_key(key) {
            return Err(Error::MalformedKey);
        }
        let addr = self.inner.selector.pick_server(key)?;

        let mut found = None;
        self.get_from_addr(addr, &[key], |item| found = Some(item))
            .await?;
        match found {
            Some(item) => {
                self.inner.metrics.inc_get_hits();
                Ok(item)
            }
            None => {
                self.inner.metrics.inc_get_misses();
                Err(Error::CacheMiss)
            }
        }
    }

    /// Batch version of [`get`](Client::get): keys are grouped by server and
    /// fetched concurrently, one task per server.
    ///
    /// The returned map may hold fewer entries than `keys` due to cache
    /// misses. When at least one server fails, the call returns
    /// [`Error::Fanout`] carrying the items parsed from the servers that did
    /// respond together with the last failure observed.
    pub async fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Item>> {
        self.inner.metrics.inc_cmd_get_multi();

        let mut buckets: HashMap<SocketAddr, Vec<String>> = HashMap::new();
        for &key in keys {
            if !protocol::legal_key(key) {
                return Err(Error::MalformedKey);
            }
            let addr = self.inner.selector.pick_server(key)?;
            buckets.entry(addr).or_default().push(key.to_owned());
        }

        let items = Arc::new(Mutex::new(HashMap::new()));
        let mut tasks = Vec::with_capacity(buckets.len());
        for (addr, bucket) in buckets {
            let client = self.clone();
            let items = Arc::clone(&items);
            tasks.push(tokio::spawn(async move {
                client
                    .get_from_addr(addr, &bucket, |item| {
                        let mut items = items.lock().expect("result lock poisoned");
                        items.insert(item.key.clone(), item);
                    })
                    .await
            }));
        }

        let mut last_err = None;
        for task in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => last_err = Some(e),
                Err(e) => last_err = Some(Error::Io(io::Error::other(e))),
            }
        }

        let items = std::mem::take(&mut *items.lock().expect("result lock poisoned"));
        match last_err {
            None => Ok(items),
            Some(source) => Err(Error::Fanout {
                source: Box::new(source),
                items,
            }),
        }
    }

    /// Write the given item, unconditionally.
    pub async fn set(&self, item: &Item) -> Result<()> {
        self.inner.metrics.inc_cmd_store();
        self.store("set", item).await
    }

    /// Write the given item only if no value exists for its key.
    /// [`Error::NotStored`] is returned if that condition is not met.
    pub async fn add(&self, item: &Item) -> Result<()> {
        self.inner.metrics.inc_cmd_store();
        self.store("add", item).await
    }

    /// Write the given item, previously returned by a retrieve, only if it
    /// was neither modified nor evicted in between. Modification is reported
    /// as [`Error::CasConflict`], eviction as [`Error::CacheMiss`].
    pub async fn compare_and_swap(&self, item: &Item) -> Result<()> {
        self.inner.metrics.inc_cmd_store();
        self.store("cas", item).await
    }

    /// Delete the item with the given key. [`Error::CacheMiss`] is returned
    /// if the item did not exist.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.inner.metrics.inc_cmd_delete();
        if !protocol::legal_key(key) {
            return Err(Error::MalformedKey);
        }
        let addr = self.inner.selector.pick_server(key)?;
        let mut conn = self.acquire(addr).await?;
        let result = Self::run_delete(&mut conn, key).await;
        self.finish(conn, result.as_ref().err());
        result
    }

    /// Atomically increment the value for `key` by `delta` and return the
    /// new value. The stored value must be a decimal number; on 64-bit
    /// overflow the server wraps around.
    pub async fn increment(&self, key: &str, delta: u64) -> Result<u64> {
        self.incr_decr("incr", key, delta).await
    }

    /// Atomically decrement the value for `key` by `delta` and return the
    /// new value. On underflow the server caps the value at zero.
    pub async fn decrement(&self, key: &str, delta: u64) -> Result<u64> {
        self.incr_decr("decr", key, delta).await
    }

    /// Retrieve general-purpose statistics from one server.
    pub async fn stats(&self, addr: SocketAddr) -> Result<GeneralStats> {
        let raw = self.raw_stats(addr, None).await?;
        if raw.is_empty() {
            return Err(Error::NoStats);
        }
        Ok(GeneralStats::from_raw(&raw))
    }

    /// Retrieve the settings of one server.
    pub async fn stats_settings(&self, addr: SocketAddr) -> Result<SettingsStats> {
        let raw = self.raw_stats(addr, Some("settings")).await?;
        if raw.is_empty() {
            return Err(Error::NoStats);
        }
        Ok(SettingsStats::from_raw(&raw))
    }

    /// Retrieve per-slab item storage statistics from one server.
    pub async fn stats_items(&self, addr: SocketAddr) -> Result<SlabStats> {
        self.slab_stats(addr, "items", crate::stats::items_stat_name)
            .await
    }

    /// Retrieve per-slab allocation statistics from one server. Global
    /// (non-slab) lines of the response are skipped.
    pub async fn stats_slabs(&self, addr: SocketAddr) -> Result<SlabStats> {
        self.slab_stats(addr, "slabs", crate::stats::slabs_stat_name)
            .await
    }

    // -- Connection management -----------------------------------------------

    async fn acquire(&self, addr: SocketAddr) -> Result<Conn> {
        let timeout = self.inner.config.timeout();
        if let Some(mut conn) = self.inner.pool.checkout(addr) {
            conn.extend_deadline(timeout);
            self.inner.metrics.inc_conns_reused();
            return Ok(conn);
        }

        self.inner.metrics.inc_dials();
        let stream = match pool::dial(addr, timeout).await {
            Ok(stream) => stream,
            Err(e) => {
                if matches!(e, Error::ConnectTimeout { .. }) {
                    self.inner.metrics.inc_dial_timeouts();
                }
                return Err(e);
            }
        };
        Ok(Conn::new(
            stream,
            addr,
            self.inner.config.read_buffer_size,
            timeout,
        ))
    }

    /// Release the connection back to the pool if the operation ended
    /// cleanly or with a resumable protocol error; drop it otherwise, since
    /// half-consumed framing would poison the next operation.
    fn finish(&self, conn: Conn, err: Option<&Error>) {
        if err.is_none_or(Error::is_resumable) {
            if self.inner.pool.checkin(conn) {
                self.inner.metrics.inc_conns_returned();
            } else {
                self.inner.metrics.inc_conns_discarded();
            }
        } else {
            self.inner.metrics.inc_conns_discarded();
        }
    }

    // -- Protocol exchanges --------------------------------------------------

    async fn get_from_addr(
        &self,
        addr: SocketAddr,
        keys: &[impl AsRef<str>],
        mut emit: impl FnMut(Item),
    ) -> Result<()> {
        let mut conn = self.acquire(addr).await?;
        let result = Self::run_gets(&mut conn, keys, &mut emit).await;
        self.finish(conn, result.as_ref().err());
        result
    }

    async fn run_gets(
        conn: &mut Conn,
        keys: &[impl AsRef<str>],
        emit: &mut impl FnMut(Item),
    ) -> Result<()> {
        trace!(addr = %conn.addr(), keys = keys.len(), "gets");
        let mut request = RequestWriter::new(64);
        request.gets(keys);
        conn.send(request.buffer()).await?;

        loop {
            match conn.read_reply(protocol::parse_get_record).await? {
                GetRecord::Value(item) => emit(item),
                GetRecord::End => return Ok(()),
            }
        }
    }

    async fn store(&self, verb: &str, item: &Item) -> Result<()> {
        if !protocol::legal_key(&item.key) {
            return Err(Error::MalformedKey);
        }
        let addr = self.inner.selector.pick_server(&item.key)?;
        let mut conn = self.acquire(addr).await?;
        let result = Self::run_store(&mut conn, verb, item).await;
        self.finish(conn, result.as_ref().err());
        result
    }

    async fn run_store(conn: &mut Conn, verb: &str, item: &Item) -> Result<()> {
        trace!(addr = %conn.addr(), verb, key = %item.key, "store");
        let casid = (verb == "cas").then_some(item.casid);
        let mut request = RequestWriter::new(item.value.len() + 64);
        request.store(
            verb,
            &item.key,
            item.flags,
            item.expiration,
            &item.value,
            casid,
        );
        conn.send(request.buffer()).await?;

        match conn.read_reply(protocol::parse_command_reply).await? {
            CommandReply::Stored => Ok(()),
            CommandReply::NotStored => Err(Error::NotStored),
            CommandReply::Exists => Err(Error::CasConflict),
            CommandReply::NotFound => Err(Error::CacheMiss),
            other => Err(Error::Server(ProtocolError::UnexpectedLine(
                other.as_line().to_owned(),
            ))),
        }
    }

    async fn run_delete(conn: &mut Conn, key: &str) -> Result<()> {
        trace!(addr = %conn.addr(), key, "delete");
        let mut request = RequestWriter::new(64);
        request.delete(key);
        conn.send(request.buffer()).await?;

        match conn.read_reply(protocol::parse_command_reply).await? {
            CommandReply::Deleted => Ok(()),
            CommandReply::NotFound => Err(Error::CacheMiss),
            CommandReply::NotStored => Err(Error::NotStored),
            CommandReply::Exists => Err(Error::CasConflict),
            other => Err(Error::Server(ProtocolError::UnexpectedLine(
                other.as_line().to_owned(),
            ))),
        }
    }

    async fn incr_decr(&self, verb: &str, key: &str, delta: u64) -> Result<u64> {
        self.inner.metrics.inc_cmd_incr_decr();
        if !protocol::legal_key(key) {
            return Err(Error::MalformedKey);
        }
        let addr = self.inner.selector.pick_server(key)?;
        let mut conn = self.acquire(addr).await?;
        let result = Self::run_incr_decr(&mut conn, verb, key, delta).await;
        self.finish(conn, result.as_ref().err());
        result
    }

    async fn run_incr_decr(conn: &mut Conn, verb: &str, key: &str, delta: u64) -> Result<u64> {
        trace!(addr = %conn.addr(), verb, key, delta, "incr_decr");
        let mut request = RequestWriter::new(64);
        request.incr_decr(verb, key, delta);
        conn.send(request.buffer()).await?;

        match conn.read_reply(protocol::parse_incr_decr_reply).await? {
            IncrDecrReply::Value(value) => Ok(value),
            IncrDecrReply::NotFound => Err(Error::CacheMiss),
            IncrDecrReply::ClientError(message) => Err(Error::Client(message)),
        }
    }

    async fn raw_stats(&self, addr: SocketAddr, argument: Option<&str>) -> Result<RawStats> {
        self.inner.metrics.inc_cmd_stats();
        let mut conn = self.acquire(addr).await?;
        let result = Self::run_stats(&mut conn, argument).await;
        self.finish(conn, result.as_ref().err());
        result
    }

    async fn run_stats(conn: &mut Conn, argument: Option<&str>) -> Result<RawStats> {
        trace!(addr = %conn.addr(), argument, "stats");
        let mut request = RequestWriter::new(64);
        request.stats(argument);
        conn.send(request.buffer()).await?;

        let mut raw = RawStats::new();
        loop {
            match conn.read_reply(protocol::parse_stat_record).await? {
                StatRecord::Stat { name, value } => {
                    raw.insert(name, value);
                }
                StatRecord::End => return Ok(raw),
            }
        }
    }

    async fn slab_stats(
        &self,
        addr: SocketAddr,
        argument: &str,
        shape: fn(&str) -> Option<SlabKey>,
    ) -> Result<SlabStats> {
        self.inner.metrics.inc_cmd_stats();
        let mut conn = self.acquire(addr).await?;
        let result = Self::run_slab_stats(&mut conn, argument, shape).await;
        self.finish(conn, result.as_ref().err());
        result
    }

    async fn run_slab_stats(
        conn: &mut Conn,
        argument: &str,
        shape: fn(&str) -> Option<SlabKey>,
    ) -> Result<SlabStats> {
        trace!(addr = %conn.addr(), argument, "stats");
        let mut request = RequestWriter::new(64);
        request.stats(Some(argument));
        conn.send(request.buffer()).await?;

        let mut slabs = SlabStats::new();
        loop {
            match conn.read_reply(protocol::parse_stat_record).await? {
                StatRecord::Stat { name, value } => match shape(&name) {
                    Some(SlabKey::Entry(slab, field)) => {
                        slabs.entry(slab).or_default().insert(field, value);
                    }
                    Some(SlabKey::Ignore) => {}
                    None => return Err(Error::Server(ProtocolError::BadStatLine(name))),
                },
                StatRecord::End => return Ok(slabs),
            }
        }
    }
}
