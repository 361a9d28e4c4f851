//! Server statistics: raw STAT maps and typed records
//!
//! `stats` and `stats settings` responses are collected into a flat
//! name→value map and then poured into a typed record through a static
//! field table. Population is lossy on purpose: unknown names and values
//! that fail to parse are ignored, leaving the field at its default.

use std::collections::HashMap;

/// Flat statistics as received: stat name → raw value bytes
pub type RawStats = HashMap<String, Vec<u8>>;

/// Per-slab statistics as returned by `stats items` and `stats slabs`:
/// slab class → (stat name → raw value bytes)
pub type SlabStats = HashMap<u32, HashMap<String, Vec<u8>>>;

/// General-purpose statistics from a `stats` request.
///
/// Field names follow the stat names of the memcached protocol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneralStats {
    pub pid: u32,
    pub uptime: u32,
    pub time: u32,
    pub version: String,
    pub pointer_size: u32,
    pub rusage_user: f64,
    pub rusage_system: f64,
    pub curr_items: u32,
    pub total_items: u32,
    pub bytes: u64,
    pub curr_connections: u32,
    pub total_connections: u32,
    pub connection_structures: u32,
    pub reserved_fds: u32,
    pub cmd_get: u64,
    pub cmd_set: u64,
    pub cmd_flush: u64,
    pub cmd_touch: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub delete_misses: u64,
    pub delete_hits: u64,
    pub incr_misses: u64,
    pub incr_hits: u64,
    pub decr_misses: u64,
    pub decr_hits: u64,
    pub cas_misses: u64,
    pub cas_hits: u64,
    pub cas_badval: u64,
    pub touch_hits: u64,
    pub touch_misses: u64,
    pub auth_cmds: u64,
    pub auth_errors: u64,
    pub evictions: u64,
    pub reclaimed: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub limit_maxbytes: u32,
    pub threads: u32,
    pub conn_yields: u64,
    pub hash_power_level: u32,
    pub hash_bytes: u64,
    pub hash_is_expanding: bool,
    pub expired_unfetched: u64,
    pub evicted_unfetched: u64,
    pub slab_reassign_running: bool,
    pub slabs_moved: u64,
}

impl GeneralStats {
    pub(crate) fn from_raw(raw: &RawStats) -> Self {
        let mut s = Self::default();
        for (name, value) in raw {
            match name.as_str() {
                "pid" => set_num(&mut s.pid, value),
                "uptime" => set_num(&mut s.uptime, value),
                "time" => set_num(&mut s.time, value),
                "version" => set_string(&mut s.version, value),
                "pointer_size" => set_num(&mut s.pointer_size, value),
                "rusage_user" => set_num(&mut s.rusage_user, value),
                "rusage_system" => set_num(&mut s.rusage_system, value),
                "curr_items" => set_num(&mut s.curr_items, value),
                "total_items" => set_num(&mut s.total_items, value),
                "bytes" => set_num(&mut s.bytes, value),
                "curr_connections" => set_num(&mut s.curr_connections, value),
                "total_connections" => set_num(&mut s.total_connections, value),
                "connection_structures" => set_num(&mut s.connection_structures, value),
                "reserved_fds" => set_num(&mut s.reserved_fds, value),
                "cmd_get" => set_num(&mut s.cmd_get, value),
                "cmd_set" => set_num(&mut s.cmd_set, value),
                "cmd_flush" => set_num(&mut s.cmd_flush, value),
                "cmd_touch" => set_num(&mut s.cmd_touch, value),
                "get_hits" => set_num(&mut s.get_hits, value),
                "get_misses" => set_num(&mut s.get_misses, value),
                "delete_misses" => set_num(&mut s.delete_misses, value),
                "delete_hits" => set_num(&mut s.delete_hits, value),
                "incr_misses" => set_num(&mut s.incr_misses, value),
                "incr_hits" => set_num(&mut s.incr_hits, value),
                "decr_misses" => set_num(&mut s.decr_misses, value),
                "decr_hits" => set_num(&mut s.decr_hits, value),
                "cas_misses" => set_num(&mut s.cas_misses, value),
                "cas_hits" => set_num(&mut s.cas_hits, value),
                "cas_badval" => set_num(&mut s.cas_badval, value),
                "touch_hits" => set_num(&mut s.touch_hits, value),
                "touch_misses" => set_num(&mut s.touch_misses, value),
                "auth_cmds" => set_num(&mut s.auth_cmds, value),
                "auth_errors" => set_num(&mut s.auth_errors, value),
                "evictions" => set_num(&mut s.evictions, value),
                "reclaimed" => set_num(&mut s.reclaimed, value),
                "bytes_read" => set_num(&mut s.bytes_read, value),
                "bytes_written" => set_num(&mut s.bytes_written, value),
                "limit_maxbytes" => set_num(&mut s.limit_maxbytes, value),
                "threads" => set_num(&mut s.threads, value),
                "conn_yields" => set_num(&mut s.conn_yields, value),
                "hash_power_level" => set_num(&mut s.hash_power_level, value),
                "hash_bytes" => set_num(&mut s.hash_bytes, value),
                "hash_is_expanding" => set_bool(&mut s.hash_is_expanding, value),
                "expired_unfetched" => set_num(&mut s.expired_unfetched, value),
                "evicted_unfetched" => set_num(&mut s.evicted_unfetched, value),
                "slab_reassign_running" => set_bool(&mut s.slab_reassign_running, value),
                "slabs_moved" => set_num(&mut s.slabs_moved, value),
                _ => {}
            }
        }
        s
    }
}

/// Server settings from a `stats settings` request.
///
/// Fields reported as `yes`/`no` or `on`/`off` on the wire are booleans here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsStats {
    pub maxbytes: u64,
    pub maxconns: i32,
    pub tcpport: i32,
    pub udpport: i32,
    pub inter: String,
    pub verbosity: i32,
    pub oldest: u32,
    pub evictions: bool,
    pub domain_socket: String,
    pub umask: i32,
    pub growth_factor: f64,
    pub chunk_size: i32,
    pub num_threads: i32,
    pub stat_key_prefix: u8,
    pub detail_enabled: bool,
    pub tcp_backlog: i32,
    pub auth_enabled_sasl: bool,
    pub item_size_max: u64,
    pub maxconns_fast: bool,
    pub hashpower_init: i32,
    pub slab_reassign: bool,
    pub slab_automove: bool,
}

impl SettingsStats {
    pub(crate) fn from_raw(raw: &RawStats) -> Self {
        let mut s = Self::default();
        for (name, value) in raw {
            match name.as_str() {
                "maxbytes" => set_num(&mut s.maxbytes, value),
                "maxconns" => set_num(&mut s.maxconns, value),
                "tcpport" => set_num(&mut s.tcpport, value),
                "udpport" => set_num(&mut s.udpport, value),
                "inter" => set_string(&mut s.inter, value),
                "verbosity" => set_num(&mut s.verbosity, value),
                "oldest" => set_num(&mut s.oldest, value),
                "evictions" => set_bool(&mut s.evictions, value),
                "domain_socket" => set_string(&mut s.domain_socket, value),
                "umask" => set_num(&mut s.umask, value),
                "growth_factor" => set_num(&mut s.growth_factor, value),
                "chunk_size" => set_num(&mut s.chunk_size, value),
                "num_threads" => set_num(&mut s.num_threads, value),
                "stat_key_prefix" => set_byte(&mut s.stat_key_prefix, value),
                "detail_enabled" => set_bool(&mut s.detail_enabled, value),
                "tcp_backlog" => set_num(&mut s.tcp_backlog, value),
                "auth_enabled_sasl" => set_bool(&mut s.auth_enabled_sasl, value),
                "item_size_max" => set_num(&mut s.item_size_max, value),
                "maxconns_fast" => set_bool(&mut s.maxconns_fast, value),
                "hashpower_init" => set_num(&mut s.hashpower_init, value),
                "slab_reassign" => set_bool(&mut s.slab_reassign, value),
                "slab_automove" => set_bool(&mut s.slab_automove, value),
                _ => {}
            }
        }
        s
    }
}

/// How a stat name maps into a per-slab table
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SlabKey {
    /// A per-slab entry: slab class and field name
    Entry(u32, String),
    /// A line with no slab association, skipped silently
    Ignore,
}

/// Shape of a `stats items` name: `items:<slab>:<field>`.
/// Anything else is a malformed response line.
pub(crate) fn items_stat_name(name: &str) -> Option<SlabKey> {
    let rest = name.strip_prefix("items:")?;
    let (slab, field) = rest.split_once(':')?;
    let slab = slab.parse().ok()?;
    Some(SlabKey::Entry(slab, field.to_owned()))
}

/// Shape of a `stats slabs` name: `<slab>:<field>`, with colon-free global
/// lines (e.g. `active_slabs`) ignored.
pub(crate) fn slabs_stat_name(name: &str) -> Option<SlabKey> {
    match name.split_once(':') {
        None => Some(SlabKey::Ignore),
        Some((slab, field)) => {
            let slab = slab.parse().ok()?;
            Some(SlabKey::Entry(slab, field.to_owned()))
        }
    }
}

fn set_num<T: std::str::FromStr>(field: &mut T, value: &[u8]) {
    if let Ok(text) = std::str::from_utf8(value) {
        if let Ok(parsed) = text.parse() {
            *field = parsed;
        }
    }
}

fn set_bool(field: &mut bool, value: &[u8]) {
    match value {
        b"yes" | b"on" | b"1" | b"true" => *field = true,
        b"no" | b"off" | b"0" | b"false" => *field = false,
        _ => {}
    }
}

fn set_string(field: &mut String, value: &[u8]) {
    if value == b"NULL" {
        field.clear();
    } else if let Ok(text) = std::str::from_utf8(value) {
        *field = text.to_owned();
    }
}

fn set_byte(field: &mut u8, value: &[u8]) {
    if let Some(&b) = value.first() {
        *field = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &[u8])]) -> RawStats {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_general_stats_population() {
        let stats = GeneralStats::from_raw(&raw(&[
            ("pid", b"1234"),
            ("version", b"1.6.21"),
            ("rusage_user", b"0.25"),
            ("bytes", b"1048576"),
            ("hash_is_expanding", b"1"),
            ("slab_reassign_running", b"0"),
            ("totally_unknown_stat", b"42"),
        ]));
        assert_eq!(stats.pid, 1234);
        assert_eq!(stats.version, "1.6.21");
        assert_eq!(stats.rusage_user, 0.25);
        assert_eq!(stats.bytes, 1_048_576);
        assert!(stats.hash_is_expanding);
        assert!(!stats.slab_reassign_running);
        // Untouched fields keep their defaults
        assert_eq!(stats.cmd_get, 0);
    }

    #[test]
    fn test_parse_failure_leaves_default() {
        let stats = GeneralStats::from_raw(&raw(&[("pid", b"not-a-number")]));
        assert_eq!(stats.pid, 0);
    }

    #[test]
    fn test_settings_stats_population() {
        let stats = SettingsStats::from_raw(&raw(&[
            ("maxbytes", b"67108864"),
            ("maxconns", b"1024"),
            ("evictions", b"on"),
            ("detail_enabled", b"no"),
            ("slab_reassign", b"yes"),
            ("maxconns_fast", b"off"),
            ("inter", b"NULL"),
            ("domain_socket", b"/tmp/memcached.sock"),
            ("stat_key_prefix", b":"),
            ("growth_factor", b"1.25"),
        ]));
        assert_eq!(stats.maxbytes, 67_108_864);
        assert_eq!(stats.maxconns, 1024);
        assert!(stats.evictions);
        assert!(!stats.detail_enabled);
        assert!(stats.slab_reassign);
        assert!(!stats.maxconns_fast);
        assert_eq!(stats.inter, "");
        assert_eq!(stats.domain_socket, "/tmp/memcached.sock");
        assert_eq!(stats.stat_key_prefix, b':');
        assert_eq!(stats.growth_factor, 1.25);
    }

    #[test]
    fn test_items_stat_name() {
        assert_eq!(
            items_stat_name("items:3:number"),
            Some(SlabKey::Entry(3, "number".to_string()))
        );
        // Field names may themselves contain colons
        assert_eq!(
            items_stat_name("items:1:a:b"),
            Some(SlabKey::Entry(1, "a:b".to_string()))
        );
        assert_eq!(items_stat_name("items:x:number"), None);
        assert_eq!(items_stat_name("number"), None);
    }

    #[test]
    fn test_slabs_stat_name() {
        assert_eq!(
            slabs_stat_name("1:chunk_size"),
            Some(SlabKey::Entry(1, "chunk_size".to_string()))
        );
        assert_eq!(slabs_stat_name("active_slabs"), Some(SlabKey::Ignore));
        assert_eq!(slabs_stat_name("x:chunk_size"), None);
    }
}
