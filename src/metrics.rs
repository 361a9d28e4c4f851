//! Lightweight atomic counters tracking client activity

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation and connection counters, updated with relaxed ordering on the
/// hot path. Read them with `load(Ordering::Relaxed)`.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    // Command counters
    pub cmd_get: AtomicU64,
    pub cmd_get_multi: AtomicU64,
    pub cmd_store: AtomicU64,
    pub cmd_delete: AtomicU64,
    pub cmd_incr_decr: AtomicU64,
    pub cmd_stats: AtomicU64,

    // Hit/miss counters for single-key retrieves
    pub get_hits: AtomicU64,
    pub get_misses: AtomicU64,

    // Connection lifecycle
    pub dials: AtomicU64,
    pub dial_timeouts: AtomicU64,
    pub conns_reused: AtomicU64,
    pub conns_returned: AtomicU64,
    pub conns_discarded: AtomicU64,
}

impl ClientMetrics {
    #[inline]
    pub(crate) fn inc_cmd_get(&self) {
        self.cmd_get.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_cmd_get_multi(&self) {
        self.cmd_get_multi.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_cmd_store(&self) {
        self.cmd_store.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_cmd_delete(&self) {
        self.cmd_delete.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_cmd_incr_decr(&self) {
        self.cmd_incr_decr.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_cmd_stats(&self) {
        self.cmd_stats.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_get_hits(&self) {
        self.get_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_get_misses(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_dials(&self) {
        self.dials.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_dial_timeouts(&self) {
        self.dial_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_conns_reused(&self) {
        self.conns_reused.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_conns_returned(&self) {
        self.conns_returned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_conns_discarded(&self) {
        self.conns_discarded.fetch_add(1, Ordering::Relaxed);
    }
}
