//! # mcshard
//!
//! Sharded client for the memcached ASCII protocol.
//!
//! ## Features
//!
//! - CAS-enabled retrieval (`gets`), store variants (set, add,
//!   compare-and-swap), delete, atomic increment/decrement
//! - Pluggable key→server selection; hash-based [`ServerList`] by default
//! - Bounded per-server idle connection pooling with dial timeouts
//! - Concurrent fan-out multi-get across shards
//! - Per-server statistics, raw and typed
//!
//! ## Example
//!
//! ```ignore
//! use mcshard::{Client, Item};
//!
//! let client = Client::new(&["127.0.0.1:11211", "127.0.0.1:11212"])?;
//! client.set(&Item::new("color", "red").with_flags(32)).await?;
//! let item = client.get("color").await?;
//! assert_eq!(item.value, b"red");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────────┐     ┌────────────┐
//! │ application │────▶│ Client                       │────▶│ memcached  │
//! │             │     │  ├─ ServerSelector (key→addr)│     │ shard 0..n │
//! │             │     │  ├─ connection pool          │     └────────────┘
//! │             │     │  │   (LIFO, ≤2 idle/addr)    │
//! │             │     │  └─ ASCII protocol engine    │
//! └─────────────┘     └──────────────────────────────┘
//! ```

// Modules
pub mod client;
pub mod config;
pub mod error;
pub mod item;
pub mod metrics;
pub mod prelude;
pub mod protocol;
pub mod selector;
pub mod stats;

// Re-exports for convenience
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, ProtocolError, Result};
pub use item::Item;
pub use metrics::ClientMetrics;
pub use selector::{ServerList, ServerSelector};
pub use stats::{GeneralStats, RawStats, SettingsStats, SlabStats};
