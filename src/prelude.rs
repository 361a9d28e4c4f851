//! Prelude module for common imports.
//!
//! This module re-exports commonly used types and traits for convenience.
//!
//! # Usage
//!
//! ```ignore
//! use mcshard::prelude::*;
//! ```

// Error types
pub use crate::error::{Error, ProtocolError, Result};

// Configuration
pub use crate::config::ClientConfig;

// Client and data model
pub use crate::client::Client;
pub use crate::item::Item;

// Server selection
pub use crate::selector::{ServerList, ServerSelector};

// Statistics
pub use crate::stats::{GeneralStats, SettingsStats, SlabStats};

// Metrics
pub use crate::metrics::ClientMetrics;

// Common external crates
pub use std::sync::Arc;
pub use tracing::{debug, error, info, trace, warn};
