// Domain model: snapshots, entities, stored state
pub mod model;

// Error kinds shared across the pipeline
pub mod error;

// Configuration (TOML file + environment)
pub mod config;

// Persistent snapshot store
pub mod snapshot;

// Change detection between snapshots
pub mod diff;

// Slack block rendering
pub mod format;

// Chunked notification delivery
pub mod delivery;

// Data source providers
pub mod source;

// Poll loop
pub mod watcher;

pub use error::{Result, WatchError};
pub use watcher::Watcher;
