use thiserror::Error;

/// Result type alias using WatchError.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors raised by the watcher pipeline.
///
/// `StorageUnavailable` is fatal only during startup initialization. Every
/// other kind raised inside a poll cycle is logged by the watcher loop and
/// the loop moves on to the next cycle.
#[derive(Error, Debug)]
pub enum WatchError {
    /// State file missing, unreadable or corrupt when a read was required
    #[error("State storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Data source could not produce a snapshot
    #[error("Fetch failed: {0}")]
    FetchFailure(String),

    /// Notification sink did not report success
    #[error("Delivery failed (status {}): {body}", display_status(.status))]
    DeliveryError { status: Option<u16>, body: String },

    /// A current entity cannot produce valid deltas
    #[error("Inconsistent data: {0}")]
    FormatInconsistency(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn display_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl WatchError {
    /// Stable label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::StorageUnavailable(_) => "storage_unavailable",
            WatchError::FetchFailure(_) => "fetch_failure",
            WatchError::DeliveryError { .. } => "delivery_error",
            WatchError::FormatInconsistency(_) => "format_inconsistency",
            WatchError::Config(_) => "config",
        }
    }
}
