//! Data source providers.
//!
//! A source returns the full current snapshot on every call. Sources are
//! stateless: the stored baseline lives in the snapshot store.

pub mod http;

pub use http::HttpSource;

use crate::error::Result;
use crate::model::Snapshot;
use async_trait::async_trait;

/// Provider of the current dataset.
///
/// # Example
/// ```no_run
/// use async_trait::async_trait;
/// use casewatch::error::Result;
/// use casewatch::model::Snapshot;
/// use casewatch::source::DataSource;
///
/// struct FixedSource(Snapshot);
///
/// #[async_trait]
/// impl DataSource for FixedSource {
///     fn name(&self) -> &str {
///         "fixed"
///     }
///
///     async fn fetch(&self) -> Result<Snapshot> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Source identifier used in logs
    fn name(&self) -> &str;

    /// Fetch the current snapshot.
    ///
    /// Any failure is reported as `WatchError::FetchFailure` and fails the
    /// whole cycle.
    async fn fetch(&self) -> Result<Snapshot>;
}
