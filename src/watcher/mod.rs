//! Poll loop: fetch, diff, notify, persist, sleep.
//!
//! Cycles run strictly one after another on a single task. A failing cycle
//! is logged and counted; the loop always goes on to sleep and retry.

use crate::config::WatchConfig;
use crate::delivery::{DeliveryReport, Dispatcher, NotificationSink};
use crate::diff::compute_changes;
use crate::error::Result;
use crate::format::{format_change_set, Locale};
use crate::model::Snapshot;
use crate::snapshot::SnapshotStore;
use crate::source::DataSource;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};


/// What a successful cycle did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was stored before; the fetched snapshot became the baseline
    Baseline,
    /// Totals unchanged since the stored snapshot
    Unchanged,
    /// Changes found and delivered
    Notified(DeliveryReport),
}

/// Status counters for external monitoring.
#[derive(Clone, Debug, Default)]
pub struct WatcherStatus {
    /// Completion time of the last successful cycle
    pub last_cycle: Option<DateTime<Utc>>,
    /// Last error message (cleared by the next successful cycle)
    pub last_error: Option<String>,
    pub cycle_count: u64,
    pub error_count: u64,
    pub notification_count: u64,
}

/// Watches a data source and notifies a sink about changes.
pub struct Watcher {
    source: Arc<dyn DataSource>,
    store: SnapshotStore,
    dispatcher: Dispatcher,
    locale: Locale,
    poll_interval: Duration,
    status: Arc<Mutex<WatcherStatus>>,
}

impl Watcher {
    /// Create a watcher from explicit configuration and collaborators.
    pub fn new(
        config: &WatchConfig,
        source: Arc<dyn DataSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            source,
            store: SnapshotStore::new(config.state.path.clone()),
            dispatcher: Dispatcher::new(
                sink,
                config.slack.envelope_template(),
                config.slack.max_blocks,
            ),
            locale: Locale::default(),
            poll_interval: config.poll.interval(),
            status: Arc::new(Mutex::new(WatcherStatus::default())),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Override the sleep between cycles.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns a clone of the status tracker.
    pub fn status(&self) -> Arc<Mutex<WatcherStatus>> {
        Arc::clone(&self.status)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run the poll loop until `shutdown` resolves.
    ///
    /// The state file is initialized first; failing that is fatal and
    /// returned. Shutdown is only observed while sleeping, so a cycle in
    /// flight always runs to completion.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.store.initialize_if_absent()?;

        info!(
            source = %self.source.name(),
            state_file = %self.store.path().display(),
            interval_secs = self.poll_interval.as_secs(),
            max_blocks = self.dispatcher.max_blocks(),
            "Starting watcher"
        );

        tokio::pin!(shutdown);

        loop {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping watcher");
                    return Ok(());
                }
            }
        }
    }

    /// Run one cycle and record its result; never fails.
    pub async fn tick(&self) {
        let result = self.run_cycle().await;
        let mut status = self.status.lock().await;

        match result {
            Ok(outcome) => {
                match &outcome {
                    CycleOutcome::Baseline => info!("Stored initial snapshot, nothing to compare yet"),
                    CycleOutcome::Unchanged => info!("No changes since last check"),
                    CycleOutcome::Notified(report) => {
                        info!(chunks = report.chunks, blocks = report.blocks, "Sent change notification");
                        status.notification_count += 1;
                    }
                }
                status.last_cycle = Some(Utc::now());
                status.last_error = None;
                status.cycle_count += 1;
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Watch cycle failed");
                status.last_error = Some(e.to_string());
                status.error_count += 1;
            }
        }
    }

    /// Fetch, diff, notify and persist once.
    ///
    /// Once the fetch succeeded the fetched snapshot is persisted no matter
    /// how diffing or delivery went, so the next cycle compares against the
    /// latest data. A notify error takes precedence over a persist error.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let current = self.source.fetch().await?;
        debug!(
            entities = current.entity_count(),
            confirmed = current.totals.confirmed,
            "Fetched current snapshot"
        );

        let notified = self.notify(&current).await;
        let persisted = self.store.save(&current);

        match (notified, persisted) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(persist_error)) => {
                error!(
                    kind = persist_error.kind(),
                    error = %persist_error,
                    "Failed to persist snapshot after failed cycle"
                );
                Err(e)
            }
        }
    }

    async fn notify(&self, current: &Snapshot) -> Result<CycleOutcome> {
        let previous = self.store.load()?;
        let is_baseline = previous.snapshot.is_none();

        let changes = match compute_changes(&previous, current)? {
            Some(changes) => changes,
            None if is_baseline => return Ok(CycleOutcome::Baseline),
            None => return Ok(CycleOutcome::Unchanged),
        };

        info!(
            total_deltas = changes.totals.deltas.len(),
            entities = changes.entities.len(),
            "Found changes in the data"
        );

        // Fully rendered before anything is sent
        let blocks = format_change_set(&changes, Utc::now(), &self.locale);
        let report = self.dispatcher.send(blocks).await?;

        Ok(CycleOutcome::Notified(report))
    }
}
