//! Chunked delivery of formatted blocks to a notification sink.

pub mod slack;

pub use slack::SlackWebhook;

use crate::error::{Result, WatchError};
use crate::format::Block;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Slack caps a single message at 50 blocks
pub const DEFAULT_MAX_BLOCKS: usize = 50;

/// Message envelope accepted by a sink
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Display title of the sender
    pub username: String,
    pub icon_emoji: String,
    /// Routing target (e.g., "#covid-19")
    pub channel: String,
    pub blocks: Vec<Block>,
}

/// Envelope metadata replicated on every delivered chunk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeTemplate {
    pub username: String,
    pub icon_emoji: String,
    pub channel: String,
}

impl EnvelopeTemplate {
    pub fn wrap(&self, blocks: Vec<Block>) -> Envelope {
        Envelope {
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
            channel: self.channel.clone(),
            blocks,
        }
    }
}

/// Destination for notification envelopes.
///
/// Implementations perform a single delivery attempt and report success
/// only on their transport's success status.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink identifier used in logs (e.g., "slack")
    fn name(&self) -> &str;

    /// Deliver one envelope.
    ///
    /// # Returns
    /// * `Ok(())` - The sink accepted the envelope
    /// * `Err(WatchError::DeliveryError)` - Non-success status or transport failure
    async fn deliver(&self, envelope: &Envelope) -> Result<()>;
}

/// Outcome of a dispatch in which every chunk was accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReport {
    pub chunks: usize,
    pub blocks: usize,
}

/// Splits block sequences into size-bounded chunks and sends each one.
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    template: EnvelopeTemplate,
    max_blocks: usize,
}

impl Dispatcher {
    /// Create a dispatcher. A `max_blocks` of zero is treated as one.
    pub fn new(sink: Arc<dyn NotificationSink>, template: EnvelopeTemplate, max_blocks: usize) -> Self {
        Self {
            sink,
            template,
            max_blocks: max_blocks.max(1),
        }
    }

    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// Send `blocks` as consecutive chunks of at most `max_blocks` each.
    ///
    /// Delivery is best-effort: a failed chunk is logged and the remaining
    /// chunks are still sent. If any chunk failed, the first failure is
    /// returned once all chunks have been attempted.
    pub async fn send(&self, blocks: Vec<Block>) -> Result<DeliveryReport> {
        let total_blocks = blocks.len();
        if blocks.is_empty() {
            debug!(sink = %self.sink.name(), "No blocks to deliver");
            return Ok(DeliveryReport { chunks: 0, blocks: 0 });
        }

        let chunk_count = total_blocks.div_ceil(self.max_blocks);
        let mut first_error: Option<WatchError> = None;
        let mut failed = 0;

        for (index, chunk) in blocks.chunks(self.max_blocks).enumerate() {
            let envelope = self.template.wrap(chunk.to_vec());

            match self.sink.deliver(&envelope).await {
                Ok(()) => {
                    debug!(
                        sink = %self.sink.name(),
                        chunk = index + 1,
                        chunks = chunk_count,
                        blocks = chunk.len(),
                        "Delivered chunk"
                    );
                }
                Err(e) => {
                    warn!(
                        sink = %self.sink.name(),
                        chunk = index + 1,
                        chunks = chunk_count,
                        error = %e,
                        "Chunk delivery failed, continuing with remaining chunks"
                    );
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            warn!(
                sink = %self.sink.name(),
                failed = failed,
                chunks = chunk_count,
                "Delivery incomplete"
            );
            return Err(e);
        }

        info!(
            sink = %self.sink.name(),
            chunks = chunk_count,
            blocks = total_blocks,
            "Notification delivered"
        );

        Ok(DeliveryReport {
            chunks: chunk_count,
            blocks: total_blocks,
        })
    }
}
