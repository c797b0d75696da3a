//! Image Extractor: a scanned page becomes per-recipe Markdown objects.
//!
//! One invocation runs the whole flow in order:
//!
//! ```text
//! queue event ──▶ fetch image ──▶ base64 data URL
//!                                      │
//!                     vision model (retried, bounded backoff)
//!                                      │
//!                     split at recipe headings ──▶ put each block
//!                                      │
//!                     delete the source object
//! ```
//!
//! The source object is deleted only after every output block has been
//! written; any earlier failure leaves it in place, so unprocessed scans
//! stay visible for inspection or replay. Retry exhaustion is a normal
//! return, not an error: the handler logs it and hands the event back to
//! the infrastructure's own redelivery rules.
//!
//! Redelivery of the same event is **not** deduplicated here. A duplicate
//! delivery repeats the model call and rewrites the output objects; the
//! event contract carries no version or ETag to key idempotency on.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::event;
use crate::prompts;
use crate::retry::Sleeper;
use crate::split;
use crate::store::ObjectStore;
use crate::vision::{EncodedImage, TokenUsage, VisionModel};

/// Accounting for a completed extraction.
#[derive(Debug, Clone)]
pub struct ExtractionStats {
    /// Output objects written to the destination bucket.
    pub blocks_written: usize,
    /// Model-call attempts made, including the successful one.
    pub attempts: u32,
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

/// How one extractor invocation ended.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// Blocks written and the source object deleted.
    Extracted(ExtractionStats),
    /// The model never answered within the attempt budget; the source
    /// object was left untouched.
    RetriesExhausted { attempts: u32 },
}

/// Pipeline B orchestrator.
pub struct Extractor {
    config: ExtractorConfig,
    store: Arc<dyn ObjectStore>,
    model: Arc<dyn VisionModel>,
    sleeper: Arc<dyn Sleeper>,
}

impl Extractor {
    pub fn new(
        config: ExtractorConfig,
        store: Arc<dyn ObjectStore>,
        model: Arc<dyn VisionModel>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            store,
            model,
            sleeper,
        }
    }

    /// Process one raw queue event payload.
    pub async fn handle(&self, raw_event: &str) -> Result<ExtractionOutcome, ExtractError> {
        let start = Instant::now();
        let object = event::parse(raw_event)?;
        info!("extracting s3://{}/{}", object.bucket, object.key);

        let bytes = self.store.get(&object.bucket, &object.key).await?;
        let image = EncodedImage::from_jpeg_bytes(&bytes);
        let prompt = self
            .config
            .prompt
            .as_deref()
            .unwrap_or(prompts::RECIPE_EXTRACTION_PROMPT);

        let attempted = match self
            .config
            .retry
            .run(self.sleeper.as_ref(), || self.model.extract(prompt, &image))
            .await
        {
            Ok(attempted) => attempted,
            Err(exhausted) => {
                warn!(
                    "failed to process image {} after {} attempts: {}; source retained",
                    object.key, exhausted.attempts, exhausted.last
                );
                return Ok(ExtractionOutcome::RetriesExhausted {
                    attempts: exhausted.attempts,
                });
            }
        };
        let extraction = attempted.value;

        let blocks = split::split_recipes(&extraction.markdown);
        for (position, block) in blocks.iter().enumerate() {
            let filename = block.filename(position);
            self.store
                .put(
                    &self.config.destination_bucket,
                    &filename,
                    block.markdown.clone().into_bytes(),
                )
                .await?;
            info!(
                "wrote s3://{}/{} ({} bytes)",
                self.config.destination_bucket,
                filename,
                block.markdown.len()
            );
        }

        // All output exists; only now is the source expendable.
        self.store.delete(&object.bucket, &object.key).await?;
        info!("deleted source s3://{}/{}", object.bucket, object.key);

        Ok(ExtractionOutcome::Extracted(ExtractionStats {
            blocks_written: blocks.len(),
            attempts: attempted.attempts,
            usage: extraction.usage,
            duration_ms: start.elapsed().as_millis() as u64,
        }))
    }
}
