//! # recipe2wiki
//!
//! Event-driven bridge from object-storage uploads to two external
//! services: a Confluence-style wiki (Markdown documents become pages) and
//! a vision-capable language model (scanned recipe pages become structured
//! Markdown objects).
//!
//! Each invocation is triggered by one queued storage notification, runs a
//! single straight-line flow, and holds no state between runs. Duplicate
//! queue delivery is absorbed by the publisher's title-existence check;
//! the extractor has no such key and reprocesses on redelivery.
//!
//! ## Pipeline A — Document Publisher
//!
//! ```text
//! queue event
//!  │
//!  ├─ 1. Parse    bucket + percent-decoded object key
//!  ├─ 2. Fetch    Markdown body from the object store
//!  ├─ 3. Derive   title (prefix + filename stem), category (## Category)
//!  ├─ 4. Convert  Markdown → wiki markup (h1–h3, bullets, images)
//!  ├─ 5. Check    skip when a page with that title already exists
//!  └─ 6. Create   page under the configured parent, attach category label
//! ```
//!
//! ## Pipeline B — Image Extractor
//!
//! ```text
//! queue event
//!  │
//!  ├─ 1. Parse    bucket + object key
//!  ├─ 2. Fetch    image bytes from the object store
//!  ├─ 3. Encode   base64 data URL
//!  ├─ 4. Model    chat-completion call under bounded exponential retry
//!  ├─ 5. Split    response Markdown at top-level recipe headings
//!  └─ 6. Write    one object per recipe, then delete the source
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recipe2wiki::{
//!     ConfluenceClient, Publisher, PublisherConfig, S3ObjectStore,
//! };
//!
//! # async fn run(raw_event: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PublisherConfig::from_env()?;
//! let wiki = ConfluenceClient::new(
//!     config.wiki_base_url.clone(),
//!     config.username.clone(),
//!     config.api_token.clone(),
//! );
//! let publisher = Publisher::new(
//!     config,
//!     Arc::new(S3ObjectStore::from_env()?),
//!     Arc::new(wiki),
//! );
//! let outcome = publisher.handle(raw_event).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! There is no CLI: both pipelines are invoked by the hosting
//! infrastructure with the raw queue payload. Collaborators sit behind
//! traits ([`ObjectStore`], [`WikiClient`], [`VisionModel`], [`Sleeper`]),
//! with in-memory doubles in [`testing`] for driving either pipeline
//! without real infrastructure.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod markup;
pub mod prompts;
pub mod publish;
pub mod retry;
pub mod split;
pub mod store;
pub mod testing;
pub mod vision;
pub mod wiki;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, PublisherConfig};
pub use error::{
    ConfigError, EventError, ExtractError, PublishError, StoreError, VisionError, WikiError,
};
pub use event::{ObjectRef, QueueEvent};
pub use extract::{ExtractionOutcome, ExtractionStats, Extractor};
pub use publish::{PublishOutcome, Publisher};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use split::RecipeBlock;
pub use store::{AwsCredentials, ObjectStore, S3ObjectStore};
pub use vision::{EncodedImage, Extraction, OpenAiVision, TokenUsage, VisionModel};
pub use wiki::{ConfluenceClient, NewPage, WikiClient};
