//! Document Publisher: uploaded Markdown becomes a wiki page.
//!
//! One invocation runs the whole flow in order:
//!
//! ```text
//! queue event ──▶ fetch object ──▶ title + category ──▶ wiki markup
//!                                        │
//!                     exists? ──yes──▶ skip (idempotent on redelivery)
//!                        │no
//!                     create page ──▶ attach category label
//! ```
//!
//! Publishing is never retried: a rejected page creation is logged and the
//! invocation ends normally, leaving re-upload as the manual replay path.
//! A failed label attachment does not undo the created page; the page
//! simply stays unlabelled and the failure is visible in the logs.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::PublisherConfig;
use crate::error::PublishError;
use crate::event;
use crate::markup;
use crate::store::ObjectStore;
use crate::wiki::{NewPage, WikiClient};

/// How one publisher invocation ended. Every variant is a normal return;
/// failures that must fail the invocation are `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Page created; `labeled` records whether the category label stuck.
    Created {
        page_id: String,
        title: String,
        label: String,
        labeled: bool,
    },
    /// A page with this title already exists in the space.
    SkippedExisting { page_id: String, title: String },
    /// The wiki rejected the creation call; logged, nothing created.
    CreateFailed { title: String },
}

/// Pipeline A orchestrator.
pub struct Publisher {
    config: PublisherConfig,
    store: Arc<dyn ObjectStore>,
    wiki: Arc<dyn WikiClient>,
}

impl Publisher {
    pub fn new(
        config: PublisherConfig,
        store: Arc<dyn ObjectStore>,
        wiki: Arc<dyn WikiClient>,
    ) -> Self {
        Self {
            config,
            store,
            wiki,
        }
    }

    /// Process one raw queue event payload.
    pub async fn handle(&self, raw_event: &str) -> Result<PublishOutcome, PublishError> {
        let object = event::parse(raw_event)?;
        info!("publishing s3://{}/{}", object.bucket, object.key);

        let bytes = self.store.get(&object.bucket, &object.key).await?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let title = self.page_title(&object.key);

        if let Some(page_id) = self
            .wiki
            .find_page(&self.config.space_id, &title)
            .await
            .map_err(PublishError::Lookup)?
        {
            info!("page '{}' already exists (id {}), skipping", title, page_id);
            return Ok(PublishOutcome::SkippedExisting { page_id, title });
        }

        let label = markup::category(&content);
        let body = markup::to_wiki_markup(&content);

        let page_id = match self
            .wiki
            .create_page(NewPage {
                title: &title,
                space_id: &self.config.space_id,
                parent_id: &self.config.parent_page_id,
                body: &body,
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("failed to create page '{}': {}", title, e);
                return Ok(PublishOutcome::CreateFailed { title });
            }
        };
        info!(
            "page '{}' created (id {}) under parent {}",
            title, page_id, self.config.parent_page_id
        );

        let labeled = match self.wiki.add_label(&page_id, &label).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "failed to attach label '{}' to page {}: {}; page left unlabelled",
                    label, page_id, e
                );
                false
            }
        };

        Ok(PublishOutcome::Created {
            page_id,
            title,
            label,
            labeled,
        })
    }

    /// Page title: optional prefix plus the filename without extension.
    fn page_title(&self, key: &str) -> String {
        let stem = Path::new(key)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(key);
        match &self.config.title_prefix {
            Some(prefix) => format!("{prefix}{stem}"),
            None => stem.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryObjectStore, RecordingWiki};

    fn publisher(prefix: Option<&str>) -> Publisher {
        let config = PublisherConfig {
            wiki_base_url: "https://wiki.test/api/v2".into(),
            username: "bot".into(),
            api_token: "token".into(),
            space_id: "1001".into(),
            parent_page_id: "2002".into(),
            title_prefix: prefix.map(String::from),
        };
        Publisher::new(
            config,
            Arc::new(MemoryObjectStore::default()),
            Arc::new(RecordingWiki::default()),
        )
    }

    #[test]
    fn title_is_filename_stem() {
        assert_eq!(publisher(None).page_title("docs/Tiramisu.md"), "Tiramisu");
        assert_eq!(publisher(None).page_title("Tiramisu.md"), "Tiramisu");
    }

    #[test]
    fn title_prefix_is_prepended() {
        assert_eq!(
            publisher(Some("Recipes: ")).page_title("Tiramisu.md"),
            "Recipes: Tiramisu"
        );
    }

    #[test]
    fn title_without_extension_is_kept_whole() {
        assert_eq!(publisher(None).page_title("notes"), "notes");
    }
}
