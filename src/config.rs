//! Configuration for the two pipelines.
//!
//! Each orchestrator takes its configuration as an explicit struct at
//! construction rather than reading process globals at call sites, so tests
//! can build one inline and production code can load one from the
//! environment with [`PublisherConfig::from_env`] /
//! [`ExtractorConfig::from_env`]. Every variable is required unless noted;
//! a missing one is a typed [`ConfigError`] instead of a panic deep inside
//! a request.

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Default vision-capable model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4-vision-preview";

/// Default model API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

/// Upper bound on generated tokens per extraction.
pub const MAX_TOKENS: u32 = 4096;

/// Settings for the Document Publisher (Pipeline A).
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Wiki REST API root, e.g. `https://example.atlassian.net/wiki/api/v2`.
    pub wiki_base_url: String,
    /// Basic-auth username for the wiki service.
    pub username: String,
    /// Basic-auth API token for the wiki service.
    pub api_token: String,
    /// Space the pages are created in, also used for existence lookups.
    pub space_id: String,
    /// Parent page every created page is nested under.
    pub parent_page_id: String,
    /// Optional prefix prepended to every derived page title.
    pub title_prefix: Option<String>,
}

impl PublisherConfig {
    /// Load from `CONFLUENCE_API_URL`, `CONFLUENCE_USERNAME`, `API_TOKEN`,
    /// `SPACE_ID`, `PARENT_PAGE_ID`, and the optional `TITLE_PREFIX`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            wiki_base_url: required("CONFLUENCE_API_URL")?,
            username: required("CONFLUENCE_USERNAME")?,
            api_token: required("API_TOKEN")?,
            space_id: required("SPACE_ID")?,
            parent_page_id: required("PARENT_PAGE_ID")?,
            title_prefix: optional("TITLE_PREFIX"),
        })
    }
}

/// Settings for the Image Extractor (Pipeline B).
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Bearer token for the model API.
    pub api_key: String,
    /// Bucket the per-recipe Markdown objects are written to.
    pub destination_bucket: String,
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Model API base URL. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,
    /// Output-token budget per request. Default: [`MAX_TOKENS`].
    pub max_tokens: u32,
    /// Extraction prompt override. Default:
    /// [`crate::prompts::RECIPE_EXTRACTION_PROMPT`].
    pub prompt: Option<String>,
    /// Retry policy around the model call. Default: 5 attempts,
    /// 1 s base delay.
    pub retry: RetryPolicy,
}

impl ExtractorConfig {
    /// Build a config with defaults for everything but the credentials
    /// and destination.
    pub fn new(api_key: impl Into<String>, destination_bucket: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            destination_bucket: destination_bucket.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_tokens: MAX_TOKENS,
            prompt: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Load from `API_KEY` and `DESTINATION_BUCKET`; everything else keeps
    /// its default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(
            required("API_KEY")?,
            required("DESTINATION_BUCKET")?,
        ))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
