//! Test doubles for the collaborator traits.
//!
//! Everything here is deterministic and in-memory so pipeline behaviour can
//! be exercised end-to-end without object storage, a wiki tenant, or a
//! model API. Each double records the calls it receives; failure injection
//! is per-double and explicit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StoreError, VisionError, WikiError};
use crate::retry::Sleeper;
use crate::store::ObjectStore;
use crate::vision::{EncodedImage, Extraction, TokenUsage, VisionModel};
use crate::wiki::{NewPage, WikiClient};

/// Build a raw queue event payload for the given object.
pub fn storage_event(bucket: &str, key: &str) -> String {
    let notification = serde_json::json!({
        "Records": [{
            "s3": {
                "bucket": { "name": bucket },
                "object": { "key": key }
            }
        }]
    });
    serde_json::json!({
        "Records": [{ "body": notification.to_string() }]
    })
    .to_string()
}

// ── Object store ─────────────────────────────────────────────────────────

/// In-memory [`ObjectStore`] keyed by `(bucket, key)`.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_puts: AtomicBool,
}

impl MemoryObjectStore {
    /// Seed an object.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    /// Sorted keys currently stored in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Make every subsequent `put` fail with an HTTP 500.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.object(bucket, key).ok_or_else(|| StoreError::Api {
            verb: "GET",
            status: 404,
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                verb: "PUT",
                status: 500,
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

// ── Wiki ─────────────────────────────────────────────────────────────────

/// A page created through [`RecordingWiki`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPage {
    pub id: String,
    pub title: String,
    pub space_id: String,
    pub parent_id: String,
    pub body: String,
}

/// Recording [`WikiClient`]: pages live in memory, every call is counted.
#[derive(Default)]
pub struct RecordingWiki {
    existing: Mutex<HashMap<(String, String), String>>,
    pages: Mutex<Vec<CreatedPage>>,
    labels: Mutex<Vec<(String, String)>>,
    lookups: AtomicU32,
    creates: AtomicU32,
    next_id: AtomicU32,
    fail_create: AtomicBool,
    fail_label: AtomicBool,
}

impl RecordingWiki {
    /// Pretend a page with this title already exists in the space.
    pub fn add_existing(&self, space: &str, title: &str, id: &str) {
        self.existing
            .lock()
            .unwrap()
            .insert((space.to_string(), title.to_string()), id.to_string());
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_label(&self, fail: bool) {
        self.fail_label.store(fail, Ordering::SeqCst);
    }

    pub fn created_pages(&self) -> Vec<CreatedPage> {
        self.pages.lock().unwrap().clone()
    }

    /// `(page_id, label)` pairs attached so far.
    pub fn labels(&self) -> Vec<(String, String)> {
        self.labels.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WikiClient for RecordingWiki {
    async fn find_page(&self, space: &str, title: &str) -> Result<Option<String>, WikiError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = self
            .existing
            .lock()
            .unwrap()
            .get(&(space.to_string(), title.to_string()))
        {
            return Ok(Some(id.clone()));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.space_id == space && p.title == title)
            .map(|p| p.id.clone()))
    }

    async fn create_page(&self, page: NewPage<'_>) -> Result<String, WikiError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WikiError::Api {
                status: 500,
                message: "injected create failure".into(),
            });
        }
        let id = format!("{}", 1000 + self.next_id.fetch_add(1, Ordering::SeqCst));
        self.pages.lock().unwrap().push(CreatedPage {
            id: id.clone(),
            title: page.title.to_string(),
            space_id: page.space_id.to_string(),
            parent_id: page.parent_id.to_string(),
            body: page.body.to_string(),
        });
        Ok(id)
    }

    async fn add_label(&self, page_id: &str, label: &str) -> Result<(), WikiError> {
        if self.fail_label.load(Ordering::SeqCst) {
            return Err(WikiError::Api {
                status: 500,
                message: "injected label failure".into(),
            });
        }
        self.labels
            .lock()
            .unwrap()
            .push((page_id.to_string(), label.to_string()));
        Ok(())
    }
}

// ── Vision model ─────────────────────────────────────────────────────────

/// Scripted [`VisionModel`]: fails a fixed number of times, then answers
/// with a canned Markdown document (or never answers at all).
pub struct ScriptedVision {
    failures_before_success: AtomicU32,
    response: Option<String>,
    calls: AtomicU32,
}

impl ScriptedVision {
    /// Succeeds on the first attempt.
    pub fn succeeding(markdown: &str) -> Self {
        Self::failing_then_succeeding(0, markdown)
    }

    /// Fails `failures` times, then succeeds.
    pub fn failing_then_succeeding(failures: u32, markdown: &str) -> Self {
        Self {
            failures_before_success: AtomicU32::new(failures),
            response: Some(markdown.to_string()),
            calls: AtomicU32::new(0),
        }
    }

    /// Fails every attempt.
    pub fn always_failing() -> Self {
        Self {
            failures_before_success: AtomicU32::new(0),
            response: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for ScriptedVision {
    async fn extract(
        &self,
        _prompt: &str,
        _image: &EncodedImage,
    ) -> Result<Extraction, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(markdown) = &self.response else {
            return Err(VisionError::Api {
                status: 503,
                message: "scripted failure".into(),
            });
        };
        let remaining = self.failures_before_success.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_before_success
                .store(remaining - 1, Ordering::SeqCst);
            return Err(VisionError::Api {
                status: 503,
                message: "scripted failure".into(),
            });
        }
        Ok(Extraction {
            markdown: markdown.clone(),
            usage: TokenUsage {
                prompt_tokens: 850,
                completion_tokens: 210,
            },
        })
    }
}

// ── Sleeper ──────────────────────────────────────────────────────────────

/// [`Sleeper`] that records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}
