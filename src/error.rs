//! Error types for the recipe2wiki library.
//!
//! Two layers of failure exist and they are deliberately kept apart:
//!
//! * **Handler errors** ([`PublishError`], [`ExtractError`]): the invocation
//!   itself fails. These cover a malformed trigger envelope and object-store
//!   faults, where continuing would either process garbage or violate the
//!   rule that a source object survives until its output exists. They
//!   propagate out of the handler as `Err` and the hosting infrastructure
//!   sees a failed invocation.
//!
//! * **Call errors** ([`WikiError`], [`VisionError`]): one outbound call to
//!   a collaborator failed. The orchestrators absorb these: Pipeline A logs
//!   and returns a non-created outcome, Pipeline B retries under its policy
//!   and logs exhaustion. They never cross the handler boundary on their own.

use thiserror::Error;

/// Failures while reading the inbound queue envelope.
///
/// The envelope format is owned by the queue infrastructure and is not
/// hardened against here: a malformed payload fails the whole invocation.
#[derive(Debug, Error)]
pub enum EventError {
    /// The envelope or its nested storage notification is not valid JSON
    /// of the expected shape.
    #[error("malformed queue envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    /// The envelope parsed but carried no records.
    #[error("queue envelope contains no records")]
    NoRecords,

    /// The object key was percent-encoded with an invalid byte sequence.
    #[error("object key is not valid percent-encoded UTF-8: {0}")]
    Key(String),
}

/// A required environment variable is missing or empty.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
}

/// Failures talking to the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store credentials could not be resolved from the environment.
    #[error("object-store credentials not configured: {0}")]
    Credentials(String),

    /// The HTTP request never completed (DNS, TLS, connection reset, ...).
    #[error("object-store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("object store returned HTTP {status} for {verb} s3://{bucket}/{key}")]
    Api {
        verb: &'static str,
        status: u16,
        bucket: String,
        key: String,
    },
}

/// Failures talking to the wiki service.
#[derive(Debug, Error)]
pub enum WikiError {
    /// The HTTP request never completed.
    #[error("wiki request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The wiki answered with a non-success status.
    #[error("wiki returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

/// Failures talking to the vision model.
///
/// Every variant is treated as retryable by [`crate::retry::RetryPolicy`];
/// there is no client-error/server-error distinction at this layer.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The HTTP request never completed.
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The model API answered with a non-success status.
    #[error("model API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A 2xx response carried no completion choices.
    #[error("model response contained no completion")]
    EmptyCompletion,
}

/// Fatal errors from the Document Publisher handler (Pipeline A).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The page-existence lookup failed. Creating blindly at this point
    /// could duplicate a title, so the invocation fails instead.
    #[error("page-existence lookup failed: {0}")]
    Lookup(#[source] WikiError),
}

/// Fatal errors from the Image Extractor handler (Pipeline B).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_api_display() {
        let e = StoreError::Api {
            verb: "PUT",
            status: 403,
            bucket: "recipes".into(),
            key: "Tiramisu.md".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("s3://recipes/Tiramisu.md"));
    }

    #[test]
    fn wiki_api_display() {
        let e = WikiError::Api {
            status: 409,
            message: "title already exists".into(),
        };
        assert!(e.to_string().contains("409"));
        assert!(e.to_string().contains("title already exists"));
    }

    #[test]
    fn publish_error_wraps_event_transparently() {
        let e = PublishError::from(EventError::NoRecords);
        assert_eq!(e.to_string(), "queue envelope contains no records");
    }
}
