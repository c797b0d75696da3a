//! Inbound trigger envelope: queue record wrapping a storage notification.
//!
//! Each invocation receives one queue message whose `body` field is itself a
//! JSON string holding the storage service's own event document. Only the
//! bucket name and object key are consumed; everything else in the envelope
//! is infrastructure detail and ignored.
//!
//! Object keys arrive percent-encoded with spaces as `+`. [`parse`] decodes
//! them so callers always see the real key.

use serde::Deserialize;

use crate::error::EventError;

/// The outer queue envelope: a list of delivery records.
#[derive(Debug, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "Records")]
    pub records: Vec<QueueRecord>,
}

/// One queue delivery. `body` is the storage notification as a JSON string.
#[derive(Debug, Deserialize)]
pub struct QueueRecord {
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct StorageNotification {
    #[serde(rename = "Records")]
    records: Vec<StorageRecord>,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    s3: StorageEntity,
}

#[derive(Debug, Deserialize)]
struct StorageEntity {
    bucket: BucketRef,
    object: ObjectKeyRef,
}

#[derive(Debug, Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectKeyRef {
    key: String,
}

/// The stored object an invocation is about: bucket plus decoded key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

/// Extract the triggering object from a raw queue event payload.
///
/// Reads the first record's `body`, parses the nested storage notification,
/// and percent-decodes the object key. Any shape mismatch is an
/// [`EventError`] and fails the invocation.
pub fn parse(raw_event: &str) -> Result<ObjectRef, EventError> {
    let event: QueueEvent = serde_json::from_str(raw_event)?;
    let record = event.records.first().ok_or(EventError::NoRecords)?;

    let notification: StorageNotification = serde_json::from_str(&record.body)?;
    let storage = notification
        .records
        .into_iter()
        .next()
        .ok_or(EventError::NoRecords)?;

    Ok(ObjectRef {
        bucket: storage.s3.bucket.name,
        key: decode_key(&storage.s3.object.key)?,
    })
}

/// Decode a storage object key: `+` means space, then percent-unescape.
fn decode_key(key: &str) -> Result<String, EventError> {
    let plussed = key.replace('+', " ");
    urlencoding::decode(&plussed)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| EventError::Key(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::storage_event;

    #[test]
    fn parses_bucket_and_key() {
        let object = parse(&storage_event("uploads", "notes.md")).expect("valid envelope");
        assert_eq!(object.bucket, "uploads");
        assert_eq!(object.key, "notes.md");
    }

    #[test]
    fn decodes_plus_and_percent_escapes() {
        let object = parse(&storage_event("uploads", "Chocolate+Cake%28v2%29.md")).unwrap();
        assert_eq!(object.key, "Chocolate Cake(v2).md");
    }

    #[test]
    fn rejects_envelope_without_records() {
        let raw = r#"{"Records": []}"#;
        assert!(matches!(parse(raw), Err(EventError::NoRecords)));
    }

    #[test]
    fn rejects_non_json_body() {
        let raw = r#"{"Records": [{"body": "not json"}]}"#;
        assert!(matches!(parse(raw), Err(EventError::Envelope(_))));
    }

    #[test]
    fn rejects_missing_storage_section() {
        let raw = r#"{"Records": [{"body": "{\"Records\": [{}]}"}]}"#;
        assert!(matches!(parse(raw), Err(EventError::Envelope(_))));
    }
}
