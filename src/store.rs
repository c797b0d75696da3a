//! Object-store collaborator: get, put, and delete by bucket and key.
//!
//! The production implementation talks to the S3 REST API directly over
//! `reqwest`, signing every request with AWS Signature Version 4. The
//! signing uses only pure-Rust primitives (`hmac`, `sha2`), so no C
//! library dependency is pulled in.
//!
//! Credentials come from the standard environment variables:
//! `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and optionally
//! `AWS_SESSION_TOKEN` for temporary credentials. A custom endpoint
//! (MinIO, LocalStack) switches addressing from virtual-host style to
//! path style.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StoreError;

type HmacSha256 = Hmac<Sha256>;

/// Storage operations the pipelines need. Implementations must be safe to
/// share across an invocation.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's full body.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Write an object, replacing any existing one under the same key.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Remove an object.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}

/// AWS credentials resolved once at construction.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Load from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and the
    /// optional `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self, StoreError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| StoreError::Credentials("AWS_ACCESS_KEY_ID not set".into()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| StoreError::Credentials("AWS_SECRET_ACCESS_KEY not set".into()))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

/// S3 REST API client with SigV4 signing.
pub struct S3ObjectStore {
    client: reqwest::Client,
    credentials: AwsCredentials,
    region: String,
    endpoint: Option<String>,
}

impl S3ObjectStore {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            region: region.into(),
            endpoint: None,
        }
    }

    /// Resolve credentials and region (`AWS_REGION`, default `us-east-1`)
    /// from the environment.
    pub fn from_env() -> Result<Self, StoreError> {
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        Ok(Self::new(AwsCredentials::from_env()?, region))
    }

    /// Use an S3-compatible endpoint (MinIO, LocalStack) with path-style
    /// addressing instead of `<bucket>.s3.<region>.amazonaws.com`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Full URL, signing host, and canonical URI for one object.
    fn locate(&self, bucket: &str, key: &str) -> (String, String, String) {
        let encoded_key = encode_key(key);
        match &self.endpoint {
            Some(endpoint) => {
                let trimmed = endpoint.trim_end_matches('/');
                let host = trimmed
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .to_string();
                let uri = format!("/{bucket}/{encoded_key}");
                (format!("{trimmed}{uri}"), host, uri)
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                let uri = format!("/{encoded_key}");
                (format!("https://{host}{uri}"), host, uri)
            }
        }
    }

    /// SigV4 headers for one request: `x-amz-date`, `x-amz-content-sha256`,
    /// the optional session token, and `Authorization`.
    fn sign(
        &self,
        method: &str,
        host: &str,
        uri: &str,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("host".to_string(), host.to_string()),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect();

        // Empty query string on every object operation.
        let canonical_request = format!(
            "{method}\n{uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );

        let scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let key = signing_key(
            &self.credentials.secret_access_key,
            &date_stamp,
            &self.region,
            "s3",
        );
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.credentials.access_key_id, scope, signed_headers, signature
        );

        // `host` is set by reqwest itself; send the rest explicitly.
        let mut out: Vec<(String, String)> = headers
            .into_iter()
            .filter(|(k, _)| k != "host")
            .collect();
        out.push(("authorization".to_string(), authorization));
        out
    }

    async fn send(
        &self,
        verb: &'static str,
        bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, StoreError> {
        let (url, host, uri) = self.locate(bucket, key);
        let payload_hash = sha256_hex(body.as_deref().unwrap_or(&[]));
        let headers = self.sign(verb, &host, &uri, &payload_hash, Utc::now());

        let mut request = match verb {
            "GET" => self.client.get(&url),
            "PUT" => self.client.put(&url).body(body.unwrap_or_default()),
            "DELETE" => self.client.delete(&url),
            other => unreachable!("unsupported store verb {other}"),
        };
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!("{} s3://{}/{}", verb, bucket, key);
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Api {
                verb,
                status: response.status().as_u16(),
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self.send("GET", bucket, key, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.send("PUT", bucket, key, Some(body)).await?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.send("DELETE", bucket, key, None).await?;
        Ok(())
    }
}

// ── SigV4 primitives ─────────────────────────────────────────────────────

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the per-day signing key:
/// `HMAC(HMAC(HMAC(HMAC("AWS4"+secret, date), region), service), "aws4_request")`.
fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encode one path segment per RFC 3986 (unreserved chars only).
fn uri_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Encode an object key, preserving `/` as the segment separator.
fn encode_key(key: &str) -> String {
    key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store(endpoint: Option<&str>) -> S3ObjectStore {
        let creds = AwsCredentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            session_token: None,
        };
        let mut s = S3ObjectStore::new(creds, "eu-west-1");
        if let Some(e) = endpoint {
            s = s.with_endpoint(e);
        }
        s
    }

    #[test]
    fn signing_key_matches_published_vector() {
        // Reference vector from the AWS SigV4 documentation.
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn uri_encode_escapes_reserved_chars() {
        assert_eq!(uri_encode("Chocolate Cake(v2).md"), "Chocolate%20Cake%28v2%29.md");
        assert_eq!(uri_encode("plain-name_0.md"), "plain-name_0.md");
    }

    #[test]
    fn encode_key_keeps_segment_separators() {
        assert_eq!(encode_key("scans/march issue.jpg"), "scans/march%20issue.jpg");
    }

    #[test]
    fn virtual_host_addressing_by_default() {
        let (url, host, uri) = store(None).locate("recipes", "A.md");
        assert_eq!(host, "recipes.s3.eu-west-1.amazonaws.com");
        assert_eq!(uri, "/A.md");
        assert_eq!(url, "https://recipes.s3.eu-west-1.amazonaws.com/A.md");
    }

    #[test]
    fn path_style_addressing_with_endpoint() {
        let (url, host, uri) = store(Some("http://localhost:9000")).locate("recipes", "A.md");
        assert_eq!(host, "localhost:9000");
        assert_eq!(uri, "/recipes/A.md");
        assert_eq!(url, "http://localhost:9000/recipes/A.md");
    }

    #[test]
    fn signed_headers_include_date_hash_and_authorization() {
        let s = store(None);
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let headers = s.sign("GET", "recipes.s3.eu-west-1.amazonaws.com", "/A.md", &sha256_hex(b""), now);

        let names: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
        assert!(names.contains(&"x-amz-date"));
        assert!(names.contains(&"x-amz-content-sha256"));
        assert!(names.contains(&"authorization"));

        let auth = &headers.iter().find(|(k, _)| k == "authorization").unwrap().1;
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240301/eu-west-1/s3/aws4_request"));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    }
}
