//! Wiki service collaborator: existence lookup, page creation, labels.
//!
//! The destination wiki exposes an HTTP/JSON API authenticated with basic
//! auth (username + API token). Three calls are used:
//!
//! * `GET  {base}/pages?spaceKey=&title=` — existence lookup; the first
//!   result's id counts as the match.
//! * `POST {base}/pages` — create a page under a parent, body in wiki
//!   markup representation.
//! * `POST {base}/content/{id}/label` — attach one global label.
//!
//! The lookup and creation use different parameter names for the same
//! space value (`spaceKey` vs `spaceId`); that asymmetry belongs to the
//! service and is reproduced here rather than papered over.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::WikiError;

/// A page to be created.
#[derive(Debug, Clone)]
pub struct NewPage<'a> {
    pub title: &'a str,
    pub space_id: &'a str,
    pub parent_id: &'a str,
    /// Page body, already converted to wiki markup.
    pub body: &'a str,
}

/// Wiki operations the publisher needs.
#[async_trait]
pub trait WikiClient: Send + Sync {
    /// Id of an existing page with this exact title in the space, if any.
    async fn find_page(&self, space: &str, title: &str) -> Result<Option<String>, WikiError>;

    /// Create a page and return its id.
    async fn create_page(&self, page: NewPage<'_>) -> Result<String, WikiError>;

    /// Attach a global label to a page.
    async fn add_label(&self, page_id: &str, label: &str) -> Result<(), WikiError>;
}

/// HTTP client for the Confluence REST API.
pub struct ConfluenceClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
}

impl ConfluenceClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            api_token: api_token.into(),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PageList {
    #[serde(default)]
    results: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreatePageRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    #[serde(rename = "spaceId")]
    space_id: &'a str,
    #[serde(rename = "parentId")]
    parent_id: &'a str,
    status: &'static str,
    body: PageBody<'a>,
    metadata: PageMetadata,
}

#[derive(Debug, Serialize)]
struct PageBody<'a> {
    value: &'a str,
    representation: &'static str,
}

#[derive(Debug, Serialize)]
struct PageMetadata {
    properties: MetadataProperties,
}

#[derive(Debug, Serialize)]
struct MetadataProperties {
    editor: EditorProperty,
}

#[derive(Debug, Serialize)]
struct EditorProperty {
    value: &'static str,
}

impl<'a> CreatePageRequest<'a> {
    fn from_page(page: &NewPage<'a>) -> Self {
        Self {
            kind: "page",
            title: page.title,
            space_id: page.space_id,
            parent_id: page.parent_id,
            status: "current",
            body: PageBody {
                value: page.body,
                representation: "wiki",
            },
            metadata: PageMetadata {
                properties: MetadataProperties {
                    editor: EditorProperty { value: "v2" },
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct LabelRequest<'a> {
    prefix: &'static str,
    name: &'a str,
}

#[async_trait]
impl WikiClient for ConfluenceClient {
    async fn find_page(&self, space: &str, title: &str) -> Result<Option<String>, WikiError> {
        let response = self
            .client
            .get(format!("{}/pages", self.base_url))
            .query(&[("spaceKey", space), ("title", title)])
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .send()
            .await?;

        // A lookup the service rejects is treated as no match; the create
        // call that follows surfaces any real problem with the service.
        if !response.status().is_success() {
            warn!(
                "page lookup for '{}' returned HTTP {}; treating as absent",
                title,
                response.status()
            );
            return Ok(None);
        }

        let list: PageList = response.json().await?;
        Ok(list.results.into_iter().next().map(|page| page.id))
    }

    async fn create_page(&self, page: NewPage<'_>) -> Result<String, WikiError> {
        let response = self
            .client
            .post(format!("{}/pages", self.base_url))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .json(&CreatePageRequest::from_page(&page))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(WikiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: PageRef = response.json().await?;
        Ok(created.id)
    }

    async fn add_label(&self, page_id: &str, label: &str) -> Result<(), WikiError> {
        let response = self
            .client
            .post(format!("{}/content/{}/label", self.base_url, page_id))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .json(&[LabelRequest {
                prefix: "global",
                name: label,
            }])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WikiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_page_payload_shape() {
        let request = CreatePageRequest::from_page(&NewPage {
            title: "Tiramisu",
            space_id: "1001",
            parent_id: "2002",
            body: "h1. Tiramisu",
        });

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "page",
                "title": "Tiramisu",
                "spaceId": "1001",
                "parentId": "2002",
                "status": "current",
                "body": { "value": "h1. Tiramisu", "representation": "wiki" },
                "metadata": { "properties": { "editor": { "value": "v2" } } }
            })
        );
    }

    #[test]
    fn label_payload_is_a_single_element_array() {
        let value = serde_json::to_value([LabelRequest {
            prefix: "global",
            name: "Dessert",
        }])
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "prefix": "global", "name": "Dessert" }])
        );
    }

    #[test]
    fn page_list_parses_first_id() {
        let list: PageList =
            serde_json::from_str(r#"{"results": [{"id": "77"}, {"id": "88"}]}"#).unwrap();
        assert_eq!(list.results[0].id, "77");
    }

    #[test]
    fn page_list_tolerates_missing_results() {
        let list: PageList = serde_json::from_str("{}").unwrap();
        assert!(list.results.is_empty());
    }
}
