//! Vision-model collaborator: one image in, structured Markdown out.
//!
//! The model API accepts images as base64 data URLs embedded in a
//! chat-completion request. Each extraction is a single user turn carrying
//! the instruction prompt as a text part and the scanned page as an
//! `image_url` part; the first choice's message content is the extracted
//! Markdown.
//!
//! Request-level failures carry no classification here: the caller wraps
//! the call in [`crate::retry::RetryPolicy`], which retries everything.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VisionError;

/// A scanned page ready for transport, wrapped in a JPEG data URL.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    data_url: String,
}

impl EncodedImage {
    /// Base64-encode raw JPEG bytes into a `data:image/jpeg;base64,` URL.
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Self {
        let b64 = STANDARD.encode(bytes);
        debug!("encoded image, {} bytes base64", b64.len());
        Self {
            data_url: format!("data:image/jpeg;base64,{b64}"),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// Token usage reported by the model API.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A completed extraction: the model's Markdown plus usage accounting.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub markdown: String,
    pub usage: TokenUsage,
}

/// The vision-capable model the extractor calls.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn extract(&self, prompt: &str, image: &EncodedImage)
        -> Result<Extraction, VisionError>;
}

/// Chat-completions client for an OpenAI-style vision API.
pub struct OpenAiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    max_tokens: u32,
}

impl OpenAiVision {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_tokens,
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl VisionModel for OpenAiVision {
    async fn extract(
        &self,
        prompt: &str,
        image: &EncodedImage,
    ) -> Result<Extraction, VisionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatResponse = response.json().await?;
        let usage = completion
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(VisionError::EmptyCompletion)?;

        Ok(Extraction {
            markdown: choice.message.content,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_wraps_base64_jpeg() {
        let image = EncodedImage::from_jpeg_bytes(&[0xFF, 0xD8, 0xFF]);
        assert!(image.data_url().starts_with("data:image/jpeg;base64,"));
        let b64 = image.data_url().trim_start_matches("data:image/jpeg;base64,");
        assert_eq!(STANDARD.decode(b64).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn request_payload_shape() {
        let image = EncodedImage {
            data_url: "data:image/jpeg;base64,QUJD".into(),
        };
        let request = ChatRequest {
            model: "gpt-4-vision-preview",
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: "extract" },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4-vision-preview",
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "extract" },
                        { "type": "image_url",
                          "image_url": { "url": "data:image/jpeg;base64,QUJD" } }
                    ]
                }],
                "max_tokens": 4096
            })
        );
    }

    #[test]
    fn response_parses_first_choice_and_usage() {
        let raw = r##"{
            "choices": [{ "message": { "content": "# Tiramisu\nbody" } }],
            "usage": { "prompt_tokens": 900, "completion_tokens": 120, "total_tokens": 1020 }
        }"##;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "# Tiramisu\nbody");
        assert_eq!(parsed.usage.unwrap().completion_tokens, 120);
    }

    #[test]
    fn response_without_usage_still_parses() {
        let raw = r#"{ "choices": [{ "message": { "content": "x" } }] }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.usage.is_none());
    }
}
