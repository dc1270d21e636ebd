//! Gemini (Google) client for translation and reference-guided image generation.

use crate::error::{parse_retry_after, sanitize_error_message, CharVizError, Result};
use crate::image::provider::GenerativeModel;
use crate::image::types::ImagePayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for text calls (translation).
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Environment variables consulted for the API key, in order.
const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiImageModel {
    /// Gemini 2.5 Flash Image preview, tuned for editing from a reference.
    #[default]
    FlashImagePreview,
    /// Nano Banana - Gemini 2.5 Flash Image (stable).
    FlashImage,
    /// Nano Banana Pro - highest quality.
    ProImage,
}

impl GeminiImageModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImagePreview => "gemini-2.5-flash-image-preview",
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::ProImage => "nano-banana-pro-preview",
        }
    }
}

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    text_model: Option<String>,
    image_model: GeminiImageModel,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, then `GEMINI_API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model used for translation calls.
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Sets the image model variant.
    pub fn image_model(mut self, model: GeminiImageModel) -> Self {
        self.image_model = model;
        self
    }

    /// Overrides the REST endpoint (proxies, regional gateways).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets a per-request timeout. Requests never time out by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client, resolving the API key.
    ///
    /// A missing key is a configuration error.
    pub fn build(self) -> Result<GeminiClient> {
        let api_key = resolve_api_key(self.api_key, |name| std::env::var(name).ok())?;

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(GeminiClient {
            client: http.build()?,
            api_key,
            text_model: self
                .text_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: self.image_model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

fn resolve_api_key(
    explicit: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| {
            API_KEY_ENV_VARS
                .iter()
                .filter_map(|name| lookup(name))
                .find(|k| !k.trim().is_empty())
        })
        .ok_or_else(|| {
            CharVizError::Config(
                "GOOGLE_API_KEY (or GEMINI_API_KEY) not set and no API key provided".into(),
            )
        })
}

/// Gemini client. Owned by the caller and passed to the orchestrator.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    text_model: String,
    image_model: GeminiImageModel,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// The model used for translation calls.
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// The model used for image calls.
    pub fn image_model(&self) -> GeminiImageModel {
        self.image_model
    }

    async fn generate_content(&self, model: &str, body: &GeminiRequest) -> Result<GeminiResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> CharVizError {
    let text = sanitize_error_message(text);
    match status {
        404 => CharVizError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        ),
        400 => CharVizError::InvalidRequest(text),
        429 => CharVizError::RateLimited {
            retry_after: parse_retry_after(headers).map(Duration::from_secs),
        },
        401 | 403 => CharVizError::Auth(text),
        _ => {
            let lower = text.to_lowercase();
            if lower.contains("safety")
                || lower.contains("blocked")
                || lower.contains("prohibited")
            {
                CharVizError::ContentBlocked(text)
            } else {
                CharVizError::Api {
                    status,
                    message: text,
                }
            }
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = GeminiRequest::text(prompt);
        let response = self.generate_content(&self.text_model, &body).await?;
        response.into_text()
    }

    async fn generate_image(
        &self,
        reference: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<ImagePayload>> {
        let start = Instant::now();
        let body = GeminiRequest::image_edit(reference, prompt);
        let response = self
            .generate_content(self.image_model.as_str(), &body)
            .await?;
        let image = response.into_first_image();

        tracing::debug!(
            model = self.image_model.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            has_image = image.is_some(),
            "Gemini image call complete"
        );
        Ok(image)
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.image_model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(CharVizError::Auth("Invalid API key".into())),
            404 => Err(CharVizError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(CharVizError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: ImagePayload,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn text(prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiRequestPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: None,
        }
    }

    /// Reference image first, then the prompt; asks for image and text back.
    fn image_edit(reference: &ImagePayload, prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiRequestPart::InlineData {
                        inline_data: reference.clone(),
                    },
                    GeminiRequestPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: Some(GeminiConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<ImagePayload>,
}

impl GeminiResponse {
    /// First inline image of the first candidate. Anything else is ignored.
    fn into_first_image(self) -> Option<ImagePayload> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(block_reason = reason, "Gemini blocked the prompt");
        }

        let candidate = self.candidates.into_iter().next()?;
        let image = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data);

        if image.is_none() {
            tracing::warn!(
                finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
                "Gemini response carried no image"
            );
        }
        image
    }

    /// Concatenated text parts of the first candidate, trimmed.
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(CharVizError::UnexpectedResponse(
                "No text in Gemini response".into(),
            ));
        }
        Ok(text.to_string())
    }
}
