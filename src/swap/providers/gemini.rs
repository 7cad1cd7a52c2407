//! Gemini (Google) outfit swap provider.

use crate::config::Config;
use crate::error::{sanitize_error_message, LuxeFitError, Result};
use crate::swap::provider::SwapProvider;
use crate::swap::types::{SwapMetadata, SwapRequest, SwapResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Deadline for a single swap call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Harm categories relaxed for try-on requests.
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }
}

impl FromStr for GeminiModel {
    type Err = LuxeFitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flash" | "nano-banana" | "gemini-2.5-flash-image" => Ok(Self::NanoBanana),
            "pro" | "nano-banana-pro" | "nano-banana-pro-preview" => Ok(Self::NanoBananaPro),
            other => Err(LuxeFitError::Config(format!(
                "unknown Gemini model '{other}' (expected 'flash' or 'pro')"
            ))),
        }
    }
}

/// Block threshold applied to every relaxed harm category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SafetyThreshold {
    /// Block only high-probability harm.
    #[default]
    BlockOnlyHigh,
    /// Never block on these categories.
    BlockNone,
}

impl SafetyThreshold {
    /// Returns the API threshold identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            Self::BlockNone => "BLOCK_NONE",
        }
    }
}

/// Builder for GeminiSwapProvider.
#[derive(Debug, Clone)]
pub struct GeminiSwapProviderBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    timeout: Duration,
    base_url: String,
    safety_threshold: SafetyThreshold,
}

impl Default for GeminiSwapProviderBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            timeout: DEFAULT_TIMEOUT,
            base_url: DEFAULT_BASE_URL.to_string(),
            safety_threshold: SafetyThreshold::default(),
        }
    }
}

impl GeminiSwapProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model,
            timeout: config.timeout,
            base_url: config.base_url.clone(),
            safety_threshold: SafetyThreshold::default(),
        }
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, then `API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the maximum time to wait for a response.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the API base URL (e.g. a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the harm block threshold.
    pub fn safety_threshold(mut self, threshold: SafetyThreshold) -> Self {
        self.safety_threshold = threshold;
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiSwapProvider> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(crate::config::api_key_from_env)
            .ok_or_else(|| {
                LuxeFitError::Config("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiSwapProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            timeout: self.timeout,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            safety_threshold: self.safety_threshold,
        })
    }
}

/// Gemini outfit swap provider.
pub struct GeminiSwapProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
    timeout: Duration,
    base_url: String,
    safety_threshold: SafetyThreshold,
}

impl GeminiSwapProvider {
    /// Creates a new `GeminiSwapProviderBuilder`.
    pub fn builder() -> GeminiSwapProviderBuilder {
        GeminiSwapProviderBuilder::new()
    }

    /// Returns the configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    /// Returns the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn swap_impl(&self, request: &SwapRequest) -> Result<SwapResult> {
        let start = Instant::now();

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_swap_request(request, self.safety_threshold);

        tracing::debug!(model = self.model.as_str(), "submitting outfit swap");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_rejection(status.as_u16(), &text));
        }

        let body = response.text().await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(duration_ms, bytes = body.len(), "outfit swap response received");

        Ok(result_from_json(&body)?.with_metadata(SwapMetadata {
            model: Some(self.model.as_str().to_string()),
            duration_ms: Some(duration_ms),
        }))
    }
}

#[async_trait]
impl SwapProvider for GeminiSwapProvider {
    async fn swap(&self, request: &SwapRequest) -> Result<SwapResult> {
        request.validate()?;

        tokio::time::timeout(self.timeout, self.swap_impl(request))
            .await
            .map_err(|_| LuxeFitError::Timeout(self.timeout))?
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/v1beta/models/{}", self.base_url, self.model.as_str());

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .get(&url)
                .header("x-goog-api-key", &self.api_key)
                .send(),
        )
        .await
        .map_err(|_| LuxeFitError::Timeout(self.timeout))??;

        match response.status().as_u16() {
            401 | 403 => Err(LuxeFitError::Auth("Invalid API key".into())),
            404 => Err(LuxeFitError::Config(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => {
                let text = response.text().await.unwrap_or_default();
                Err(classify_rejection(s, &text))
            }
            _ => Ok(()),
        }
    }
}

/// Maps a non-success HTTP response to an error value.
///
/// A 412 anywhere in the rejection means generation is not offered in the
/// caller's region, whatever else the body says.
fn classify_rejection(status: u16, text: &str) -> LuxeFitError {
    // Match on the full body; only the stored message is shortened.
    let lower = text.to_lowercase();
    let message = sanitize_error_message(text);

    if status == 412 || text.contains("412") || lower.contains("user location is not supported")
    {
        return LuxeFitError::ServiceUnavailable(message);
    }
    if status == 401 || status == 403 || lower.contains("api key not valid") {
        return LuxeFitError::Auth(message);
    }
    LuxeFitError::Api { status, message }
}

/// Parses a `generateContent` response body into a swap result.
pub(crate) fn result_from_json(body: &str) -> Result<SwapResult> {
    let response: GeminiResponse = serde_json::from_str(body)?;
    extract_result(response)
}

/// Picks the first inline image out of a successful response.
fn extract_result(response: GeminiResponse) -> Result<SwapResult> {
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let msg = feedback
                .block_reason_message
                .unwrap_or_else(|| format!("prompt blocked: {reason}"));
            return Err(LuxeFitError::EmptyResponse(msg));
        }
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        LuxeFitError::EmptyResponse("no candidates in Gemini response".into())
    })?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if parts.is_empty() {
        let detail = match candidate.finish_reason.as_deref() {
            Some(reason) if reason != "STOP" => format!("finish reason {reason}"),
            _ => "the request may have been blocked by safety filters or the model could not \
                  process the images"
                .to_string(),
        };
        return Err(LuxeFitError::EmptyResponse(detail));
    }

    let inline_data = parts
        .into_iter()
        .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
        .ok_or(LuxeFitError::NoImageInResponse)?;

    Ok(SwapResult::new(
        inline_data.data,
        inline_data.mime_type.filter(|m| !m.is_empty()),
    ))
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
    safety_settings: Vec<SafetySetting>,
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
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

impl GeminiRequest {
    fn from_swap_request(req: &SwapRequest, threshold: SafetyThreshold) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.model.media_type.clone(),
                    data: req.model.payload.clone(),
                },
            },
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.garment.media_type.clone(),
                    data: req.garment.payload.clone(),
                },
            },
            GeminiRequestPart::Text {
                text: req.prompt.clone(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: threshold.as_str(),
                })
                .collect(),
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
    #[serde(default)]
    block_reason_message: Option<String>,
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
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}
