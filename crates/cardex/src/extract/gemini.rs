//! Extractor backed by the Gemini `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use log::{debug, info, warn};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::model::RawImage;
use crate::sanitize::truncate_for_log;

use super::parse::parse_extraction;
use super::prompt::EXTRACTION_PROMPT;
use super::{check_images, Extraction, ExtractionError, Extractor};

/// Public Gemini API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Model used when the config doesn't name one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Connect timeout for the HTTP client (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on error bodies copied into errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated.
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Sends the card images to Gemini and parses its JSON answer.
pub struct GeminiExtractor {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

impl GeminiExtractor {
    /// Creates an extractor whose requests give up after `timeout`.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Client(e.to_string()))?;

        let model = model.into();
        info!("Initialized Gemini extractor (model: {})", model);

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model,
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request<'a>(images: &'a [RawImage]) -> GenerateContentRequest<'a> {
        let engine = base64::engine::general_purpose::STANDARD;
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::Text {
            text: EXTRACTION_PROMPT,
        });
        parts.extend(images.iter().map(|image| Part::Inline {
            inline_data: InlineData {
                mime_type: &image.content_type,
                data: engine.encode(&image.data),
            },
        }));
        GenerateContentRequest {
            contents: vec![Content { parts }],
        }
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(&self, images: &[RawImage]) -> Result<Extraction, ExtractionError> {
        check_images(images)?;
        for (index, image) in images.iter().enumerate() {
            if image.data.len() < 100 {
                warn!(
                    "Image {} is only {} bytes; extraction will likely fail",
                    index,
                    image.data.len()
                );
            }
        }

        debug!(
            "Sending {} image(s) to Gemini model {}",
            images.len(),
            self.model
        );

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&Self::build_request(images))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body = truncate_for_log(&body, MAX_ERROR_BODY_LENGTH);
            warn!("Gemini request failed ({}): {}", status, body);
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ExtractionError::Service(format!("Malformed Gemini response envelope: {}", e))
        })?;

        let text = match parsed.first_text() {
            Some(text) => text,
            None => {
                if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
                    return Err(ExtractionError::Service(format!(
                        "Gemini blocked the request: {}",
                        reason
                    )));
                }
                return Err(ExtractionError::EmptyResponse);
            }
        };

        debug!("Gemini answered with {} characters", text.len());

        parse_extraction(&text).inspect_err(|e| {
            warn!(
                "Could not parse Gemini answer ({}): {}",
                e,
                truncate_for_log(&text, MAX_ERROR_BODY_LENGTH)
            );
        })
    }
}
