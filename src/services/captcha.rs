//! Captcha recognition through the Gemini generative API
//!
//! Sibling of the request client: same transport layer, but a single direct
//! call to a third-party service instead of the pool and retry path.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::proxy::{Transport, TransportFactory, TransportRequest};

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

const CAPTCHA_PROMPT: &str = "Please identify and provide only the text/numbers shown in this captcha image. Format the answer as plain text without any additional explanation or punctuation. Provide the result in ALL UPPERCASE LETTERS.";

/// Something that turns a captcha image into text
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Recognize a base64-encoded PNG, returning uppercase text without whitespace
    async fn solve(&self, base64_image: &str) -> Result<String>;

    /// Feedback hook for a captcha the backend accepted
    fn report_good(&self) {}

    /// Feedback hook for a captcha the backend rejected
    fn report_bad(&self) {}
}

/// Encode raw image bytes for `CaptchaSolver::solve`
pub fn encode_image(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Strip all whitespace and uppercase
pub fn normalize_captcha_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini-backed solver
pub struct GeminiSolver {
    api_key: HeaderValue,
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl GeminiSolver {
    /// Create a solver talking to the public Gemini endpoint
    pub fn new(api_key: &str, factory: &dyn TransportFactory) -> Result<Self> {
        Self::with_endpoint(api_key, GEMINI_ENDPOINT, factory)
    }

    pub fn with_endpoint(api_key: &str, endpoint: &str, factory: &dyn TransportFactory) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ClientError::InvalidConfig("Gemini API key is required".into()));
        }

        let mut api_key = HeaderValue::from_str(api_key)
            .map_err(|_| ClientError::InvalidConfig("Gemini API key contains invalid characters".into()))?;
        api_key.set_sensitive(true);

        let solver = Self {
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            transport: factory.build(None)?,
        };
        info!("Gemini captcha solver initialized");
        Ok(solver)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, GEMINI_MODEL)
    }
}

#[async_trait]
impl CaptchaSolver for GeminiSolver {
    async fn solve(&self, base64_image: &str) -> Result<String> {
        BASE64
            .decode(base64_image)
            .map_err(|e| ClientError::Captcha(format!("image is not valid base64: {}", e)))?;

        info!("Solving captcha with Gemini");

        let payload = GenerateRequest {
            contents: [Content {
                parts: [
                    RequestPart::Text { text: CAPTCHA_PROMPT },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: base64_image,
                        },
                    },
                ],
            }],
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(GEMINI_KEY_HEADER), self.api_key.clone());

        let request = TransportRequest {
            method: Method::POST,
            url: self.url(),
            headers,
            body: Some(serde_json::to_value(&payload)?),
        };

        let response = self.transport.send(request).await.map_err(|e| {
            warn!("Gemini request failed: {}", e);
            ClientError::Captcha(e.to_string())
        })?;

        let data = response
            .data
            .ok_or_else(|| ClientError::Captcha("empty response".into()))?;
        let parsed: GenerateResponse = serde_json::from_value(data)
            .map_err(|e| ClientError::Captcha(format!("unexpected response: {}", e)))?;

        let text = parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| ClientError::Captcha("no text in response".into()))?;

        let solved = normalize_captcha_text(&text);
        info!("Gemini captcha result: {}", solved);
        Ok(solved)
    }
}
