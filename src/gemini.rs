use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::encoder::{decode_image, sniff_mime, EncodedImage};
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type", default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

impl Part {
    pub fn image(image: &EncodedImage) -> Self {
        Part::Image {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Image,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub response_modalities: Vec<Modality>,
}

impl ContentRequest {
    pub fn new(model: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            model: model.into(),
            parts,
            system_instruction: None,
            temperature: None,
            top_p: None,
            response_modalities: Vec::new(),
        }
    }

    pub fn with_system_instruction(mut self, s: impl Into<String>) -> Self {
        self.system_instruction = Some(s.into());
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn with_top_p(mut self, p: f32) -> Self {
        self.top_p = Some(p);
        self
    }

    pub fn with_modalities(mut self, m: &[Modality]) -> Self {
        self.response_modalities = m.to_vec();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResponse {
    pub text: Option<String>,
    pub images: Vec<InlineData>,
}

impl ContentResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            images: Vec::new(),
        }
    }

    pub fn from_images(images: Vec<InlineData>) -> Self {
        Self { text: None, images }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate_content(&self, request: ContentRequest)
        -> Result<ContentResponse, ServiceError>;
}

// ===== Wire format =====

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<Modality>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequestBody<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent<'a>>,
    generation_config: WireGenerationConfig,
}

impl<'a> From<&'a ContentRequest> for GeminiRequestBody<'a> {
    fn from(req: &'a ContentRequest) -> Self {
        GeminiRequestBody {
            contents: vec![WireContent {
                role: Some("user"),
                parts: req.parts.clone(),
            }],
            system_instruction: req.system_instruction.as_ref().map(|s| WireContent {
                role: None,
                parts: vec![Part::text(s.as_str())],
            }),
            generation_config: WireGenerationConfig {
                temperature: req.temperature,
                top_p: req.top_p,
                response_modalities: req.response_modalities.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseBody {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: Option<String>,
}

impl From<GeminiResponseBody> for ContentResponse {
    fn from(body: GeminiResponseBody) -> Self {
        let parts = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default();

        let mut text: Option<String> = None;
        let mut images = Vec::new();
        for p in parts {
            if let Some(t) = p.text {
                text.get_or_insert_with(String::new).push_str(&t);
            }
            if let Some(mut inline) = p.inline_data {
                if inline.data.is_empty() {
                    continue;
                }
                if inline.mime_type.is_empty() {
                    inline.mime_type = decode_image(&inline.data)
                        .ok()
                        .and_then(|b| sniff_mime(&b))
                        .unwrap_or("image/png")
                        .to_string();
                }
                images.push(inline);
            }
        }
        ContentResponse { text, images }
    }
}

// ===== Client =====

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    #[instrument(skip(self, request), fields(model = %request.model, parts = request.parts.len()))]
    async fn generate_content(
        &self,
        request: ContentRequest,
    ) -> Result<ContentResponse, ServiceError> {
        let body = GeminiRequestBody::from(&request);
        let resp = self
            .http
            .post(self.endpoint(&request.model))
            .header("X-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(text);
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let value: GeminiResponseBody = resp
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        let out = ContentResponse::from(value);
        debug!(images = out.images.len(), has_text = out.text.is_some(), "gemini response");
        Ok(out)
    }
}
