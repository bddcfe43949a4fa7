//! OpenAI-compatible client for chat (vision) and image edit/generation

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{read_json, ImageModel, VisionModel};
use crate::error::{ModelError, Result};
use crate::types::{
    ChatRequest, ContentPart, ImageEditRequest, ImageGenerateRequest, ImagePayload,
};

const SERVICE: &str = "openai";

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Chat model used for vision and text prompts
    pub chat_model: String,
    /// Model used for image edits and generations
    pub image_model: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o".to_string(),
            image_model: "gpt-image-1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("OpenAI API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn seconds(&self) -> u64 {
        self.config.timeout.as_secs()
    }
}

/// Build the `chat/completions` body for a request
pub(crate) fn chat_body(model: &str, request: &ChatRequest) -> Value {
    let mut messages = Vec::new();

    if let Some(system) = &request.system {
        messages.push(json!({ "role": "system", "content": system }));
    }

    let content: Vec<Value> = request
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "type": "text", "text": text }),
            ContentPart::Image { image, detail } => json!({
                "type": "image_url",
                "image_url": { "url": image.to_data_url(), "detail": detail },
            }),
        })
        .collect();
    messages.push(json!({ "role": "user", "content": content }));

    json!({
        "model": model,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    })
}

/// Pull `choices[0].message.content` out of a chat response
pub(crate) fn chat_content(response: &Value) -> Result<String> {
    let content = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::unexpected(SERVICE, "missing choices[0].message.content"))?;

    if content.trim().is_empty() {
        return Err(ModelError::EmptyResponse { service: SERVICE });
    }
    Ok(content.to_string())
}

/// Pull the first image out of an images response (`b64_json` or `url`)
pub(crate) fn image_payload(response: &Value) -> Result<ImagePayload> {
    let first = response
        .pointer("/data/0")
        .ok_or(ModelError::EmptyResponse { service: SERVICE })?;

    if let Some(encoded) = first.get("b64_json").and_then(Value::as_str) {
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ModelError::decode(SERVICE, e.to_string()))?;
        return Ok(ImagePayload::Inline(bytes));
    }

    if let Some(url) = first.get("url").and_then(Value::as_str) {
        return Ok(ImagePayload::Url(url.to_string()));
    }

    if let Some(error) = response.pointer("/error/message").and_then(Value::as_str) {
        return Err(ModelError::unexpected(SERVICE, error));
    }

    Err(ModelError::unexpected(SERVICE, "image entry has neither b64_json nor url"))
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let body = chat_body(&self.config.chat_model, &request);
        debug!(
            model = %self.config.chat_model,
            has_image = request.has_image(),
            max_tokens = request.max_tokens,
            "chat completion request"
        );

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(SERVICE, self.seconds(), e))?;

        let json = read_json(SERVICE, self.seconds(), response).await?;
        chat_content(&json)
    }
}

#[async_trait]
impl ImageModel for OpenAiClient {
    async fn edit(&self, request: ImageEditRequest) -> Result<ImagePayload> {
        let file_name = format!("original.{}", request.base_image.extension());
        let image_part = Part::bytes(request.base_image.bytes.clone())
            .file_name(file_name)
            .mime_str(&request.base_image.mime)
            .map_err(|e| ModelError::Config(e.to_string()))?;

        let form = Form::new()
            .text("model", self.config.image_model.clone())
            .text("prompt", request.prompt.clone())
            .text("size", request.size.as_str().to_string())
            .text("n", "1")
            .part("image", image_part);

        debug!(size = %request.size, "image edit request");

        let response = self
            .client
            .post(self.url("images/edits"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(SERVICE, self.seconds(), e))?;

        let json = read_json(SERVICE, self.seconds(), response).await.map_err(|e| {
            warn!(error = %e, "image edit failed");
            e
        })?;
        image_payload(&json)
    }

    async fn generate(&self, request: ImageGenerateRequest) -> Result<ImagePayload> {
        let body = json!({
            "model": self.config.image_model,
            "prompt": request.prompt,
            "size": request.size.as_str(),
            "n": 1,
        });

        debug!(size = %request.size, "image generation request");

        let response = self
            .client
            .post(self.url("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(SERVICE, self.seconds(), e))?;

        let json = read_json(SERVICE, self.seconds(), response).await?;
        image_payload(&json)
    }
}
