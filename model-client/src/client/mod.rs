//! Model endpoint traits and HTTP implementations
//!
//! Each external capability is a small async trait so pipelines can hold
//! `Arc<dyn Trait>` and tests can substitute scripted fakes:
//!
//! - [`VisionModel`]: system + multi-part user prompt → free text
//! - [`ImageModel`]: edit an image, or generate one from text only
//! - [`StyleModel`]: apply a style instruction to a source image
//! - [`ImageFetcher`]: download an image reference
//!
//! ```no_run
//! use model_client::{ChatRequest, ImageDetail, ImageInput, OpenAiClient, OpenAiConfig, VisionModel};
//!
//! # async fn example() -> model_client::Result<()> {
//! let client = OpenAiClient::new(OpenAiConfig::new("sk-..."))?;
//! let request = ChatRequest::new("You are a design analyst")
//!     .text("Describe the typography")
//!     .image(ImageInput::png(std::fs::read("shot.png").unwrap()), ImageDetail::High);
//! let text = client.complete(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod openai;
pub mod replicate;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::types::{
    ChatRequest, FetchedImage, ImageEditRequest, ImageGenerateRequest, ImagePayload,
    StyleOutput, StyleRequest,
};

/// Vision-capable (or text-only) chat model
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// Image edit / generation endpoint
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn edit(&self, request: ImageEditRequest) -> Result<ImagePayload>;

    async fn generate(&self, request: ImageGenerateRequest) -> Result<ImagePayload>;
}

/// Style-transfer endpoint
#[async_trait]
pub trait StyleModel: Send + Sync {
    async fn stylize(&self, request: StyleRequest) -> Result<StyleOutput>;
}

/// Downloads image references returned by the other endpoints
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

/// Plain GET fetcher with a timeout budget
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let seconds = self.timeout.as_secs();
        debug!(url, "fetching image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest("fetch", seconds, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelError::from_reqwest("fetch", seconds, e))?
            .to_vec();

        Ok(FetchedImage {
            status,
            content_type,
            bytes,
        })
    }
}

/// Read a response body, turning non-success statuses into [`ModelError::Api`]
pub(crate) async fn read_json(
    service: &'static str,
    seconds: u64,
    response: reqwest::Response,
) -> Result<serde_json::Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ModelError::from_reqwest(service, seconds, e))?;

    if !status.is_success() {
        return Err(ModelError::Api {
            service,
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }

    serde_json::from_str(&body).map_err(|e| ModelError::decode(service, e.to_string()))
}
