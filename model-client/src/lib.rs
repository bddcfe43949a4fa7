//! HTTP clients for the vision, image and style-transfer models used by design-flux
//!
//! The traits in [`client`] are the seam: the pipeline depends only on them,
//! and the concrete OpenAI / Replicate clients live behind them.

pub mod client;
pub mod error;
pub mod types;

pub use client::openai::{OpenAiClient, OpenAiConfig};
pub use client::replicate::{ReplicateClient, ReplicateConfig};
pub use client::{HttpFetcher, ImageFetcher, ImageModel, StyleModel, VisionModel};
pub use error::{ModelError, Result};
pub use types::{
    ChatRequest, ContentPart, FetchedImage, ImageDetail, ImageEditRequest, ImageGenerateRequest,
    ImageInput, ImagePayload, ImageSize, StyleOutput, StyleRequest,
};
