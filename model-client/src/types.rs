//! Request and response types shared by every model endpoint

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, Result};

// ============================================================================
// Images
// ============================================================================

/// Encoded image bytes with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageInput {
    /// Wrap raw bytes, sniffing the MIME type from the magic number
    pub fn new(bytes: Vec<u8>) -> Self {
        let mime = sniff_mime(&bytes).to_string();
        Self { bytes, mime }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "image/png".to_string(),
        }
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URL form accepted by vision chat endpoints
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }

    /// File extension matching the MIME type, used for multipart uploads
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else {
        "image/png"
    }
}

/// Requested fidelity for an image attached to a vision prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    #[default]
    High,
    Auto,
}

/// Output dimensions accepted by the image edit/generate endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1536x1024")]
    Landscape,
    #[serde(rename = "1024x1536")]
    Portrait,
}

impl ImageSize {
    pub const ALL: [ImageSize; 3] = [ImageSize::Square, ImageSize::Landscape, ImageSize::Portrait];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1536x1024",
            ImageSize::Portrait => "1024x1536",
        }
    }

    /// (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageSize::Square => (1024, 1024),
            ImageSize::Landscape => (1536, 1024),
            ImageSize::Portrait => (1024, 1536),
        }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Vision / text chat
// ============================================================================

/// One part of the user turn
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image { image: ImageInput, detail: ImageDetail },
}

/// A single-turn request: system text plus a multi-part user message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub parts: Vec<ContentPart>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            parts: Vec::new(),
            max_tokens: 4000,
            temperature: 0.0,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(ContentPart::Text(text.into()));
        self
    }

    pub fn image(mut self, image: ImageInput, detail: ImageDetail) -> Self {
        self.parts.push(ContentPart::Image { image, detail });
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Concatenated text parts, mostly useful for logging and test fakes
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, ContentPart::Image { .. }))
    }
}

// ============================================================================
// Image edit / generate
// ============================================================================

/// Edit an existing image according to an instruction
#[derive(Debug, Clone)]
pub struct ImageEditRequest {
    pub base_image: ImageInput,
    pub prompt: String,
    pub size: ImageSize,
}

/// Text-only generation with no base image
#[derive(Debug, Clone)]
pub struct ImageGenerateRequest {
    pub prompt: String,
    pub size: ImageSize,
}

/// Image returned by the edit/generate endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Decoded inline bytes (`b64_json`)
    Inline(Vec<u8>),
    /// Reference to fetch
    Url(String),
}

// ============================================================================
// Style transfer
// ============================================================================

/// Apply a style instruction to a source image
#[derive(Debug, Clone)]
pub struct StyleRequest {
    pub image: ImageInput,
    pub prompt: String,
    /// e.g. `match_input_image`
    pub aspect_ratio: String,
    /// Determinism hint; `None` lets the service pick
    pub seed: Option<u64>,
    pub output_format: String,
}

/// Output of a style-transfer prediction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOutput {
    Url(String),
    Bytes(Vec<u8>),
    /// Iterable wrapper; the first element is the image
    List(Vec<StyleOutput>),
}

impl StyleOutput {
    /// Interpret a prediction `output` field
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) if s.starts_with("http://") || s.starts_with("https://") => {
                Ok(StyleOutput::Url(s.clone()))
            }
            Value::String(s) if s.starts_with("data:") => {
                let encoded = s
                    .split_once(',')
                    .map(|(_, data)| data)
                    .ok_or_else(|| ModelError::decode("replicate", "malformed data URL"))?;
                let bytes = general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| ModelError::decode("replicate", e.to_string()))?;
                Ok(StyleOutput::Bytes(bytes))
            }
            Value::Array(items) => items
                .iter()
                .map(StyleOutput::from_json)
                .collect::<Result<Vec<_>>>()
                .map(StyleOutput::List),
            Value::Null => Err(ModelError::EmptyResponse {
                service: "replicate",
            }),
            other => Err(ModelError::unexpected(
                "replicate",
                format!("unsupported output value: {}", other),
            )),
        }
    }
}

/// Body downloaded from an image reference
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}
