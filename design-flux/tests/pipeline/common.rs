//! Scripted fakes for every collaborator trait

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgb};
use model_client::{
    ChatRequest, FetchedImage, ImageEditRequest, ImageFetcher, ImageGenerateRequest, ImageModel,
    ImagePayload, ModelError, StyleModel, StyleOutput, StyleRequest, VisionModel,
};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use design_flux::capture::{Capture, DevicePair, SegmentCapturer};
use design_flux::mapper::ComponentMap;

/// Noisy PNG so the encoded size stays well above small-payload thresholds
pub fn png_bytes(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let v = state.to_be_bytes();
        Rgb([v[0], v[1], v[2]])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn api_error(status: u16) -> ModelError {
    ModelError::Api {
        service: "fake",
        status,
        body: "scripted failure".to_string(),
    }
}

pub fn fenced(json: &str) -> String {
    format!("Here is the analysis:\n```json\n{}\n```\n", json)
}

// ============================================================================
// Vision
// ============================================================================

type VisionHandler = Box<dyn Fn(&ChatRequest) -> model_client::Result<String> + Send + Sync>;

/// Answers each request through a handler; records every prompt
pub struct ScriptedVision {
    handler: VisionHandler,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedVision {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ChatRequest) -> model_client::Result<String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Routes by prompt text to plausible replies; quality replies are fixed
    pub fn routed(quality_reply: &'static str) -> Arc<Self> {
        Self::new(move |request| Ok(route(&request.prompt_text(), quality_reply)))
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

#[async_trait]
impl VisionModel for ScriptedVision {
    async fn complete(&self, request: ChatRequest) -> model_client::Result<String> {
        self.prompts.lock().unwrap().push(request.prompt_text());
        (self.handler)(&request)
    }
}

/// Replies in order; an exhausted queue is an error
pub struct SequenceVision {
    replies: Mutex<VecDeque<model_client::Result<String>>>,
    pub calls: AtomicUsize,
}

impl SequenceVision {
    pub fn new(replies: Vec<model_client::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl VisionModel for SequenceVision {
    async fn complete(&self, _request: ChatRequest) -> model_client::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::EmptyResponse { service: "fake" }))
    }
}

pub const NO_ISSUES: &str =
    r#"{"has_issues": false, "issues": [], "overall_quality": "good", "regeneration_needed": false}"#;

pub const NEEDS_REGENERATION: &str = r#"{"has_issues": true, "issues": [
    {"type": "text overflow", "description": "Hero headline clipped", "severity": "high", "fix": "Shrink the hero headline so it fits"},
    {"type": "alignment", "description": "Logo slightly off", "severity": "low", "fix": "Nudge the logo"}
], "overall_quality": "fair", "regeneration_needed": true}"#;

pub fn route(prompt: &str, quality_reply: &str) -> String {
    if prompt.contains("Analyze this webpage segment") {
        fenced(
            r##"{"Navigation & Header": {"layout": "logo left, links right"},
                 "Buttons & Calls-to-Action": {"primary": "rounded #6366F1"},
                 "Color & Contrast": {"primary": "#6366F1"}}"##,
        )
    } else if prompt.contains("page segment") {
        "export function Segment() { return <section />; }".to_string()
    } else if prompt.contains("modify the component structure") {
        r#"{"hero": {"height": "60vh"}, "cta": "single"}"#.to_string()
    } else if prompt.contains("A/B testing variation") {
        "export default function Variation() { return <main />; }".to_string()
    } else if prompt.contains("Inspect this generated website layout") {
        quality_reply.to_string()
    } else {
        fenced(r#"{"Typography": {"families": ["Inter"]}}"#)
    }
}

// ============================================================================
// Images
// ============================================================================

type FailRule = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Returns a fresh PNG per call unless the prompt matches the fail rule
pub struct FakeImages {
    fail: FailRule,
    counter: AtomicUsize,
    pub edit_prompts: Mutex<Vec<String>>,
    pub generate_prompts: Mutex<Vec<String>>,
    /// Bytes of every successful payload, in call order
    pub outputs: Mutex<Vec<Vec<u8>>>,
}

impl FakeImages {
    pub fn new() -> Arc<Self> {
        Self::failing_when(|_| false)
    }

    pub fn failing_when<F>(rule: F) -> Arc<Self>
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Arc::new(Self {
            fail: Box::new(rule),
            counter: AtomicUsize::new(0),
            edit_prompts: Mutex::new(Vec::new()),
            generate_prompts: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
        })
    }

    fn respond(&self, prompt: &str) -> model_client::Result<ImagePayload> {
        if (self.fail)(prompt) {
            return Err(api_error(500));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) as u32;
        let bytes = png_bytes(24, 16, 100 + n);
        self.outputs.lock().unwrap().push(bytes.clone());
        Ok(ImagePayload::Inline(bytes))
    }
}

#[async_trait]
impl ImageModel for FakeImages {
    async fn edit(&self, request: ImageEditRequest) -> model_client::Result<ImagePayload> {
        self.edit_prompts.lock().unwrap().push(request.prompt.clone());
        self.respond(&request.prompt)
    }

    async fn generate(&self, request: ImageGenerateRequest) -> model_client::Result<ImagePayload> {
        self.generate_prompts.lock().unwrap().push(request.prompt.clone());
        self.respond(&request.prompt)
    }
}

/// Serves canned responses per URL; unknown URLs are 404
#[derive(Default)]
pub struct FakeFetcher {
    pub responses: HashMap<String, FetchedImage>,
}

impl FakeFetcher {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(responses: Vec<(&str, FetchedImage)>) -> Arc<Self> {
        Arc::new(Self {
            responses: responses
                .into_iter()
                .map(|(url, image)| (url.to_string(), image))
                .collect(),
        })
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> model_client::Result<FetchedImage> {
        Ok(self.responses.get(url).cloned().unwrap_or(FetchedImage {
            status: 404,
            content_type: Some("text/html".to_string()),
            bytes: b"not found".to_vec(),
        }))
    }
}

// ============================================================================
// Styles
// ============================================================================

type StyleHandler = Box<dyn Fn(&StyleRequest) -> model_client::Result<StyleOutput> + Send + Sync>;

pub struct FakeStyles {
    handler: StyleHandler,
    pub requests: Mutex<Vec<(String, Option<u64>)>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeStyles {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&StyleRequest) -> model_client::Result<StyleOutput> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Inline PNG for every style
    pub fn succeeding() -> Arc<Self> {
        Self::new(|_| Ok(StyleOutput::Bytes(png_bytes(32, 32, 7))))
    }
}

#[async_trait]
impl StyleModel for FakeStyles {
    async fn stylize(&self, request: StyleRequest) -> model_client::Result<StyleOutput> {
        self.requests
            .lock()
            .unwrap()
            .push((request.prompt.clone(), request.seed));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let result = (self.handler)(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ============================================================================
// Capture
// ============================================================================

/// Writes noisy PNGs into a directory instead of driving a browser
pub struct FakeCapturer {
    pub dir: PathBuf,
    pub fail_scrolls: Vec<f32>,
}

impl FakeCapturer {
    pub fn new(dir: &Path) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.to_path_buf(),
            fail_scrolls: Vec::new(),
        })
    }

    fn write(&self, file_name: &str, width: u32, height: u32, seed: u32) -> anyhow::Result<Capture> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let bytes = png_bytes(width, height, seed);
        std::fs::write(&path, &bytes)?;
        Capture::from_bytes(path, bytes)
    }
}

#[async_trait]
impl SegmentCapturer for FakeCapturer {
    async fn capture_at(&self, _url: &str, scroll: f32, file_name: &str) -> anyhow::Result<Capture> {
        if self.fail_scrolls.contains(&scroll) {
            anyhow::bail!("browser crashed at {}", scroll);
        }
        self.write(file_name, 48, 27, (scroll * 100.0) as u32)
    }

    async fn capture_device_pair(&self, _url: &str) -> anyhow::Result<DevicePair> {
        Ok(DevicePair {
            desktop: self.write("desktop.png", 48, 27, 900)?,
            mobile: self.write("mobile.png", 15, 32, 901)?,
        })
    }
}

/// Component map with no segments, for generator tests that need no screenshot
pub fn empty_map(url: &str) -> ComponentMap {
    ComponentMap {
        url: url.to_string(),
        generated_at: chrono::Utc::now(),
        segments: Default::default(),
        generated_code: Default::default(),
        code_errors: Default::default(),
        hierarchy: Default::default(),
        design_system: None,
        device_analysis: None,
    }
}
