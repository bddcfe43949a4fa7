//! Screenshot capture boundary
//!
//! The pipeline only sees [`SegmentCapturer`]. [`CommandCapturer`] drives an
//! external headless-browser command line; tests substitute canned images.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use image::GenericImageView;
use model_client::ImageInput;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::config::Settings;

/// Upload ceiling for vision requests
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// One fixed scroll offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpec {
    pub id: &'static str,
    pub scroll: f32,
}

/// Top, quarter, half and three-quarter scroll captures
pub const SEGMENTS: [SegmentSpec; 4] = [
    SegmentSpec { id: "segment_1_top", scroll: 0.0 },
    SegmentSpec { id: "segment_2_quarter", scroll: 0.25 },
    SegmentSpec { id: "segment_3_half", scroll: 0.5 },
    SegmentSpec { id: "segment_4_bottom", scroll: 0.75 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const MOBILE: Viewport = Viewport { width: 375, height: 812 };
}

/// A screenshot on disk plus its decoded bytes
#[derive(Debug, Clone)]
pub struct Capture {
    pub path: PathBuf,
    pub image: ImageInput,
    pub width: u32,
    pub height: u32,
}

impl Capture {
    /// Build a capture from encoded bytes, reading dimensions from the image header
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode screenshot: {}", path.display()))?;
        let (width, height) = decoded.dimensions();

        Ok(Self {
            path,
            image: ImageInput::new(bytes),
            width,
            height,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DevicePair {
    pub desktop: Capture,
    pub mobile: Capture,
}

#[async_trait]
pub trait SegmentCapturer: Send + Sync {
    /// Capture the page scrolled to `scroll` (0.0 top, 1.0 bottom)
    async fn capture_at(&self, url: &str, scroll: f32, file_name: &str) -> Result<Capture>;

    /// Full-page desktop capture plus a mobile viewport capture
    async fn capture_device_pair(&self, url: &str) -> Result<DevicePair>;
}

/// Runs a capture command template such as
/// `shot-scraper {url} -o {output} --width {width} --height {height} --scroll {scroll}`
pub struct CommandCapturer {
    program: PathBuf,
    args: Vec<String>,
    output_dir: PathBuf,
    desktop: Viewport,
    timeout: Duration,
}

impl CommandCapturer {
    pub fn new(
        template: &str,
        output_dir: impl Into<PathBuf>,
        desktop: Viewport,
        timeout: Duration,
    ) -> Result<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("Screenshot command template is empty"))?;
        let program = which::which(&program)
            .with_context(|| format!("Screenshot command not found on PATH: {}", program))?;

        Ok(Self {
            program,
            args: parts.collect(),
            output_dir: output_dir.into(),
            desktop,
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(
            &settings.screenshot_command,
            output_dir,
            Viewport {
                width: settings.screenshot_width,
                height: settings.screenshot_height,
            },
            settings.screenshot_timeout,
        )
    }

    async fn run(&self, url: &str, output: &Path, viewport: Viewport, scroll: f32) -> Result<Capture> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let args = render_args(&self.args, url, output, viewport, scroll);
        let mut cmd = Command::new(&self.program);
        cmd.args(&args).kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "Screenshot of {} timed out after {}ms",
                    url,
                    self.timeout.as_millis()
                )
            })?
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !result.status.success() {
            bail!(
                "Screenshot command exited with {}: {}",
                result.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&result.stderr).trim()
            );
        }

        let bytes = tokio::fs::read(output)
            .await
            .with_context(|| format!("Screenshot command produced no file at {}", output.display()))?;
        Capture::from_bytes(output, bytes)
    }
}

/// Substitute `{url}`, `{output}`, `{width}`, `{height}` and `{scroll}` in each argument
pub fn render_args(
    template: &[String],
    url: &str,
    output: &Path,
    viewport: Viewport,
    scroll: f32,
) -> Vec<String> {
    let output = output.display().to_string();
    template
        .iter()
        .map(|arg| {
            arg.replace("{url}", url)
                .replace("{output}", &output)
                .replace("{width}", &viewport.width.to_string())
                .replace("{height}", &viewport.height.to_string())
                .replace("{scroll}", &scroll.to_string())
        })
        .collect()
}

#[async_trait]
impl SegmentCapturer for CommandCapturer {
    async fn capture_at(&self, url: &str, scroll: f32, file_name: &str) -> Result<Capture> {
        let output = self.output_dir.join(file_name);
        self.run(url, &output, self.desktop, scroll).await
    }

    async fn capture_device_pair(&self, url: &str) -> Result<DevicePair> {
        let desktop = self
            .run(url, &self.output_dir.join("desktop.png"), self.desktop, 0.0)
            .await
            .context("Desktop capture failed")?;
        let mobile = self
            .run(url, &self.output_dir.join("mobile.png"), Viewport::MOBILE, 0.0)
            .await
            .context("Mobile capture failed")?;

        Ok(DevicePair { desktop, mobile })
    }
}

/// Downscale a screenshot that exceeds `max_bytes`, re-encoding as PNG
///
/// Images already under the limit are returned untouched.
pub fn optimize_for_upload(input: &ImageInput, max_bytes: usize) -> Result<ImageInput> {
    if input.bytes.len() <= max_bytes {
        return Ok(input.clone());
    }

    let decoded =
        image::load_from_memory(&input.bytes).context("Failed to decode oversized screenshot")?;
    let ratio = (max_bytes as f64 / input.bytes.len() as f64).sqrt();
    let (width, height) = decoded.dimensions();
    let new_width = ((width as f64 * ratio) as u32).max(1);
    let new_height = ((height as f64 * ratio) as u32).max(1);

    let resized = decoded.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);
    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, image::ImageFormat::Png)
        .context("Failed to re-encode screenshot")?;

    Ok(ImageInput::png(buffer.into_inner()))
}
