//! Per-pattern variation state machine
//!
//! ```text
//! ModifyStructure ► DraftCode ► BuildEditPrompt ► GenerateImage ► QualityCheck ─┬─► Done
//!                                                                               └─► Regenerate ► Done
//! ```
//!
//! Every branch ends in `Done` with a [`Variation`] record; failures are
//! written into the record instead of being returned.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use model_client::{
    ChatRequest, ImageDetail, ImageEditRequest, ImageFetcher, ImageGenerateRequest, ImageInput,
    ImageModel, ImagePayload, ImageSize, VisionModel,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use design_flux_sdk::{
    log_unit_complete, log_unit_failed, log_unit_progress, log_unit_start, log_warning,
};

use super::locate::{locate, LocatedScreenshot, ScreenshotCandidate};
use super::patterns::{Pattern, PatternId, PatternSelector};
use super::prompts::{
    code_prompt, edit_prompt, modify_prompt, regeneration_prompt, select_size, simplified_prompt,
    CODE_SYSTEM_PROMPT, MODIFY_SYSTEM_PROMPT, QUALITY_SYSTEM_PROMPT,
};
use super::quality::{parse_quality_report, QualityReport, QUALITY_PROMPT};
use crate::mapper::ComponentMap;

const STAGE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationState {
    ModifyStructure,
    DraftCode,
    BuildEditPrompt,
    GenerateImage,
    QualityCheck,
    Regenerate,
    Done,
}

/// How the image was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Edit of the original screenshot
    Edit,
    /// Text-only generation, no screenshot was found
    TextOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifiedComponents {
    pub modification_strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_structure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// Final image; the improved one when regeneration succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// First image, kept when `path` was replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GenerationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_screenshot: Option<PathBuf>,
    pub size: ImageSize,
    pub quality_improved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regeneration_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub skipped: bool,
    pub generated_at: DateTime<Utc>,
}

impl ImageResult {
    fn new(size: ImageSize) -> Self {
        Self {
            path: None,
            original_path: None,
            mode: None,
            source_screenshot: None,
            size,
            quality_improved: false,
            regeneration_error: None,
            error: None,
            skipped: false,
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    pub id: PatternId,
    pub name: String,
    pub description: String,
    pub layout_strategy: String,
    pub key_changes: Vec<String>,
    pub expected_improvements: Vec<String>,
    pub modified_components: ModifiedComponents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_error: Option<String>,
    pub edit_prompt: String,
    pub image_result: ImageResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<QualityReport>,
    /// States visited, in order
    pub states: Vec<VariationState>,
}

impl Variation {
    fn new(pattern: &Pattern) -> Self {
        Self {
            id: pattern.id,
            name: pattern.name.to_string(),
            description: pattern.description.to_string(),
            layout_strategy: pattern.layout_strategy.to_string(),
            key_changes: pattern.key_changes.iter().map(|s| s.to_string()).collect(),
            expected_improvements: pattern
                .expected_improvements
                .iter()
                .map(|s| s.to_string())
                .collect(),
            modified_components: ModifiedComponents {
                modification_strategy: pattern.layout_strategy.to_string(),
                modified_structure: None,
                error: None,
            },
            generated_code: None,
            code_error: None,
            edit_prompt: String::new(),
            image_result: ImageResult::new(ImageSize::Landscape),
            quality_report: None,
            states: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        self.id.variation_key()
    }

    /// An image exists for this variation
    pub fn has_image(&self) -> bool {
        self.image_result.path.is_some()
    }

    pub fn failed(&self) -> bool {
        self.image_result.error.is_some()
    }

    fn enter(&mut self, state: VariationState) {
        log_unit_progress!(self.key(), format!("{:?}", state));
        self.states.push(state);
    }
}

pub struct VariationGenerator {
    vision: Arc<dyn VisionModel>,
    images: Arc<dyn ImageModel>,
    fetcher: Arc<dyn ImageFetcher>,
    variations_dir: PathBuf,
    generate_images: bool,
}

impl VariationGenerator {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        images: Arc<dyn ImageModel>,
        fetcher: Arc<dyn ImageFetcher>,
        variations_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            vision,
            images,
            fetcher,
            variations_dir: variations_dir.into(),
            generate_images: true,
        }
    }

    /// Skip the image call (and the quality loop with it)
    pub fn without_images(mut self) -> Self {
        self.generate_images = false;
        self
    }

    /// Run every selected pattern concurrently
    pub async fn generate_all(
        &self,
        map: &ComponentMap,
        selector: PatternSelector,
        candidates: &[ScreenshotCandidate],
    ) -> Vec<Variation> {
        let runs = selector
            .patterns()
            .into_iter()
            .map(|id| self.generate_variation(map, id, candidates));
        join_all(runs).await
    }

    /// Drive one pattern to `Done`
    pub async fn generate_variation(
        &self,
        map: &ComponentMap,
        id: PatternId,
        candidates: &[ScreenshotCandidate],
    ) -> Variation {
        let pattern = id.pattern();
        let mut variation = Variation::new(pattern);
        log_unit_start!(STAGE, variation.key(), pattern.name);

        variation.enter(VariationState::ModifyStructure);
        match self.modify_structure(map, pattern).await {
            Ok(text) => variation.modified_components.modified_structure = Some(text),
            Err(err) => {
                log_warning!("{} structure modification failed: {:#}", pattern.name, err);
                variation.modified_components.error = Some(format!("{:#}", err));
            }
        }

        variation.enter(VariationState::DraftCode);
        let structure = variation
            .modified_components
            .modified_structure
            .clone()
            .unwrap_or_else(|| pattern.key_changes.join("\n"));
        match self.draft_code(pattern, &structure).await {
            Ok(code) => variation.generated_code = Some(code),
            Err(err) => {
                log_warning!("{} code generation failed: {:#}", pattern.name, err);
                variation.code_error = Some(format!("{:#}", err));
            }
        }

        variation.enter(VariationState::BuildEditPrompt);
        let original = locate(candidates).await;
        variation.edit_prompt = match &original {
            Some(_) => edit_prompt(pattern, map),
            None => simplified_prompt(pattern, map),
        };
        variation.image_result.size = original
            .as_ref()
            .map(|o| select_size(o.capture.width, o.capture.height, o.is_desktop))
            .unwrap_or(ImageSize::Landscape);

        if !self.generate_images {
            variation.image_result.skipped = true;
            variation.enter(VariationState::Done);
            log_unit_complete!(variation.key(), "image generation skipped");
            return variation;
        }

        variation.enter(VariationState::GenerateImage);
        let first_path = self.image_path(id, false);
        let generated = self
            .produce_image(original.as_ref(), &variation.edit_prompt, variation.image_result.size, &first_path)
            .await;
        variation.image_result.generated_at = Utc::now();
        variation.image_result.mode = Some(mode_for(original.as_ref()));
        variation.image_result.source_screenshot = original.as_ref().map(|o| o.capture.path.clone());

        let image = match generated {
            Ok(image) => {
                variation.image_result.path = Some(first_path);
                image
            }
            Err(err) => {
                let message = format!("{:#}", err);
                log_unit_failed!(variation.key(), &message);
                variation.image_result.error = Some(message);
                variation.enter(VariationState::Done);
                return variation;
            }
        };

        variation.enter(VariationState::QualityCheck);
        let report = self.check_quality(&image).await;
        let regenerate = report.regeneration_needed;
        variation.quality_report = Some(report);

        if regenerate {
            variation.enter(VariationState::Regenerate);
            self.regenerate(&mut variation, original.as_ref()).await;
        }

        variation.enter(VariationState::Done);
        log_unit_complete!(
            variation.key(),
            if variation.image_result.quality_improved {
                "image regenerated after quality check"
            } else {
                "image generated"
            }
        );
        variation
    }

    async fn modify_structure(&self, map: &ComponentMap, pattern: &Pattern) -> Result<String> {
        let hierarchy = component_overview(map);
        let request = ChatRequest::new(MODIFY_SYSTEM_PROMPT)
            .text(modify_prompt(&hierarchy, pattern))
            .max_tokens(1500)
            .temperature(0.2);
        self.vision
            .complete(request)
            .await
            .context("Structure modification call failed")
    }

    async fn draft_code(&self, pattern: &Pattern, structure: &str) -> Result<String> {
        let request = ChatRequest::new(CODE_SYSTEM_PROMPT)
            .text(code_prompt(pattern, structure))
            .max_tokens(2500)
            .temperature(0.1);
        self.vision
            .complete(request)
            .await
            .context("Code generation call failed")
    }

    /// Quality failures of any kind collapse to the default report
    async fn check_quality(&self, image: &ImageInput) -> QualityReport {
        let request = ChatRequest::new(QUALITY_SYSTEM_PROMPT)
            .text(QUALITY_PROMPT)
            .image(image.clone(), ImageDetail::High)
            .max_tokens(1000)
            .temperature(0.0);
        match self.vision.complete(request).await {
            Ok(text) => parse_quality_report(&text),
            Err(err) => {
                log_warning!("Quality check failed: {}; assuming no issues", err);
                QualityReport::default()
            }
        }
    }

    /// One attempt; success replaces the image, failure is recorded
    async fn regenerate(&self, variation: &mut Variation, original: Option<&LocatedScreenshot>) {
        let Some(report) = &variation.quality_report else {
            return;
        };
        let prompt = regeneration_prompt(&variation.edit_prompt, report);
        let improved_path = self.image_path(variation.id, true);

        match self
            .produce_image(original, &prompt, variation.image_result.size, &improved_path)
            .await
        {
            Ok(_) => {
                variation.image_result.original_path = variation.image_result.path.take();
                variation.image_result.path = Some(improved_path);
                variation.image_result.quality_improved = true;
            }
            Err(err) => {
                log_warning!("{} regeneration failed: {:#}", variation.name, err);
                variation.image_result.regeneration_error = Some(format!("{:#}", err));
            }
        }
    }

    /// Edit the original when there is one, otherwise generate from text
    async fn produce_image(
        &self,
        original: Option<&LocatedScreenshot>,
        prompt: &str,
        size: ImageSize,
        path: &Path,
    ) -> Result<ImageInput> {
        let payload = match original {
            Some(original) => {
                self.images
                    .edit(ImageEditRequest {
                        base_image: original.capture.image.clone(),
                        prompt: prompt.to_string(),
                        size,
                    })
                    .await
            }
            None => {
                self.images
                    .generate(ImageGenerateRequest {
                        prompt: prompt.to_string(),
                        size,
                    })
                    .await
            }
        }
        .context("Image generation failed")?;

        let bytes = self.materialize(payload).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(ImageInput::new(bytes))
    }

    async fn materialize(&self, payload: ImagePayload) -> Result<Vec<u8>> {
        let bytes = match payload {
            ImagePayload::Inline(bytes) => bytes,
            ImagePayload::Url(url) => {
                let fetched = self
                    .fetcher
                    .fetch(&url)
                    .await
                    .with_context(|| format!("Failed to download {}", url))?;
                if fetched.status != 200 {
                    bail!("Image download returned HTTP {}", fetched.status);
                }
                fetched.bytes
            }
        };
        if bytes.is_empty() {
            return Err(anyhow!("Image payload was empty"));
        }
        Ok(bytes)
    }

    fn image_path(&self, id: PatternId, improved: bool) -> PathBuf {
        let suffix = if improved { "_improved" } else { "" };
        self.variations_dir
            .join(format!("{}{}.png", id.variation_key(), suffix))
    }
}

fn mode_for(original: Option<&LocatedScreenshot>) -> GenerationMode {
    match original {
        Some(_) => GenerationMode::Edit,
        None => GenerationMode::TextOnly,
    }
}

/// Hierarchy plus the categories each segment described
fn component_overview(map: &ComponentMap) -> String {
    let segments: serde_json::Map<String, serde_json::Value> = map
        .segments
        .iter()
        .map(|(id, record)| {
            let categories: Vec<&str> = record
                .analysis
                .as_ref()
                .map(|a| a.available().into_iter().map(|c| c.name()).collect())
                .unwrap_or_default();
            (id.clone(), json!({ "described_categories": categories }))
        })
        .collect();

    let overview = json!({
        "hierarchy": map.hierarchy,
        "segments": segments,
    });
    serde_json::to_string_pretty(&overview).unwrap_or_else(|_| "{}".to_string())
}
