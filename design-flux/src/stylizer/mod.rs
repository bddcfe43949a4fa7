//! Style transfer over variation images
//!
//! Styles run in waves of `batch_size` with a pause between waves. Each
//! (variation, style) pair is an independent [`StyleJob`]; a failure is kept
//! in that job and never touches its siblings.

pub mod gallery;
pub mod presets;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use model_client::{ImageFetcher, ImageInput, StyleModel, StyleOutput, StyleRequest};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use design_flux_sdk::{log_info, log_unit_complete, log_unit_failed, log_unit_start};

use crate::batch::execute_waves;
pub use gallery::render_gallery;
pub use presets::{safe_style_name, StyleCatalog, StylePreset};

const STAGE: usize = 3;

/// Smallest payload accepted as a real image
pub const MIN_IMAGE_BYTES: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(2);

/// Seed sent with every style request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    Fixed(u64),
    Random,
}

impl SeedPolicy {
    fn next(&self) -> u64 {
        match self {
            SeedPolicy::Fixed(seed) => *seed,
            SeedPolicy::Random => rand::thread_rng().gen_range(0..=u64::from(u32::MAX)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StyleStatus {
    Pending,
    Success { output_path: PathBuf, bytes: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleJob {
    pub variation_id: String,
    pub style_name: String,
    pub style_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub status: StyleStatus,
    pub generated_at: DateTime<Utc>,
}

impl StyleJob {
    fn pending(variation_id: &str, style: &StylePreset) -> Self {
        Self {
            variation_id: variation_id.to_string(),
            style_name: style.name.clone(),
            style_description: style.short_description(),
            seed: None,
            status: StyleStatus::Pending,
            generated_at: Utc::now(),
        }
    }

    fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = StyleStatus::Failed {
            error: error.into(),
        };
        self.generated_at = Utc::now();
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, StyleStatus::Success { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.status {
            StyleStatus::Success { output_path, .. } => Some(output_path),
            _ => None,
        }
    }
}

/// Base image for one variation
#[derive(Debug, Clone)]
pub struct StyleSource {
    pub variation_key: String,
    pub variation_name: String,
    /// Final variation image; `None` when generation failed or was skipped
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationStyles {
    pub original_variation: String,
    pub source_image: Option<PathBuf>,
    pub stylized_images: Vec<StyleJob>,
}

impl VariationStyles {
    pub fn success_count(&self) -> usize {
        self.stylized_images.iter().filter(|j| j.is_success()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylizationMetadata {
    pub stylization_timestamp: DateTime<Utc>,
    pub total_styles: usize,
    pub total_variations: usize,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylizationReport {
    pub metadata: StylizationMetadata,
    pub stylized_variations: BTreeMap<String, VariationStyles>,
}

impl StylizationReport {
    pub fn total_jobs(&self) -> usize {
        self.stylized_variations
            .values()
            .map(|v| v.stylized_images.len())
            .sum()
    }

    pub fn success_count(&self) -> usize {
        self.stylized_variations
            .values()
            .map(VariationStyles::success_count)
            .sum()
    }

    pub fn failure_count(&self) -> usize {
        self.total_jobs() - self.success_count()
    }
}

pub struct Stylizer {
    model: Arc<dyn StyleModel>,
    fetcher: Arc<dyn ImageFetcher>,
    output_dir: PathBuf,
    model_name: String,
    batch_size: usize,
    pause: Duration,
    seed: SeedPolicy,
}

impl Stylizer {
    pub fn new(
        model: Arc<dyn StyleModel>,
        fetcher: Arc<dyn ImageFetcher>,
        output_dir: impl Into<PathBuf>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            model,
            fetcher,
            output_dir: output_dir.into(),
            model_name: model_name.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            pause: DEFAULT_BATCH_PAUSE,
            seed: SeedPolicy::Random,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_seed(mut self, seed: SeedPolicy) -> Self {
        self.seed = seed;
        self
    }

    /// Deterministic location for a (variation, style) pair
    pub fn output_path(&self, variation_key: &str, style: &StylePreset) -> PathBuf {
        self.output_dir
            .join(variation_key)
            .join(format!("{}_{}.png", variation_key, style.safe_name()))
    }

    pub async fn stylize_all(
        &self,
        sources: &[StyleSource],
        styles: &[StylePreset],
    ) -> StylizationReport {
        let mut stylized_variations = BTreeMap::new();

        for source in sources {
            log_info!(
                "Stylizing {} ({}) with {} styles",
                source.variation_key,
                source.variation_name,
                styles.len()
            );
            let outcome = self.stylize_variation(source, styles).await;
            stylized_variations.insert(source.variation_key.clone(), outcome);
        }

        StylizationReport {
            metadata: StylizationMetadata {
                stylization_timestamp: Utc::now(),
                total_styles: styles.len(),
                total_variations: sources.len(),
                model: self.model_name.clone(),
            },
            stylized_variations,
        }
    }

    /// Every requested style gets a job, even when the source is missing
    pub async fn stylize_variation(
        &self,
        source: &StyleSource,
        styles: &[StylePreset],
    ) -> VariationStyles {
        let key = source.variation_key.as_str();
        let image = match load_source(source.image.as_deref()).await {
            Ok(image) => image,
            Err(err) => {
                let error = format!("{:#}", err);
                return VariationStyles {
                    original_variation: source.variation_name.clone(),
                    source_image: source.image.clone(),
                    stylized_images: styles
                        .iter()
                        .map(|style| StyleJob::pending(key, style).fail(error.clone()))
                        .collect(),
                };
            }
        };

        // Styles sharing a file name would overwrite each other; only the first runs
        let collisions = output_collisions(styles);
        let runnable: Vec<StylePreset> = styles
            .iter()
            .zip(&collisions)
            .filter(|(_, collision)| collision.is_none())
            .map(|(style, _)| style.clone())
            .collect();

        let jobs = execute_waves(
            STAGE,
            runnable.clone(),
            self.batch_size,
            self.pause,
            |style, ctx| {
                let image = &image;
                async move {
                    let unit_id = format!("{}_{}", key, style.safe_name());
                    log_unit_start!(ctx.stage, &unit_id, &style.name, ctx.total_tasks);

                    let job = StyleJob::pending(key, &style);
                    let seed = self.seed.next();
                    let job = match self.apply_style(image, key, &style, seed).await {
                        Ok((output_path, bytes)) => {
                            log_unit_complete!(&unit_id, output_path.display());
                            StyleJob {
                                seed: Some(seed),
                                status: StyleStatus::Success { output_path, bytes },
                                generated_at: Utc::now(),
                                ..job
                            }
                        }
                        Err(err) => {
                            log_unit_failed!(&unit_id, format!("{:#}", err));
                            StyleJob {
                                seed: Some(seed),
                                ..job
                            }
                            .fail(format!("{:#}", err))
                        }
                    };
                    Ok::<_, anyhow::Error>(job)
                }
            },
        )
        .await;

        let mut finished = jobs.into_iter().zip(&runnable).map(|(job, style)| {
            job.unwrap_or_else(|err| StyleJob::pending(key, style).fail(format!("{:#}", err)))
        });
        let stylized_images = styles
            .iter()
            .zip(collisions)
            .map(|(style, collision)| match collision {
                Some(error) => StyleJob::pending(key, style).fail(error),
                None => finished
                    .next()
                    .unwrap_or_else(|| StyleJob::pending(key, style).fail("Style was not run")),
            })
            .collect();

        VariationStyles {
            original_variation: source.variation_name.clone(),
            source_image: source.image.clone(),
            stylized_images,
        }
    }

    async fn apply_style(
        &self,
        image: &ImageInput,
        variation_key: &str,
        style: &StylePreset,
        seed: u64,
    ) -> Result<(PathBuf, usize)> {
        let request = StyleRequest {
            image: image.clone(),
            prompt: format!("Apply this exact style: {}", style.prompt),
            aspect_ratio: "match_input_image".to_string(),
            seed: Some(seed),
            output_format: "png".to_string(),
        };
        let output = self
            .model
            .stylize(request)
            .await
            .context("Style transfer failed")?;
        let bytes = self.resolve_output(output).await?;

        let path = self.output_path(variation_key, style);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let written = tokio::fs::metadata(&path).await?.len();
        if written != bytes.len() as u64 {
            bail!(
                "File size mismatch after writing {}: {} != {}",
                path.display(),
                written,
                bytes.len()
            );
        }
        Ok((path, bytes.len()))
    }

    /// Turn a prediction output into image bytes
    async fn resolve_output(&self, output: StyleOutput) -> Result<Vec<u8>> {
        let mut output = output;
        while let StyleOutput::List(items) = output {
            output = items
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("Style model returned an empty output list"))?;
        }

        let bytes = match output {
            StyleOutput::Bytes(bytes) => bytes,
            StyleOutput::Url(url) => {
                let fetched = self
                    .fetcher
                    .fetch(&url)
                    .await
                    .with_context(|| format!("Failed to download {}", url))?;
                if fetched.status != 200 {
                    bail!("Failed to download image: HTTP {}", fetched.status);
                }
                let content_type = fetched.content_type.unwrap_or_default();
                if !content_type.starts_with("image/") {
                    bail!("Invalid content type: {:?}", content_type);
                }
                fetched.bytes
            }
            StyleOutput::List(_) => bail!("Nested output list"),
        };

        if bytes.len() < MIN_IMAGE_BYTES {
            bail!("Downloaded content too small: {} bytes", bytes.len());
        }
        Ok(bytes)
    }
}

/// Per style, an error when an earlier style already owns its output file
fn output_collisions(styles: &[StylePreset]) -> Vec<Option<String>> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    styles
        .iter()
        .map(|style| match owners.entry(style.safe_name()) {
            Entry::Occupied(owner) => Some(format!(
                "Output file for {:?} collides with style {:?}",
                style.name,
                owner.get()
            )),
            Entry::Vacant(slot) => {
                slot.insert(&style.name);
                None
            }
        })
        .collect()
}

async fn load_source(path: Option<&Path>) -> Result<ImageInput> {
    let path = path.ok_or_else(|| anyhow!("No source image for this variation"))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read source image: {}", path.display()))?;
    Ok(ImageInput::new(bytes))
}
