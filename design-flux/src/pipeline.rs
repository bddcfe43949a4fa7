/*
  Stage 1: COMPONENT MAPPING
    ├─> Capture 4 scroll segments (+ desktop/mobile pair with --include-mobile)
    ├─> Analyze segments concurrently, one engine session each
    ├─> Draft a code stub per analyzed segment
    ├─> Design system of the top segment (multi-stage unless --single-stage)
    └─> Output: components/component_map.json, components/design_system.json,
                components/code/<segment>.tsx

  Stage 2: A/B VARIATIONS (patterns run concurrently)
    ├─> modify structure ► draft code ► edit prompt ► image ► quality check ► [regenerate]
    └─> Output: ab_tests/ab_test_package.json, ab_tests/quality_report.json,
                ab_tests/variation_<id>/{variation_<id>.tsx, variation_details.json}

  Stage 3: STYLIZE (optional, waves of 5 styles per variation)
    └─> Output: stylized/<variation>/<variation>_<style>.png,
                stylized/stylization_results.json, stylized/style_gallery.html

  Finally: analysis_summary.json
*/

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use model_client::{
    HttpFetcher, ImageFetcher, ImageModel, OpenAiClient, OpenAiConfig, ReplicateClient,
    ReplicateConfig, StyleModel, VisionModel,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use design_flux_sdk::{
    log_artifact, log_file_saved, log_info, log_outcome_summary, log_stage_complete,
    log_stage_failed, log_stage_start, log_stage_start_console, log_warning, RunId,
};

use crate::analysis::AnalysisMode;
use crate::capture::{CommandCapturer, SegmentCapturer};
use crate::config::Settings;
use crate::mapper::{ComponentMap, ComponentMapper, HierarchyBucket};
use crate::stylizer::{
    render_gallery, SeedPolicy, StyleCatalog, StylePreset, StyleSource, StylizationReport,
    Stylizer, DEFAULT_BATCH_PAUSE, DEFAULT_BATCH_SIZE,
};
use crate::variation::{candidates_for, AbTestPackage, PatternSelector, VariationGenerator};

/// Everything one run needs besides the collaborators
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub selector: PatternSelector,
    pub output_dir: PathBuf,
    /// Concurrent segment analyses
    pub concurrency: usize,
    /// Mode for the design-system and desktop/mobile analyses
    pub device_mode: AnalysisMode,
    pub include_mobile: bool,
    pub generate_images: bool,
    pub stylize: bool,
    /// Style names to apply; empty means the whole catalogue
    pub styles: Vec<String>,
    pub styles_file: Option<PathBuf>,
    pub style_seed: Option<u64>,
    pub style_batch_size: usize,
    pub style_pause: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            selector: PatternSelector::All,
            output_dir: PathBuf::from("output"),
            concurrency: 4,
            device_mode: AnalysisMode::MultiStage,
            include_mobile: false,
            generate_images: true,
            stylize: false,
            styles: Vec::new(),
            styles_file: None,
            style_seed: None,
            style_batch_size: DEFAULT_BATCH_SIZE,
            style_pause: DEFAULT_BATCH_PAUSE,
        }
    }
}

/// External services a run talks to
pub struct Collaborators {
    pub capturer: Arc<dyn SegmentCapturer>,
    pub vision: Arc<dyn VisionModel>,
    pub images: Arc<dyn ImageModel>,
    pub fetcher: Arc<dyn ImageFetcher>,
    /// Required only when stylizing
    pub styles: Option<Arc<dyn StyleModel>>,
    pub style_model_name: String,
}

impl Collaborators {
    /// Build the HTTP clients and the capture command from settings
    ///
    /// Fails before any pipeline work when stylizing without a style credential.
    pub fn from_settings(settings: &Settings, config: &RunConfig) -> Result<Self> {
        let openai = Arc::new(OpenAiClient::new(OpenAiConfig {
            api_key: settings.openai_api_key.clone(),
            base_url: settings.openai_base_url.clone(),
            chat_model: settings.openai_model.clone(),
            image_model: settings.image_model.clone(),
            timeout: settings.model_timeout,
        })?);

        let styles: Option<Arc<dyn StyleModel>> = if config.stylize {
            let token = settings.require_replicate()?;
            let mut replicate = ReplicateConfig::new(token);
            replicate.model = settings.style_model.clone();
            Some(Arc::new(ReplicateClient::new(replicate)?))
        } else {
            None
        };

        let capturer = CommandCapturer::from_settings(
            settings,
            settings.screenshot_dir(&config.output_dir),
        )?;

        Ok(Self {
            capturer: Arc::new(capturer),
            vision: openai.clone(),
            images: openai,
            fetcher: Arc::new(HttpFetcher::new(settings.model_timeout)?),
            styles,
            style_model_name: settings.style_model.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub tool_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub total_segments: usize,
    pub analyzed_segments: usize,
    pub code_stubs_generated: usize,
    pub hierarchy_categories: Vec<HierarchyBucket>,
    pub design_system: bool,
    pub device_analysis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbTestingSummary {
    pub selected_pattern: String,
    pub total_variations: usize,
    pub variations_with_images: usize,
    pub failed_variations: usize,
    pub quality_improved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylingSummary {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub metadata: SummaryMetadata,
    pub component_analysis: ComponentSummary,
    pub ab_testing: AbTestingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styling: Option<StylingSummary>,
    pub next_steps: Vec<String>,
}

/// In-memory results of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub component_map: ComponentMap,
    pub package: AbTestPackage,
    pub stylization: Option<StylizationReport>,
    pub summary: SummaryReport,
}

/// Prefix `https://` when the scheme is missing
pub fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        bail!("A URL is required");
    }
    if url.contains("://") {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{}", url))
    }
}

/// Run the whole pipeline
///
/// Unit failures (a segment, a pattern, a style) end up inside the returned
/// records; only failures with nothing to fall back on are returned as errors.
pub async fn run(config: RunConfig, collaborators: Collaborators) -> Result<RunOutcome> {
    let run_id = RunId::new();
    let url = normalize_url(&config.url)?;

    // Resolve the style selection before any paid call is made
    let styles = if config.stylize {
        if collaborators.styles.is_none() {
            bail!("Stylizing requires a style-transfer model");
        }
        Some(load_styles(&config)?)
    } else {
        None
    };
    let total_stages = if config.stylize { 3 } else { 2 };

    fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    log_info!("Run {} for {}", run_id, url);

    // Stage 1
    log_stage_start_console!(1, "COMPONENT MAPPING", "Capturing and analyzing page segments");
    log_stage_start!(1, "Component Mapping", total_stages);
    let mapper = ComponentMapper::new(collaborators.vision.clone(), config.concurrency);
    let mut component_map = match mapper.map(collaborators.capturer.as_ref(), &url).await {
        Ok(map) => map,
        Err(err) => {
            log_stage_failed!(1, "Component Mapping", format!("{:#}", err));
            return Err(err);
        }
    };

    match mapper
        .analyze_design_system(&component_map, &config.device_mode)
        .await
    {
        Ok(design_system) => component_map.design_system = Some(design_system),
        Err(err) => log_warning!("Design system analysis failed: {:#}", err),
    }

    if config.include_mobile {
        match mapper
            .analyze_devices(collaborators.capturer.as_ref(), &url, &config.device_mode)
            .await
        {
            Ok(devices) => component_map.device_analysis = Some(devices),
            Err(err) => log_warning!("Device analysis failed: {:#}", err),
        }
    }

    write_component_artifacts(&config.output_dir, &component_map).await?;
    log_stage_complete!(1, "Component Mapping");

    // Stage 2
    log_stage_start_console!(2, "A/B VARIATIONS", format!("Generating pattern {}", config.selector));
    log_stage_start!(2, "A/B Variations", total_stages);
    let mut generator = VariationGenerator::new(
        collaborators.vision.clone(),
        collaborators.images.clone(),
        collaborators.fetcher.clone(),
        config.output_dir.join("variations"),
    );
    if !config.generate_images {
        generator = generator.without_images();
    }

    let candidates = candidates_for(&component_map);
    let variations = generator
        .generate_all(&component_map, config.selector, &candidates)
        .await;
    let package = AbTestPackage::new(&url, config.selector, variations);
    write_variation_artifacts(&config.output_dir, &package).await?;
    log_outcome_summary!(
        package.metadata.variations_with_images,
        package.metadata.failed_variations,
        package.metadata.total_variations
    );
    log_stage_complete!(2, "A/B Variations");

    // Stage 3
    let stylization = match (styles, collaborators.styles.clone()) {
        (Some(styles), Some(model)) => {
            log_stage_start_console!(3, "STYLIZE", format!("Applying {} styles", styles.len()));
            log_stage_start!(3, "Stylize", total_stages);
            let report = stylize(&config, &package, &styles, model, &collaborators).await?;
            log_outcome_summary!(report.success_count(), report.failure_count(), report.total_jobs());
            log_stage_complete!(3, "Stylize");
            Some(report)
        }
        _ => None,
    };

    let summary = build_summary(run_id, &url, &component_map, &package, stylization.as_ref());
    write_json(
        &config.output_dir.join("analysis_summary.json"),
        &summary,
        total_stages,
        "Run summary",
    )
    .await?;

    Ok(RunOutcome {
        component_map,
        package,
        stylization,
        summary,
    })
}

fn load_styles(config: &RunConfig) -> Result<Vec<StylePreset>> {
    let catalog = match &config.styles_file {
        Some(path) => StyleCatalog::from_file(path)?,
        None => StyleCatalog::builtin()?,
    };
    catalog.select(&config.styles)
}

async fn stylize(
    config: &RunConfig,
    package: &AbTestPackage,
    styles: &[StylePreset],
    model: Arc<dyn StyleModel>,
    collaborators: &Collaborators,
) -> Result<StylizationReport> {
    let stylized_dir = config.output_dir.join("stylized");
    let seed = match config.style_seed {
        Some(seed) => SeedPolicy::Fixed(seed),
        None => SeedPolicy::Random,
    };
    let stylizer = Stylizer::new(
        model,
        collaborators.fetcher.clone(),
        &stylized_dir,
        collaborators.style_model_name.clone(),
    )
    .with_batch_size(config.style_batch_size)
    .with_pause(config.style_pause)
    .with_seed(seed);

    let sources: Vec<StyleSource> = package
        .variations
        .iter()
        .map(|(key, variation)| StyleSource {
            variation_key: key.clone(),
            variation_name: variation.name.clone(),
            image: variation.image_result.path.clone(),
        })
        .collect();

    let report = stylizer.stylize_all(&sources, styles).await;

    write_json(
        &stylized_dir.join("stylization_results.json"),
        &report,
        3,
        "Stylization results",
    )
    .await?;
    let gallery_path = stylized_dir.join("style_gallery.html");
    write_text(&gallery_path, &render_gallery(&report, &stylized_dir), 3, "Style gallery").await?;

    Ok(report)
}

async fn write_component_artifacts(output_dir: &Path, map: &ComponentMap) -> Result<()> {
    let components_dir = output_dir.join("components");
    write_json(
        &components_dir.join("component_map.json"),
        map,
        1,
        "Component map",
    )
    .await?;

    if let Some(design_system) = &map.design_system {
        write_json(
            &components_dir.join("design_system.json"),
            &design_system.analysis,
            1,
            "Design system",
        )
        .await?;
    }

    for (segment_id, code) in &map.generated_code {
        let path = components_dir.join("code").join(format!("{}.tsx", segment_id));
        write_text(&path, code, 1, "Segment code stub").await?;
    }
    Ok(())
}

async fn write_variation_artifacts(output_dir: &Path, package: &AbTestPackage) -> Result<()> {
    let ab_dir = output_dir.join("ab_tests");
    write_json(
        &ab_dir.join("ab_test_package.json"),
        package,
        2,
        "A/B test package",
    )
    .await?;
    write_json(
        &ab_dir.join("quality_report.json"),
        &package.quality_summary(),
        2,
        "Quality report",
    )
    .await?;

    for (key, variation) in &package.variations {
        let variation_dir = ab_dir.join(key);
        if let Some(code) = &variation.generated_code {
            write_text(&variation_dir.join(format!("{}.tsx", key)), code, 2, "Variation code").await?;
        }
        write_json(
            &variation_dir.join("variation_details.json"),
            variation,
            2,
            "Variation details",
        )
        .await?;
    }
    Ok(())
}

fn build_summary(
    run_id: RunId,
    url: &str,
    map: &ComponentMap,
    package: &AbTestPackage,
    stylization: Option<&StylizationReport>,
) -> SummaryReport {
    let hierarchy_categories: Vec<HierarchyBucket> = map
        .hierarchy
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(bucket, _)| *bucket)
        .collect();

    let mut next_steps = vec![
        "Review the component map and generated code stubs".to_string(),
        "Compare the variation images against the original screenshots".to_string(),
        format!(
            "Run each variation for {} with {}",
            package.comparison_metrics.testing_duration,
            package.comparison_metrics.minimum_sample_size
        ),
    ];
    if package.metadata.failed_variations > 0 {
        next_steps.push("Re-run the failed variations".to_string());
    }

    SummaryReport {
        metadata: SummaryMetadata {
            run_id,
            timestamp: Utc::now(),
            url: url.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        component_analysis: ComponentSummary {
            total_segments: map.segments.len(),
            analyzed_segments: map.analyzed_count(),
            code_stubs_generated: map.generated_code.len(),
            hierarchy_categories,
            design_system: map.design_system.is_some(),
            device_analysis: map.device_analysis.is_some(),
        },
        ab_testing: AbTestingSummary {
            selected_pattern: package.metadata.selected_pattern.clone(),
            total_variations: package.metadata.total_variations,
            variations_with_images: package.metadata.variations_with_images,
            failed_variations: package.metadata.failed_variations,
            quality_improved: package
                .variations
                .values()
                .filter(|v| v.image_result.quality_improved)
                .count(),
        },
        styling: stylization.map(|report| StylingSummary {
            total_jobs: report.total_jobs(),
            succeeded: report.success_count(),
            failed: report.failure_count(),
        }),
        next_steps,
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T, stage: usize, description: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", description))?;
    write_text(path, &json, stage, description).await
}

async fn write_text(path: &Path, content: &str, stage: usize, description: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log_artifact!(stage, path.display(), description);
    log_file_saved!(path.display());
    Ok(())
}
