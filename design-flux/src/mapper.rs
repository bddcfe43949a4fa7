//! Component mapping: capture scroll segments, analyze each, draft code stubs,
//! and assemble one addressable [`ComponentMap`]

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use model_client::{ChatRequest, VisionModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use design_flux_sdk::{
    log_info, log_unit_complete, log_unit_failed, log_unit_start, log_warning,
};

use crate::analysis::{AnalysisEngine, AnalysisMode, AnalysisResult, Category};
use crate::batch::execute_contained;
use crate::capture::{optimize_for_upload, Capture, SegmentCapturer, MAX_UPLOAD_BYTES, SEGMENTS};

const STAGE: usize = 1;

pub const COMPONENT_PROMPT: &str = r#"Analyze this webpage segment and identify its distinct UI components:
1. Navigation elements (header, menu, breadcrumbs)
2. Hero sections (banners, calls-to-action)
3. Content blocks (cards, articles, features)
4. Interactive elements (buttons, forms, inputs)
5. Footer elements (links, contact info)

For each component describe its purpose, position and dimensions, visual styling, content hierarchy and interactive states.

Return a single ```json fenced object. Use these exact keys for whatever is visible in the segment and omit the rest:
"Navigation & Header", "Layout & Grid System", "Typography", "Color & Contrast", "Buttons & Calls-to-Action", "Form & Input Styling", "Cards / Panels / Containers", "Imagery", "Backgrounds"."#;

const CODE_SYSTEM_PROMPT: &str = "You are an expert React developer. Generate clean, modern, \
production-ready React components with TypeScript and Tailwind CSS.";

/// One captured scroll position
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: String,
    pub scroll_position: f32,
    pub capture: Capture,
}

/// Buckets of the component hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyBucket {
    Navigation,
    Hero,
    Content,
    Interactive,
    Footer,
}

impl HierarchyBucket {
    pub const ALL: [HierarchyBucket; 5] = [
        HierarchyBucket::Navigation,
        HierarchyBucket::Hero,
        HierarchyBucket::Content,
        HierarchyBucket::Interactive,
        HierarchyBucket::Footer,
    ];
}

/// Persisted view of one segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub scroll_position: f32,
    pub screenshot_path: PathBuf,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

/// Desktop and mobile analyses of the same page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAnalysis {
    pub desktop_path: PathBuf,
    pub mobile_path: PathBuf,
    pub desktop: AnalysisResult,
    pub mobile: AnalysisResult,
}

/// Whole-page design system, read from the top segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignSystem {
    pub source_segment: String,
    pub screenshot_path: PathBuf,
    pub mode: String,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMap {
    pub url: String,
    pub generated_at: DateTime<Utc>,
    pub segments: BTreeMap<String, SegmentRecord>,
    pub generated_code: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub code_errors: BTreeMap<String, String>,
    /// Bucket -> segment ids
    pub hierarchy: BTreeMap<HierarchyBucket, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_system: Option<DesignSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_analysis: Option<DeviceAnalysis>,
}

impl ComponentMap {
    /// Segment ids in scroll order
    pub fn segment_ids(&self) -> Vec<&str> {
        let mut ids: Vec<(&str, f32)> = self
            .segments
            .iter()
            .map(|(id, record)| (id.as_str(), record.scroll_position))
            .collect();
        ids.sort_by(|a, b| a.1.total_cmp(&b.1));
        ids.into_iter().map(|(id, _)| id).collect()
    }

    pub fn analyzed_count(&self) -> usize {
        self.segments.values().filter(|s| s.analysis.is_some()).count()
    }

    /// Screenshot paths in scroll order, used to locate the original page image
    pub fn screenshot_paths(&self) -> Vec<PathBuf> {
        self.segment_ids()
            .into_iter()
            .filter_map(|id| self.segments.get(id))
            .map(|s| s.screenshot_path.clone())
            .collect()
    }
}

pub struct ComponentMapper {
    vision: Arc<dyn VisionModel>,
    concurrency: usize,
}

impl ComponentMapper {
    pub fn new(vision: Arc<dyn VisionModel>, concurrency: usize) -> Self {
        Self { vision, concurrency }
    }

    /// Capture, analyze, draft code and assemble the map
    pub async fn map(&self, capturer: &dyn SegmentCapturer, url: &str) -> Result<ComponentMap> {
        let segments = self.capture_segments(capturer, url).await?;
        let analyses = self.analyze_segments(&segments).await;
        let (code, code_errors) = self.draft_code(&analyses).await;
        Ok(build_map(url, &segments, analyses, code, code_errors))
    }

    /// Capture the fixed scroll offsets; a failed offset is skipped
    pub async fn capture_segments(
        &self,
        capturer: &dyn SegmentCapturer,
        url: &str,
    ) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();

        for spec in SEGMENTS {
            let file_name = format!("{}.png", spec.id);
            match capturer.capture_at(url, spec.scroll, &file_name).await {
                Ok(capture) => {
                    log_info!("Captured {} at {}% scroll", spec.id, spec.scroll * 100.0);
                    segments.push(Segment {
                        id: spec.id.to_string(),
                        scroll_position: spec.scroll,
                        capture,
                    });
                }
                Err(err) => log_warning!("Failed to capture {}: {:#}", spec.id, err),
            }
        }

        if segments.is_empty() {
            bail!("No scroll segments could be captured for {}", url);
        }
        Ok(segments)
    }

    /// Analyze every segment concurrently, each in its own engine session
    pub async fn analyze_segments(
        &self,
        segments: &[Segment],
    ) -> BTreeMap<String, Result<AnalysisResult, String>> {
        let mode = AnalysisMode::Custom(COMPONENT_PROMPT.to_string());
        let total = segments.len();

        let results = execute_contained(STAGE, segments.to_vec(), self.concurrency, |segment, _ctx| {
            let vision = self.vision.clone();
            let mode = mode.clone();
            async move {
                log_unit_start!(STAGE, &segment.id, "Analyzing segment components", total);
                let image = optimize_for_upload(&segment.capture.image, MAX_UPLOAD_BYTES)?;
                let mut engine = AnalysisEngine::new(vision);
                let analysis = engine
                    .analyze(&image, &mode)
                    .await
                    .with_context(|| format!("Failed to analyze {}", segment.id))?;
                log_unit_complete!(
                    &segment.id,
                    format!("{} categories described", analysis.available().len())
                );
                Ok(analysis)
            }
        })
        .await;

        segments
            .iter()
            .zip(results)
            .map(|(segment, result)| {
                let result = result.map_err(|err| {
                    log_unit_failed!(&segment.id, format!("{:#}", err));
                    format!("{:#}", err)
                });
                (segment.id.clone(), result)
            })
            .collect()
    }

    /// Draft a code stub for each analyzed segment
    pub async fn draft_code(
        &self,
        analyses: &BTreeMap<String, Result<AnalysisResult, String>>,
    ) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
        let jobs: Vec<(String, AnalysisResult)> = analyses
            .iter()
            .filter_map(|(id, result)| result.as_ref().ok().map(|a| (id.clone(), a.clone())))
            .collect();
        let ids: Vec<String> = jobs.iter().map(|(id, _)| id.clone()).collect();

        let results = execute_contained(STAGE, jobs, self.concurrency, |(id, analysis), _ctx| {
            let vision = self.vision.clone();
            async move {
                let request = ChatRequest::new(CODE_SYSTEM_PROMPT)
                    .text(code_prompt(&id, &analysis))
                    .max_tokens(2000)
                    .temperature(0.1);
                vision
                    .complete(request)
                    .await
                    .with_context(|| format!("Code generation failed for {}", id))
            }
        })
        .await;

        let mut code = BTreeMap::new();
        let mut errors = BTreeMap::new();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(text) => {
                    code.insert(id, text);
                }
                Err(err) => {
                    log_warning!("{:#}", err);
                    errors.insert(id, format!("{:#}", err));
                }
            }
        }
        (code, errors)
    }

    /// Capture desktop + mobile and analyze each in its own session
    /// Full-schema analysis of the top captured segment
    pub async fn analyze_design_system(
        &self,
        map: &ComponentMap,
        mode: &AnalysisMode,
    ) -> Result<DesignSystem> {
        let segment_id = map
            .segment_ids()
            .first()
            .map(|id| id.to_string())
            .ok_or_else(|| anyhow!("No captured segment to analyze"))?;
        let record = map
            .segments
            .get(&segment_id)
            .ok_or_else(|| anyhow!("Segment {} missing from the map", segment_id))?;

        log_unit_start!(STAGE, "design_system", format!("Design system from {}", segment_id));
        let bytes = tokio::fs::read(&record.screenshot_path)
            .await
            .with_context(|| format!("Failed to read {}", record.screenshot_path.display()))?;
        let capture = Capture::from_bytes(record.screenshot_path.clone(), bytes)?;
        let image = optimize_for_upload(&capture.image, MAX_UPLOAD_BYTES)?;

        let mut engine = AnalysisEngine::new(self.vision.clone());
        let analysis = match engine.analyze(&image, mode).await {
            Ok(analysis) => analysis,
            Err(err) => {
                log_unit_failed!("design_system", err.to_string());
                return Err(anyhow::Error::new(err).context("Design system analysis failed"));
            }
        };
        log_unit_complete!(
            "design_system",
            format!("{} categories described", analysis.available().len())
        );

        Ok(DesignSystem {
            source_segment: segment_id,
            screenshot_path: capture.path,
            mode: mode.label().to_string(),
            analysis,
        })
    }

    pub async fn analyze_devices(
        &self,
        capturer: &dyn SegmentCapturer,
        url: &str,
        mode: &AnalysisMode,
    ) -> Result<DeviceAnalysis> {
        let pair = capturer.capture_device_pair(url).await?;
        let desktop_image = optimize_for_upload(&pair.desktop.image, MAX_UPLOAD_BYTES)?;
        let mobile_image = optimize_for_upload(&pair.mobile.image, MAX_UPLOAD_BYTES)?;

        let mut desktop_engine = AnalysisEngine::new(self.vision.clone());
        let mut mobile_engine = AnalysisEngine::new(self.vision.clone());
        let (desktop, mobile) = tokio::join!(
            desktop_engine.analyze(&desktop_image, mode),
            mobile_engine.analyze(&mobile_image, mode),
        );

        Ok(DeviceAnalysis {
            desktop_path: pair.desktop.path,
            mobile_path: pair.mobile.path,
            desktop: desktop.context("Desktop analysis failed")?,
            mobile: mobile.context("Mobile analysis failed")?,
        })
    }
}

fn code_prompt(segment_id: &str, analysis: &AnalysisResult) -> String {
    let analysis_json = serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Generate a React component for the page segment "{segment_id}" described by this analysis:

{analysis_json}

Requirements:
1. Functional components with hooks and TypeScript interfaces
2. Tailwind CSS classes for styling
3. Responsive and accessible, with semantic HTML and ARIA labels
4. Hover states and interactions

Match the analyzed design exactly and include all imports and exports."#
    )
}

/// Assemble the map from captured segments and per-segment outcomes
pub fn build_map(
    url: &str,
    segments: &[Segment],
    mut analyses: BTreeMap<String, Result<AnalysisResult, String>>,
    generated_code: BTreeMap<String, String>,
    code_errors: BTreeMap<String, String>,
) -> ComponentMap {
    let mut records = BTreeMap::new();
    let mut hierarchy: BTreeMap<HierarchyBucket, Vec<String>> =
        HierarchyBucket::ALL.iter().map(|b| (*b, Vec::new())).collect();

    let last = segments.len().saturating_sub(1);
    for (position, segment) in segments.iter().enumerate() {
        let outcome = analyses.remove(&segment.id);
        let (analysis, analysis_error) = match outcome {
            Some(Ok(analysis)) => (Some(analysis), None),
            Some(Err(err)) => (None, Some(err)),
            None => (None, Some("Segment was not analyzed".to_string())),
        };

        for bucket in buckets_for(position, last, analysis.as_ref()) {
            if let Some(ids) = hierarchy.get_mut(&bucket) {
                ids.push(segment.id.clone());
            }
        }

        records.insert(
            segment.id.clone(),
            SegmentRecord {
                scroll_position: segment.scroll_position,
                screenshot_path: segment.capture.path.clone(),
                width: segment.capture.width,
                height: segment.capture.height,
                analysis,
                analysis_error,
            },
        );
    }

    ComponentMap {
        url: url.to_string(),
        generated_at: Utc::now(),
        segments: records,
        generated_code,
        code_errors,
        hierarchy,
        design_system: None,
        device_analysis: None,
    }
}

/// Top segment holds navigation and hero, the last one the footer, the rest content;
/// segments with described buttons or forms are also interactive
pub fn buckets_for(
    position: usize,
    last: usize,
    analysis: Option<&AnalysisResult>,
) -> Vec<HierarchyBucket> {
    let mut buckets = Vec::new();
    if position == 0 {
        buckets.push(HierarchyBucket::Navigation);
        buckets.push(HierarchyBucket::Hero);
    }
    if position == last {
        buckets.push(HierarchyBucket::Footer);
    }
    if position != 0 && position != last {
        buckets.push(HierarchyBucket::Content);
    }

    let interactive = analysis.is_some_and(|a| {
        a.get(Category::Buttons).is_available() || a.get(Category::Forms).is_available()
    });
    if interactive {
        buckets.push(HierarchyBucket::Interactive);
    }
    buckets
}
