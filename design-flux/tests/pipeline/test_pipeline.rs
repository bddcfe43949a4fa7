//! End-to-end runs against scripted collaborators

use super::common::*;
use design_flux::analysis::{AnalysisMode, Category};
use design_flux::mapper::HierarchyBucket;
use design_flux::pipeline::{run, Collaborators, RunConfig};
use design_flux::variation::PatternSelector;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn collaborators(capturer: Arc<FakeCapturer>, styles: Option<Arc<FakeStyles>>) -> Collaborators {
    Collaborators {
        capturer,
        vision: ScriptedVision::routed(NO_ISSUES),
        images: FakeImages::new(),
        fetcher: FakeFetcher::empty(),
        styles: styles.map(|s| s as Arc<dyn model_client::StyleModel>),
        style_model_name: "fake/style-model".to_string(),
    }
}

fn config(output_dir: &Path) -> RunConfig {
    RunConfig {
        url: "example.com".to_string(),
        output_dir: output_dir.to_path_buf(),
        style_pause: Duration::ZERO,
        ..RunConfig::default()
    }
}

#[tokio::test]
async fn test_full_run_writes_every_artifact() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("output");
    let capturer = FakeCapturer::new(&dir.path().join("screenshots"));
    let styles = FakeStyles::succeeding();

    let config = RunConfig {
        include_mobile: true,
        stylize: true,
        styles: vec!["Neo-Brutalism".to_string(), "glassmorphism".to_string()],
        style_seed: Some(7),
        ..config(&out)
    };
    let outcome = run(config, collaborators(capturer, Some(styles.clone())))
        .await
        .unwrap();

    let expected = [
        "components/component_map.json",
        "components/design_system.json",
        "components/code/segment_1_top.tsx",
        "components/code/segment_4_bottom.tsx",
        "ab_tests/ab_test_package.json",
        "ab_tests/quality_report.json",
        "ab_tests/variation_1/variation_1.tsx",
        "ab_tests/variation_4/variation_details.json",
        "variations/variation_2.png",
        "stylized/stylization_results.json",
        "stylized/style_gallery.html",
        "stylized/variation_3/variation_3_neo_brutalism.png",
        "stylized/variation_3/variation_3_glassmorphism.png",
        "analysis_summary.json",
    ];
    for relative in expected {
        assert!(out.join(relative).exists(), "missing {}", relative);
    }

    let summary = &outcome.summary;
    assert_eq!(summary.metadata.url, "https://example.com");
    assert_eq!(summary.component_analysis.total_segments, 4);
    assert_eq!(summary.component_analysis.analyzed_segments, 4);
    assert_eq!(summary.component_analysis.code_stubs_generated, 4);
    assert!(summary.component_analysis.device_analysis);
    assert_eq!(summary.ab_testing.selected_pattern, "all");
    assert_eq!(summary.ab_testing.total_variations, 4);
    assert_eq!(summary.ab_testing.variations_with_images, 4);
    assert_eq!(summary.ab_testing.failed_variations, 0);

    let styling = summary.styling.as_ref().unwrap();
    assert_eq!(styling.total_jobs, 8);
    assert_eq!(styling.succeeded, 8);
    assert!(styles
        .requests
        .lock()
        .unwrap()
        .iter()
        .all(|(_, seed)| *seed == Some(7)));

    let package: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("ab_tests/ab_test_package.json")).unwrap())
            .unwrap();
    let keys: Vec<&String> = package["variations"].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["variation_1", "variation_2", "variation_3", "variation_4"]);

    let gallery = std::fs::read_to_string(out.join("stylized/style_gallery.html")).unwrap();
    assert!(gallery.contains("variation_3/variation_3_neo_brutalism.png"));
}

#[tokio::test]
async fn test_failed_segment_capture_is_contained() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("output");
    let capturer = Arc::new(FakeCapturer {
        dir: dir.path().join("screenshots"),
        fail_scrolls: vec![0.5],
    });

    let config = RunConfig {
        selector: PatternSelector::All,
        generate_images: false,
        ..config(&out)
    };
    let outcome = run(config, collaborators(capturer, None)).await.unwrap();

    let map = &outcome.component_map;
    assert_eq!(map.segment_ids(), ["segment_1_top", "segment_2_quarter", "segment_4_bottom"]);
    assert_eq!(map.hierarchy[&HierarchyBucket::Navigation], ["segment_1_top"]);
    assert_eq!(map.hierarchy[&HierarchyBucket::Hero], ["segment_1_top"]);
    assert_eq!(map.hierarchy[&HierarchyBucket::Content], ["segment_2_quarter"]);
    assert_eq!(map.hierarchy[&HierarchyBucket::Footer], ["segment_4_bottom"]);
    assert_eq!(map.hierarchy[&HierarchyBucket::Interactive].len(), 3);

    assert!(outcome.stylization.is_none());
    assert!(outcome.summary.styling.is_none());
    assert_eq!(outcome.summary.ab_testing.variations_with_images, 0);
    assert_eq!(outcome.summary.ab_testing.failed_variations, 0);
    assert!(!out.join("variations").exists());
    assert!(!out.join("stylized").exists());
}

#[tokio::test]
async fn test_no_segments_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let capturer = Arc::new(FakeCapturer {
        dir: dir.path().join("screenshots"),
        fail_scrolls: vec![0.0, 0.25, 0.5, 0.75],
    });

    let err = run(config(&dir.path().join("output")), collaborators(capturer, None))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No scroll segments"));
}

#[tokio::test]
async fn test_unknown_style_fails_before_any_call() {
    let dir = TempDir::new().unwrap();
    let capturer = FakeCapturer::new(&dir.path().join("screenshots"));
    let styles = FakeStyles::succeeding();
    let config = RunConfig {
        stylize: true,
        styles: vec!["Not A Style".to_string()],
        ..config(&dir.path().join("output"))
    };

    assert!(run(config, collaborators(capturer, Some(styles.clone()))).await.is_err());
    assert!(!dir.path().join("screenshots").exists());
    assert!(styles.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_default_run_analyzes_design_system_in_multi_stage() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("output");
    let capturer = FakeCapturer::new(&dir.path().join("screenshots"));
    let vision = ScriptedVision::routed(NO_ISSUES);
    let mut collaborators = collaborators(capturer, None);
    collaborators.vision = vision.clone() as Arc<dyn model_client::VisionModel>;

    let config = RunConfig {
        generate_images: false,
        ..config(&out)
    };
    let outcome = run(config, collaborators).await.unwrap();

    let design_system = outcome.component_map.design_system.as_ref().unwrap();
    assert_eq!(design_system.source_segment, "segment_1_top");
    assert_eq!(design_system.mode, "multi_stage");
    assert_eq!(design_system.analysis.len(), Category::ALL.len());
    assert!(design_system.analysis.get(Category::Typography).is_available());
    assert!(outcome.component_map.device_analysis.is_none());
    assert!(outcome.summary.component_analysis.design_system);

    assert_eq!(vision.prompts_containing("Focus only on"), 4);
    assert_eq!(vision.prompts_containing("Combine them into one complete design system"), 1);
    assert_eq!(vision.prompts_containing("Review this design system analysis"), 1);

    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("components/design_system.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(written.as_object().unwrap().len(), Category::ALL.len());
}

#[tokio::test]
async fn test_single_stage_design_system_uses_first_captured_segment() {
    let dir = TempDir::new().unwrap();
    let capturer = Arc::new(FakeCapturer {
        dir: dir.path().join("screenshots"),
        fail_scrolls: vec![0.0],
    });
    let vision = ScriptedVision::routed(NO_ISSUES);
    let mut collaborators = collaborators(capturer, None);
    collaborators.vision = vision.clone() as Arc<dyn model_client::VisionModel>;

    let config = RunConfig {
        device_mode: AnalysisMode::SingleStage,
        generate_images: false,
        ..config(&dir.path().join("output"))
    };
    let outcome = run(config, collaborators).await.unwrap();

    let design_system = outcome.component_map.design_system.unwrap();
    assert_eq!(design_system.source_segment, "segment_2_quarter");
    assert_eq!(design_system.mode, "single_stage");
    assert_eq!(vision.prompts_containing("Focus only on"), 0);
    assert_eq!(vision.prompts_containing("Combine them"), 0);
}
