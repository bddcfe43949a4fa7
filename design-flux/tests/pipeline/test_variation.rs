//! Tests for the variation state machine and quality loop

use super::common::*;
use design_flux::variation::{
    GenerationMode, PatternId, PatternSelector, ScreenshotCandidate, VariationGenerator,
    VariationState,
};
use model_client::ImageSize;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn screenshot(dir: &Path, name: &str, width: u32, height: u32) -> ScreenshotCandidate {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height, 3)).unwrap();
    ScreenshotCandidate::desktop(path)
}

fn generator(
    vision: Arc<ScriptedVision>,
    images: Arc<FakeImages>,
    dir: &Path,
) -> VariationGenerator {
    VariationGenerator::new(vision, images, FakeFetcher::empty(), dir.join("variations"))
}

#[tokio::test]
async fn test_no_regeneration_keeps_first_image() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NO_ISSUES);
    let images = FakeImages::new();
    let candidates = vec![screenshot(dir.path(), "top.png", 32, 18)];

    let variation = generator(vision.clone(), images.clone(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::HeroFirst, &candidates)
        .await;

    let path = variation.image_result.path.clone().unwrap();
    assert_eq!(path, dir.path().join("variations").join("variation_1.png"));
    assert_eq!(std::fs::read(&path).unwrap(), images.outputs.lock().unwrap()[0]);
    assert!(!variation.image_result.quality_improved);
    assert!(variation.image_result.original_path.is_none());
    assert_eq!(images.edit_prompts.lock().unwrap().len(), 1);
    assert!(!variation.states.contains(&VariationState::Regenerate));
    assert_eq!(variation.states.last(), Some(&VariationState::Done));
}

#[tokio::test]
async fn test_successful_regeneration_replaces_image() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NEEDS_REGENERATION);
    let images = FakeImages::new();
    let candidates = vec![screenshot(dir.path(), "top.png", 32, 18)];

    let variation = generator(vision.clone(), images.clone(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::HeroFirst, &candidates)
        .await;

    let variations_dir = dir.path().join("variations");
    assert!(variation.image_result.quality_improved);
    assert_eq!(
        variation.image_result.path,
        Some(variations_dir.join("variation_1_improved.png"))
    );
    assert_eq!(
        variation.image_result.original_path,
        Some(variations_dir.join("variation_1.png"))
    );
    let outputs = images.outputs.lock().unwrap();
    assert_eq!(
        std::fs::read(variations_dir.join("variation_1_improved.png")).unwrap(),
        outputs[1]
    );

    // one regeneration, both edits against the same screenshot, no second review
    let prompts = images.edit_prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].starts_with(prompts[0].trim_end()));
    assert!(prompts[1].contains("Shrink the hero headline so it fits"));
    assert!(!prompts[1].contains("Nudge the logo"));
    assert_eq!(vision.prompts_containing("Inspect this generated website layout"), 1);
}

#[tokio::test]
async fn test_failed_regeneration_keeps_original_and_records_error() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NEEDS_REGENERATION);
    let images = FakeImages::failing_when(|prompt| prompt.contains("FIX THESE ISSUES"));
    let candidates = vec![screenshot(dir.path(), "top.png", 32, 18)];

    let variation = generator(vision, images.clone(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::ContentHeavy, &candidates)
        .await;

    assert!(!variation.image_result.quality_improved);
    assert_eq!(
        variation.image_result.path,
        Some(dir.path().join("variations").join("variation_3.png"))
    );
    assert!(variation.image_result.regeneration_error.is_some());
    assert!(variation.image_result.error.is_none());
    assert!(variation.has_image());
}

#[tokio::test]
async fn test_all_patterns_contain_one_failure() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NO_ISSUES);
    let images = FakeImages::failing_when(|prompt| prompt.contains("Feature-Grid Layout"));
    let candidates = vec![screenshot(dir.path(), "top.png", 32, 18)];

    let variations = generator(vision, images, dir.path())
        .generate_all(&empty_map("https://example.com"), PatternSelector::All, &candidates)
        .await;

    assert_eq!(variations.len(), 4);
    assert_eq!(variations.iter().filter(|v| v.has_image()).count(), 3);
    let failed: Vec<_> = variations.iter().filter(|v| v.failed()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, PatternId::FeatureGrid);
    assert!(failed[0].image_result.path.is_none());
    assert!(failed[0].quality_report.is_none());
}

#[tokio::test]
async fn test_missing_screenshot_falls_back_to_text_only() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NO_ISSUES);
    let images = FakeImages::new();
    let candidates = vec![ScreenshotCandidate::desktop(dir.path().join("missing.png"))];

    let variation = generator(vision, images.clone(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::ConversionOptimized, &candidates)
        .await;

    assert_eq!(variation.image_result.mode, Some(GenerationMode::TextOnly));
    assert!(images.edit_prompts.lock().unwrap().is_empty());
    let generated = images.generate_prompts.lock().unwrap();
    assert_eq!(generated.len(), 1);
    assert!(generated[0].contains("Conversion-Optimized Layout"));
    assert!(variation.has_image());
}

#[tokio::test]
async fn test_without_images_skips_image_and_quality() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NEEDS_REGENERATION);
    let images = FakeImages::new();

    let variation = generator(vision.clone(), images.clone(), dir.path())
        .without_images()
        .generate_variation(&empty_map("https://example.com"), PatternId::HeroFirst, &[])
        .await;

    assert!(variation.image_result.skipped);
    assert!(!variation.has_image());
    assert!(!variation.failed());
    assert!(variation.generated_code.is_some());
    assert!(!variation.edit_prompt.is_empty());
    assert!(images.outputs.lock().unwrap().is_empty());
    assert_eq!(vision.prompts_containing("Inspect this generated website layout"), 0);
}

#[tokio::test]
async fn test_failed_quality_call_means_no_regeneration() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::new(|request| {
        let prompt = request.prompt_text();
        if prompt.contains("Inspect this generated website layout") {
            Err(api_error(500))
        } else {
            Ok(route(&prompt, NO_ISSUES))
        }
    });
    let images = FakeImages::new();
    let candidates = vec![screenshot(dir.path(), "top.png", 32, 18)];

    let variation = generator(vision, images.clone(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::HeroFirst, &candidates)
        .await;

    let report = variation.quality_report.unwrap();
    assert!(!report.regeneration_needed);
    assert_eq!(images.outputs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_text_step_failures_are_recorded() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::new(|request| {
        let prompt = request.prompt_text();
        if prompt.contains("modify the component structure") || prompt.contains("A/B testing variation") {
            Err(api_error(429))
        } else {
            Ok(route(&prompt, NO_ISSUES))
        }
    });
    let images = FakeImages::new();
    let candidates = vec![screenshot(dir.path(), "top.png", 32, 18)];

    let variation = generator(vision, images, dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::FeatureGrid, &candidates)
        .await;

    assert!(variation.modified_components.error.is_some());
    assert!(variation.code_error.is_some());
    assert!(variation.generated_code.is_none());
    assert!(variation.has_image());
}

#[tokio::test]
async fn test_size_follows_screenshot_kind() {
    let dir = TempDir::new().unwrap();
    let vision = ScriptedVision::routed(NO_ISSUES);

    // Tall desktop capture still gets the landscape size
    let desktop = vec![screenshot(dir.path(), "tall.png", 20, 60)];
    let variation = generator(vision.clone(), FakeImages::new(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::HeroFirst, &desktop)
        .await;
    assert_eq!(variation.image_result.size, ImageSize::Landscape);

    let mut mobile = screenshot(dir.path(), "mobile.png", 15, 32);
    mobile.is_desktop = false;
    let variation = generator(vision, FakeImages::new(), dir.path())
        .generate_variation(&empty_map("https://example.com"), PatternId::HeroFirst, &[mobile])
        .await;
    assert_eq!(variation.image_result.size, ImageSize::Portrait);
}
