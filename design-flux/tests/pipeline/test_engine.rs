//! Tests for the analysis engine modes and recovery

use super::common::*;
use design_flux::analysis::{AnalysisEngine, AnalysisError, AnalysisMode, Category, CategoryValue};
use model_client::ImageInput;
use std::sync::atomic::Ordering;

fn image() -> ImageInput {
    ImageInput::png(png_bytes(8, 8, 1))
}

#[tokio::test]
async fn test_single_stage_merges_fenced_blocks() {
    let vision = SequenceVision::new(vec![Ok(format!(
        "{}{}",
        fenced(r#"{"typography": {"fontFamilies": ["Inter"]}}"#),
        fenced(r#"{"Imagery": "photography"}"#)
    ))]);
    let mut engine = AnalysisEngine::new(vision.clone());

    let result = engine.analyze(&image(), &AnalysisMode::SingleStage).await.unwrap();

    assert_eq!(result.len(), Category::ALL.len());
    assert!(result.get(Category::Typography).is_available());
    assert!(result.get(Category::Imagery).is_available());
    assert_eq!(engine.chunk_history().len(), 2);
    assert_eq!(engine.last_successful_merge(), Some(&result));
}

#[tokio::test]
async fn test_failure_without_prior_merge_is_reported() {
    let vision = SequenceVision::new(vec![Err(api_error(503))]);
    let mut engine = AnalysisEngine::new(vision);

    let err = engine
        .analyze(&image(), &AnalysisMode::SingleStage)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Model { .. }));
    assert_eq!(err.stage(), "single-stage analysis");
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_failure_after_merge_returns_last_merge() {
    let vision = SequenceVision::new(vec![
        Ok(fenced(r#"{"Imagery": "photography"}"#)),
        Err(api_error(500)),
        Ok("no structured data at all".to_string()),
    ]);
    let mut engine = AnalysisEngine::new(vision);

    let first = engine.analyze(&image(), &AnalysisMode::SingleStage).await.unwrap();
    let after_model_error = engine.analyze(&image(), &AnalysisMode::SingleStage).await.unwrap();
    let after_parse_error = engine.analyze(&image(), &AnalysisMode::SingleStage).await.unwrap();

    assert_eq!(after_model_error, first);
    assert_eq!(after_parse_error, first);
}

#[tokio::test]
async fn test_unfenced_output_stays_out_of_history() {
    let vision = SequenceVision::new(vec![Ok(
        r#"The system: {"Imagery": {"style": "illustration"}}"#.to_string(),
    )]);
    let mut engine = AnalysisEngine::new(vision);

    let result = engine.analyze(&image(), &AnalysisMode::SingleStage).await.unwrap();

    assert!(result.get(Category::Imagery).is_available());
    assert!(engine.chunk_history().is_empty());
    assert!(engine.last_successful_merge().is_none());
}

#[tokio::test]
async fn test_multi_stage_skips_failed_focus_area() {
    let vision = ScriptedVision::new(|request| {
        let prompt = request.prompt_text();
        if prompt.contains("Focus only on color") {
            Err(api_error(500))
        } else if prompt.contains("Focus only on typography") {
            Ok(fenced(r#"{"typography": {"fontFamilies": ["Inter"]}}"#))
        } else if prompt.contains("Focus only") {
            Ok(fenced(r#"{"Backgrounds": "white"}"#))
        } else if prompt.contains("Combine them") {
            Ok(fenced(r##"{"Color & Contrast": {"primary": "#111"}}"##))
        } else {
            Ok(fenced(r#"{"Motion & Animation": ["fade-in"]}"#))
        }
    });
    let mut engine = AnalysisEngine::new(vision.clone());

    let result = engine.analyze(&image(), &AnalysisMode::MultiStage).await.unwrap();

    // 4 focused + synthesis + validation
    assert_eq!(vision.call_count(), 6);
    assert_eq!(vision.prompts_containing("Combine them"), 1);
    assert!(result.get(Category::Typography).is_available());
    assert!(result.get(Category::ColorContrast).is_available());
    assert!(result.get(Category::Motion).is_available());
    assert_eq!(result.len(), Category::ALL.len());
}

#[tokio::test]
async fn test_multi_stage_synthesis_failure_recovers_focused_chunks() {
    let vision = ScriptedVision::new(|request| {
        let prompt = request.prompt_text();
        if prompt.contains("Focus only on typography") {
            Ok(fenced(r#"{"typography": {"fontFamilies": ["Inter"]}}"#))
        } else if prompt.contains("Focus only") {
            Ok("nothing useful".to_string())
        } else {
            Err(api_error(502))
        }
    });
    let mut engine = AnalysisEngine::new(vision.clone());

    let result = engine.analyze(&image(), &AnalysisMode::MultiStage).await.unwrap();

    let CategoryValue::Map(typography) = result.get(Category::Typography) else {
        panic!("typography should come from the focused pass");
    };
    assert_eq!(typography[Category::Typography.field(0)], serde_json::json!(["Inter"]));
    // validation never runs after a failed synthesis
    assert_eq!(vision.call_count(), 5);
}

#[tokio::test]
async fn test_custom_prompt_is_sent_verbatim() {
    let vision = ScriptedVision::new(|_| Ok(fenced(r#"{"Cursors & Pointer States": "pointer"}"#)));
    let mut engine = AnalysisEngine::new(vision.clone());

    let mode = AnalysisMode::Custom("List every cursor style.".to_string());
    let result = engine.analyze(&image(), &mode).await.unwrap();

    assert_eq!(vision.prompts_containing("List every cursor style."), 1);
    assert!(result.get(Category::Cursors).is_available());
}

#[tokio::test]
async fn test_sequence_fake_counts_calls() {
    let vision = SequenceVision::new(vec![]);
    let mut engine = AnalysisEngine::new(vision.clone());
    assert!(engine.analyze(&image(), &AnalysisMode::SingleStage).await.is_err());
    assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
}
