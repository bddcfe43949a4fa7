//! Tests for response parsing and chunk merging

use design_flux::analysis::{merge_chunks, parse_response, AnalysisResult, Category, CategoryValue, ParsedResponse};
use serde_json::{json, Value};
use std::collections::BTreeSet;

fn key_set(result: &AnalysisResult) -> BTreeSet<String> {
    result
        .to_json()
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect()
}

fn canonical_names() -> BTreeSet<String> {
    Category::ALL.iter().map(|c| c.name().to_string()).collect()
}

#[test]
fn test_merge_key_set_is_canonical_for_any_block_count() {
    let blocks = vec![
        json!({"typography": {"fontFamilies": ["Inter"]}}),
        json!({"colorPalette": {"primary": {"brand": "#000"}}}),
        json!({"Imagery": "photography"}),
        json!({"unrelated": true}),
        json!({"buttonStyles": {"primaryButton": {"padding": "8px"}}}),
    ];

    for n in 0..=blocks.len() {
        let result = merge_chunks(&blocks[..n]);
        assert_eq!(result.len(), Category::ALL.len(), "{} blocks", n);
        assert_eq!(key_set(&result), canonical_names(), "{} blocks", n);
    }
}

#[test]
fn test_merge_is_idempotent() {
    let chunks = vec![
        json!({"typography": {"fontFamilies": ["Inter"], "fontWeights": [400, 700]}}),
        json!({"Typography": {"families": ["Roboto"]}}),
        json!({"gridSystem": {"columns": 12}}),
    ];

    let first = merge_chunks(&chunks);
    let second = merge_chunks(&chunks);
    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
}

#[test]
fn test_later_chunk_overwrites_same_category() {
    let chunks = vec![
        json!({"Typography": {"families": ["Roboto"]}}),
        json!({"typography": {"fontFamilies": ["Inter"]}}),
    ];
    let result = merge_chunks(&chunks);
    let CategoryValue::Map(map) = result.get(Category::Typography) else {
        panic!("typography should be populated");
    };
    assert_eq!(map[Category::Typography.field(0)], json!(["Inter"]));
}

#[test]
fn test_placeholders_fill_untouched_categories() {
    let result = merge_chunks(&[json!({"Imagery": "photos"})]);
    let json = result.to_json();
    assert_eq!(json["Imagery"], json!("photos"));
    assert_eq!(
        json["Favicons & Social Preview Assets"],
        json!(Category::Favicons.placeholder())
    );
}

#[test]
fn test_unfenced_response_uses_bracket_span() {
    let text = "Sure! {\"Imagery\": {\"style\": \"flat\"}} Hope that helps.";
    match parse_response(text).unwrap() {
        ParsedResponse::Raw(value) => assert_eq!(value["Imagery"]["style"], "flat"),
        other => panic!("expected raw, got {:?}", other),
    }
}

#[test]
fn test_response_without_json_is_error() {
    assert!(parse_response("I cannot analyze this image.").is_err());
    assert!(parse_response("{ broken").is_err());
}

#[test]
fn test_serialized_result_round_trips_through_placeholders() {
    let result = merge_chunks(&[json!({"Backgrounds": ["gradient"]})]);
    let text = serde_json::to_string(&result).unwrap();
    let back: AnalysisResult = serde_json::from_str(&text).unwrap();
    assert_eq!(back, result);

    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value.as_object().unwrap().len(), Category::ALL.len());
}
