//! Tests for wave-batched style transfer

use super::common::*;
use design_flux::stylizer::{
    SeedPolicy, StyleCatalog, StylePreset, StyleSource, StyleStatus, Stylizer, MIN_IMAGE_BYTES,
};
use model_client::{FetchedImage, StyleOutput};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn presets(count: usize) -> Vec<StylePreset> {
    StyleCatalog::builtin().unwrap().presets()[..count].to_vec()
}

fn source(dir: &Path) -> StyleSource {
    let path = dir.join("variation_1.png");
    std::fs::write(&path, png_bytes(24, 16, 5)).unwrap();
    StyleSource {
        variation_key: "variation_1".to_string(),
        variation_name: "Hero-First Layout".to_string(),
        image: Some(path),
    }
}

fn stylizer(model: Arc<FakeStyles>, fetcher: Arc<FakeFetcher>, dir: &Path) -> Stylizer {
    Stylizer::new(model, fetcher, dir.join("stylized"), "fake/style-model")
        .with_pause(Duration::ZERO)
}

#[tokio::test]
async fn test_failures_are_contained_per_style() {
    let dir = TempDir::new().unwrap();
    let styles = presets(7);
    let failing: Vec<String> = [1, 3, 5].iter().map(|&i| styles[i].prompt.clone()).collect();
    let model = FakeStyles::new(move |request| {
        if failing.iter().any(|p| request.prompt.contains(p.as_str())) {
            Err(api_error(500))
        } else {
            Ok(StyleOutput::Bytes(png_bytes(32, 32, 7)))
        }
    });
    let stylizer = stylizer(model.clone(), FakeFetcher::empty(), dir.path());

    let result = stylizer.stylize_variation(&source(dir.path()), &styles).await;

    assert_eq!(result.stylized_images.len(), 7);
    assert_eq!(result.success_count(), 4);
    for (index, (job, style)) in result.stylized_images.iter().zip(&styles).enumerate() {
        assert_eq!(job.style_name, style.name);
        let expected = stylizer.output_path("variation_1", style);
        if [1, 3, 5].contains(&index) {
            assert!(matches!(job.status, StyleStatus::Failed { .. }), "style {}", index);
            assert!(!expected.exists(), "style {}", index);
        } else {
            assert_eq!(job.output_path(), Some(expected.as_path()));
            assert!(expected.exists(), "style {}", index);
        }
    }
    assert_eq!(model.requests.lock().unwrap().len(), 7);
    assert!(model.max_in_flight.load(Ordering::SeqCst) <= 5);
}

#[tokio::test]
async fn test_wave_size_bounds_concurrency() {
    let dir = TempDir::new().unwrap();
    let model = FakeStyles::succeeding();
    let stylizer = stylizer(model.clone(), FakeFetcher::empty(), dir.path()).with_batch_size(2);

    let result = stylizer.stylize_variation(&source(dir.path()), &presets(5)).await;

    assert_eq!(result.success_count(), 5);
    assert!(model.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_url_outputs_are_validated() {
    let dir = TempDir::new().unwrap();
    let styles = presets(4);
    let urls = ["https://cdn/ok.png", "https://cdn/page.html", "https://cdn/tiny.png", "https://cdn/gone.png"];
    let by_prompt: Vec<(String, String)> = styles
        .iter()
        .zip(urls)
        .map(|(style, url)| (style.prompt.clone(), url.to_string()))
        .collect();
    let model = FakeStyles::new(move |request| {
        let url = by_prompt
            .iter()
            .find(|(prompt, _)| request.prompt.contains(prompt.as_str()))
            .map(|(_, url)| url.clone())
            .unwrap();
        Ok(StyleOutput::Url(url))
    });
    let fetcher = FakeFetcher::with(vec![
        (
            "https://cdn/ok.png",
            FetchedImage {
                status: 200,
                content_type: Some("image/png".to_string()),
                bytes: png_bytes(32, 32, 9),
            },
        ),
        (
            "https://cdn/page.html",
            FetchedImage {
                status: 200,
                content_type: Some("text/html".to_string()),
                bytes: vec![b'x'; MIN_IMAGE_BYTES * 2],
            },
        ),
        (
            "https://cdn/tiny.png",
            FetchedImage {
                status: 200,
                content_type: Some("image/png".to_string()),
                bytes: vec![0; MIN_IMAGE_BYTES - 1],
            },
        ),
    ]);

    let result = stylizer(model, fetcher, dir.path())
        .stylize_variation(&source(dir.path()), &styles)
        .await;

    let errors: Vec<Option<&str>> = result
        .stylized_images
        .iter()
        .map(|job| match &job.status {
            StyleStatus::Failed { error } => Some(error.as_str()),
            _ => None,
        })
        .collect();
    assert!(errors[0].is_none());
    assert!(errors[1].unwrap().contains("content type"));
    assert!(errors[2].unwrap().contains("too small"));
    assert!(errors[3].unwrap().contains("404"));
}

#[tokio::test]
async fn test_list_output_uses_first_item() {
    let dir = TempDir::new().unwrap();
    let styles = presets(2);
    let first = styles[0].prompt.clone();
    let model = FakeStyles::new(move |request| {
        if request.prompt.contains(first.as_str()) {
            Ok(StyleOutput::List(vec![StyleOutput::Bytes(png_bytes(32, 32, 11))]))
        } else {
            Ok(StyleOutput::List(Vec::new()))
        }
    });

    let result = stylizer(model, FakeFetcher::empty(), dir.path())
        .stylize_variation(&source(dir.path()), &styles)
        .await;

    assert!(result.stylized_images[0].is_success());
    match &result.stylized_images[1].status {
        StyleStatus::Failed { error } => assert!(error.contains("empty output list")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fixed_seed_is_sent_and_recorded() {
    let dir = TempDir::new().unwrap();
    let model = FakeStyles::succeeding();
    let stylizer =
        stylizer(model.clone(), FakeFetcher::empty(), dir.path()).with_seed(SeedPolicy::Fixed(1234));

    let result = stylizer.stylize_variation(&source(dir.path()), &presets(3)).await;

    assert!(model
        .requests
        .lock()
        .unwrap()
        .iter()
        .all(|(prompt, seed)| prompt.starts_with("Apply this exact style: ") && *seed == Some(1234)));
    assert!(result.stylized_images.iter().all(|job| job.seed == Some(1234)));
}

#[tokio::test]
async fn test_missing_source_fails_every_style_without_calls() {
    let dir = TempDir::new().unwrap();
    let model = FakeStyles::succeeding();
    let sources = vec![StyleSource {
        variation_key: "variation_2".to_string(),
        variation_name: "Feature-Grid Layout".to_string(),
        image: None,
    }];

    let report = stylizer(model.clone(), FakeFetcher::empty(), dir.path())
        .stylize_all(&sources, &presets(3))
        .await;

    assert_eq!(report.total_jobs(), 3);
    assert_eq!(report.failure_count(), 3);
    assert_eq!(report.metadata.total_variations, 1);
    assert_eq!(report.metadata.model, "fake/style-model");
    assert!(model.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rerun_overwrites_same_paths() {
    let dir = TempDir::new().unwrap();
    let styles = presets(2);
    let source = source(dir.path());

    let first = stylizer(FakeStyles::succeeding(), FakeFetcher::empty(), dir.path())
        .stylize_variation(&source, &styles)
        .await;
    let replacement = png_bytes(40, 40, 77);
    let expected = replacement.clone();
    let second = stylizer(
        FakeStyles::new(move |_| Ok(StyleOutput::Bytes(replacement.clone()))),
        FakeFetcher::empty(),
        dir.path(),
    )
    .stylize_variation(&source, &styles)
    .await;

    for (a, b) in first.stylized_images.iter().zip(&second.stylized_images) {
        assert_eq!(a.output_path(), b.output_path());
        assert_eq!(std::fs::read(b.output_path().unwrap()).unwrap(), expected);
    }
    let neo = dir.path().join("stylized/variation_1/variation_1_neo_brutalism.png");
    assert!(neo.exists());
}

#[tokio::test]
async fn test_styles_sharing_a_file_name_do_not_overwrite() {
    let dir = TempDir::new().unwrap();
    let styles = vec![
        StylePreset {
            name: "Neo Brutalism".to_string(),
            prompt: "first brutalist take".to_string(),
        },
        StylePreset {
            name: "Neo-Brutalism".to_string(),
            prompt: "second brutalist take".to_string(),
        },
        StylePreset {
            name: "Mono".to_string(),
            prompt: "black and white".to_string(),
        },
    ];
    let first_image = png_bytes(32, 32, 21);
    let expected = first_image.clone();
    let model = FakeStyles::new(move |request| {
        if request.prompt.contains("first brutalist take") {
            Ok(StyleOutput::Bytes(first_image.clone()))
        } else {
            Ok(StyleOutput::Bytes(png_bytes(32, 32, 22)))
        }
    });

    let result = stylizer(model.clone(), FakeFetcher::empty(), dir.path())
        .stylize_variation(&source(dir.path()), &styles)
        .await;

    assert_eq!(result.stylized_images.len(), 3);
    let owner = result.stylized_images[0].output_path().unwrap();
    assert_eq!(std::fs::read(owner).unwrap(), expected);
    match &result.stylized_images[1].status {
        StyleStatus::Failed { error } => assert!(error.contains("collides")),
        other => panic!("expected a collision failure, got {:?}", other),
    }
    assert_eq!(result.stylized_images[1].style_name, "Neo-Brutalism");
    assert!(result.stylized_images[2].is_success());
    assert_eq!(model.requests.lock().unwrap().len(), 2);
}
