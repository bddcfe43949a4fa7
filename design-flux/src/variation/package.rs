//! A/B test package and quality report documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::generator::Variation;
use super::patterns::PatternSelector;
use super::quality::QualityReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub original_url: String,
    pub generation_timestamp: DateTime<Utc>,
    pub selected_pattern: String,
    pub total_variations: usize,
    pub variations_with_images: usize,
    pub failed_variations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub suggested_metrics: Vec<String>,
    pub testing_duration: String,
    pub minimum_sample_size: String,
    pub statistical_significance: String,
}

impl Default for ComparisonMetrics {
    fn default() -> Self {
        Self {
            suggested_metrics: [
                "Conversion rate",
                "Click-through rate",
                "Bounce rate",
                "Time on page",
                "Scroll depth",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            testing_duration: "2-4 weeks".to_string(),
            minimum_sample_size: "1000 visitors per variation".to_string(),
            statistical_significance: "95% confidence level".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbTestPackage {
    pub metadata: PackageMetadata,
    /// Keyed `variation_<id>`
    pub variations: BTreeMap<String, Variation>,
    pub comparison_metrics: ComparisonMetrics,
}

impl AbTestPackage {
    pub fn new(url: &str, selector: PatternSelector, variations: Vec<Variation>) -> Self {
        let metadata = PackageMetadata {
            original_url: url.to_string(),
            generation_timestamp: Utc::now(),
            selected_pattern: selector.to_string(),
            total_variations: variations.len(),
            variations_with_images: variations.iter().filter(|v| v.has_image()).count(),
            failed_variations: variations.iter().filter(|v| v.failed()).count(),
        };

        Self {
            metadata,
            variations: variations.into_iter().map(|v| (v.key(), v)).collect(),
            comparison_metrics: ComparisonMetrics::default(),
        }
    }

    pub fn quality_summary(&self) -> QualitySummary {
        QualitySummary {
            generated_at: Utc::now(),
            variations: self
                .variations
                .iter()
                .map(|(key, v)| {
                    (
                        key.clone(),
                        QualityEntry {
                            quality_report: v.quality_report.clone(),
                            quality_improved: v.image_result.quality_improved,
                            original_path: v.image_result.original_path.clone(),
                            final_path: v.image_result.path.clone(),
                            regeneration_error: v.image_result.regeneration_error.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityEntry {
    pub quality_report: Option<QualityReport>,
    pub quality_improved: bool,
    pub original_path: Option<PathBuf>,
    pub final_path: Option<PathBuf>,
    pub regeneration_error: Option<String>,
}

/// Per-variation quality outcomes, persisted as `quality_report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySummary {
    pub generated_at: DateTime<Utc>,
    pub variations: BTreeMap<String, QualityEntry>,
}
