//! A/B layout variations: one state machine per pattern, with a
//! quality check and at most one regeneration

pub mod generator;
pub mod locate;
pub mod package;
pub mod patterns;
pub mod prompts;
pub mod quality;

pub use generator::{GenerationMode, ImageResult, Variation, VariationGenerator, VariationState};
pub use locate::{candidates_for, locate, ScreenshotCandidate};
pub use package::{AbTestPackage, QualitySummary};
pub use patterns::{Pattern, PatternId, PatternSelector};
pub use quality::{parse_quality_report, Issue, QualityReport, Severity};
