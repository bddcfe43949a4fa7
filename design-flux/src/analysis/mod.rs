//! Design-system analysis of screenshots
//!
//! - [`schema`]: the canonical category set and the complete result type
//! - [`parser`]: fenced-block and bracket-span extraction
//! - [`merge`]: chunk history -> canonical result
//! - [`engine`]: single-stage, multi-stage and custom-prompt sessions

pub mod engine;
pub mod merge;
pub mod parser;
pub mod prompts;
pub mod schema;

pub use engine::{AnalysisEngine, AnalysisError, AnalysisMode};
pub use merge::merge_chunks;
pub use parser::{parse_response, ParseError, ParsedResponse};
pub use schema::{AnalysisResult, Category, CategoryValue};
