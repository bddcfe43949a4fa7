//! Quality check of generated variation images

use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use design_flux_sdk::log_warning;

use crate::analysis::parser::extract_bracket_span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub fix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub has_issues: bool,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default = "unknown_quality")]
    pub overall_quality: String,
    pub regeneration_needed: bool,
}

fn unknown_quality() -> String {
    "unknown".to_string()
}

impl Default for QualityReport {
    /// No issues, no regeneration
    fn default() -> Self {
        Self {
            has_issues: false,
            issues: Vec::new(),
            overall_quality: unknown_quality(),
            regeneration_needed: false,
        }
    }
}

impl QualityReport {
    pub fn serious_issue_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i.severity, Severity::High | Severity::Medium))
            .count()
    }
}

pub const QUALITY_PROMPT: &str = r#"Inspect this generated website layout for visual defects. Check each point:
1. Text overflow: text cut off or spilling out of its container
2. Margins: uneven or missing spacing around sections
3. Font legibility: text too small, distorted or garbled
4. Contrast: text that is hard to read against its background
5. Alignment: elements that should line up but do not
6. Overlap: elements covering each other
7. Broken layout: sections collapsed, misplaced or cut in half
8. Blur: blurry or low-resolution regions
9. Inconsistent styling: mismatched colors, fonts or component styles
10. Other glitches: artifacts, duplicated elements, nonsense content

Respond with ONLY this JSON object:
{
  "has_issues": true or false,
  "issues": [
    {"type": "<checklist item>", "description": "<what is wrong>", "severity": "low" | "medium" | "high", "fix": "<instruction for fixing it>"}
  ],
  "overall_quality": "excellent" | "good" | "fair" | "poor",
  "regeneration_needed": true or false
}"#;

fn report_schema() -> Value {
    json!({
        "type": "object",
        "required": ["has_issues", "regeneration_needed"],
        "properties": {
            "has_issues": {"type": "boolean"},
            "regeneration_needed": {"type": "boolean"},
            "overall_quality": {"type": "string"},
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["type", "description", "severity"],
                    "properties": {
                        "type": {"type": "string"},
                        "description": {"type": "string"},
                        "severity": {"enum": ["low", "medium", "high"]},
                        "fix": {"type": "string"}
                    }
                }
            }
        }
    })
}

/// Parse a quality response leniently
///
/// Anything that is not a schema-valid report collapses to the default,
/// so a broken review never triggers a regeneration.
pub fn parse_quality_report(text: &str) -> QualityReport {
    let Some(span) = extract_bracket_span(text) else {
        log_warning!("Quality check returned no JSON; assuming no issues");
        return QualityReport::default();
    };

    let value: Value = match serde_json::from_str(span) {
        Ok(value) => value,
        Err(err) => {
            log_warning!("Quality report is not valid JSON ({}); assuming no issues", err);
            return QualityReport::default();
        }
    };

    let schema = report_schema();
    let valid = JSONSchema::compile(&schema)
        .map(|compiled| compiled.is_valid(&value))
        .unwrap_or(false);
    if !valid {
        log_warning!("Quality report does not match the expected shape; assuming no issues");
        return QualityReport::default();
    }

    serde_json::from_value(value).unwrap_or_default()
}
