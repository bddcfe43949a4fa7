//! Prompt assembly and size selection for variation images

use model_client::ImageSize;

use super::patterns::{Pattern, PatternId};
use super::quality::{QualityReport, Severity};
use crate::analysis::{AnalysisResult, Category};
use crate::mapper::ComponentMap;

pub const MODIFY_SYSTEM_PROMPT: &str = "You are a UX expert specializing in A/B testing and \
conversion optimization. Modify component structures to match specific testing patterns.";

pub const CODE_SYSTEM_PROMPT: &str = "You are an expert React developer specializing in A/B \
testing implementations. Generate conversion-optimized React components.";

pub const QUALITY_SYSTEM_PROMPT: &str = "You are a meticulous UI quality reviewer. You inspect \
rendered web layouts for visual defects and report them as strict JSON.";

const EXCERPT_LIMIT: usize = 600;

pub fn modify_prompt(hierarchy_json: &str, pattern: &Pattern) -> String {
    format!(
        r#"Based on this component analysis and A/B testing pattern, modify the component structure:

Original Components: {hierarchy_json}

A/B Testing Pattern: {name}
Strategy: {strategy}
Key Changes: {changes}

Provide a modified component structure that implements these changes:
1. Rearrange component priority and positioning
2. Modify component sizes and emphasis
3. Add/remove elements based on pattern
4. Adjust content hierarchy
5. Optimize for the pattern's goals

Return as structured JSON with the new component arrangement."#,
        name = pattern.name,
        strategy = pattern.layout_strategy,
        changes = pattern.key_changes.join("; "),
    )
}

pub fn code_prompt(pattern: &Pattern, modified_structure: &str) -> String {
    format!(
        r#"Generate a complete React component for this A/B testing variation:

Pattern: {name}
Strategy: {strategy}
Modified Components: {modified_structure}

Requirements:
1. Implement the A/B testing pattern exactly
2. Use modern React with TypeScript
3. Include Tailwind CSS for styling
4. Make it responsive and accessible
5. Add proper conversion tracking hooks
6. Include A/B testing metadata
7. Optimize for the pattern's goals

Generate complete, production-ready code that implements this variation."#,
        name = pattern.name,
        strategy = pattern.layout_strategy,
    )
}

/// Where hero, navigation, CTA and content go for each pattern
fn positioning_rules(id: PatternId) -> &'static [&'static str] {
    match id {
        PatternId::HeroFirst => &[
            "Hero: enlarge to fill about 60% of the first viewport, headline centered",
            "Navigation: reduce to logo plus at most three links",
            "CTA: one primary button directly under the hero headline",
            "Content: move social proof (logos, testimonials) immediately below the hero",
        ],
        PatternId::FeatureGrid => &[
            "Hero: shorten to about 35% of the viewport",
            "Navigation: render primary links as tabs",
            "CTA: one button per feature card plus the hero button",
            "Content: arrange features as a 3-column grid with testimonials in a right sidebar",
        ],
        PatternId::ContentHeavy => &[
            "Hero: keep compact with a descriptive subheading",
            "Navigation: add a secondary navigation row below the header",
            "CTA: place a CTA after each major content block",
            "Content: stack detailed description blocks and give the FAQ a prominent section",
        ],
        PatternId::ConversionOptimized => &[
            "Hero: add an urgency banner (limited-time offer) above the headline",
            "Navigation: remove everything except the logo and the CTA",
            "CTA: make the primary button sticky at the top right",
            "Content: show social-proof badges next to the CTA and drop distracting sections",
        ],
    }
}

const PRESERVE_CONSTRAINTS: &[&str] = &[
    "Preserve ALL original styling: colors, fonts, imagery, icons, border radii and shadows",
    "Keep every text string exactly as written; do not invent copy",
    "Change the LAYOUT only: position, size and order of existing sections",
    "Keep the page looking like the same website and brand",
    "Render crisp, legible text with consistent margins",
];

/// Edit instruction applied against the original screenshot
pub fn edit_prompt(pattern: &Pattern, map: &ComponentMap) -> String {
    let mut prompt = format!(
        "Rearrange this website screenshot into a {} variation: {}.\n\nLAYOUT CHANGES:\n",
        pattern.name, pattern.description
    );
    for change in pattern.key_changes {
        prompt.push_str(&format!("- {}\n", change));
    }

    prompt.push_str("\nPOSITIONING:\n");
    for rule in positioning_rules(pattern.id) {
        prompt.push_str(&format!("- {}\n", rule));
    }

    prompt.push_str("\nCONSTRAINTS:\n");
    for constraint in PRESERVE_CONSTRAINTS {
        prompt.push_str(&format!("- {}\n", constraint));
    }

    let (colors, typography) = style_excerpts(map);
    prompt.push_str(&format!(
        "\nREFERENCE STYLE:\n- Colors: {}\n- Typography: {}\n",
        colors, typography
    ));
    prompt
}

/// Text-only fallback when no original screenshot exists
pub fn simplified_prompt(pattern: &Pattern, map: &ComponentMap) -> String {
    let (colors, typography) = style_excerpts(map);
    let mut prompt = format!(
        "Create a modern, professional website landing page design.\n\n\
         LAYOUT PATTERN: {} - {}\n\n\
         VISUAL STYLE:\n- Color scheme: {}\n- Typography: {}\n\n\
         LAYOUT REQUIREMENTS:\n",
        pattern.name, pattern.description, colors, typography
    );
    for change in pattern.key_changes {
        prompt.push_str(&format!("- {}\n", change));
    }
    prompt.push_str(
        "\nSPECIFIC ELEMENTS:\n- Header with navigation\n- Hero section with clear value proposition\n\
         - Call-to-action buttons\n- Feature highlights\n- Social proof elements\n- Footer section\n\n\
         STYLE: clean, modern, flat design, minimal shadows, contemporary UI/UX",
    );
    prompt
}

const GENERAL_QUALITY_GUIDELINES: &[&str] = &[
    "All text must be sharp, fully visible and inside its container",
    "Keep consistent margins and alignment across sections",
    "Keep sufficient contrast between text and background",
    "No overlapping elements",
];

/// Original instruction plus high/medium fixes and general guidelines
pub fn regeneration_prompt(original: &str, report: &QualityReport) -> String {
    let fixes: Vec<&str> = report
        .issues
        .iter()
        .filter(|issue| matches!(issue.severity, Severity::High | Severity::Medium))
        .map(|issue| issue.fix.as_str())
        .filter(|fix| !fix.trim().is_empty())
        .collect();

    let mut prompt = original.trim_end().to_string();
    if !fixes.is_empty() {
        prompt.push_str("\n\nFIX THESE ISSUES FROM THE PREVIOUS ATTEMPT:\n");
        for fix in fixes {
            prompt.push_str(&format!("- {}\n", fix));
        }
    }
    prompt.push_str("\nQUALITY REQUIREMENTS:\n");
    for guideline in GENERAL_QUALITY_GUIDELINES {
        prompt.push_str(&format!("- {}\n", guideline));
    }
    prompt
}

/// Pick the output size for an original screenshot
///
/// Desktop captures always take the landscape size; tall full-page captures
/// cannot be reproduced at native resolution anyway.
pub fn select_size(width: u32, height: u32, is_desktop: bool) -> ImageSize {
    if is_desktop || height == 0 {
        return ImageSize::Landscape;
    }
    let ratio = width as f64 / height as f64;
    if ratio >= 1.2 {
        ImageSize::Landscape
    } else if ratio <= 0.83 {
        ImageSize::Portrait
    } else {
        ImageSize::Square
    }
}

/// Compact color and typography descriptions from the first analyzed segment
fn style_excerpts(map: &ComponentMap) -> (String, String) {
    let analysis = map
        .segment_ids()
        .into_iter()
        .filter_map(|id| map.segments.get(id))
        .find_map(|record| record.analysis.as_ref());

    let excerpt = |analysis: Option<&AnalysisResult>, category: Category, fallback: &str| {
        analysis
            .map(|a| a.get(category))
            .filter(|value| value.is_available())
            .map(|value| truncate(&value.to_value(category).to_string(), EXCERPT_LIMIT))
            .unwrap_or_else(|| fallback.to_string())
    };

    (
        excerpt(analysis, Category::ColorContrast, "the original page's color palette"),
        excerpt(analysis, Category::Typography, "the original page's typefaces and scale"),
    )
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
