//! Prompt text for the analysis stages

use serde::{Deserialize, Serialize};

pub const SYSTEM_PROMPT: &str = "\
You are a senior UI/UX designer and front-end engineer who has spent years taking \
design systems apart. You read screenshots with a developer's precision and a \
designer's eye, and you turn what you see into exact technical specifications: \
font families, weights and sizes; brand, neutral and semantic colors; grids, \
spacing and breakpoints; component patterns; accessibility treatment.";

/// Single-stage request: the whole schema in one pass
pub fn analysis_prompt(schema_json: &str) -> String {
    format!(
        r#"Analyze this website screenshot and extract its complete design system.

Work through it category by category:
1. Typography: identify font families from letter forms, weights from stroke thickness, the heading and body size scale, line-height, letter-spacing and alignment.
2. Color: brand primaries, secondaries and accents with exact hex values, the neutral scale, semantic colors, gradients and overlays.
3. Layout and spacing: content widths, columns and gutters, breakpoints, the base spacing unit and vertical rhythm.
4. Components: buttons and their states, navigation, cards and containers, form inputs.
5. Visual language: logo usage, iconography, imagery, backgrounds and textures.
6. Interaction: hover states, transitions, motion and accessibility cues.

Give concrete measurements (px, rem, %) and exact color values wherever you can.

Return ONE JSON object that follows this schema exactly, with every category present:

{schema_json}

Respond with the JSON object only. It must start with {{ and end with }}."#
    )
}

/// Category groups analysed in parallel during the focused pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Typography,
    Colors,
    Layout,
    Components,
}

impl FocusArea {
    pub const ALL: [FocusArea; 4] = [
        FocusArea::Typography,
        FocusArea::Colors,
        FocusArea::Layout,
        FocusArea::Components,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusArea::Typography => "typography",
            FocusArea::Colors => "colors",
            FocusArea::Layout => "layout",
            FocusArea::Components => "components",
        }
    }

    pub fn prompt(&self) -> String {
        let focus = match self {
            FocusArea::Typography => {
                "Focus only on typography:\n\
                 - font families, weights and sizes, measured precisely\n\
                 - line-heights and letter-spacing\n\
                 - the typographic hierarchy and scale\n\
                 - alignment and max line width\n\
                 - link and interactive text styles"
            }
            FocusArea::Colors => {
                "Focus only on color:\n\
                 - exact hex/RGB values for every color in use\n\
                 - the full palette and neutral scale\n\
                 - gradients and how colors relate\n\
                 - semantic colors (success, error, warning, info)\n\
                 - contrast ratios and accessibility compliance"
            }
            FocusArea::Layout => {
                "Focus only on layout and spacing:\n\
                 - the grid system and breakpoints\n\
                 - recurring spacing values and rhythm\n\
                 - container widths and responsive behavior\n\
                 - section spacing\n\
                 - padding and margin patterns"
            }
            FocusArea::Components => {
                "Focus only on UI components:\n\
                 - button styles, states and dimensions\n\
                 - form elements and inputs\n\
                 - cards and containers\n\
                 - navigation and header\n\
                 - interactive states and micro-interactions"
            }
        };
        format!("{}\n\nProvide detailed analysis in JSON format.", focus)
    }
}

/// Synthesis request: fold focused findings into the full schema
pub fn synthesis_prompt(focused_json: &str, schema_json: &str) -> String {
    format!(
        r#"Here are focused analyses of this screenshot:

{focused_json}

Combine them into one complete design system that follows this schema:

{schema_json}

Some categories may be missing above or a focused analysis may have failed. Fill every such category by examining the screenshot directly. Keep values consistent across categories and give precise technical specifications."#
    )
}

/// Validation request: self-review of the synthesized analysis
pub fn validation_prompt(analysis_json: &str) -> String {
    format!(
        r#"Review this design system analysis against the screenshot:

{analysis_json}

Check that similar elements are described consistently, that measurements are realistic, and that color values are accurate and complete. Add anything that is missing.

Return the corrected, final design system as JSON."#
    )
}
