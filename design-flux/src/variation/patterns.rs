//! The four fixed layout strategies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PatternId {
    #[serde(rename = "1")]
    HeroFirst,
    #[serde(rename = "2")]
    FeatureGrid,
    #[serde(rename = "3")]
    ContentHeavy,
    #[serde(rename = "4")]
    ConversionOptimized,
}

impl PatternId {
    pub const ALL: [PatternId; 4] = [
        PatternId::HeroFirst,
        PatternId::FeatureGrid,
        PatternId::ContentHeavy,
        PatternId::ConversionOptimized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::HeroFirst => "1",
            PatternId::FeatureGrid => "2",
            PatternId::ContentHeavy => "3",
            PatternId::ConversionOptimized => "4",
        }
    }

    /// Key used in packages and file names, e.g. `variation_2`
    pub fn variation_key(&self) -> String {
        format!("variation_{}", self.as_str())
    }

    pub fn pattern(&self) -> &'static Pattern {
        match self {
            PatternId::HeroFirst => &HERO_FIRST,
            PatternId::FeatureGrid => &FEATURE_GRID,
            PatternId::ContentHeavy => &CONTENT_HEAVY,
            PatternId::ConversionOptimized => &CONVERSION_OPTIMIZED,
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(PatternId::HeroFirst),
            "2" => Ok(PatternId::FeatureGrid),
            "3" => Ok(PatternId::ContentHeavy),
            "4" => Ok(PatternId::ConversionOptimized),
            other => Err(format!("Unknown pattern '{}' (expected 1-4)", other)),
        }
    }
}

/// Which patterns a run generates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSelector {
    One(PatternId),
    All,
}

impl PatternSelector {
    pub fn patterns(&self) -> Vec<PatternId> {
        match self {
            PatternSelector::One(id) => vec![*id],
            PatternSelector::All => PatternId::ALL.to_vec(),
        }
    }
}

impl fmt::Display for PatternSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSelector::One(id) => write!(f, "{}", id),
            PatternSelector::All => f.write_str("all"),
        }
    }
}

impl FromStr for PatternSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(PatternSelector::All)
        } else {
            s.parse().map(PatternSelector::One)
        }
    }
}

#[derive(Debug)]
pub struct Pattern {
    pub id: PatternId,
    pub name: &'static str,
    pub description: &'static str,
    pub layout_strategy: &'static str,
    /// Required structural changes, in priority order
    pub key_changes: &'static [&'static str],
    pub expected_improvements: &'static [&'static str],
}

pub static HERO_FIRST: Pattern = Pattern {
    id: PatternId::HeroFirst,
    name: "Hero-First Layout",
    description: "Prominent hero section with clear CTA, minimal navigation",
    layout_strategy: "hero_dominant",
    key_changes: &[
        "Large hero section (60% of viewport)",
        "Single primary CTA button",
        "Minimal navigation menu",
        "Social proof below hero",
    ],
    expected_improvements: &[
        "Higher conversion rates from clear CTA",
        "Reduced bounce rate from focused messaging",
        "Better mobile experience",
    ],
};

pub static FEATURE_GRID: Pattern = Pattern {
    id: PatternId::FeatureGrid,
    name: "Feature-Grid Layout",
    description: "Grid-based feature showcase with multiple CTAs",
    layout_strategy: "feature_grid",
    key_changes: &[
        "3-column feature grid",
        "Multiple CTA buttons",
        "Tabbed navigation",
        "Testimonials sidebar",
    ],
    expected_improvements: &[
        "Increased feature discovery",
        "Higher engagement with multiple CTAs",
        "Better for complex products",
    ],
};

pub static CONTENT_HEAVY: Pattern = Pattern {
    id: PatternId::ContentHeavy,
    name: "Content-Heavy Layout",
    description: "Information-rich design with detailed explanations",
    layout_strategy: "content_rich",
    key_changes: &[
        "Detailed product descriptions",
        "FAQ section prominent",
        "Multiple content blocks",
        "Secondary navigation",
    ],
    expected_improvements: &[
        "Improved user education",
        "Higher qualified leads",
        "Better for B2B conversions",
    ],
};

pub static CONVERSION_OPTIMIZED: Pattern = Pattern {
    id: PatternId::ConversionOptimized,
    name: "Conversion-Optimized Layout",
    description: "Focused on conversion with urgency and social proof",
    layout_strategy: "conversion_focused",
    key_changes: &[
        "Urgency indicators (limited time)",
        "Social proof badges",
        "Sticky CTA button",
        "Minimal distractions",
    ],
    expected_improvements: &[
        "Urgency-driven conversions",
        "Social proof validation",
        "Reduced decision friction",
    ],
};
