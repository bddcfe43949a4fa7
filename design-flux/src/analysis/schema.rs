//! Canonical design-system schema
//!
//! Every [`AnalysisResult`] covers exactly the categories listed in
//! [`Category::ALL`]; categories the model never described carry
//! [`CategoryValue::Unavailable`] and serialize as a placeholder sentence.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Design categories, in schema order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Typography")]
    Typography,
    #[serde(rename = "Color & Contrast")]
    ColorContrast,
    #[serde(rename = "Layout & Grid System")]
    LayoutGrid,
    #[serde(rename = "Spacing & Sizing Tokens")]
    SpacingTokens,
    #[serde(rename = "Imagery")]
    Imagery,
    #[serde(rename = "Illustration & Iconography")]
    Iconography,
    #[serde(rename = "Logo Usage")]
    LogoUsage,
    #[serde(rename = "Buttons & Calls-to-Action")]
    Buttons,
    #[serde(rename = "Form & Input Styling")]
    Forms,
    #[serde(rename = "Navigation & Header")]
    Navigation,
    #[serde(rename = "Cards / Panels / Containers")]
    Cards,
    #[serde(rename = "Shadows & Elevation")]
    Shadows,
    #[serde(rename = "Borders & Dividers")]
    Borders,
    #[serde(rename = "Motion & Animation")]
    Motion,
    #[serde(rename = "Micro-Interactions")]
    MicroInteractions,
    #[serde(rename = "Media Blocks (Video / Audio / 3-D)")]
    MediaBlocks,
    #[serde(rename = "Backgrounds")]
    Backgrounds,
    #[serde(rename = "Dark-Mode / High-Contrast Variants")]
    DarkMode,
    #[serde(rename = "Accessibility Visuals")]
    Accessibility,
    #[serde(rename = "Data-Viz & Infographics")]
    DataViz,
    #[serde(rename = "Cursors & Pointer States")]
    Cursors,
    #[serde(rename = "Tone & Mood Descriptors")]
    ToneMood,
    #[serde(rename = "Reusable Brand Motifs")]
    BrandMotifs,
    #[serde(rename = "Favicons & Social Preview Assets")]
    Favicons,
}

impl Category {
    pub const ALL: [Category; 24] = [
        Category::Typography,
        Category::ColorContrast,
        Category::LayoutGrid,
        Category::SpacingTokens,
        Category::Imagery,
        Category::Iconography,
        Category::LogoUsage,
        Category::Buttons,
        Category::Forms,
        Category::Navigation,
        Category::Cards,
        Category::Shadows,
        Category::Borders,
        Category::Motion,
        Category::MicroInteractions,
        Category::MediaBlocks,
        Category::Backgrounds,
        Category::DarkMode,
        Category::Accessibility,
        Category::DataViz,
        Category::Cursors,
        Category::ToneMood,
        Category::BrandMotifs,
        Category::Favicons,
    ];

    /// Canonical key used in prompts and persisted documents
    pub fn name(&self) -> &'static str {
        match self {
            Category::Typography => "Typography",
            Category::ColorContrast => "Color & Contrast",
            Category::LayoutGrid => "Layout & Grid System",
            Category::SpacingTokens => "Spacing & Sizing Tokens",
            Category::Imagery => "Imagery",
            Category::Iconography => "Illustration & Iconography",
            Category::LogoUsage => "Logo Usage",
            Category::Buttons => "Buttons & Calls-to-Action",
            Category::Forms => "Form & Input Styling",
            Category::Navigation => "Navigation & Header",
            Category::Cards => "Cards / Panels / Containers",
            Category::Shadows => "Shadows & Elevation",
            Category::Borders => "Borders & Dividers",
            Category::Motion => "Motion & Animation",
            Category::MicroInteractions => "Micro-Interactions",
            Category::MediaBlocks => "Media Blocks (Video / Audio / 3-D)",
            Category::Backgrounds => "Backgrounds",
            Category::DarkMode => "Dark-Mode / High-Contrast Variants",
            Category::Accessibility => "Accessibility Visuals",
            Category::DataViz => "Data-Viz & Infographics",
            Category::Cursors => "Cursors & Pointer States",
            Category::ToneMood => "Tone & Mood Descriptors",
            Category::BrandMotifs => "Reusable Brand Motifs",
            Category::Favicons => "Favicons & Social Preview Assets",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.name() == name)
    }

    /// Sub-fields the model is asked to describe for this category
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Category::Typography => &[
                "Primary, secondary & fallback font families (web-safe or web-hosted)",
                "Weight spectrum to use (e.g., 300, 400, 600, 700)",
                "Heading sizes (H1-H6) with exact px/rem values",
                "Body, sub-body, caption, and micro-copy sizes",
                "Line-height & paragraph spacing rules",
                "Letter-spacing / tracking values by text role",
                "Case usage rules (Title Case, ALL CAPS, small-caps)",
                "Text alignment preferences & max character/line width",
                "Link, hover, visited & focus styles (color, underline, animation)",
                "Font-smoothing / antialiasing guidance (e.g., -webkit-font-smoothing)",
            ],
            Category::ColorContrast => &[
                "Brand primaries, secondaries, accents (hex/RGB/HSL)",
                "Neutral/gray scale set",
                "Success, warning, error, info colors",
                "Gradient definitions (angle, stops)",
                "Overlay & scrim tints (opacity levels)",
                "Minimum contrast ratios and WCAG targets",
            ],
            Category::LayoutGrid => &[
                "Maximum content width / full-bleed rules",
                "Column count, gutter width, and margin specs",
                "Responsive breakpoints & how the grid adapts",
                "Vertical rhythm unit (e.g., 4 px or 8 px scale)",
                "Section spacing above/below (hero, feature blocks, footer, etc.)",
            ],
            Category::SpacingTokens => &[
                "Base spacing unit & multiplier scale (e.g., 4-pt, 8-pt)",
                "Standard padding/margin tiers (XS-XL)",
                "Corner-radius scale (buttons, cards, inputs, images)",
            ],
            Category::Imagery => &[
                "Hero image style (photo, illustration, 3-D render)",
                "Subject-matter guidelines & mood (e.g., people-centric, product-focused)",
                "Color treatment (duotone, desaturation, overlays)",
                "Acceptable aspect ratios & cropping rules",
                "Minimum resolution/DPI & file formats (AVIF, WebP, SVG)",
                "Allowed/no-go visual cliches or stock tropes",
                "Watermark or logo overlay rules",
            ],
            Category::Iconography => &[
                "Illustration style (flat, outline, skeuomorphic, 3-D, isometric)",
                "Line weight range & corner radius for icons",
                "Filled vs outlined icon usage rules",
                "Icon grid size & padding (e.g., keyed to 24 px)",
                "Animation/hover behavior for icons (spin, color shift, none)",
            ],
            Category::LogoUsage => &[
                "Color variants (full-color, mono-light, mono-dark)",
                "Minimum size & clear-space requirements",
                "Preferred placement(s) on desktop & mobile",
                "Backgrounds the logo may/ may not sit on",
            ],
            Category::Buttons => &[
                "Primary, secondary, tertiary button styles",
                "Padding, min-width & height, corner radius",
                "Text style (size, weight, letter-spacing)",
                "State styles: default, hover, active, focus, disabled",
                "Shadow/elevation or border usage rules",
                "Icon-in-button conventions",
            ],
            Category::Forms => &[
                "Field height & internal padding",
                "Border shape (radius, stroke, or none)",
                "Label, helper text & placeholder typography",
                "Focus, hover, error & success states (border, shadow, icon)",
                "Checkbox, radio & switch visual design",
            ],
            Category::Navigation => &[
                "Desktop vs mobile navbar height & padding",
                "Link spacing & separator rules",
                "Hover/active indicators (underline, highlight, color)",
                "Sticky or scroll-hide/show behavior styling",
                "Burger-menu icon style & animation",
            ],
            Category::Cards => &[
                "Default background (solid, translucent, glass, gradient)",
                "Border, radius & shadow tiers (e.g., card-1, card-2)",
                "Internal padding and media / text alignment",
            ],
            Category::Shadows => &[
                "Layer naming (e.g., Elevation 1-5)",
                "X/Y offset, blur, spread & color opacity per tier",
                "When to swap shadows for borders in dark mode",
            ],
            Category::Borders => &[
                "Standard stroke widths & styles (solid, dashed)",
                "Divider thickness & color",
                "Inset vs outset rules",
            ],
            Category::Motion => &[
                "Primary easing curves (e.g., cubic-bezier)",
                "Duration bands (very-fast <150 ms, normal 200-400 ms, slow >600 ms)",
                "Preferred motion directions (fade-in up, scale-in, etc.)",
                "Scroll-triggered reveal behavior specs",
                "Reduced-motion fallbacks and when to disable animation",
            ],
            Category::MicroInteractions => &[
                "Button tap ripple or scale effect",
                "Form field shake on error vs color change",
                "Tooltip styling & animation",
                "Loading spinners / skeleton screens style",
            ],
            Category::MediaBlocks => &[
                "Aspect ratio & max width rules",
                "Autoplay, loop, mute defaults & overlay icon style",
                "Poster frame treatment (gradient overlay, play button)",
                "Player control skin (minimal, brand colors)",
            ],
            Category::Backgrounds => &[
                "Solid vs gradient vs pattern hierarchy",
                "Texture use (noise, grain) & opacity limits",
                "Parallax or fixed attachment behavior",
            ],
            Category::DarkMode => &[
                "Token swaps for colors, shadows, borders",
                "Image/illustration adaptations (tinted, inverted)",
                "Focus ring color adjustments",
            ],
            Category::Accessibility => &[
                "Focus indicator thickness & color",
                "Link underline rules for color-blind safety",
                "High-contrast palette mapping",
            ],
            Category::DataViz => &[
                "Chart color palette & order",
                "Gridline weight & opacity",
                "Label typography & number formatting rules",
            ],
            Category::Cursors => &[
                "Cursor override for draggable, clickable, custom hover",
                "Pointer animation (subtle grow, color pulse)",
            ],
            Category::ToneMood => &[
                "Three-to-five adjectives defining the visual vibe (e.g., 'clean, approachable, tech-forward')",
                "Emotional goals (trust, excitement, calm)",
            ],
            Category::BrandMotifs => &[
                "Shapes, lines, or patterns (e.g., angled lines at 30 degrees, dotted wave)",
                "Frequency & placement guidance",
            ],
            Category::Favicons => &[
                "Favicon shapes, background transparency rules",
                "Open Graph / social card imagery style & typography",
            ],
        }
    }

    /// Sub-field description by position
    pub fn field(&self, index: usize) -> &'static str {
        self.fields().get(index).copied().unwrap_or("Details")
    }

    /// Text stored for a category the analysis never described
    pub fn placeholder(&self) -> String {
        format!("Analysis not available for {} category", self.name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Category -> sub-field descriptions, rendered into prompts
pub fn schema_template() -> Value {
    let mut template = Map::new();
    for category in Category::ALL {
        let fields = category
            .fields()
            .iter()
            .map(|f| Value::String(f.to_string()))
            .collect();
        template.insert(category.name().to_string(), Value::Array(fields));
    }
    Value::Object(template)
}

/// Pretty JSON form of [`schema_template`]
pub fn schema_json() -> String {
    serde_json::to_string_pretty(&schema_template()).unwrap_or_else(|_| "{}".to_string())
}

// ============================================================================
// Values
// ============================================================================

/// What the analysis knows about one category
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryValue {
    Unavailable,
    /// Free-form string, number or boolean
    Scalar(Value),
    List(Vec<Value>),
    Map(Map<String, Value>),
}

impl CategoryValue {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => CategoryValue::Unavailable,
            Value::Array(items) => CategoryValue::List(items),
            Value::Object(map) => CategoryValue::Map(map),
            scalar => CategoryValue::Scalar(scalar),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, CategoryValue::Unavailable)
    }

    pub fn to_value(&self, category: Category) -> Value {
        match self {
            CategoryValue::Unavailable => Value::String(category.placeholder()),
            CategoryValue::Scalar(value) => value.clone(),
            CategoryValue::List(items) => Value::Array(items.clone()),
            CategoryValue::Map(map) => Value::Object(map.clone()),
        }
    }
}

/// A complete analysis: one value per canonical category
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    categories: BTreeMap<Category, CategoryValue>,
}

impl AnalysisResult {
    /// Every category unavailable
    pub fn empty() -> Self {
        Self::from_partial(BTreeMap::new())
    }

    /// Fill any category missing from `partial` with [`CategoryValue::Unavailable`]
    pub fn from_partial(mut partial: BTreeMap<Category, CategoryValue>) -> Self {
        for category in Category::ALL {
            partial.entry(category).or_insert(CategoryValue::Unavailable);
        }
        Self { categories: partial }
    }

    pub fn get(&self, category: Category) -> &CategoryValue {
        // from_partial guarantees presence
        self.categories
            .get(&category)
            .unwrap_or(&CategoryValue::Unavailable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryValue)> {
        self.categories.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn available(&self) -> Vec<Category> {
        self.iter()
            .filter(|(_, v)| v.is_available())
            .map(|(c, _)| c)
            .collect()
    }

    pub fn to_json(&self) -> Value {
        let map = self
            .iter()
            .map(|(category, value)| (category.name().to_string(), value.to_value(category)))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, value) in self.iter() {
            map.serialize_entry(category.name(), &value.to_value(category))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnalysisResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultVisitor;

        impl<'de> Visitor<'de> for ResultVisitor {
            type Value = AnalysisResult;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of design categories")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AnalysisResult, A::Error> {
                let mut partial = BTreeMap::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    let Some(category) = Category::from_name(&key) else {
                        continue;
                    };
                    let value = match value {
                        Value::String(ref s) if *s == category.placeholder() => {
                            CategoryValue::Unavailable
                        }
                        other => CategoryValue::from_value(other),
                    };
                    partial.insert(category, value);
                }
                Ok(AnalysisResult::from_partial(partial))
            }
        }

        deserializer.deserialize_map(ResultVisitor)
    }
}
