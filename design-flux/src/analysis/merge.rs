//! Merge parsed chunks into the canonical schema
//!
//! Chunks use whatever keys the model chose. Keys that already are canonical
//! category names are taken verbatim; a handful of common aliases are mapped
//! into the matching category's sub-fields. Later chunks win per category.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::schema::{AnalysisResult, Category, CategoryValue};

/// Merge a chunk history into one complete result
///
/// Pure: the same slice always yields the same result.
pub fn merge_chunks(chunks: &[Value]) -> AnalysisResult {
    let mut merged: BTreeMap<Category, CategoryValue> = BTreeMap::new();

    for chunk in chunks {
        let Some(obj) = chunk.as_object() else {
            continue;
        };

        for (key, value) in obj {
            if let Some(category) = Category::from_name(key) {
                merged.insert(category, CategoryValue::from_value(value.clone()));
            }
        }

        for (category, value) in map_aliases(obj) {
            merged.insert(category, CategoryValue::Map(value));
        }
    }

    AnalysisResult::from_partial(merged)
}

fn map_aliases(chunk: &Map<String, Value>) -> Vec<(Category, Map<String, Value>)> {
    let mut mapped = Vec::new();

    if let Some(typography) = chunk.get("typography") {
        mapped.push((Category::Typography, map_typography(typography)));
    }
    if chunk.contains_key("colorPalette") || chunk.contains_key("primary") {
        mapped.push((Category::ColorContrast, map_colors(chunk)));
    }
    if chunk.contains_key("gridSystem") || chunk.contains_key("spacingPatterns") {
        mapped.push((Category::LayoutGrid, map_layout(chunk)));
    }
    if let Some(buttons) = chunk.get("buttonStyles") {
        mapped.push((Category::Buttons, map_buttons(buttons)));
    }
    if let Some(forms) = chunk.get("formElements") {
        mapped.push((Category::Forms, as_map(forms)));
    }
    if let Some(cards) = chunk.get("cardDesigns") {
        mapped.push((Category::Cards, as_map(cards)));
    }

    mapped
}

fn map_typography(typography: &Value) -> Map<String, Value> {
    let c = Category::Typography;
    let weights = match typography.get("fontWeights") {
        Some(Value::Object(weights)) => Value::Array(weights.values().cloned().collect()),
        Some(Value::Array(weights)) => Value::Array(weights.clone()),
        _ => json!([]),
    };

    let mut out = Map::new();
    out.insert(
        c.field(0).into(),
        or_default(typography.get("fontFamilies"), json!(["Not specified"])),
    );
    out.insert(c.field(1).into(), weights);
    out.insert(c.field(2).into(), or_default(typography.get("fontSizes"), json!({})));
    out.insert(c.field(4).into(), or_default(typography.get("lineHeights"), json!({})));
    out.insert(c.field(5).into(), or_default(typography.get("letterSpacing"), json!({})));
    out
}

fn map_colors(chunk: &Map<String, Value>) -> Map<String, Value> {
    let c = Category::ColorContrast;
    let palette = chunk
        .get("colorPalette")
        .and_then(Value::as_object)
        .unwrap_or(chunk);
    let gradients = chunk
        .get("gradients")
        .or_else(|| palette.get("gradients"))
        .cloned()
        .unwrap_or_else(|| json!([]));

    let mut out = Map::new();
    out.insert(c.field(0).into(), or_default(palette.get("primary"), json!({})));
    out.insert(c.field(1).into(), or_default(palette.get("neutral"), json!({})));
    out.insert(c.field(2).into(), or_default(palette.get("semantic"), json!({})));
    out.insert(c.field(3).into(), gradients);
    out
}

fn map_layout(chunk: &Map<String, Value>) -> Map<String, Value> {
    let c = Category::LayoutGrid;
    let grid = chunk.get("gridSystem");
    let columns = grid
        .and_then(|g| g.get("columns"))
        .map(display)
        .unwrap_or_else(|| "12".to_string());
    let gutters = grid
        .and_then(|g| g.get("gutters"))
        .map(display)
        .unwrap_or_else(|| "default".to_string());

    let mut out = Map::new();
    out.insert(
        c.field(0).into(),
        or_default(
            chunk.get("containerWidths").and_then(|w| w.get("extraLarge")),
            json!("Not specified"),
        ),
    );
    out.insert(
        c.field(1).into(),
        json!(format!("{} columns, {} gutters", columns, gutters)),
    );
    out.insert(
        c.field(2).into(),
        or_default(grid.and_then(|g| g.get("breakpoints")), json!({})),
    );
    out.insert(
        c.field(3).into(),
        or_default(
            chunk.get("spacingPatterns").and_then(|s| s.get("baseUnit")),
            json!("8px"),
        ),
    );
    out
}

fn map_buttons(buttons: &Value) -> Map<String, Value> {
    let c = Category::Buttons;
    let primary = buttons.get("primaryButton");
    let attr = |name: &str| {
        primary
            .and_then(|p| p.get(name))
            .map(display)
            .unwrap_or_else(|| "default".to_string())
    };

    let mut out = Map::new();
    out.insert(c.field(0).into(), buttons.clone());
    out.insert(
        c.field(1).into(),
        json!(format!("Padding: {}, Radius: {}", attr("padding"), attr("borderRadius"))),
    );
    out.insert(
        c.field(2).into(),
        json!(format!("Size: {}, Weight: {}", attr("fontSize"), attr("fontWeight"))),
    );
    out.insert(
        c.field(3).into(),
        or_default(primary.and_then(|p| p.get("hoverState")), json!({})),
    );
    out
}

fn as_map(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("details".to_string(), other.clone());
            map
        }
    }
}

fn or_default(value: Option<&Value>, default: Value) -> Value {
    value.cloned().unwrap_or(default)
}

/// Strings without quotes, everything else as JSON text
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
