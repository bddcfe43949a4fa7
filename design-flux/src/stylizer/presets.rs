//! Style catalogue: built-in presets or a user YAML file

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_YAML: &str = include_str!("../../assets/style_presets.yaml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylePreset {
    pub name: String,
    pub prompt: String,
}

impl StylePreset {
    /// File-name fragment: lowercase, spaces and dashes become underscores
    pub fn safe_name(&self) -> String {
        safe_style_name(&self.name)
    }

    /// Shortened prompt for reports and the gallery
    pub fn short_description(&self) -> String {
        match self.prompt.char_indices().nth(100) {
            Some((idx, _)) => format!("{}...", &self.prompt[..idx]),
            None => self.prompt.clone(),
        }
    }
}

pub fn safe_style_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c if c.is_alphanumeric() || c == '_' => c,
            _ => '_',
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct StyleCatalog {
    presets: Vec<StylePreset>,
}

impl StyleCatalog {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_YAML).context("Built-in style catalogue is malformed")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let presets: Vec<StylePreset> = serde_yaml::from_str(yaml)?;
        if presets.is_empty() {
            bail!("Style catalogue contains no presets");
        }

        let mut owners: HashMap<String, &str> = HashMap::new();
        for preset in &presets {
            if let Some(owner) = owners.insert(preset.safe_name(), &preset.name) {
                bail!(
                    "Styles {:?} and {:?} map to the same file name {:?}",
                    owner,
                    preset.name,
                    preset.safe_name()
                );
            }
        }
        Ok(Self { presets })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read style catalogue: {}", path.display()))?;
        Self::from_yaml(&yaml)
            .with_context(|| format!("Failed to parse style catalogue: {}", path.display()))
    }

    pub fn presets(&self) -> &[StylePreset] {
        &self.presets
    }

    pub fn find(&self, name: &str) -> Option<&StylePreset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Presets for the requested names, in request order; empty request means all
    ///
    /// A name requested twice is selected once.
    pub fn select(&self, names: &[String]) -> Result<Vec<StylePreset>> {
        if names.is_empty() {
            return Ok(self.presets.clone());
        }

        let mut selected: Vec<StylePreset> = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            match self.find(name) {
                Some(preset) if selected.contains(preset) => {}
                Some(preset) => selected.push(preset.clone()),
                None => unknown.push(name.as_str()),
            }
        }
        if !unknown.is_empty() {
            bail!("Unknown style(s): {}", unknown.join(", "));
        }
        Ok(selected)
    }
}
