//! Startup configuration read from the environment (and `.env`)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Capture command used when `SCREENSHOT_COMMAND` is unset
pub const DEFAULT_SCREENSHOT_COMMAND: &str =
    "shot-scraper {url} -o {output} --width {width} --height {height} --scroll {scroll}";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Everything the pipeline needs from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub image_model: String,
    pub replicate_api_token: Option<String>,
    pub style_model: String,
    pub screenshot_width: u32,
    pub screenshot_height: u32,
    pub screenshot_timeout: Duration,
    pub screenshot_command: String,
    pub model_timeout: Duration,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        Ok(Self {
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            image_model: get("IMAGE_MODEL").unwrap_or_else(|| "gpt-image-1".to_string()),
            replicate_api_token: get("REPLICATE_API_TOKEN"),
            style_model: get("STYLE_MODEL")
                .unwrap_or_else(|| "black-forest-labs/flux-kontext-pro".to_string()),
            screenshot_width: parse_number(&get, "SCREENSHOT_WIDTH", 1920)?,
            screenshot_height: parse_number(&get, "SCREENSHOT_HEIGHT", 1080)?,
            screenshot_timeout: Duration::from_millis(parse_number(
                &get,
                "SCREENSHOT_TIMEOUT",
                30_000,
            )?),
            screenshot_command: get("SCREENSHOT_COMMAND")
                .unwrap_or_else(|| DEFAULT_SCREENSHOT_COMMAND.to_string()),
            model_timeout: Duration::from_secs(parse_number(&get, "MODEL_TIMEOUT", 120)?),
        })
    }

    /// Stylizing needs its own credential; checked before any pipeline work
    pub fn require_replicate(&self) -> Result<&str, ConfigError> {
        self.replicate_api_token
            .as_deref()
            .ok_or(ConfigError::Missing("REPLICATE_API_TOKEN"))
    }

    /// Directory capture commands write into, relative to a run's output directory
    pub fn screenshot_dir(&self, output_dir: &std::path::Path) -> PathBuf {
        output_dir.join("screenshots")
    }
}

fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected: "a positive integer",
            value,
        }),
    }
}
