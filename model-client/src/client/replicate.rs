//! Replicate predictions client for style transfer

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{read_json, StyleModel};
use crate::error::{ModelError, Result};
use crate::types::{StyleOutput, StyleRequest};

const SERVICE: &str = "replicate";

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: String,
    pub base_url: String,
    /// `owner/name` of the style-transfer model
    pub model: String,
    pub timeout: Duration,
    /// Delay between status polls when `Prefer: wait` returns early
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl ReplicateConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: "https://api.replicate.com/v1".to_string(),
            model: "black-forest-labs/flux-kontext-pro".to_string(),
            timeout: Duration::from_secs(180),
            poll_interval: Duration::from_secs(2),
            max_polls: 90,
        }
    }
}

pub struct ReplicateClient {
    client: reqwest::Client,
    config: ReplicateConfig,
}

/// Lifecycle of a prediction as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PredictionStatus {
    Pending,
    Succeeded,
    Failed,
}

pub(crate) fn prediction_status(prediction: &Value) -> PredictionStatus {
    match prediction.get("status").and_then(Value::as_str) {
        Some("succeeded") => PredictionStatus::Succeeded,
        Some("failed") | Some("canceled") => PredictionStatus::Failed,
        _ => PredictionStatus::Pending,
    }
}

pub(crate) fn prediction_input(request: &StyleRequest) -> Value {
    let mut input = json!({
        "prompt": request.prompt,
        "input_image": request.image.to_data_url(),
        "aspect_ratio": request.aspect_ratio,
        "output_format": request.output_format,
    });
    if let Some(seed) = request.seed {
        input["seed"] = json!(seed);
    }
    json!({ "input": input })
}

fn prediction_error(prediction: &Value) -> ModelError {
    let message = prediction
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("prediction failed without an error message");
    ModelError::unexpected(SERVICE, message)
}

impl ReplicateClient {
    pub fn new(config: ReplicateConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(ModelError::Config("Replicate API token is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn seconds(&self) -> u64 {
        self.config.timeout.as_secs()
    }

    async fn poll(&self, mut prediction: Value) -> Result<Value> {
        for attempt in 0..self.config.max_polls {
            match prediction_status(&prediction) {
                PredictionStatus::Succeeded => return Ok(prediction),
                PredictionStatus::Failed => return Err(prediction_error(&prediction)),
                PredictionStatus::Pending => {}
            }

            let get_url = prediction
                .pointer("/urls/get")
                .and_then(Value::as_str)
                .ok_or_else(|| ModelError::unexpected(SERVICE, "prediction has no urls.get"))?
                .to_string();

            debug!(attempt, "prediction pending, polling");
            tokio::time::sleep(self.config.poll_interval).await;

            let response = self
                .client
                .get(&get_url)
                .bearer_auth(&self.config.api_token)
                .send()
                .await
                .map_err(|e| ModelError::from_reqwest(SERVICE, self.seconds(), e))?;
            prediction = read_json(SERVICE, self.seconds(), response).await?;
        }

        warn!(max_polls = self.config.max_polls, "prediction never finished");
        Err(ModelError::Timeout {
            service: SERVICE,
            seconds: self.config.poll_interval.as_secs() * u64::from(self.config.max_polls),
        })
    }
}

#[async_trait]
impl StyleModel for ReplicateClient {
    async fn stylize(&self, request: StyleRequest) -> Result<StyleOutput> {
        let url = format!(
            "{}/models/{}/predictions",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        debug!(model = %self.config.model, seed = ?request.seed, "creating prediction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .header("Prefer", "wait")
            .json(&prediction_input(&request))
            .send()
            .await
            .map_err(|e| ModelError::from_reqwest(SERVICE, self.seconds(), e))?;

        let prediction = read_json(SERVICE, self.seconds(), response).await?;
        let finished = self.poll(prediction).await?;

        let output = finished.get("output").unwrap_or(&Value::Null);
        StyleOutput::from_json(output)
    }
}
