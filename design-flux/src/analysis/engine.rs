//! Analysis engine: drives a vision model through one of three modes
//!
//! ```text
//! SingleStage   schema prompt ───────────────────────────────► parse ► merge
//! MultiStage    focused x4 (concurrent) ► synthesis ► validation ► parse ► merge
//! Custom        caller prompt ───────────────────────────────► parse ► merge
//! ```
//!
//! One engine is one session. Fenced chunks from every call accumulate in
//! the session, each successful fenced merge is remembered, and a later
//! failure returns that remembered merge instead of an error.

use futures::future::join_all;
use model_client::{ChatRequest, ImageDetail, ImageInput, ModelError, VisionModel};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use design_flux_sdk::{log_debug, log_warning};

use super::merge::merge_chunks;
use super::parser::{parse_response, ParseError, ParsedResponse};
use super::prompts::{self, FocusArea, SYSTEM_PROMPT};
use super::schema::{schema_json, AnalysisResult};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Vision analysis failed during {stage}: {source}")]
    Model {
        stage: &'static str,
        #[source]
        source: ModelError,
    },

    #[error("Vision analysis failed during {stage}: {source}")]
    Parse {
        stage: &'static str,
        #[source]
        source: ParseError,
    },
}

impl AnalysisError {
    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::Model { stage, .. } | AnalysisError::Parse { stage, .. } => stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    /// One call with the full schema
    SingleStage,
    /// Focused pass, synthesis, validation
    MultiStage,
    /// Caller-supplied prompt, same parsing and recovery
    Custom(String),
}

impl AnalysisMode {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::SingleStage => "single_stage",
            AnalysisMode::MultiStage => "multi_stage",
            AnalysisMode::Custom(_) => "custom",
        }
    }
}

/// Sampling parameters for one call
#[derive(Debug, Clone, Copy)]
struct CallParams {
    stage: &'static str,
    max_tokens: u32,
    temperature: f32,
}

const SINGLE: CallParams = CallParams { stage: "single-stage analysis", max_tokens: 4000, temperature: 0.0 };
const CUSTOM: CallParams = CallParams { stage: "custom analysis", max_tokens: 4000, temperature: 0.0 };
const FOCUSED: CallParams = CallParams { stage: "focused analysis", max_tokens: 1500, temperature: 0.1 };
const SYNTHESIS: CallParams = CallParams { stage: "synthesis", max_tokens: 4000, temperature: 0.1 };
const VALIDATION: CallParams = CallParams { stage: "validation", max_tokens: 4000, temperature: 0.1 };

pub struct AnalysisEngine {
    model: Arc<dyn VisionModel>,
    /// Every fenced chunk parsed in this session, in arrival order
    chunks: Vec<Value>,
    last_successful_merge: Option<AnalysisResult>,
}

impl AnalysisEngine {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            chunks: Vec::new(),
            last_successful_merge: None,
        }
    }

    pub fn chunk_history(&self) -> &[Value] {
        &self.chunks
    }

    pub fn last_successful_merge(&self) -> Option<&AnalysisResult> {
        self.last_successful_merge.as_ref()
    }

    /// Analyze one image
    ///
    /// On failure, falls back to the last successful merge of this session;
    /// only a session with no prior merge reports the error.
    pub async fn analyze(
        &mut self,
        image: &ImageInput,
        mode: &AnalysisMode,
    ) -> Result<AnalysisResult, AnalysisError> {
        let outcome = match mode {
            AnalysisMode::SingleStage => {
                let prompt = prompts::analysis_prompt(&schema_json());
                self.run_call(image, prompt, SINGLE).await
            }
            AnalysisMode::MultiStage => self.run_multi_stage(image).await,
            AnalysisMode::Custom(prompt) => self.run_call(image, prompt.clone(), CUSTOM).await,
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(err) => match &self.last_successful_merge {
                Some(previous) => {
                    log_warning!("Using last successful merge after {}", err);
                    Ok(previous.clone())
                }
                None => Err(err),
            },
        }
    }

    async fn run_multi_stage(&mut self, image: &ImageInput) -> Result<AnalysisResult, AnalysisError> {
        let focused = self.run_focused(image).await;

        let focused_json = serde_json::to_string_pretty(&focused).unwrap_or_else(|_| "{}".to_string());
        let synthesized = self
            .run_call(image, prompts::synthesis_prompt(&focused_json, &schema_json()), SYNTHESIS)
            .await?;

        let analysis_json =
            serde_json::to_string_pretty(&synthesized).unwrap_or_else(|_| "{}".to_string());
        self.run_call(image, prompts::validation_prompt(&analysis_json), VALIDATION)
            .await
    }

    /// Focused calls run concurrently; parsing happens after all resolve
    async fn run_focused(&mut self, image: &ImageInput) -> BTreeMap<FocusArea, Value> {
        let calls = FocusArea::ALL.map(|area| {
            let request = request(image, area.prompt(), FOCUSED);
            let model = self.model.clone();
            async move { (area, model.complete(request).await) }
        });
        let responses = join_all(calls).await;

        let mut focused = BTreeMap::new();
        for (area, response) in responses {
            let parsed = match response {
                Ok(text) => parse_response(&text),
                Err(err) => {
                    log_warning!("Failed to analyze {}: {}", area.as_str(), err);
                    continue;
                }
            };

            match parsed {
                Ok(ParsedResponse::Fenced(chunks)) => {
                    self.absorb(chunks.clone());
                    focused.insert(area, ParsedResponse::Fenced(chunks).into_value());
                }
                Ok(raw) => {
                    focused.insert(area, raw.into_value());
                }
                Err(err) => log_warning!("Failed to parse {} analysis: {}", area.as_str(), err),
            }
        }

        log_debug!("Focused pass produced {}/4 analyses", focused.len());
        focused
    }

    async fn run_call(
        &mut self,
        image: &ImageInput,
        prompt: String,
        params: CallParams,
    ) -> Result<AnalysisResult, AnalysisError> {
        let text = self
            .model
            .complete(request(image, prompt, params))
            .await
            .map_err(|source| AnalysisError::Model {
                stage: params.stage,
                source,
            })?;

        self.interpret(&text).map_err(|source| AnalysisError::Parse {
            stage: params.stage,
            source,
        })
    }

    /// Turn one response into a complete result
    fn interpret(&mut self, text: &str) -> Result<AnalysisResult, ParseError> {
        match parse_response(text)? {
            ParsedResponse::Fenced(chunks) => Ok(self.absorb(chunks)),
            // Unfenced output is normalized but stays out of the session history
            ParsedResponse::Raw(value) => Ok(merge_chunks(std::slice::from_ref(&value))),
        }
    }

    /// Append chunks to the session and re-merge the whole history
    fn absorb(&mut self, chunks: Vec<Value>) -> AnalysisResult {
        let count = chunks.len();
        self.chunks.extend(chunks);
        let merged = merge_chunks(&self.chunks);
        log_debug!(
            "Merged {} new chunks ({} in session)",
            count,
            self.chunks.len()
        );
        self.last_successful_merge = Some(merged.clone());
        merged
    }
}

fn request(image: &ImageInput, prompt: String, params: CallParams) -> ChatRequest {
    ChatRequest::new(SYSTEM_PROMPT)
        .text(prompt)
        .image(image.clone(), ImageDetail::High)
        .max_tokens(params.max_tokens)
        .temperature(params.temperature)
}
