use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{error::SummaryError, http::HttpBackend};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "mistral";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

static SUMMARY_PROMPT: &str = "Summarize in few key takeaways the transcript TEXT below. \
Format it with title, section headers and points within the section.";

/// Build the summarization prompt for a transcript
pub fn build_summary_prompt(transcript: &str) -> String {
    format!("{}\n\nTEXT:\n{}", SUMMARY_PROMPT, transcript)
}

/// Turns transcript text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummaryError>;
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl OllamaConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_MODEL)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaSummarizer {
    config: OllamaConfig,
    backend: Arc<dyn HttpBackend>,
}

impl OllamaSummarizer {
    pub fn new(config: OllamaConfig, backend: Arc<dyn HttpBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummaryError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "prompt": build_summary_prompt(transcript),
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
            },
        });

        debug!(model = %self.config.model, url = %url, "requesting summary");
        let response = self.backend.post_json(&url, &body).await?;

        if !response.is_success() {
            return Err(SummaryError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let generated: GenerateResponse = serde_json::from_str(&response.body)
            .map_err(|e| SummaryError::InvalidResponse(format!("{e}: {}", response.body)))?;

        if generated.response.trim().is_empty() {
            return Err(SummaryError::Empty);
        }

        Ok(generated.response)
    }
}
