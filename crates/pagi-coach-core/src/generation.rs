//! Generation invoker: one bounded call to an OpenAI-compatible chat completion
//! endpoint (OpenRouter by default).
//!
//! The model never sees raw tool plumbing: callers compose a [`ComposedContext`]
//! first. Any failure (no key, network, timeout, non-success status, empty
//! output) yields [`GENERATION_FALLBACK`]. No retries.

use crate::composer::{AccessibilityMode, ComposedContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const GENERATION_FALLBACK: &str = "Sorry, I'm having trouble answering right now. Please try again in a moment.";

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no language model configured")]
    NotConfigured,

    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation returned no content")]
    Empty,
}

/// Sampling parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<AccessibilityMode> for GenerationParams {
    fn from(mode: AccessibilityMode) -> Self {
        Self {
            temperature: mode.temperature(),
            max_tokens: mode.max_tokens(),
        }
    }
}

/// Chat completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str, params: GenerationParams) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter (or any OpenAI-compatible) chat completion client.
pub struct OpenRouterModel {
    api_key: String,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
    async fn complete(&self, system: &str, user: &str, params: GenerationParams) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://pagi-coach.local")
            .header("X-Title", "PAGI-Coach")
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }

        let parsed: ChatResponse = res.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerationError::Empty)
    }
}

/// Wraps an optional model with the timeout and fallback policy.
#[derive(Clone)]
pub struct GenerationInvoker {
    model: Option<Arc<dyn LanguageModel>>,
    timeout: Duration,
}

impl GenerationInvoker {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self {
            model: Some(model),
            timeout,
        }
    }

    /// No backend: every call returns the fallback.
    pub fn unconfigured() -> Self {
        Self {
            model: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Never fails; see [`try_invoke`](Self::try_invoke) for the error.
    pub async fn invoke(&self, context: &ComposedContext) -> String {
        match self.try_invoke(context).await {
            Ok(text) => text,
            Err(e) => {
                warn!(target: "pagi::coach::generation", error = %e, "generation failed, using fallback text");
                GENERATION_FALLBACK.to_string()
            }
        }
    }

    pub async fn try_invoke(&self, context: &ComposedContext) -> Result<String, GenerationError> {
        let model = self.model.as_ref().ok_or(GenerationError::NotConfigured)?;
        let params = GenerationParams::from(context.mode);
        let system = context.system_prompt();
        let user = context.user_prompt();
        debug!(
            target: "pagi::coach::generation",
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            prompt_chars = system.len() + user.len(),
            "invoking language model"
        );
        let text = tokio::time::timeout(self.timeout, model.complete(&system, &user, params))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }
}
