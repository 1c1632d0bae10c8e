//! LLM backends that turn article text into a tagged insights view.
//!
//! # Architecture
//!
//! - [`ModelInvoker`]: core trait, one article text in, raw model text out
//! - [`OpenAiChat`]: OpenAI-compatible `/chat/completions` backend
//! - [`GeminiChat`]: Google Gemini `generateContent` backend
//! - [`ModelSelector`]: which backend a run uses (CLI-facing)
//! - [`ModelBackend`]: a selector bound to its invoker, produced by
//!   [`Backends::resolve`]
//!
//! Calls are made once; there is no retry or backoff. Pacing against the
//! upstream APIs is the batch scheduler's inter-batch delay.

use crate::error::{ModelError, PipelineError};
use crate::prompts::render_insights_prompt;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Async model interaction.
///
/// Implementors receive the fetched article text, render it into a prompt
/// and return the model's raw answer. The answer is expected, but not
/// guaranteed, to contain `insights`, `thumbnail_snippet` and `title` tags.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send `content` to the model and return its raw text.
    async fn ask(&self, content: &str) -> Result<String, ModelError>;
}

/// The supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelSelector {
    #[value(name = "openai")]
    OpenAi,
    #[value(name = "gemini")]
    Gemini,
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSelector::OpenAi => f.write_str("openai"),
            ModelSelector::Gemini => f.write_str("gemini"),
        }
    }
}

/// A model family bound to the invoker that serves it.
#[derive(Clone)]
pub enum ModelBackend {
    OpenAi(Arc<dyn ModelInvoker>),
    Gemini(Arc<dyn ModelInvoker>),
}

impl ModelBackend {
    pub fn selector(&self) -> ModelSelector {
        match self {
            ModelBackend::OpenAi(_) => ModelSelector::OpenAi,
            ModelBackend::Gemini(_) => ModelSelector::Gemini,
        }
    }

    /// Run the bound invoker on `content`.
    pub async fn invoke(&self, content: &str) -> Result<String, ModelError> {
        match self {
            ModelBackend::OpenAi(invoker) | ModelBackend::Gemini(invoker) => {
                invoker.ask(content).await
            }
        }
    }
}

impl fmt::Debug for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelBackend").field(&self.selector()).finish()
    }
}

/// The invokers available to a run. Either may be absent.
#[derive(Clone, Default)]
pub struct Backends {
    pub openai: Option<Arc<dyn ModelInvoker>>,
    pub gemini: Option<Arc<dyn ModelInvoker>>,
}

impl Backends {
    /// Bind `selector` to its invoker.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MissingBackend`] if no invoker was supplied for the
    /// selected family.
    pub fn resolve(&self, selector: ModelSelector) -> Result<ModelBackend, PipelineError> {
        match selector {
            ModelSelector::OpenAi => self
                .openai
                .clone()
                .map(ModelBackend::OpenAi)
                .ok_or(PipelineError::MissingBackend(selector)),
            ModelSelector::Gemini => self
                .gemini
                .clone()
                .map(ModelBackend::Gemini)
                .ok_or(PipelineError::MissingBackend(selector)),
        }
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("openai", &self.openai.is_some())
            .field("gemini", &self.gemini.is_some())
            .finish()
    }
}

/// Turn a non-2xx response into [`ModelError::Status`].
async fn check_status(backend: &'static str, response: Response) -> Result<Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Status {
        backend,
        status,
        body: truncate_for_log(&body, 300),
    })
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion backend.
///
/// The rendered prompt is sent as a single system message.
pub struct OpenAiChat {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ModelInvoker for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, content: &str) -> Result<String, ModelError> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system",
                content: render_insights_prompt(content),
            }],
        };

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status("openai", response).await?;
        let body: ChatResponse = response.json().await?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(ModelError::EmptyCompletion("openai"))?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Completion received"
        );
        Ok(text)
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

/// Google Gemini `generateContent` backend.
pub struct GeminiChat {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiChat {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl fmt::Debug for GeminiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiChat")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ModelInvoker for GeminiChat {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, content: &str) -> Result<String, ModelError> {
        let t0 = Instant::now();
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(render_insights_prompt(content)),
                }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status("gemini", response).await?;
        let body: GeminiResponse = response.json().await?;

        // Gemini may split one answer across several text parts.
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            warn!("Gemini candidate carried no text");
            return Err(ModelError::EmptyCompletion("gemini"));
        }

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.chars().count(),
            "Completion received"
        );
        Ok(text)
    }
}
