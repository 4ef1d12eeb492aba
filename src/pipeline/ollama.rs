//! Ollama HTTP client for local model inference.
//!
//! The generation service is a singleton shared resource per model: the
//! pipeline only ever generates against it, lists its installed models for
//! the preflight check, and unloads a model to recover from a wedged
//! backend. The HTTP client carries no request timeout on purpose; the
//! cooperative watchdog in [`crate::pipeline::invoker`] owns timeouts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DecodingOptions;
use crate::pipeline::PipelineError;

/// Connect timeout for the local Ollama socket.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Text-generation capability consumed by the pipeline.
pub trait LlmClient: Send + Sync {
    /// One blocking generation call. May block arbitrarily long; may fail on
    /// transport errors; may return an empty string, which callers must
    /// treat as a failed attempt rather than a timeout.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, PipelineError>;

    /// Names of the models installed on the instance.
    fn list_models(&self) -> Result<Vec<String>, PipelineError>;

    /// Ask the service to unload `model`, releasing a wedged backend.
    fn unload(&self, model: &str) -> Result<(), PipelineError>;

    fn is_model_available(&self, model: &str) -> Result<bool, PipelineError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m == model || m.starts_with(model)))
    }
}

// ═══════════════════════════════════════════════════════════
// OllamaClient
// ═══════════════════════════════════════════════════════════

pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    decoding: DecodingOptions,
}

impl OllamaClient {
    pub fn new(base_url: &str, decoding: DecodingOptions) -> Self {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            decoding,
        }
    }

    /// Default Ollama instance at localhost:11434.
    pub fn default_local() -> Self {
        Self::new("http://localhost:11434", DecodingOptions::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> PipelineError {
        if e.is_connect() {
            PipelineError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            PipelineError::HttpClient("request timed out".to_string())
        } else {
            PipelineError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama `/api/generate`.
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
    /// `Some(0)` asks Ollama to unload the model right away.
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<u32>,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

impl From<DecodingOptions> for OllamaOptions {
    fn from(d: DecodingOptions) -> Self {
        Self {
            temperature: d.temperature,
            top_p: d.top_p,
            repeat_penalty: d.repeat_penalty,
        }
    }
}

/// Response body from Ollama `/api/generate`.
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

/// Response body from Ollama `/api/tags`.
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, PipelineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
            options: self.decoding.into(),
            keep_alive: None,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| PipelineError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }

    fn list_models(&self) -> Result<Vec<String>, PipelineError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| PipelineError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn unload(&self, model: &str) -> Result<(), PipelineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt: "",
            stream: false,
            options: self.decoding.into(),
            keep_alive: Some(0),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// MockLlmClient
// ═══════════════════════════════════════════════════════════

/// Scripted behavior for one [`MockLlmClient`] generate call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this text.
    Reply(String),
    /// Fail with a transport error.
    Fail(String),
    /// Block for the given duration, then return this text (usually to a
    /// caller that already gave up).
    Hang(Duration, String),
}

/// Mock LLM for tests: consumes a script of behaviors, then repeats the last
/// one. Records generate and unload calls.
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockBehavior>>,
    fallback: MockBehavior,
    models: Vec<String>,
    generate_calls: AtomicUsize,
    unload_calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn replying(response: &str) -> Self {
        Self::with_fallback(MockBehavior::Reply(response.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_fallback(MockBehavior::Fail(message.to_string()))
    }

    pub fn hanging(duration: Duration) -> Self {
        Self::with_fallback(MockBehavior::Hang(duration, String::new()))
    }

    fn with_fallback(fallback: MockBehavior) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            models: vec!["cnmoro/mistral_7b_portuguese:q4_K_M".to_string()],
            generate_calls: AtomicUsize::new(0),
            unload_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a behavior before the fallback kicks in.
    pub fn then(self, behavior: MockBehavior) -> Self {
        self.script.lock().unwrap().push_back(behavior);
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn unload_calls(&self) -> usize {
        self.unload_calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, PipelineError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match behavior {
            MockBehavior::Reply(text) => Ok(text),
            MockBehavior::Fail(message) => Err(PipelineError::HttpClient(message)),
            MockBehavior::Hang(duration, text) => {
                std::thread::sleep(duration);
                Ok(text)
            }
        }
    }

    fn list_models(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.models.clone())
    }

    fn unload(&self, _model: &str) -> Result<(), PipelineError> {
        self.unload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
