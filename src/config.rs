//! Run configuration: stage selection, model catalog and path derivation.
//!
//! Everything a run needs is resolved once at startup and threaded through
//! the runner and log constructors; nothing reads ambient process state
//! mid-run.

use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "rasegen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default input dataset, relative to the working directory.
pub const DEFAULT_INPUT: &str = "dataset.json";

/// Directory for prediction output files.
pub const PREDICTS_DIR: &str = "predicts";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "rasegen=info".to_string()
}

// ═══════════════════════════════════════════════════════════
// Stages
// ═══════════════════════════════════════════════════════════

/// Which generation pass a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Decompose raw texts into atomic sentences.
    Sentences,
    /// Extract the four structured clauses from each sentence.
    Operators,
    /// Extract typed comparison properties from each clause.
    Properties,
}

/// Pipeline stage. Chained variants run the same generation pass as their
/// final segment; they only differ in which file they consume, since each
/// stage fully consumes the previous stage's complete output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    N1,
    N2,
    N3,
    N1N2,
    N2N3,
    N1N2N3,
}

impl Stage {
    /// Stage key used in file names.
    pub fn key(self) -> &'static str {
        match self {
            Self::N1 => "n1",
            Self::N2 => "n2",
            Self::N3 => "n3",
            Self::N1N2 => "n1_n2",
            Self::N2N3 => "n2_n3",
            Self::N1N2N3 => "n1_n2_n3",
        }
    }

    pub fn kind(self) -> StageKind {
        match self {
            Self::N1 => StageKind::Sentences,
            Self::N2 | Self::N1N2 => StageKind::Operators,
            Self::N3 | Self::N2N3 | Self::N1N2N3 => StageKind::Properties,
        }
    }

    /// Default input file: the gold dataset for base stages, the previous
    /// stage's prediction file for chained ones.
    pub fn default_input(self, model: ModelAlias) -> PathBuf {
        match self {
            Self::N1 | Self::N2 | Self::N3 => PathBuf::from(DEFAULT_INPUT),
            Self::N1N2 => prediction_path("n1", model),
            Self::N2N3 => prediction_path("n2", model),
            Self::N1N2N3 => prediction_path("n1_n2", model),
        }
    }

    pub fn default_output(self, model: ModelAlias) -> PathBuf {
        prediction_path(self.key(), model)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

fn prediction_path(stage_key: &str, model: ModelAlias) -> PathBuf {
    PathBuf::from(PREDICTS_DIR).join(format!("generate_{stage_key}_{model}.json"))
}

// ═══════════════════════════════════════════════════════════
// Model catalog
// ═══════════════════════════════════════════════════════════

/// Short aliases for the Portuguese-capable Ollama models the pipeline is
/// evaluated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAlias {
    Llama,
    Alpaca,
    Mistral,
    Dolphin,
    Gemma,
    Qwen,
}

impl ModelAlias {
    /// The exact Ollama model identifier behind the alias.
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Llama => "llama3.3:latest",
            Self::Alpaca => "splitpierre/bode-alpaca-pt-br:13b-Q4_0",
            Self::Mistral => "cnmoro/mistral_7b_portuguese:q4_K_M",
            Self::Dolphin => "cnmoro/llama-3-8b-dolphin-portuguese-v0.3:4_k_m",
            Self::Gemma => "brunoconterato/Gemma-3-Gaia-PT-BR-4b-it:f16",
            Self::Qwen => "cnmoro/Qwen2.5-0.5B-Portuguese-v1:q4_k_m",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llama => "llama",
            Self::Alpaca => "alpaca",
            Self::Mistral => "mistral",
            Self::Dolphin => "dolphin",
            Self::Gemma => "gemma",
            Self::Qwen => "qwen",
        }
    }
}

impl std::fmt::Display for ModelAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════
// Run configuration
// ═══════════════════════════════════════════════════════════

/// Decoding parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

/// Everything one pipeline run needs, resolved at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Resolved Ollama model identifier.
    pub model: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Explicit log file; when `None`, `debug` decides whether a path is
    /// derived from the output file name.
    pub log_path: Option<PathBuf>,
    pub debug: bool,
    /// Attempts per unit of work before it degrades to an empty result.
    pub max_retries: u32,
    /// Hard ceiling on one model call.
    pub call_timeout: Duration,
    /// Interval between "still waiting" log lines during a call.
    pub heartbeat_interval: Duration,
    /// Sleep between attempts after an invocation error.
    pub retry_backoff: Duration,
    pub base_url: String,
    pub decoding: DecodingOptions,
}

impl RunConfig {
    /// Configuration for `stage` with `model`, using the catalog's default
    /// paths unless overridden by the caller.
    pub fn for_stage(stage: Stage, model: ModelAlias) -> Self {
        Self {
            model: model.model_id().to_string(),
            input_path: stage.default_input(model),
            output_path: stage.default_output(model),
            log_path: None,
            debug: false,
            max_retries: 3,
            call_timeout: Duration::from_secs(600),
            heartbeat_interval: Duration::from_secs(60),
            retry_backoff: Duration::from_secs(1),
            base_url: "http://localhost:11434".to_string(),
            decoding: DecodingOptions::default(),
        }
    }
}
