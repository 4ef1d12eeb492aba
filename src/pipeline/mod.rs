//! Generation pipeline: Ollama client, timeout watchdog, retry control and
//! the checkpointed batch runners.

pub mod invoker;
pub mod ollama;
pub mod retry;
pub mod runner;

use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for one pipeline run.
///
/// Only dataset and preflight failures abort a run; everything that happens
/// per unit of work (timeouts, transport errors, empty responses) is absorbed
/// by the retry controller and never surfaces here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("Failed to decode input dataset JSON: {0}")]
    DatasetParse(String),

    #[error("Checkpoint write failed: {0}")]
    Checkpoint(String),

    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Model {0} is not available on the Ollama instance (pull it first)")]
    ModelNotAvailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model worker terminated without producing a result")]
    WorkerLost,
}
