use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use rasegen::config::{self, ModelAlias, RunConfig, Stage};
use rasegen::pipeline::ollama::{LlmClient, OllamaClient};
use rasegen::pipeline::runner::run_stage;
use rasegen::pipeline::PipelineError;

/// Environment variable enabling debug logging, read once at startup.
const DEBUG_ENV: &str = "RASEGEN_DEBUG";

#[derive(Parser)]
#[command(
    name = config::APP_NAME,
    version = config::APP_VERSION,
    about = "Staged RASE simplification of normative text via a local Ollama service"
)]
struct Cli {
    /// Pipeline stage to run. Chained stages consume the previous stage's
    /// prediction file.
    #[arg(value_enum)]
    stage: StageArg,

    /// Model preset.
    #[arg(long, value_enum, default_value_t = ModelArg::Mistral)]
    model: ModelArg,

    /// Input dataset (defaults to the stage's standard input file).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output prediction file (defaults to predicts/generate_<stage>_<model>.json).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Append run logging to this file.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Enable run logging to logs/<output-name>.log.
    #[arg(long)]
    debug: bool,

    /// Ollama base URL.
    #[arg(long, default_value = "http://localhost:11434")]
    base_url: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    N1,
    N2,
    N3,
    #[value(name = "n1-n2", alias = "n1_n2")]
    N1N2,
    #[value(name = "n2-n3", alias = "n2_n3")]
    N2N3,
    #[value(name = "n1-n2-n3", alias = "n1_n2_n3")]
    N1N2N3,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::N1 => Stage::N1,
            StageArg::N2 => Stage::N2,
            StageArg::N3 => Stage::N3,
            StageArg::N1N2 => Stage::N1N2,
            StageArg::N2N3 => Stage::N2N3,
            StageArg::N1N2N3 => Stage::N1N2N3,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Llama,
    Alpaca,
    Mistral,
    Dolphin,
    Gemma,
    Qwen,
}

impl From<ModelArg> for ModelAlias {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Llama => ModelAlias::Llama,
            ModelArg::Alpaca => ModelAlias::Alpaca,
            ModelArg::Mistral => ModelAlias::Mistral,
            ModelArg::Dolphin => ModelAlias::Dolphin,
            ModelArg::Gemma => ModelAlias::Gemma,
            ModelArg::Qwen => ModelAlias::Qwen,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let stage: Stage = cli.stage.into();
    let model: ModelAlias = cli.model.into();

    let mut config = RunConfig::for_stage(stage, model);
    config.base_url = cli.base_url;
    config.debug = cli.debug || debug_env_enabled();
    config.log_path = cli.log;
    if let Some(input) = cli.input {
        config.input_path = input;
    }
    if let Some(output) = cli.output {
        config.output_path = output;
    }

    tracing::info!(
        stage = %stage,
        model = %config.model,
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        "{} v{} starting",
        config::APP_NAME,
        config::APP_VERSION,
    );

    let client = OllamaClient::new(&config.base_url, config.decoding);
    if !client.is_model_available(&config.model)? {
        return Err(PipelineError::ModelNotAvailable(config.model));
    }

    println!("Generating {} with {}...", stage.key().to_uppercase(), model);
    println!();

    run_stage(&config, stage.kind(), Arc::new(client))
}

/// Fallback debug toggle from the environment, captured once here; nothing
/// reads it mid-run.
fn debug_env_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
