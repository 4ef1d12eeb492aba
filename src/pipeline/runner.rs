//! Checkpointed batch runner: one pass over the dataset, one model call at a
//! time, the whole output file rewritten after every top-level item.
//!
//! Items are processed strictly in dataset order. Per-unit failures degrade
//! to empty results and the run continues; only dataset loading aborts.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::checkpoint::RunResult;
use crate::config::{RunConfig, StageKind};
use crate::dataset::{Dataset, FieldMap, N1Entry, OperatorSet, TextItem};
use crate::parse;
use crate::pipeline::ollama::LlmClient;
use crate::pipeline::retry::{generate_with_retries, RetryPolicy};
use crate::pipeline::PipelineError;
use crate::prompts;
use crate::runlog::RunLog;

/// Console preview length for one text, in characters.
const PREVIEW_CHARS: usize = 40;

/// Run one generation pass over the dataset.
///
/// The output file is created in valid form before the first item and
/// atomically rewritten after each one, so at any moment it is a complete,
/// loadable [`RunResult`] covering exactly the finished items.
pub fn run_stage(
    config: &RunConfig,
    kind: StageKind,
    client: Arc<dyn LlmClient>,
) -> Result<(), PipelineError> {
    let mut log = RunLog::open(&config.output_path, config.log_path.as_deref(), config.debug)?;
    let outcome = run_inner(config, kind, &client, &mut log);
    // Drop also closes on unwind; this keeps the happy path explicit.
    log.close();
    outcome
}

fn run_inner(
    config: &RunConfig,
    kind: StageKind,
    client: &Arc<dyn LlmClient>,
    log: &mut RunLog,
) -> Result<(), PipelineError> {
    let dataset = load_dataset(&config.input_path)?;

    let mut result = RunResult::default();
    result.save(&config.output_path)?;

    let stage_name = match kind {
        StageKind::Sentences => "N1",
        StageKind::Operators => "N2",
        StageKind::Properties => "N3",
    };
    log.log(&format!(
        "Starting {stage_name} generation. run={} model={} input={} output={}",
        Uuid::new_v4(),
        config.model,
        config.input_path.display(),
        config.output_path.display(),
    ));
    log.log(&format!("Total texts: {}", dataset.datas.len()));

    let policy = RetryPolicy::from_config(config);
    let run_start = Instant::now();

    for (index, item) in dataset.datas.iter().enumerate() {
        let count = index + 1;
        let preview = preview(&item.text);
        let item_start = Instant::now();
        log.log(&format!("Starting text {count}: {preview}"));

        let entry = match kind {
            StageKind::Sentences => split_item(config, client, &policy, log, count, item),
            StageKind::Operators => extract_item_operators(config, client, &policy, log, count, item),
            StageKind::Properties => extract_item_properties(config, client, &policy, log, count, item),
        };

        let elapsed = item_start.elapsed().as_secs_f64();
        result.datas.push(entry);
        result.counts = count;
        result.time = run_start.elapsed().as_secs_f64();
        result.save(&config.output_path)?;

        println!("Text {count} ({elapsed:.2}s): {preview}");
        log.log(&format!("Text {count} completed ({elapsed:.2}s)"));
    }

    println!("Processing complete. Total time: {:.2} seconds.", result.time);
    println!("Result saved to {}", config.output_path.display());
    log.log(&format!(
        "Processing complete. Total time: {:.2} seconds.",
        result.time,
    ));
    log.log(&format!("Result saved to {}", config.output_path.display()));
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Per-item passes
// ═══════════════════════════════════════════════════════════

/// N1: one unit of work per text, decomposed into atomic sentences.
fn split_item(
    config: &RunConfig,
    client: &Arc<dyn LlmClient>,
    policy: &RetryPolicy,
    log: &mut RunLog,
    count: usize,
    item: &TextItem,
) -> TextItem {
    let prompt = prompts::render(prompts::N1_TEMPLATE, &[("text", &item.text)]);
    let unit = format!("text {count}");

    let sentences = generate_with_retries(client, &config.model, &prompt, &unit, policy, log, |text| {
        let parsed = parse::n1::process_text(text);
        (!parsed.is_empty()).then_some(parsed)
    })
    .unwrap_or_else(|| {
        let msg = format!(
            "Failed to process text after {} attempts. Continuing.",
            policy.max_retries,
        );
        println!("{msg}");
        log.log(&msg);
        Vec::new()
    });

    TextItem {
        text: item.text.clone(),
        texts_n1: sentences
            .into_iter()
            .map(|sentence| N1Entry {
                text_n1: sentence,
                operators_n2: OperatorSet::default(),
            })
            .collect(),
    }
}

/// N2: one unit of work per sentence, extracting the four clause fields.
fn extract_item_operators(
    config: &RunConfig,
    client: &Arc<dyn LlmClient>,
    policy: &RetryPolicy,
    log: &mut RunLog,
    count: usize,
    item: &TextItem,
) -> TextItem {
    let mut entries = Vec::with_capacity(item.texts_n1.len());

    for (sentence_index, n1) in item.texts_n1.iter().enumerate() {
        let unit = format!("text {count}, sentence {}", sentence_index + 1);
        let prompt = prompts::render(
            prompts::N2_TEMPLATE,
            &[("text", &item.text), ("text_n1", &n1.text_n1)],
        );

        // Any clean response counts: a sentence may genuinely have only
        // empty optional fields.
        let fields =
            generate_with_retries(client, &config.model, &prompt, &unit, policy, log, |text| {
                Some(parse::n2::extract_fields(text))
            })
            .unwrap_or_else(|| {
                let msg = format!("Failed to process text ({unit}).");
                println!("{msg}");
                log.log(&msg);
                FieldMap::default()
            });

        entries.push(N1Entry {
            text_n1: n1.text_n1.clone(),
            operators_n2: OperatorSet::from_fields(&fields),
        });
    }

    TextItem {
        text: item.text.clone(),
        texts_n1: entries,
    }
}

/// N3: one unit of work per non-empty operator clause, filling its typed
/// properties. Operators without clause text keep their empty defaults and
/// cost no model call.
fn extract_item_properties(
    config: &RunConfig,
    client: &Arc<dyn LlmClient>,
    policy: &RetryPolicy,
    log: &mut RunLog,
    count: usize,
    item: &TextItem,
) -> TextItem {
    let mut entries = Vec::with_capacity(item.texts_n1.len());

    for (sentence_index, n1) in item.texts_n1.iter().enumerate() {
        let mut operators = n1.operators_n2.clone();

        for (name, operator) in operators.iter_mut() {
            if operator.text_n2.is_empty() {
                continue;
            }
            let unit = format!("text {count}, sentence {}, {name}", sentence_index + 1);
            let prompt = prompts::render(
                prompts::N3_TEMPLATE,
                &[("text_n1", &n1.text_n1), ("text_n2", &operator.text_n2)],
            );

            match generate_with_retries(
                client,
                &config.model,
                &prompt,
                &unit,
                policy,
                log,
                parse::n3::parse_properties,
            ) {
                Some(properties) => operator.properties_n3 = properties,
                None => {
                    let msg = format!("Failed to process text ({unit}).");
                    println!("{msg}");
                    log.log(&msg);
                }
            }
        }

        entries.push(N1Entry {
            text_n1: n1.text_n1.clone(),
            operators_n2: operators,
        });
    }

    TextItem {
        text: item.text.clone(),
        texts_n1: entries,
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

fn load_dataset(path: &Path) -> Result<Dataset, PipelineError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::DatasetNotFound(path.to_path_buf())
        } else {
            PipelineError::Io(e)
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| PipelineError::DatasetParse(e.to_string()))
}

/// First characters of the text, flattened, with an ellipsis when cut.
fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        flat.to_string()
    }
}
