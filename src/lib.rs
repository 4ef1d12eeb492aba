//! rasegen — staged simplification of normative text over a local Ollama
//! service.
//!
//! Three generation passes progressively structure legal/technical text:
//! N1 decomposes a text into atomic sentences, N2 extracts the four RASE
//! clauses (applicability, selection, exception, requirement) from each
//! sentence, N3 types each clause into comparison properties. Each pass is
//! a batch run over a JSON dataset with per-item crash-safe checkpointing,
//! a timeout watchdog around every model call and a bounded retry
//! discipline, so a flaky or wedged local model degrades single units
//! instead of killing the run.

pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod runlog;
