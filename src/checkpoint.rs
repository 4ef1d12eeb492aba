//! Crash-safe persistence of run progress.
//!
//! The output file is rewritten wholesale after every completed top-level
//! item, via a temp-file-plus-rename so the file on disk is always a
//! complete, loadable [`RunResult`]. A crash loses at most the in-flight
//! item, never previously completed ones.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::dataset::TextItem;
use crate::pipeline::PipelineError;

/// Persisted run progress: the checkpoint unit.
///
/// `counts` is the 1-based index of the last completed top-level item and
/// `datas` grows by one entry per item; `time` is cumulative wall-clock
/// seconds since the run started.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    pub counts: usize,
    pub datas: Vec<TextItem>,
    pub time: f64,
}

impl RunResult {
    /// Atomically rewrite the whole checkpoint file.
    ///
    /// Writes to a temp file in the target directory, then renames over the
    /// destination, so a crash mid-write never corrupts the last good
    /// checkpoint.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)
            .map_err(|e| PipelineError::Checkpoint(e.to_string()))?;
        tmp.flush()?;
        tmp.persist(path)
            .map_err(|e| PipelineError::Checkpoint(e.to_string()))?;
        Ok(())
    }

    /// Load a checkpoint file. Used by tests and by operators inspecting an
    /// interrupted run; the pipeline itself only ever writes.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| PipelineError::Checkpoint(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{N1Entry, OperatorSet};

    fn entry(text: &str, sentences: &[&str]) -> TextItem {
        TextItem {
            text: text.to_string(),
            texts_n1: sentences
                .iter()
                .map(|s| N1Entry {
                    text_n1: s.to_string(),
                    operators_n2: OperatorSet::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn empty_result_is_persisted_and_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predict.json");

        RunResult::default().save(&path).unwrap();

        let loaded = RunResult::load(&path).unwrap();
        assert_eq!(loaded.counts, 0);
        assert!(loaded.datas.is_empty());
        assert_eq!(loaded.time, 0.0);
    }

    #[test]
    fn save_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predicts").join("generate_n1_mistral.json");

        RunResult::default().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn rewrite_replaces_previous_checkpoint_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predict.json");

        let mut result = RunResult::default();
        result.datas.push(entry("Texto um.", &["Sentenca um."]));
        result.counts = 1;
        result.time = 1.5;
        result.save(&path).unwrap();

        result.datas.push(entry("Texto dois.", &["Sentenca dois."]));
        result.counts = 2;
        result.time = 3.0;
        result.save(&path).unwrap();

        let loaded = RunResult::load(&path).unwrap();
        assert_eq!(loaded.counts, 2);
        assert_eq!(loaded.datas.len(), 2);
        assert_eq!(loaded.datas[1].text, "Texto dois.");
    }

    #[test]
    fn checkpoint_counts_matches_datas_len_after_each_item() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predict.json");

        let mut result = RunResult::default();
        for (i, text) in ["A.", "B.", "C."].iter().enumerate() {
            result.datas.push(entry(text, &[]));
            result.counts = i + 1;
            result.save(&path).unwrap();

            // Simulated crash point: the file on disk reflects exactly the
            // completed items.
            let loaded = RunResult::load(&path).unwrap();
            assert_eq!(loaded.counts, i + 1);
            assert_eq!(loaded.datas.len(), i + 1);
        }
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunResult::load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn output_is_valid_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predict.json");

        let mut result = RunResult::default();
        result.datas.push(entry("Texto.", &["Sentenca."]));
        result.counts = 1;
        result.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["counts"], 1);
        assert_eq!(value["datas"][0]["texts_n1"][0]["text_n1"], "Sentenca.");
    }
}
