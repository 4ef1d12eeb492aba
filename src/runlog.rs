//! RunLog — the operator-facing run journal.
//!
//! Mirrors progress, attempt-failure and heartbeat messages to the console
//! and an append-only log file, flushing after every line so a crash never
//! loses buffered output. Whether logging is active is decided once at
//! startup from the run configuration; inactive logs are total no-ops.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directory used when a log path has to be derived from the output file.
const LOGS_DIR: &str = "logs";

/// Timestamped console + file logger for one pipeline run.
pub struct RunLog {
    file: Option<File>,
}

impl RunLog {
    /// Open a log according to the run configuration.
    ///
    /// Active when an explicit `log_path` is supplied, or when `debug` is
    /// set, in which case the path derives from the output file's name under
    /// [`LOGS_DIR`]. Otherwise returns a disabled log.
    pub fn open(
        output_path: &Path,
        log_path: Option<&Path>,
        debug: bool,
    ) -> std::io::Result<Self> {
        let path: Option<PathBuf> = match log_path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None if debug => {
                let name = output_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "run".to_string());
                Some(PathBuf::from(LOGS_DIR).join(format!("{name}.log")))
            }
            None => None,
        };

        let file = match path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                Some(OpenOptions::new().create(true).append(true).open(&path)?)
            }
            None => None,
        };

        Ok(Self { file })
    }

    /// A log that ignores every message.
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Timestamp-prefix the message, print it and append it to the log file.
    /// No-op when logging is inactive.
    pub fn log(&mut self, message: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{timestamp}] {message}");
        println!("{line}");
        if writeln!(file, "{line}").and_then(|_| file.flush()).is_err() {
            tracing::warn!("Failed to append to run log");
        }
    }

    /// Release the file handle. Idempotent: safe when already closed or
    /// never opened.
    pub fn close(&mut self) {
        self.file = None;
    }
}

impl Drop for RunLog {
    // Covers every exit path of a run, including unwinding.
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_log_ignores_messages() {
        let mut log = RunLog::disabled();
        assert!(!log.is_enabled());
        log.log("nothing happens");
        log.close();
    }

    #[test]
    fn inactive_without_path_or_debug() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("predict.json");
        let log = RunLog::open(&output, None, false).unwrap();
        assert!(!log.is_enabled());
    }

    #[test]
    fn explicit_path_writes_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("predict.json");
        let log_path = dir.path().join("run.log");

        let mut log = RunLog::open(&output, Some(&log_path), false).unwrap();
        assert!(log.is_enabled());
        log.log("first message");
        log.log("second message");
        log.close();

        let contents = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let re = regex::Regex::new(r"^\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] first message$")
            .unwrap();
        assert!(re.is_match(lines[0]), "unexpected line: {}", lines[0]);
        assert!(lines[1].ends_with("second message"));
    }

    #[test]
    fn appends_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("predict.json");
        let log_path = dir.path().join("run.log");

        let mut log = RunLog::open(&output, Some(&log_path), false).unwrap();
        log.log("from first run");
        log.close();

        let mut log = RunLog::open(&output, Some(&log_path), false).unwrap();
        log.log("from second run");
        log.close();

        let contents = fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn debug_derives_path_from_output_name() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let output = PathBuf::from("predicts/generate_n1_mistral.json");
        let mut log = RunLog::open(&output, None, true).unwrap();
        log.log("derived");
        log.close();

        let derived = PathBuf::from(LOGS_DIR).join("generate_n1_mistral.json.log");
        let exists = derived.exists();
        std::env::set_current_dir(cwd).unwrap();
        assert!(exists);
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("predict.json");
        let log_path = dir.path().join("run.log");

        let mut log = RunLog::open(&output, Some(&log_path), false).unwrap();
        log.close();
        log.close();
        log.log("after close is a no-op");
        assert!(!log.is_enabled());
    }
}
