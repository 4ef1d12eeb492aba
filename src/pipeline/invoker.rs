//! Resilient invoker: a cooperative timeout around one blocking generation
//! call.
//!
//! The call is dispatched onto a worker thread; the calling flow polls a
//! channel at a short fixed interval, emitting a heartbeat log line while it
//! waits. On timeout the worker is abandoned, not joined: it may eventually
//! finish and its late result is discarded with the channel. That is an
//! accepted leak bounded by one outstanding worker per timed-out attempt.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::pipeline::ollama::LlmClient;
use crate::pipeline::PipelineError;

/// How often the waiting flow wakes up to check the worker and the clock.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What one watched invocation produced.
#[derive(Debug)]
pub enum InvokeOutcome {
    /// The worker finished in time. The payload may still be empty, which
    /// callers treat as a distinct failure from a timeout.
    Completed(String),
    /// The deadline passed; the worker was abandoned.
    TimedOut,
}

/// Run one generation call under a hard deadline.
///
/// Worker errors are re-raised to the caller. A heartbeat line is logged
/// every `heartbeat_interval` while waiting (disabled when zero).
pub fn invoke_with_timeout(
    client: Arc<dyn LlmClient>,
    model: &str,
    prompt: String,
    timeout: Duration,
    heartbeat_interval: Duration,
    log: &mut crate::runlog::RunLog,
) -> Result<InvokeOutcome, PipelineError> {
    let (tx, rx) = mpsc::channel();
    let worker_model = model.to_string();
    let worker = thread::spawn(move || {
        let _ = tx.send(client.generate(&worker_model, &prompt));
    });

    let start = Instant::now();
    let mut next_heartbeat = heartbeat_interval;

    let outcome = loop {
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            break Ok(InvokeOutcome::TimedOut);
        }
        if !heartbeat_interval.is_zero() && elapsed >= next_heartbeat {
            log.log(&format!(
                "Still waiting for the model response ({}s)...",
                elapsed.as_secs(),
            ));
            next_heartbeat = elapsed + heartbeat_interval;
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(result) => break result.map(InvokeOutcome::Completed),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break Err(PipelineError::WorkerLost),
        }
    };

    if matches!(outcome, Ok(InvokeOutcome::TimedOut)) {
        // Explicit abandon: dropping the handle detaches the worker.
        drop(worker);
    } else {
        let _ = worker.join();
    }
    outcome
}
