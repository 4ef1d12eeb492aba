//! Retry controller: drives the invoker through up to N attempts for one
//! unit of work.
//!
//! The three failure kinds get three different responses:
//! - timeout: unload the model (recovers a wedged backend), retry at once;
//! - invocation error: sleep the backoff, then retry;
//! - clean-but-empty payload or empty extraction: retry at once, no reset.
//!
//! Exhaustion is absorbed by the caller as a default result; it never aborts
//! the batch.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::RunConfig;
use crate::pipeline::invoker::{invoke_with_timeout, InvokeOutcome};
use crate::pipeline::ollama::LlmClient;
use crate::runlog::RunLog;

/// Attempt discipline for one unit of work.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub call_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            call_timeout: config.call_timeout,
            heartbeat_interval: config.heartbeat_interval,
            backoff: config.retry_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            call_timeout: Duration::from_secs(600),
            heartbeat_interval: Duration::from_secs(60),
            backoff: Duration::from_secs(1),
        }
    }
}

/// Call the model until `parse` accepts a response or attempts run out.
///
/// `parse` returning `None` means the response held nothing useful; the
/// stage decides what "useful" is. Returns `None` on exhaustion; the caller
/// records a default result and the pipeline continues.
pub fn generate_with_retries<T>(
    client: &Arc<dyn LlmClient>,
    model: &str,
    prompt: &str,
    unit: &str,
    policy: &RetryPolicy,
    log: &mut RunLog,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    for attempt in 1..=policy.max_retries {
        log.log(&format!("Calling model ({unit}, attempt {attempt})"));

        let outcome = invoke_with_timeout(
            Arc::clone(client),
            model,
            prompt.to_string(),
            policy.call_timeout,
            policy.heartbeat_interval,
            log,
        );

        let text = match outcome {
            Ok(InvokeOutcome::TimedOut) => {
                let msg = format!(
                    "Model call timed out after {}s.",
                    policy.call_timeout.as_secs(),
                );
                println!("{msg}");
                log.log(&msg);
                if client.unload(model).is_err() {
                    log.log("Failed to unload the model.");
                    tracing::warn!(model, "Model unload request failed");
                }
                continue;
            }
            Err(err) => {
                let msg = format!("Model call failed ({unit}, attempt {attempt}): {err}");
                println!("{msg}");
                log.log(&msg);
                if attempt < policy.max_retries {
                    thread::sleep(policy.backoff);
                }
                continue;
            }
            Ok(InvokeOutcome::Completed(text)) => text,
        };

        if text.trim().is_empty() {
            let msg = format!("Attempt {attempt} returned empty. Retrying.");
            println!("{msg}");
            log.log(&msg);
            continue;
        }

        log.log(&format!("Model output:\n{text}"));
        match parse(&text) {
            Some(value) => return Some(value),
            None => {
                let msg = format!("Attempt {attempt} returned empty. Retrying.");
                println!("{msg}");
                log.log(&msg);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ollama::{MockBehavior, MockLlmClient};
    use std::time::Instant;

    const MODEL: &str = "cnmoro/mistral_7b_portuguese:q4_K_M";

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            call_timeout: Duration::from_millis(50),
            heartbeat_interval: Duration::ZERO,
            backoff: Duration::from_millis(10),
        }
    }

    fn run(client: Arc<MockLlmClient>, policy: &RetryPolicy) -> Option<String> {
        let dyn_client: Arc<dyn LlmClient> = client;
        generate_with_retries(
            &dyn_client,
            MODEL,
            "prompt",
            "text 1",
            policy,
            &mut RunLog::disabled(),
            |text| Some(text.to_string()),
        )
    }

    #[test]
    fn first_attempt_success_short_circuits() {
        let mock = Arc::new(MockLlmClient::replying("resposta"));
        let result = run(Arc::clone(&mock), &fast_policy());
        assert_eq!(result.as_deref(), Some("resposta"));
        assert_eq!(mock.generate_calls(), 1);
        assert_eq!(mock.unload_calls(), 0);
    }

    #[test]
    fn timeout_triggers_model_reset_then_retry() {
        let mock = Arc::new(
            MockLlmClient::replying("recuperado")
                .then(MockBehavior::Hang(Duration::from_secs(2), String::new())),
        );
        let result = run(Arc::clone(&mock), &fast_policy());
        assert_eq!(result.as_deref(), Some("recuperado"));
        assert_eq!(mock.generate_calls(), 2);
        assert_eq!(mock.unload_calls(), 1);
    }

    #[test]
    fn invocation_error_backs_off_then_retries() {
        let mock = Arc::new(
            MockLlmClient::replying("depois do erro")
                .then(MockBehavior::Fail("conexao recusada".into())),
        );
        let start = Instant::now();
        let result = run(Arc::clone(&mock), &fast_policy());
        assert_eq!(result.as_deref(), Some("depois do erro"));
        assert_eq!(mock.generate_calls(), 2);
        assert_eq!(mock.unload_calls(), 0);
        assert!(start.elapsed() >= Duration::from_millis(10), "backoff skipped");
    }

    #[test]
    fn empty_payload_retries_without_reset_or_backoff() {
        let mock = Arc::new(
            MockLlmClient::replying("cheio").then(MockBehavior::Reply("  \n ".into())),
        );
        let result = run(Arc::clone(&mock), &fast_policy());
        assert_eq!(result.as_deref(), Some("cheio"));
        assert_eq!(mock.generate_calls(), 2);
        assert_eq!(mock.unload_calls(), 0);
    }

    #[test]
    fn rejected_extraction_counts_as_failed_attempt() {
        let mock = Arc::new(MockLlmClient::replying("sem conteudo util"));
        let dyn_client: Arc<dyn LlmClient> = Arc::clone(&mock) as Arc<dyn LlmClient>;
        let result: Option<String> = generate_with_retries(
            &dyn_client,
            MODEL,
            "prompt",
            "text 1",
            &fast_policy(),
            &mut RunLog::disabled(),
            |_| None,
        );
        assert!(result.is_none());
        assert_eq!(mock.generate_calls(), 3);
    }

    #[test]
    fn exhaustion_after_persistent_timeouts() {
        let mock = Arc::new(MockLlmClient::hanging(Duration::from_secs(2)));
        let result = run(Arc::clone(&mock), &fast_policy());
        assert!(result.is_none());
        assert_eq!(mock.generate_calls(), 3);
        // One reset per timed-out attempt.
        assert_eq!(mock.unload_calls(), 3);
    }

    #[test]
    fn last_error_attempt_skips_the_backoff_sleep() {
        let mock = Arc::new(MockLlmClient::failing("sempre falha"));
        let policy = RetryPolicy {
            backoff: Duration::from_secs(5),
            max_retries: 1,
            ..fast_policy()
        };
        let start = Instant::now();
        let result = run(Arc::clone(&mock), &policy);
        assert!(result.is_none());
        assert!(start.elapsed() < Duration::from_secs(1), "slept on final attempt");
    }
}
