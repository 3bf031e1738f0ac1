//! Request execution with timeout, retry, and backoff.
//!
//! One `execute` call makes up to `1 + retries` strictly sequential attempts.
//! Each attempt produces an explicit [`AttemptOutcome`] and the loop switches
//! on the tag, so retry eligibility is a property of the outcome rather than of
//! exception inspection.

use reqwest::Response;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::response;
use crate::error::ApiError;

/// Result of a single attempt. Never persisted; lives only inside one
/// `execute` call's retry loop.
enum AttemptOutcome {
  Success(Response),
  /// Server error or transport failure; another attempt may succeed.
  Retryable(ApiError),
  /// Client error, timeout, or malformed request; retrying would repeat it.
  Terminal(ApiError),
}

/// Executes one logical HTTP request. Stateless across calls.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
  timeout: Duration,
  retries: u32,
  backoff_base: Duration,
}

impl RequestExecutor {
  pub fn new(timeout: Duration, retries: u32, backoff_base: Duration) -> Self {
    Self {
      timeout,
      retries,
      backoff_base,
    }
  }

  /// Delay before the attempt after attempt `n`: `2^n * base`, no jitter.
  fn backoff_delay(&self, attempt: u32) -> Duration {
    self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
  }

  /// Run the request, retrying retryable failures within budget.
  ///
  /// `make_request` must build a fresh request on every call: a consumed body
  /// cannot be replayed, so the same future cannot serve two attempts.
  pub async fn execute<F, Fut>(&self, mut make_request: F) -> Result<Response, ApiError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
  {
    let mut attempt: u32 = 0;
    loop {
      match self.run_attempt(make_request()).await {
        AttemptOutcome::Success(response) => return Ok(response),
        AttemptOutcome::Terminal(err) => return Err(err),
        AttemptOutcome::Retryable(err) => {
          if attempt >= self.retries {
            debug!(attempt, "retry budget exhausted");
            return Err(err);
          }
          let delay = self.backoff_delay(attempt);
          warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying request");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }

  async fn run_attempt<Fut>(&self, request: Fut) -> AttemptOutcome
  where
    Fut: Future<Output = Result<Response, reqwest::Error>>,
  {
    let result = match tokio::time::timeout(self.timeout, request).await {
      Ok(result) => result,
      // An aborted attempt never counts toward the retry budget.
      Err(_) => return AttemptOutcome::Terminal(ApiError::Timeout(self.timeout)),
    };

    match result {
      Ok(response) => {
        let status = response.status();
        if status.is_success() {
          AttemptOutcome::Success(response)
        } else if status.is_server_error() {
          AttemptOutcome::Retryable(response::error_from_response(response).await)
        } else {
          // 4xx is assumed non-transient; stray 1xx/3xx is a contract
          // violation (reqwest already follows redirects).
          AttemptOutcome::Terminal(response::error_from_response(response).await)
        }
      }
      Err(err) if err.is_builder() => {
        AttemptOutcome::Terminal(ApiError::InvalidRequest(err.to_string()))
      }
      Err(err) => AttemptOutcome::Retryable(ApiError::Network(err.to_string())),
    }
  }
}
