use std::time::Duration;

use super::retry::RetryPolicy;

/// Runtime configuration describing how to reach the REST backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Backoff applied to rate-limited sequence submissions.
    pub retry: RetryPolicy,
}

impl BackendConfig {
    /// Construct a configuration with default timeout and retry schedule.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
