//! Executor configuration.

use std::time::Duration;

/// Default wall-clock budget for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for script execution.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Hard wall-clock budget for one execution. When it elapses the caller
    /// gets a timeout result; the script itself is not terminated.
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ExecutorConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_ten_seconds() {
        assert_eq!(ExecutorConfig::default().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let config = ExecutorConfig::new().with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}
