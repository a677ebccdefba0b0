use std::time::Duration;

use serde::Deserialize;

/// Settings applied to a saga when it is built.
///
/// Deserializes from a table such as:
///
/// ```toml
/// require-compensation = true
/// timeout-ms = 5000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SagaConfig {
    require_compensation: bool,
    timeout_ms: Option<u64>,
}

impl SagaConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject steps that declare no compensating action.
    #[must_use]
    pub fn require_compensation(&self) -> bool {
        self.require_compensation
    }

    /// Deadline applied to executions that do not set their own.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn with_require_compensation(mut self, require: bool) -> Self {
        self.require_compensation = require;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
