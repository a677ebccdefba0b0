use std::path::{Path, PathBuf};
use std::time::Duration;

use commerce_saga::SagaConfig;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::{OperationError, Result};

/// Default settings file name.
pub const SETTINGS_FILE: &str = "commerce.toml";

/// Per-workflow overrides of the base saga settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkflowOverride {
    require_compensation: Option<bool>,
    timeout_ms: Option<u64>,
}

/// Saga settings for every workflow, read from `commerce.toml`:
///
/// ```toml
/// [saga]
/// require-compensation = true
///
/// [workflows.send-quote]
/// timeout-ms = 2000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowSettings {
    saga: SagaConfig,
    workflows: IndexMap<String, WorkflowOverride>,
}

impl WorkflowSettings {
    /// Loads settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(OperationError::SettingsRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&content, path)
    }

    /// Parses settings text; `path` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid settings TOML.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| OperationError::SettingsParse {
            path: PathBuf::from(path),
            source,
        })
    }

    /// Overrides the base timeout, e.g. from a command-line flag.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.saga = self.saga.with_timeout(timeout);
        for workflow in self.workflows.values_mut() {
            workflow.timeout_ms = None;
        }
        self
    }

    /// Effective saga settings for the named workflow.
    #[must_use]
    pub fn for_workflow(&self, name: &str) -> SagaConfig {
        let mut config = self.saga.clone();
        if let Some(overrides) = self.workflows.get(name) {
            if let Some(require) = overrides.require_compensation {
                config = config.with_require_compensation(require);
            }
            if let Some(timeout_ms) = overrides.timeout_ms {
                config = config.with_timeout(Duration::from_millis(timeout_ms));
            }
        }
        config
    }
}
