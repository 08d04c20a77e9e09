//! Runtime configuration

use serde::Deserialize;

use crate::error::JsError;

/// Default nesting limit for resumptions (generator calling generator, `yield*` chains)
pub const DEFAULT_MAX_RESUME_DEPTH: usize = 512;

/// Limits applied by an [`Interpreter`](crate::Interpreter)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Instructions allowed per outermost resumption. 0 disables the limit.
    pub max_steps: u64,
    /// Maximum number of generator resumptions active on the host stack at once
    pub max_resume_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: 0,
            max_resume_depth: DEFAULT_MAX_RESUME_DEPTH,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON; absent fields keep their defaults
    ///
    /// ```
    /// use genrun::RuntimeConfig;
    ///
    /// let config = RuntimeConfig::from_json(r#"{ "max_steps": 10000 }"#).unwrap();
    /// assert_eq!(config.max_steps, 10000);
    /// assert_eq!(config.max_resume_depth, 512);
    /// ```
    pub fn from_json(text: &str) -> Result<Self, JsError> {
        serde_json::from_str(text)
            .map_err(|e| JsError::syntax_error(format!("Invalid runtime configuration: {}", e)))
    }
}
