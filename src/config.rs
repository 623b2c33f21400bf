//! Runtime configuration.
//!
//! Diagnostics are a runtime flag rather than a build mode: a release build
//! can opt in, a debug build can opt out.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Receives every diagnostic warning instead of the `tracing` sink.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Configuration shared by a [`Runtime`](crate::Runtime) and everything it creates.
///
/// # Example
///
/// ```ignore
/// let config = RuntimeConfig::from_json(r#"{ "diagnostics_enabled": true }"#)?;
/// let runtime = Runtime::with_config(config);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emit advisory warnings (reserved names, undeclared property access,
    /// misplaced `el`/`propsData`). Defaults to on in debug builds.
    pub diagnostics_enabled: bool,
    /// Suppress the `tracing` output of warnings. A warn handler still runs.
    pub silent: bool,
    /// Emit construction timing as a debug event per instance.
    pub performance: bool,
    #[serde(skip)]
    warn_handler: Option<WarnHandler>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            diagnostics_enabled: cfg!(debug_assertions),
            silent: false,
            performance: false,
            warn_handler: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable diagnostics.
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics_enabled = enabled;
        self
    }

    /// Route warnings to `handler`.
    pub fn on_warn(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.warn_handler = Some(Rc::new(handler));
        self
    }

    pub(crate) fn warn_handler(&self) -> Option<WarnHandler> {
        self.warn_handler.clone()
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("diagnostics_enabled", &self.diagnostics_enabled)
            .field("silent", &self.silent)
            .field("performance", &self.performance)
            .field("warn_handler", &self.warn_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "performance": true }"#).unwrap();
        assert!(config.performance);
        assert!(!config.silent);
        assert_eq!(config.diagnostics_enabled, cfg!(debug_assertions));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(RuntimeConfig::from_json("{ nope").is_err());
    }
}
