//! Advisory warnings.
//!
//! Warnings never abort anything. When diagnostics are disabled they are not
//! even formatted.

use std::fmt;

use crate::config::{RuntimeConfig, WarnHandler};

/// Warning sink carried into merges, descriptors and instances.
#[derive(Clone, Default)]
pub struct Diagnostics {
    enabled: bool,
    silent: bool,
    handler: Option<WarnHandler>,
}

impl Diagnostics {
    /// A sink that warns through `tracing` when `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            silent: false,
            handler: None,
        }
    }

    /// A sink that never warns.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            enabled: config.diagnostics_enabled,
            silent: config.silent,
            handler: config.warn_handler(),
        }
    }

    /// Route warnings to `handler` instead of `tracing`.
    pub fn with_handler(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.handler = Some(std::rc::Rc::new(handler));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit a warning.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        if !self.enabled {
            return;
        }
        let message = args.to_string();
        match &self.handler {
            Some(handler) => handler(&message),
            None if !self.silent => tracing::warn!(target: "spark_components", "{message}"),
            None => {}
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .field("silent", &self.silent)
            .finish_non_exhaustive()
    }
}
