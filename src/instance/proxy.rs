//! Render-time property access.
//!
//! With diagnostics on, reads through [`RenderProxy`] check the key first
//! and warn about anything the instance does not declare. With diagnostics
//! off the proxy is a plain pass-through.

use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;
use crate::options::keys::is_reserved_key;
use super::Instance;

/// How render-time reads are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// Reads go straight to the instance.
    #[default]
    Direct,
    /// Reads of undeclared keys warn.
    Diagnostic,
}

pub(crate) fn init_proxy(vm: &Rc<Instance>) -> Result<()> {
    let mode = if vm.diagnostics().is_enabled() {
        ProxyMode::Diagnostic
    } else {
        ProxyMode::Direct
    };
    vm.proxy_mode.set(mode);
    Ok(())
}

/// The receiver a render function reads through.
#[derive(Debug, Clone, Copy)]
pub struct RenderProxy<'a> {
    vm: &'a Instance,
}

impl RenderProxy<'_> {
    pub fn mode(&self) -> ProxyMode {
        self.vm.proxy_mode.get()
    }

    /// Whether `key` is declared on the instance.
    pub fn has(&self, key: &str) -> bool {
        self.vm.declares(key)
    }

    /// Read a prop, data property, injection or computed property.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let value = self.vm.read(key)?;
        if value.is_none() && self.mode() == ProxyMode::Diagnostic && !self.vm.declares(key) {
            self.warn_missing(key);
        }
        Ok(value)
    }

    fn warn_missing(&self, key: &str) {
        let diagnostics = self.vm.diagnostics();
        if is_reserved_key(key) && self.vm.data().contains_key(key) {
            diagnostics.warn(format_args!(
                "Property \"{key}\" must be accessed with \"$data.{key}\" because properties starting \
                 with \"$\" or \"_\" are not proxied in the instance."
            ));
        } else {
            diagnostics.warn(format_args!(
                "Property or method \"{key}\" is not defined on the instance but referenced during render."
            ));
        }
    }
}

impl Instance {
    /// The render proxy (`vm._renderProxy`).
    pub fn proxy(&self) -> RenderProxy<'_> {
        RenderProxy { vm: self }
    }
}
