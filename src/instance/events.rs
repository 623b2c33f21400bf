//! Instance events: `on`, `off`, `emit`.

use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;
use crate::options::keys::hyphenate;
use crate::vnode::{EventHandler, Listeners};
use super::{Instance, InstanceFlags};

/// Reset the listener store and register the placeholder's listeners.
pub(crate) fn init_events(vm: &Rc<Instance>) -> Result<()> {
    vm.events.borrow_mut().clear();
    vm.remove_flags(InstanceFlags::HAS_HOOK_EVENT);
    if let Some(listeners) = vm.options().parent_listeners() {
        for (event, handlers) in listeners.iter() {
            for handler in handlers {
                vm.add_listener(event, handler.clone());
            }
        }
    }
    Ok(())
}

impl Instance {
    /// Listen for `event`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// vm.on("saved", |args| {
    ///     tracing::info!(?args, "saved");
    ///     Ok(())
    /// });
    /// vm.emit("saved", &[json!(42)])?;
    /// ```
    pub fn on(&self, event: &str, handler: impl Fn(&[Value]) -> Result<()> + 'static) -> EventHandler {
        let handler: EventHandler = Rc::new(handler);
        self.add_listener(event, handler.clone());
        handler
    }

    pub(crate) fn add_listener(&self, event: &str, handler: EventHandler) {
        self.events.borrow_mut().entry(event.to_owned()).or_default().push(handler);
        if event.starts_with("hook:") {
            self.insert_flags(InstanceFlags::HAS_HOOK_EVENT);
        }
    }

    /// Remove listeners.
    ///
    /// `None` removes everything. `Some(event)` removes every handler of
    /// `event`; use [`off_handler`](Self::off_handler) for a single one.
    pub fn off(&self, event: Option<&str>) {
        let mut events = self.events.borrow_mut();
        match event {
            Some(event) => {
                events.shift_remove(event);
            }
            None => events.clear(),
        }
    }

    /// Remove one handler previously returned by [`on`](Self::on).
    pub fn off_handler(&self, event: &str, handler: &EventHandler) {
        let mut events = self.events.borrow_mut();
        if let Some(handlers) = events.get_mut(event) {
            if let Some(position) = handlers.iter().rposition(|h| Rc::ptr_eq(h, handler)) {
                handlers.remove(position);
            }
        }
    }

    /// Invoke every handler of `event` in registration order.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        let handlers = self.events.borrow().get(event).cloned().unwrap_or_default();
        if handlers.is_empty() && self.diagnostics().is_enabled() {
            let lower = event.to_lowercase();
            if lower != event && self.events.borrow().contains_key(&lower) {
                self.diagnostics().warn(format_args!(
                    "Event \"{lower}\" is emitted in component but the handler is registered for \"{event}\". \
                     Use \"{}\" instead of \"{event}\".",
                    hyphenate(event)
                ));
            }
        }
        for handler in handlers {
            handler(args)?;
        }
        Ok(())
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.events.borrow().get(event).map_or(0, Vec::len)
    }

    /// `$listeners`: what the placeholder vnode passed in.
    pub fn listeners(&self) -> Rc<Listeners> {
        self.options().parent_listeners().unwrap_or_default()
    }
}
