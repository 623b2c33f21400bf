//! Pluggable construction steps.
//!
//! Construction calls every step through a [`Collaborators`] object owned by
//! the [`Runtime`](crate::Runtime). Each method defaults to the built-in
//! behavior, so an embedder overrides only what it needs:
//!
//! ```ignore
//! struct Headless;
//!
//! impl Collaborators for Headless {
//!     fn mount(&self, vm: &Rc<Instance>, _el: Option<&str>) -> Result<()> {
//!         tracing::info!(uid = vm.uid(), "mount skipped");
//!         Ok(())
//!     }
//! }
//!
//! let runtime = Runtime::with_collaborators(RuntimeConfig::default(), Headless);
//! ```

use std::rc::Rc;

use crate::error::Result;
use crate::instance::{events, inject, lifecycle, proxy, render, state, Instance};
use crate::options::LifecycleHook;

/// The construction steps an instance goes through.
pub trait Collaborators {
    fn init_proxy(&self, vm: &Rc<Instance>) -> Result<()> {
        proxy::init_proxy(vm)
    }

    fn init_lifecycle(&self, vm: &Rc<Instance>) -> Result<()> {
        lifecycle::init_lifecycle(vm)
    }

    fn init_events(&self, vm: &Rc<Instance>) -> Result<()> {
        events::init_events(vm)
    }

    fn init_render(&self, vm: &Rc<Instance>) -> Result<()> {
        render::init_render(vm)
    }

    fn init_injections(&self, vm: &Rc<Instance>) -> Result<()> {
        inject::init_injections(vm)
    }

    fn init_state(&self, vm: &Rc<Instance>) -> Result<()> {
        state::init_state(vm)
    }

    fn init_provide(&self, vm: &Rc<Instance>) -> Result<()> {
        inject::init_provide(vm)
    }

    /// Fire every handler of `hook` bound to `vm`.
    fn call_hook(&self, vm: &Rc<Instance>, hook: LifecycleHook) -> Result<()> {
        lifecycle::call_hook(vm, hook)
    }

    /// Mount `vm` onto `el`. Called by construction when `el` is set.
    fn mount(&self, vm: &Rc<Instance>, el: Option<&str>) -> Result<()> {
        lifecycle::mount_component(vm, el)
    }
}

/// The built-in steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCollaborators;

impl Collaborators for DefaultCollaborators {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use crate::config::RuntimeConfig;
    use crate::instance::InitStage;
    use crate::options::Options;
    use crate::runtime::Runtime;

    #[derive(Default)]
    struct Recording {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl Collaborators for Recording {
        fn init_state(&self, vm: &Rc<Instance>) -> Result<()> {
            self.calls.borrow_mut().push("state".into());
            state::init_state(vm)
        }

        fn call_hook(&self, vm: &Rc<Instance>, hook: LifecycleHook) -> Result<()> {
            self.calls.borrow_mut().push(hook.as_str().into());
            lifecycle::call_hook(vm, hook)
        }

        fn mount(&self, _vm: &Rc<Instance>, el: Option<&str>) -> Result<()> {
            self.calls.borrow_mut().push(format!("mount:{}", el.unwrap_or_default()));
            Ok(())
        }
    }

    #[test]
    fn test_overridden_steps_are_used() {
        let recording = Recording::default();
        let calls = recording.calls.clone();
        let runtime = Runtime::with_collaborators(RuntimeConfig::default().diagnostics(false), recording);

        let vm = runtime.new_instance(Options::new().with_el("#app")).unwrap();

        assert_eq!(*calls.borrow(), vec!["beforeCreate", "state", "created", "mount:#app"]);
        assert_eq!(vm.stage(), InitStage::CreatedHookFired);
        assert!(!vm.is_mounted());
    }

    #[test]
    fn test_lifecycle_failure_reported_after_events_and_render() {
        #[derive(Default)]
        struct FailingLifecycle {
            calls: Rc<RefCell<Vec<&'static str>>>,
        }

        impl Collaborators for FailingLifecycle {
            fn init_lifecycle(&self, _vm: &Rc<Instance>) -> Result<()> {
                self.calls.borrow_mut().push("lifecycle");
                Err(crate::error::Error::msg("no parent"))
            }

            fn init_events(&self, vm: &Rc<Instance>) -> Result<()> {
                self.calls.borrow_mut().push("events");
                events::init_events(vm)
            }

            fn init_render(&self, vm: &Rc<Instance>) -> Result<()> {
                self.calls.borrow_mut().push("render");
                render::init_render(vm)
            }

            fn call_hook(&self, _vm: &Rc<Instance>, hook: LifecycleHook) -> Result<()> {
                self.calls.borrow_mut().push(hook.as_str());
                Ok(())
            }
        }

        let collaborators = FailingLifecycle::default();
        let calls = collaborators.calls.clone();
        let runtime = Runtime::with_collaborators(RuntimeConfig::default().diagnostics(false), collaborators);
        let err = runtime.new_instance(Options::new()).unwrap_err();

        assert_eq!(err.to_string(), "no parent");
        assert_eq!(*calls.borrow(), vec!["lifecycle", "events", "render"]);
    }
}
