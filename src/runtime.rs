//! The runtime: uid counters, the base descriptor and global registration.
//!
//! Everything process-global in a component system lives on a [`Runtime`]
//! instead. Instances and descriptors carry a handle to the runtime that
//! created them, so two runtimes never share uids, registries or mixins.
//!
//! # Example
//!
//! ```ignore
//! let runtime = Runtime::with_config(RuntimeConfig::default().diagnostics(true));
//! runtime.component("counter", Options::new().with_data(|_| Ok(json!({ "count": 0 }))));
//! let app = runtime.new_instance(Options::new().with_el("#app").with_render(|vm| {
//!     Ok(vm.create_element("counter", vec![]))
//! }))?;
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::collaborators::{Collaborators, DefaultCollaborators};
use crate::config::RuntimeConfig;
use crate::descriptor::ComponentDescriptor;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::instance::Instance;
use crate::options::keys::NAME;
use crate::options::{
    merge_options, validate_component_name, Asset, AssetKind, AssetRegistry, Definition, MergeContext,
    OptionValue, Options,
};

// =============================================================================
// Uid Counter
// =============================================================================

/// Monotonic id source. Ids start at 0 and are never reused.
#[derive(Debug, Default)]
pub struct UidCounter {
    next: Cell<u64>,
}

impl UidCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next id.
    pub fn next(&self) -> u64 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }

    /// The id the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> u64 {
        self.next.get()
    }
}

// =============================================================================
// Runtime
// =============================================================================

struct RuntimeInner {
    config: RuntimeConfig,
    diagnostics: Diagnostics,
    uids: UidCounter,
    base: Rc<ComponentDescriptor>,
    collaborators: Rc<dyn Collaborators>,
    /// Descriptors extended from raw definitions found in registries.
    definitions: RefCell<Vec<(Rc<Options>, Rc<ComponentDescriptor>)>>,
}

/// Shared handle to a component runtime. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime with the default config and built-in collaborators.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_collaborators(config, DefaultCollaborators)
    }

    /// A runtime whose construction steps run through `collaborators`.
    pub fn with_collaborators(config: RuntimeConfig, collaborators: impl Collaborators + 'static) -> Self {
        let diagnostics = Diagnostics::from_config(&config);
        let base_options = AssetKind::ALL.into_iter().fold(Options::new(), |options, kind| {
            options.with(kind.key(), OptionValue::Assets(Rc::new(AssetRegistry::new())))
        });
        let base = ComponentDescriptor::base(base_options, Rc::new(UidCounter::new()), diagnostics.clone());
        tracing::debug!(
            diagnostics = config.diagnostics_enabled,
            performance = config.performance,
            "runtime created"
        );
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                diagnostics,
                uids: UidCounter::new(),
                base,
                collaborators: Rc::new(collaborators),
                definitions: RefCell::new(Vec::new()),
            }),
        }
    }

    // =========================================================================
    // Global API
    // =========================================================================

    /// The root descriptor every component derives from.
    pub fn base(&self) -> &Rc<ComponentDescriptor> {
        &self.inner.base
    }

    /// Derive a component type from the base descriptor.
    pub fn extend(&self, options: Options) -> Rc<ComponentDescriptor> {
        self.inner.base.extend(options)
    }

    /// The descriptor for a raw definition, extending it on first use.
    pub(crate) fn extend_definition(&self, definition: &Rc<Options>) -> Rc<ComponentDescriptor> {
        let cached = self
            .inner
            .definitions
            .borrow()
            .iter()
            .find(|(options, _)| Rc::ptr_eq(options, definition))
            .map(|(_, descriptor)| descriptor.clone());
        if let Some(descriptor) = cached {
            return descriptor;
        }
        let descriptor = self.extend(definition.shallow_copy());
        self.inner
            .definitions
            .borrow_mut()
            .push((definition.clone(), descriptor.clone()));
        descriptor
    }

    /// Register a component globally.
    ///
    /// Raw options are extended from the base first, taking `id` as their
    /// name unless they carry one.
    pub fn component(&self, id: &str, definition: impl Into<Definition>) -> Rc<ComponentDescriptor> {
        validate_component_name(id, &self.inner.diagnostics);
        let descriptor = match definition.into() {
            Definition::Descriptor(descriptor) => descriptor,
            Definition::Options(options) => {
                let options = options.shallow_copy();
                if options.name().is_none() {
                    options.insert(NAME, OptionValue::value(id));
                }
                self.extend(options)
            }
        };
        self.inner.base.register(AssetKind::Component, id, Asset::Component(descriptor.clone()));
        descriptor
    }

    /// Register a directive globally.
    pub fn directive(&self, id: &str, definition: Options) {
        self.inner
            .base
            .register(AssetKind::Directive, id, Asset::Definition(Rc::new(definition)));
    }

    /// Register a filter globally.
    pub fn filter(&self, id: &str, filter: impl Fn(&Value) -> Value + 'static) {
        self.inner.base.register(AssetKind::Filter, id, Asset::Filter(Rc::new(filter)));
    }

    /// A globally registered asset, looked up by exact id.
    pub fn registered(&self, kind: AssetKind, id: &str) -> Option<Asset> {
        self.inner.base.options().assets(kind)?.get(id)
    }

    /// Merge `mixin` into the base options.
    ///
    /// The base gets a new options bag, so every descriptor re-resolves the
    /// next time it is instantiated.
    pub fn mixin(&self, mixin: Options) {
        let base = &self.inner.base;
        let merged = merge_options(&base.options(), &mixin, MergeContext::extend(&self.inner.diagnostics));
        base.replace_options(merged);
        tracing::debug!(cid = base.cid(), "global mixin applied");
    }

    /// Construct a root instance of the base descriptor.
    pub fn new_instance(&self, options: Options) -> Result<Rc<Instance>> {
        Instance::new(self, &self.inner.base, options)
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Take the next instance uid.
    pub fn next_uid(&self) -> u64 {
        self.inner.uids.next()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    pub fn collaborators(&self) -> &Rc<dyn Collaborators> {
        &self.inner.collaborators
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("next_uid", &self.inner.uids.peek())
            .field("base", &self.inner.base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::options::{LifecycleHook, OptionsView};

    fn runtime() -> Runtime {
        Runtime::with_config(RuntimeConfig::default().diagnostics(false))
    }

    #[test]
    fn test_uid_counter() {
        let counter = UidCounter::new();
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.peek(), 2);
    }

    #[test]
    fn test_runtimes_are_isolated() {
        let a = runtime();
        let b = runtime();
        a.component("only-a", Options::new());

        assert!(a.registered(AssetKind::Component, "only-a").is_some());
        assert!(b.registered(AssetKind::Component, "only-a").is_none());
        assert_eq!(a.new_instance(Options::new()).unwrap().uid(), 0);
        assert_eq!(b.new_instance(Options::new()).unwrap().uid(), 0);
    }

    #[test]
    fn test_component_takes_id_as_name() {
        let runtime = runtime();
        let card = runtime.component("card", Options::new());
        let named = runtime.component("alias", Options::new().with_name("real"));

        assert_eq!(card.name().as_deref(), Some("card"));
        assert_eq!(named.name().as_deref(), Some("real"));
        let registered = runtime.registered(AssetKind::Component, "card").and_then(|a| a.descriptor());
        assert!(registered.is_some_and(|d| Rc::ptr_eq(&d, &card)));
    }

    #[test]
    fn test_component_accepts_descriptor() {
        let runtime = runtime();
        let ctor = runtime.extend(Options::new().with_name("panel"));
        let registered = runtime.component("panel", ctor.clone());
        assert!(Rc::ptr_eq(&registered, &ctor));
    }

    #[test]
    fn test_global_registration_visible_to_existing_components() {
        let runtime = runtime();
        let ctor = runtime.extend(Options::new());
        runtime.filter("trim", |v: &Value| json!(v.as_str().map(str::trim)));

        let registry = ctor.options().assets(AssetKind::Filter).unwrap();
        assert!(registry.resolve("trim").is_some());
    }

    #[test]
    fn test_directive_registration() {
        let runtime = runtime();
        runtime.directive("focus", Options::new().with_value("bind", true));
        assert!(matches!(
            runtime.registered(AssetKind::Directive, "focus"),
            Some(Asset::Definition(_))
        ));
    }

    #[test]
    fn test_mixin_reaches_existing_descriptors() {
        let runtime = runtime();
        let ctor = runtime.extend(Options::new().with_hook(LifecycleHook::Created, |_| Ok(())));
        let before = ctor.resolve_options();

        runtime.mixin(Options::new().with_value("flavor", "vanilla").with_hook(LifecycleHook::Created, |_| Ok(())));
        let after = ctor.resolve_options();

        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(after.get("flavor").and_then(|v| v.as_str().map(str::to_owned)).as_deref(), Some("vanilla"));
        assert_eq!(after.hooks(LifecycleHook::Created).map(|h| h.len()), Some(2));
    }

    #[test]
    fn test_extend_definition_cached() {
        let runtime = runtime();
        let definition = Rc::new(Options::new().with_name("lazy"));
        let first = runtime.extend_definition(&definition);
        let second = runtime.extend_definition(&definition);
        assert!(Rc::ptr_eq(&first, &second));
    }
}
