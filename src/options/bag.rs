//! Options bag - a component definition or a resolved `$options`.
//!
//! # Layered lookup
//!
//! An [`Options`] may carry a fallback bag. [`OptionsView::get`] checks the
//! own entries first and reads through to the fallback on a miss, the way an
//! internal child's `$options` reads through to its constructor's options:
//!
//! ```text
//! child.$options { parent, _parentVnode, propsData, ... }
//!        │ miss
//!        ▼
//! Ctor.options { data, created, components, ... }
//! ```
//!
//! # Building
//!
//! ```ignore
//! let options = Options::new()
//!     .with_name("counter")
//!     .with_data(|_| Ok(json!({ "count": 0 })))
//!     .with_hook(LifecycleHook::Created, |vm| {
//!         tracing::info!(uid = vm.uid(), "created");
//!         Ok(())
//!     });
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::instance::Instance;
use crate::vnode::{Listeners, VNode};
use super::assets::{Asset, AssetRegistry};
use super::keys::{self, AssetKind, LifecycleHook};
use super::value::{
    ComputedMap, Definition, HookFn, InjectMap, InjectOptions, MethodsMap, OptionValue, PropOptions,
    PropsMap, RenderFn, WatchHandler, WatchMap,
};

// =============================================================================
// View
// =============================================================================

/// Keyed read access with fallthrough.
pub trait OptionsView {
    /// Look `key` up, falling through to any fallback layer.
    fn get(&self, key: &str) -> Option<OptionValue>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

// =============================================================================
// Options
// =============================================================================

/// An ordered option-name to [`OptionValue`] mapping.
#[derive(Clone, Default)]
pub struct Options {
    entries: RefCell<IndexMap<String, OptionValue>>,
    fallback: Option<Rc<Options>>,
    merged: bool,
}

impl OptionsView for Options {
    fn get(&self, key: &str) -> Option<OptionValue> {
        if let Some(value) = self.get_own(key) {
            return Some(value);
        }
        self.fallback.as_ref().and_then(|fallback| fallback.get(key))
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty bag whose misses read through to `fallback`.
    pub fn inheriting(fallback: Rc<Options>) -> Self {
        Self {
            entries: RefCell::new(IndexMap::new()),
            fallback: Some(fallback),
            merged: false,
        }
    }

    pub fn fallback(&self) -> Option<&Rc<Options>> {
        self.fallback.as_ref()
    }

    /// Whether this bag came out of a merge (mixins and `extends` already applied).
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    pub(crate) fn mark_merged(&mut self) {
        self.merged = true;
    }

    pub fn get_own(&self, key: &str) -> Option<OptionValue> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn contains_own(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Set `key` in place. The bag's identity is unchanged.
    pub fn insert(&self, key: impl Into<String>, value: OptionValue) {
        self.entries.borrow_mut().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<OptionValue> {
        self.entries.borrow_mut().shift_remove(key)
    }

    /// Shallow-assign every own entry of `other` onto this bag.
    pub fn assign(&self, other: &Options) {
        let incoming = other.own_entries();
        let mut entries = self.entries.borrow_mut();
        for (key, value) in incoming {
            entries.insert(key, value);
        }
    }

    /// Own entries in insertion order.
    pub fn own_entries(&self) -> Vec<(String, OptionValue)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Every visible key: own keys first, then fallback keys not shadowed.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        if let Some(fallback) = &self.fallback {
            for key in fallback.keys() {
                if !self.contains_own(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Every visible entry, resolved through the fallback chain.
    pub fn entries(&self) -> Vec<(String, OptionValue)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|value| (key, value)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// A new bag with the same own entries (values shared, not cloned).
    pub fn shallow_copy(&self) -> Options {
        Options {
            entries: RefCell::new(self.entries.borrow().clone()),
            fallback: None,
            merged: self.merged,
        }
    }

    // =========================================================================
    // Typed Reads
    // =========================================================================

    pub fn name(&self) -> Option<String> {
        self.get(keys::NAME).and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Mount target, if `el` is set to something truthy.
    pub fn el(&self) -> Option<String> {
        let el = self.get(keys::EL)?;
        if !el.is_truthy() {
            return None;
        }
        el.as_value().map(|value| match value {
            Value::String(target) => target.clone(),
            other => other.to_string(),
        })
    }

    pub fn is_abstract(&self) -> bool {
        self.get(keys::ABSTRACT).is_some_and(|v| v.is_truthy())
    }

    pub fn hooks(&self, hook: LifecycleHook) -> Option<Rc<[HookFn]>> {
        self.get(hook.as_str()).and_then(|v| v.as_hooks().cloned())
    }

    pub fn assets(&self, kind: AssetKind) -> Option<Rc<AssetRegistry>> {
        self.get(kind.key()).and_then(|v| v.as_assets().cloned())
    }

    pub fn props(&self) -> Option<Rc<PropsMap>> {
        match self.get(keys::PROPS)? {
            OptionValue::Props(props) => Some(props),
            _ => None,
        }
    }

    pub fn methods(&self) -> Option<Rc<MethodsMap>> {
        match self.get(keys::METHODS)? {
            OptionValue::Methods(methods) => Some(methods),
            _ => None,
        }
    }

    pub fn computed(&self) -> Option<Rc<ComputedMap>> {
        match self.get(keys::COMPUTED)? {
            OptionValue::Computed(computed) => Some(computed),
            _ => None,
        }
    }

    pub fn watch(&self) -> Option<Rc<WatchMap>> {
        self.get(keys::WATCH).and_then(|v| v.as_watch().cloned())
    }

    pub fn inject(&self) -> Option<Rc<InjectMap>> {
        match self.get(keys::INJECT)? {
            OptionValue::Inject(inject) => Some(inject),
            _ => None,
        }
    }

    pub fn props_data(&self) -> Option<Map<String, Value>> {
        match self.get(keys::PROPS_DATA)?.as_value()? {
            Value::Object(map) => Some(map.clone()),
            _ => None,
        }
    }

    pub fn parent_instance(&self) -> Option<Rc<Instance>> {
        match self.get(keys::PARENT)? {
            OptionValue::Parent(parent) => parent.upgrade(),
            _ => None,
        }
    }

    pub fn parent_vnode(&self) -> Option<Rc<VNode>> {
        match self.get(keys::PARENT_VNODE)? {
            OptionValue::VNode(vnode) => Some(vnode),
            _ => None,
        }
    }

    pub fn parent_listeners(&self) -> Option<Rc<Listeners>> {
        match self.get(keys::PARENT_LISTENERS)? {
            OptionValue::Listeners(listeners) => Some(listeners),
            _ => None,
        }
    }

    pub fn render_children(&self) -> Option<Rc<[VNode]>> {
        match self.get(keys::RENDER_CHILDREN)? {
            OptionValue::Children(children) => Some(children),
            _ => None,
        }
    }

    pub fn component_tag(&self) -> Option<String> {
        self.get(keys::COMPONENT_TAG).and_then(|v| v.as_str().map(str::to_owned))
    }

    pub fn render(&self) -> Option<RenderFn> {
        match self.get(keys::RENDER)? {
            OptionValue::Render(render) => Some(render),
            _ => None,
        }
    }

    pub fn static_render_fns(&self) -> Option<Rc<[RenderFn]>> {
        match self.get(keys::STATIC_RENDER_FNS)? {
            OptionValue::StaticRenderFns(fns) => Some(fns),
            _ => None,
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Set an arbitrary key.
    pub fn with(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.entries.get_mut().insert(key.into(), value);
        self
    }

    pub fn with_value(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(key, OptionValue::value(value))
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_value(keys::NAME, name.into())
    }

    pub fn with_el(self, target: impl Into<String>) -> Self {
        self.with_value(keys::EL, target.into())
    }

    pub fn with_abstract(self) -> Self {
        self.with_value(keys::ABSTRACT, true)
    }

    /// `data` as a factory.
    pub fn with_data(self, factory: impl Fn(&Rc<Instance>) -> Result<Value> + 'static) -> Self {
        self.with(keys::DATA, OptionValue::Data(Rc::new(factory)))
    }

    /// `data` as a plain object. Only valid on instance-level options.
    pub fn with_data_object(self, data: Value) -> Self {
        self.with_value(keys::DATA, data)
    }

    pub fn with_provide(self, factory: impl Fn(&Rc<Instance>) -> Result<Value> + 'static) -> Self {
        self.with(keys::PROVIDE, OptionValue::Data(Rc::new(factory)))
    }

    pub fn with_provide_object(self, provided: Value) -> Self {
        self.with_value(keys::PROVIDE, provided)
    }

    pub fn with_props_data(self, props_data: Value) -> Self {
        self.with_value(keys::PROPS_DATA, props_data)
    }

    pub fn with_parent(self, parent: &Rc<Instance>) -> Self {
        self.with(keys::PARENT, OptionValue::Parent(Rc::downgrade(parent)))
    }

    pub fn with_render(self, render: impl Fn(&Rc<Instance>) -> Result<VNode> + 'static) -> Self {
        self.with(keys::RENDER, OptionValue::Render(Rc::new(render)))
    }

    /// Append a handler to a lifecycle hook.
    pub fn with_hook(
        mut self,
        hook: LifecycleHook,
        handler: impl Fn(&Rc<Instance>) -> Result<()> + 'static,
    ) -> Self {
        let handler: HookFn = Rc::new(handler);
        let entries = self.entries.get_mut();
        let hooks: Rc<[HookFn]> = match entries.get(hook.as_str()).and_then(|v| v.as_hooks()) {
            Some(existing) => existing.iter().cloned().chain(std::iter::once(handler)).collect(),
            None => Rc::from(vec![handler]),
        };
        entries.insert(hook.as_str().to_owned(), OptionValue::Hooks(hooks));
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, prop: PropOptions) -> Self {
        let mut props = match self.entries.get_mut().get(keys::PROPS) {
            Some(OptionValue::Props(props)) => (**props).clone(),
            _ => PropsMap::new(),
        };
        props.insert(name.into(), prop);
        self.entries.get_mut().insert(keys::PROPS.to_owned(), OptionValue::Props(Rc::new(props)));
        self
    }

    /// `props` in array or object syntax; normalized when merged.
    pub fn with_props_value(self, props: Value) -> Self {
        self.with_value(keys::PROPS, props)
    }

    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Rc<Instance>, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        let mut methods = match self.entries.get_mut().get(keys::METHODS) {
            Some(OptionValue::Methods(methods)) => (**methods).clone(),
            _ => MethodsMap::new(),
        };
        methods.insert(name.into(), Rc::new(method));
        self.entries.get_mut().insert(keys::METHODS.to_owned(), OptionValue::Methods(Rc::new(methods)));
        self
    }

    pub fn with_computed(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&Rc<Instance>) -> Result<Value> + 'static,
    ) -> Self {
        let mut computed = match self.entries.get_mut().get(keys::COMPUTED) {
            Some(OptionValue::Computed(computed)) => (**computed).clone(),
            _ => ComputedMap::new(),
        };
        computed.insert(name.into(), Rc::new(getter));
        self.entries.get_mut().insert(keys::COMPUTED.to_owned(), OptionValue::Computed(Rc::new(computed)));
        self
    }

    pub fn with_watch(mut self, key: impl Into<String>, handler: WatchHandler) -> Self {
        let mut watch = match self.entries.get_mut().get(keys::WATCH) {
            Some(OptionValue::Watch(watch)) => (**watch).clone(),
            _ => WatchMap::new(),
        };
        watch.entry(key.into()).or_default().push(handler);
        self.entries.get_mut().insert(keys::WATCH.to_owned(), OptionValue::Watch(Rc::new(watch)));
        self
    }

    pub fn with_inject(mut self, key: impl Into<String>, inject: InjectOptions) -> Self {
        let mut injections = match self.entries.get_mut().get(keys::INJECT) {
            Some(OptionValue::Inject(inject)) => (**inject).clone(),
            _ => InjectMap::new(),
        };
        injections.insert(key.into(), inject);
        self.entries.get_mut().insert(keys::INJECT.to_owned(), OptionValue::Inject(Rc::new(injections)));
        self
    }

    /// `inject` in array or object syntax; normalized when merged.
    pub fn with_inject_value(self, inject: Value) -> Self {
        self.with_value(keys::INJECT, inject)
    }

    /// Register a local asset.
    pub fn with_asset(mut self, kind: AssetKind, id: impl Into<String>, asset: Asset) -> Self {
        let existing = self.entries.get_mut().get(kind.key()).and_then(|v| v.as_assets()).cloned();
        let registry = match existing {
            Some(registry) => registry,
            None => {
                let registry = Rc::new(AssetRegistry::new());
                self.entries.get_mut().insert(kind.key().to_owned(), OptionValue::Assets(registry.clone()));
                registry
            }
        };
        registry.register(id, asset);
        self
    }

    pub fn with_component(self, id: impl Into<String>, asset: Asset) -> Self {
        self.with_asset(AssetKind::Component, id, asset)
    }

    pub fn with_extends(self, definition: impl Into<Definition>) -> Self {
        self.with(keys::EXTENDS, OptionValue::Extends(definition.into()))
    }

    pub fn with_mixin(mut self, mixin: impl Into<Definition>) -> Self {
        let mixin = mixin.into();
        let mixins: Rc<[Definition]> = match self.entries.get_mut().get(keys::MIXINS) {
            Some(OptionValue::Mixins(existing)) => existing.iter().cloned().chain(std::iter::once(mixin)).collect(),
            _ => Rc::from(vec![mixin]),
        };
        self.entries.get_mut().insert(keys::MIXINS.to_owned(), OptionValue::Mixins(mixins));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("entries", &*self.entries.borrow())
            .field("fallback", &self.fallback.is_some())
            .field("merged", &self.merged)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fallback_lookup() {
        let base = Rc::new(Options::new().with_name("base").with_value("color", "red"));
        let view = Options::inheriting(base.clone());
        view.insert("color", OptionValue::value("blue"));

        assert_eq!(view.name().as_deref(), Some("base"));
        assert_eq!(view.get("color").and_then(|v| v.as_str().map(str::to_owned)).as_deref(), Some("blue"));
        assert!(!view.contains_own("name"));
        assert_eq!(view.keys(), vec!["color".to_string(), "name".to_string()]);
    }

    #[test]
    fn test_with_hook_appends() {
        let options = Options::new()
            .with_hook(LifecycleHook::Created, |_| Ok(()))
            .with_hook(LifecycleHook::Created, |_| Ok(()));

        assert_eq!(options.hooks(LifecycleHook::Created).map(|h| h.len()), Some(2));
        assert!(options.hooks(LifecycleHook::Mounted).is_none());
    }

    #[test]
    fn test_el_requires_truthy_value() {
        assert_eq!(Options::new().with_el("#app").el().as_deref(), Some("#app"));
        assert_eq!(Options::new().with_value("el", json!(null)).el(), None);
    }

    #[test]
    fn test_insert_keeps_identity() {
        let options = Rc::new(Options::new());
        let alias = options.clone();
        options.insert("late", OptionValue::value(1));
        assert!(Rc::ptr_eq(&options, &alias));
        assert!(alias.contains_own("late"));
    }
}
