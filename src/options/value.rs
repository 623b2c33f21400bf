//! Option values.
//!
//! An [`OptionValue`] is whatever a component definition can hold under a
//! key. Identity matters: the resolver and the modified-option detector
//! compare values with [`OptionValue::same`], which is pointer identity for
//! everything reference-counted and value equality for JSON scalars.

use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::ComponentDescriptor;
use crate::error::Result;
use crate::instance::Instance;
use crate::vnode::{Listeners, VNode};
use super::assets::AssetRegistry;
use super::bag::Options;

// =============================================================================
// Callback Types
// =============================================================================

/// Lifecycle hook handler, bound to the instance it runs for.
pub type HookFn = Rc<dyn Fn(&Rc<Instance>) -> Result<()>>;

/// `data` / `provide` factory. Must produce a JSON object.
pub type DataFn = Rc<dyn Fn(&Rc<Instance>) -> Result<Value>>;

/// Instance method.
pub type MethodFn = Rc<dyn Fn(&Rc<Instance>, &[Value]) -> Result<Value>>;

/// Computed property getter. Evaluated on every access.
pub type ComputedFn = Rc<dyn Fn(&Rc<Instance>) -> Result<Value>>;

/// Render function producing the instance's root vnode.
pub type RenderFn = Rc<dyn Fn(&Rc<Instance>) -> Result<VNode>>;

/// Filter registered in a `filters` registry.
pub type FilterFn = Rc<dyn Fn(&Value) -> Value>;

/// Watch callback: `(instance, new, old)`.
pub type WatchCallback = Rc<dyn Fn(&Rc<Instance>, &Value, &Value) -> Result<()>>;

// =============================================================================
// Structured Option Entries
// =============================================================================

/// What a watcher invokes when its key changes.
#[derive(Clone)]
pub enum WatchTarget {
    Callback(WatchCallback),
    /// Name of a method on the instance, called with `[new, old]`.
    Method(String),
}

/// One handler registered under a `watch` key.
#[derive(Clone)]
pub struct WatchHandler {
    pub target: WatchTarget,
    /// Fire once during state initialization with the initial value.
    pub immediate: bool,
}

impl WatchHandler {
    pub fn new(callback: impl Fn(&Rc<Instance>, &Value, &Value) -> Result<()> + 'static) -> Self {
        Self {
            target: WatchTarget::Callback(Rc::new(callback)),
            immediate: false,
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self {
            target: WatchTarget::Method(name.into()),
            immediate: false,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub(crate) fn same(&self, other: &WatchHandler) -> bool {
        match (&self.target, &other.target) {
            (WatchTarget::Callback(a), WatchTarget::Callback(b)) => Rc::ptr_eq(a, b),
            (WatchTarget::Method(a), WatchTarget::Method(b)) => a == b,
            _ => false,
        }
    }
}

/// Declared prop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropOptions {
    /// Accepted type names. Empty means any.
    pub types: Vec<String>,
    pub default: Option<Value>,
    pub required: bool,
}

impl PropOptions {
    pub fn with_default(default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::default()
        }
    }

    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }
}

/// Declared injection.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectOptions {
    /// Provided key to look up on ancestors.
    pub from: String,
    pub default: Option<Value>,
}

impl InjectOptions {
    pub fn from(key: impl Into<String>) -> Self {
        Self {
            from: key.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

pub type PropsMap = IndexMap<String, PropOptions>;
pub type MethodsMap = IndexMap<String, MethodFn>;
pub type ComputedMap = IndexMap<String, ComputedFn>;
pub type InjectMap = IndexMap<String, InjectOptions>;
pub type WatchMap = IndexMap<String, Vec<WatchHandler>>;

/// A definition usable under `extends` or `mixins`.
#[derive(Clone)]
pub enum Definition {
    Options(Rc<Options>),
    Descriptor(Rc<ComponentDescriptor>),
}

impl Definition {
    /// The options this definition contributes to a merge.
    pub fn options(&self) -> Rc<Options> {
        match self {
            Definition::Options(options) => options.clone(),
            Definition::Descriptor(descriptor) => descriptor.options(),
        }
    }

    fn same(&self, other: &Definition) -> bool {
        match (self, other) {
            (Definition::Options(a), Definition::Options(b)) => Rc::ptr_eq(a, b),
            (Definition::Descriptor(a), Definition::Descriptor(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Options> for Definition {
    fn from(options: Options) -> Self {
        Definition::Options(Rc::new(options))
    }
}

impl From<Rc<ComponentDescriptor>> for Definition {
    fn from(descriptor: Rc<ComponentDescriptor>) -> Self {
        Definition::Descriptor(descriptor)
    }
}

// =============================================================================
// Option Value
// =============================================================================

/// A value stored under an option key.
#[derive(Clone)]
pub enum OptionValue {
    /// Plain JSON data (`name`, `el`, `propsData`, application keys, ...).
    Value(Rc<Value>),
    Hooks(Rc<[HookFn]>),
    /// `data` or `provide` factory.
    Data(DataFn),
    Assets(Rc<AssetRegistry>),
    Watch(Rc<WatchMap>),
    Props(Rc<PropsMap>),
    Methods(Rc<MethodsMap>),
    Computed(Rc<ComputedMap>),
    Inject(Rc<InjectMap>),
    Render(RenderFn),
    StaticRenderFns(Rc<[RenderFn]>),
    Extends(Definition),
    Mixins(Rc<[Definition]>),
    /// Owning parent instance.
    Parent(Weak<Instance>),
    VNode(Rc<VNode>),
    Listeners(Rc<Listeners>),
    Children(Rc<[VNode]>),
}

impl OptionValue {
    pub fn value(value: impl Into<Value>) -> Self {
        OptionValue::Value(Rc::new(value.into()))
    }

    /// Identity comparison.
    ///
    /// Reference-counted values are the same only if they share an
    /// allocation. JSON scalars compare by value; JSON objects and arrays by
    /// allocation.
    pub fn same(&self, other: &OptionValue) -> bool {
        use OptionValue as O;
        match (self, other) {
            (O::Value(a), O::Value(b)) => {
                Rc::ptr_eq(a, b) || (!a.is_object() && !a.is_array() && a == b)
            }
            (O::Hooks(a), O::Hooks(b)) => Rc::ptr_eq(a, b),
            (O::Data(a), O::Data(b)) => Rc::ptr_eq(a, b),
            (O::Assets(a), O::Assets(b)) => Rc::ptr_eq(a, b),
            (O::Watch(a), O::Watch(b)) => Rc::ptr_eq(a, b),
            (O::Props(a), O::Props(b)) => Rc::ptr_eq(a, b),
            (O::Methods(a), O::Methods(b)) => Rc::ptr_eq(a, b),
            (O::Computed(a), O::Computed(b)) => Rc::ptr_eq(a, b),
            (O::Inject(a), O::Inject(b)) => Rc::ptr_eq(a, b),
            (O::Render(a), O::Render(b)) => Rc::ptr_eq(a, b),
            (O::StaticRenderFns(a), O::StaticRenderFns(b)) => Rc::ptr_eq(a, b),
            (O::Extends(a), O::Extends(b)) => a.same(b),
            (O::Mixins(a), O::Mixins(b)) => Rc::ptr_eq(a, b),
            (O::Parent(a), O::Parent(b)) => Weak::ptr_eq(a, b),
            (O::VNode(a), O::VNode(b)) => Rc::ptr_eq(a, b),
            (O::Listeners(a), O::Listeners(b)) => Rc::ptr_eq(a, b),
            (O::Children(a), O::Children(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            OptionValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_hooks(&self) -> Option<&Rc<[HookFn]>> {
        match self {
            OptionValue::Hooks(hooks) => Some(hooks),
            _ => None,
        }
    }

    pub fn as_assets(&self) -> Option<&Rc<AssetRegistry>> {
        match self {
            OptionValue::Assets(registry) => Some(registry),
            _ => None,
        }
    }

    pub fn as_watch(&self) -> Option<&Rc<WatchMap>> {
        match self {
            OptionValue::Watch(watch) => Some(watch),
            _ => None,
        }
    }

    /// JavaScript-style truthiness for plain values; structured values are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Value(value) => match value.as_ref() {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                Value::String(s) => !s.is_empty(),
                _ => true,
            },
            _ => true,
        }
    }

    /// Short name of the variant, for diagnostics and `Debug`.
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::Value(_) => "value",
            OptionValue::Hooks(_) => "hooks",
            OptionValue::Data(_) => "factory",
            OptionValue::Assets(_) => "assets",
            OptionValue::Watch(_) => "watch",
            OptionValue::Props(_) => "props",
            OptionValue::Methods(_) => "methods",
            OptionValue::Computed(_) => "computed",
            OptionValue::Inject(_) => "inject",
            OptionValue::Render(_) => "render",
            OptionValue::StaticRenderFns(_) => "static-render-fns",
            OptionValue::Extends(_) => "extends",
            OptionValue::Mixins(_) => "mixins",
            OptionValue::Parent(_) => "parent",
            OptionValue::VNode(_) => "vnode",
            OptionValue::Listeners(_) => "listeners",
            OptionValue::Children(_) => "children",
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        OptionValue::Value(Rc::new(value))
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Value(value) => write!(f, "Value({value})"),
            OptionValue::Hooks(hooks) => write!(f, "Hooks(len={})", hooks.len()),
            OptionValue::Props(props) => f.debug_tuple("Props").field(&props.keys().collect::<Vec<_>>()).finish(),
            OptionValue::Watch(watch) => f.debug_tuple("Watch").field(&watch.keys().collect::<Vec<_>>()).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_identity_is_value_equality() {
        assert!(OptionValue::value("a").same(&OptionValue::value("a")));
        assert!(!OptionValue::value(1).same(&OptionValue::value(2)));
    }

    #[test]
    fn test_object_identity_is_pointer_equality() {
        let a = OptionValue::value(json!({ "x": 1 }));
        let b = OptionValue::value(json!({ "x": 1 }));
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn test_truthiness() {
        assert!(!OptionValue::value(Value::Null).is_truthy());
        assert!(!OptionValue::value("").is_truthy());
        assert!(OptionValue::value("#app").is_truthy());
        assert!(!OptionValue::value(0).is_truthy());
    }
}
