//! Reactive state: props, methods, data, computed and watchers.
//!
//! Props, data and injections are stored as `spark_signals` signals, so
//! effects reading them through [`Instance::get`] track them. Computed
//! properties are evaluated on access. Watchers compare the watched path
//! before and after every [`Instance::set`] and fire when it changed.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use spark_signals::{signal, Signal};

use crate::error::{Error, Result};
use crate::options::keys::{self, hyphenate, is_reserved_key};
use crate::options::{
    ComputedMap, MethodsMap, OptionValue, OptionsView, PropOptions, PropsMap, WatchHandler, WatchMap,
    WatchTarget,
};
use super::Instance;

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Prop,
    Data,
    Injected,
}

#[derive(Default)]
pub(crate) struct ReactiveState {
    props: IndexMap<String, Signal<Value>>,
    data: IndexMap<String, Signal<Value>>,
    injected: IndexMap<String, Signal<Value>>,
    methods: Rc<MethodsMap>,
    computed: Rc<ComputedMap>,
    watchers: IndexMap<String, Vec<WatchHandler>>,
    /// Last value seen per watched path.
    watched: IndexMap<String, Value>,
}

impl ReactiveState {
    pub(crate) fn set_injected(&mut self, values: Map<String, Value>) {
        self.injected = values.into_iter().map(|(key, value)| (key, signal(value))).collect();
    }

    /// Signal behind `key`. Data keys starting with `$` or `_` are not
    /// reachable this way.
    fn find(&self, key: &str) -> Option<(Signal<Value>, Origin)> {
        if let Some(prop) = self.props.get(key) {
            return Some((prop.clone(), Origin::Prop));
        }
        if !is_reserved_key(key) {
            if let Some(data) = self.data.get(key) {
                return Some((data.clone(), Origin::Data));
            }
        }
        self.injected.get(key).map(|injected| (injected.clone(), Origin::Injected))
    }

    fn declares(&self, key: &str) -> bool {
        self.find(key).is_some() || self.computed.contains_key(key) || self.methods.contains_key(key)
    }

    pub(crate) fn clear_watchers(&mut self) {
        self.watchers.clear();
        self.watched.clear();
    }
}

// =============================================================================
// Initialization
// =============================================================================

/// Initialize props, methods, data, computed and watch, in that order.
pub(crate) fn init_state(vm: &Rc<Instance>) -> Result<()> {
    let options = vm.options();
    if let Some(props) = options.props() {
        init_props(vm, &props, options.props_data().unwrap_or_default());
    }
    if let Some(methods) = options.methods() {
        init_methods(vm, methods);
    }
    init_data(vm)?;
    if let Some(computed) = options.computed() {
        init_computed(vm, &computed);
    }
    if let Some(watch) = options.watch() {
        init_watch(vm, &watch)?;
    }
    Ok(())
}

fn init_props(vm: &Rc<Instance>, props: &PropsMap, props_data: Map<String, Value>) {
    let mut signals = IndexMap::new();
    for (key, prop) in props {
        let provided = props_data.get(key).or_else(|| props_data.get(&hyphenate(key))).cloned();
        let value = match provided {
            Some(value) => value,
            None => {
                if prop.required {
                    vm.diagnostics().warn(format_args!("Missing required prop: \"{key}\""));
                }
                default_prop_value(prop)
            }
        };
        if !value.is_null() && !prop.types.is_empty() && !prop.types.iter().any(|t| type_matches(t, &value)) {
            vm.diagnostics().warn(format_args!(
                "Invalid prop: type check failed for prop \"{key}\". Expected {}, got {}",
                prop.types.join(", "),
                type_name(&value)
            ));
        }
        signals.insert(key.clone(), signal(value));
    }
    vm.state.borrow_mut().props = signals;
}

fn default_prop_value(prop: &PropOptions) -> Value {
    match &prop.default {
        Some(default) => default.clone(),
        None if prop.types.iter().any(|t| t == "Boolean") => Value::Bool(false),
        None => Value::Null,
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "String" | "Number" | "Boolean" | "Array" | "Object" => type_name(value) == expected,
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn init_methods(vm: &Rc<Instance>, methods: Rc<MethodsMap>) {
    let diagnostics = vm.diagnostics();
    if diagnostics.is_enabled() {
        let state = vm.state.borrow();
        for key in methods.keys() {
            if state.props.contains_key(key) {
                diagnostics.warn(format_args!("Method \"{key}\" has already been defined as a prop."));
            }
            if is_reserved_key(key) {
                diagnostics.warn(format_args!(
                    "Method \"{key}\" conflicts with an existing instance method. \
                     Avoid defining component methods that start with _ or $."
                ));
            }
        }
    }
    vm.state.borrow_mut().methods = methods;
}

fn init_data(vm: &Rc<Instance>) -> Result<()> {
    let data = match vm.options().get(keys::DATA) {
        Some(OptionValue::Data(factory)) => factory(vm).map_err(|source| Error::Data {
            uid: vm.uid(),
            source: Box::new(source),
        })?,
        Some(OptionValue::Value(value)) => (*value).clone(),
        Some(other) => {
            vm.diagnostics().warn(format_args!(
                "Invalid value for option \"data\": expected a factory, but got {}.",
                other.kind()
            ));
            Value::Null
        }
        None => Value::Null,
    };
    let data = match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            vm.diagnostics().warn(format_args!("data functions should return an object, got {other}"));
            Map::new()
        }
    };

    let diagnostics = vm.diagnostics();
    let mut state = vm.state.borrow_mut();
    for key in data.keys() {
        if state.methods.contains_key(key) {
            diagnostics.warn(format_args!("Method \"{key}\" has already been defined as a data property."));
        }
        if state.props.contains_key(key) {
            diagnostics.warn(format_args!(
                "The data property \"{key}\" is already declared as a prop. Use prop default value instead."
            ));
        }
    }
    state.data = data.into_iter().map(|(key, value)| (key, signal(value))).collect();
    Ok(())
}

fn init_computed(vm: &Rc<Instance>, computed: &ComputedMap) {
    let diagnostics = vm.diagnostics();
    let mut state = vm.state.borrow_mut();
    let mut accepted = ComputedMap::new();
    for (key, getter) in computed {
        let conflict = if state.data.contains_key(key) {
            Some("in data")
        } else if state.props.contains_key(key) {
            Some("as a prop")
        } else if state.methods.contains_key(key) {
            Some("as a method")
        } else {
            None
        };
        match conflict {
            Some(place) => diagnostics.warn(format_args!("The computed property \"{key}\" is already defined {place}.")),
            None => {
                accepted.insert(key.clone(), getter.clone());
            }
        }
    }
    state.computed = Rc::new(accepted);
}

fn init_watch(vm: &Rc<Instance>, watch: &WatchMap) -> Result<()> {
    for (key, handlers) in watch {
        let current = vm.read_path(key)?;
        {
            let mut state = vm.state.borrow_mut();
            state.watchers.entry(key.clone()).or_default().extend(handlers.iter().cloned());
            state.watched.insert(key.clone(), current.clone());
        }
        for handler in handlers.iter().filter(|handler| handler.immediate) {
            run_watcher(vm, key, handler, &current, &Value::Null)?;
        }
    }
    Ok(())
}

fn run_watcher(vm: &Rc<Instance>, key: &str, handler: &WatchHandler, new: &Value, old: &Value) -> Result<()> {
    let outcome = match &handler.target {
        WatchTarget::Callback(callback) => callback(vm, new, old),
        WatchTarget::Method(method) => vm.call_method(method, &[new.clone(), old.clone()]).map(drop),
    };
    outcome.map_err(|source| Error::Watcher {
        key: key.to_owned(),
        source: Box::new(source),
    })
}

// =============================================================================
// Access
// =============================================================================

impl Instance {
    /// Current value of a prop, data property or injection.
    pub fn get(&self, key: &str) -> Option<Value> {
        let (signal, _) = self.state.borrow().find(key)?;
        Some(signal.get())
    }

    /// Evaluate the computed property `key`.
    pub fn computed(&self, key: &str) -> Result<Option<Value>> {
        let getter = self.state.borrow().computed.get(key).cloned();
        match (getter, self.rc()) {
            (Some(getter), Some(vm)) => getter(&vm).map(Some),
            _ => Ok(None),
        }
    }

    /// [`get`](Self::get), then computed properties.
    pub fn read(&self, key: &str) -> Result<Option<Value>> {
        match self.get(key) {
            Some(value) => Ok(Some(value)),
            None => self.computed(key),
        }
    }

    /// Read a dotted path such as `user.name`. Missing segments read as null.
    pub fn read_path(&self, path: &str) -> Result<Value> {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        let mut value = self.read(head)?.unwrap_or(Value::Null);
        for segment in segments {
            value = match &value {
                Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index).cloned())
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
        }
        Ok(value)
    }

    /// Whether `key` is a declared prop, data property, injection, computed
    /// property or method.
    pub fn declares(&self, key: &str) -> bool {
        self.state.borrow().declares(key)
    }

    /// Assign `value` to a prop, data property or injection, then run every
    /// watcher whose path changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let found = self.state.borrow().find(key);
        let Some((signal, origin)) = found else {
            return Err(Error::UnknownProperty(key.to_owned()));
        };
        match origin {
            Origin::Prop if self.parent().is_some() => self.diagnostics().warn(format_args!(
                "Avoid mutating a prop directly since the value will be overwritten whenever the parent \
                 component re-renders. Prop being mutated: \"{key}\""
            )),
            Origin::Injected => self.diagnostics().warn(format_args!(
                "Avoid mutating an injected value directly since the changes will be overwritten whenever \
                 the provided component re-renders. Injection being mutated: \"{key}\""
            )),
            _ => {}
        }
        if signal.get() == value {
            return Ok(());
        }
        signal.set(value);
        self.notify_watchers()
    }

    fn notify_watchers(&self) -> Result<()> {
        let Some(vm) = self.rc() else {
            return Ok(());
        };
        let paths: Vec<String> = self.state.borrow().watched.keys().cloned().collect();
        for path in paths {
            let new = vm.read_path(&path)?;
            let old = self.state.borrow_mut().watched.insert(path.clone(), new.clone()).unwrap_or(Value::Null);
            if old == new {
                continue;
            }
            let handlers = self.state.borrow().watchers.get(&path).cloned().unwrap_or_default();
            for handler in &handlers {
                run_watcher(&vm, &path, handler, &new, &old)?;
            }
        }
        Ok(())
    }

    /// Register a watcher after construction.
    pub fn watch(&self, path: &str, handler: WatchHandler) -> Result<()> {
        let Some(vm) = self.rc() else {
            return Ok(());
        };
        let current = vm.read_path(path)?;
        {
            let mut state = self.state.borrow_mut();
            state.watchers.entry(path.to_owned()).or_default().push(handler.clone());
            state.watched.entry(path.to_owned()).or_insert_with(|| current.clone());
        }
        if handler.immediate {
            run_watcher(&vm, path, &handler, &current, &Value::Null)?;
        }
        Ok(())
    }

    /// Call the method `name`.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value> {
        let method = self.state.borrow().methods.get(name).cloned();
        match (method, self.rc()) {
            (Some(method), Some(vm)) => method(&vm, args),
            _ => Err(Error::UnknownMethod(name.to_owned())),
        }
    }

    /// `$data`: every data property, including `$`/`_`-prefixed ones.
    pub fn data(&self) -> Map<String, Value> {
        let state = self.state.borrow();
        state.data.iter().map(|(key, signal)| (key.clone(), signal.get())).collect()
    }

    /// `$props`.
    pub fn props(&self) -> Map<String, Value> {
        let state = self.state.borrow();
        state.props.iter().map(|(key, signal)| (key.clone(), signal.get())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::config::RuntimeConfig;
    use crate::options::{Options, PropOptions};
    use crate::runtime::Runtime;
    use crate::vnode::VNode;

    fn quiet() -> Runtime {
        Runtime::with_config(RuntimeConfig::default().diagnostics(false))
    }

    fn collecting() -> (Runtime, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let config = RuntimeConfig::default()
            .diagnostics(true)
            .on_warn(move |m| sink.borrow_mut().push(m.to_string()));
        (Runtime::with_config(config), seen)
    }

    #[test]
    fn test_data_factory_sees_props() {
        let options = Options::new()
            .with_prop("start", PropOptions::with_default(5))
            .with_data(|vm| Ok(json!({ "count": vm.get("start") })));

        let vm = quiet().new_instance(options).unwrap();
        assert_eq!(vm.get("count"), Some(json!(5)));
        assert_eq!(vm.props(), json!({ "start": 5 }).as_object().cloned().unwrap());
    }

    #[test]
    fn test_props_from_props_data() {
        let options = Options::new()
            .with_props_value(json!(["my-label", "flag"]))
            .with_props_data(json!({ "myLabel": "hi" }));

        let vm = quiet().new_instance(options).unwrap();
        assert_eq!(vm.get("myLabel"), Some(json!("hi")));
        assert_eq!(vm.get("flag"), Some(Value::Null));
    }

    #[test]
    fn test_prop_checks_warn() {
        let (runtime, seen) = collecting();
        let options = Options::new()
            .with_prop("needed", PropOptions::required())
            .with_prop(
                "size",
                PropOptions {
                    types: vec!["Number".into()],
                    ..PropOptions::default()
                },
            )
            .with_prop(
                "on",
                PropOptions {
                    types: vec!["Boolean".into()],
                    ..PropOptions::default()
                },
            )
            .with_props_data(json!({ "size": "big" }));

        let vm = runtime.new_instance(options).unwrap();

        assert_eq!(vm.get("on"), Some(json!(false)));
        let seen = seen.borrow();
        assert!(seen.iter().any(|m| m == "Missing required prop: \"needed\""));
        assert!(seen.iter().any(|m| m.contains("type check failed for prop \"size\". Expected Number, got String")));
    }

    #[test]
    fn test_methods_and_computed() {
        let options = Options::new()
            .with_data(|_| Ok(json!({ "count": 2 })))
            .with_method("double", |vm, _| Ok(json!(vm.get("count").and_then(|v| v.as_i64()).unwrap_or(0) * 2)))
            .with_computed("doubled", |vm| vm.call_method("double", &[]));

        let vm = quiet().new_instance(options).unwrap();

        assert_eq!(vm.computed("doubled").unwrap(), Some(json!(4)));
        vm.set("count", 5).unwrap();
        assert_eq!(vm.read("doubled").unwrap(), Some(json!(10)));
        assert!(matches!(vm.call_method("missing", &[]), Err(Error::UnknownMethod(_))));
    }

    #[test]
    fn test_conflicts_warn() {
        let (runtime, seen) = collecting();
        let options = Options::new()
            .with_prop("shared", PropOptions::default())
            .with_method("shared", |_, _| Ok(Value::Null))
            .with_method("_private", |_, _| Ok(Value::Null))
            .with_data(|_| Ok(json!({ "shared": 1, "count": 0 })))
            .with_computed("count", |_| Ok(Value::Null));

        runtime.new_instance(options).unwrap();

        let seen = seen.borrow();
        assert!(seen.iter().any(|m| m == "Method \"shared\" has already been defined as a prop."));
        assert!(seen.iter().any(|m| m.starts_with("Method \"_private\" conflicts")));
        assert!(seen.iter().any(|m| m == "Method \"shared\" has already been defined as a data property."));
        assert!(seen.iter().any(|m| m.starts_with("The data property \"shared\" is already declared as a prop")));
        assert!(seen.iter().any(|m| m == "The computed property \"count\" is already defined in data."));
    }

    #[test]
    fn test_non_object_data_warns() {
        let (runtime, seen) = collecting();
        let vm = runtime.new_instance(Options::new().with_data(|_| Ok(json!(3)))).unwrap();

        assert!(vm.data().is_empty());
        assert!(seen.borrow().iter().any(|m| m.starts_with("data functions should return an object")));
    }

    #[test]
    fn test_data_error_wrapped() {
        let err = quiet()
            .new_instance(Options::new().with_data(|_| Err(Error::msg("broken"))))
            .unwrap_err();
        assert!(matches!(err, Error::Data { .. }));
    }

    #[test]
    fn test_reserved_data_only_in_data() {
        let vm = quiet().new_instance(Options::new().with_data(|_| Ok(json!({ "_hidden": 1 })))).unwrap();
        assert_eq!(vm.get("_hidden"), None);
        assert_eq!(vm.data().get("_hidden"), Some(&json!(1)));
    }

    #[test]
    fn test_set_unknown_errors() {
        let vm = quiet().new_instance(Options::new()).unwrap();
        assert!(matches!(vm.set("nope", 1), Err(Error::UnknownProperty(_))));
    }

    #[test]
    fn test_watchers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let options = Options::new()
            .with_data(|_| Ok(json!({ "user": { "name": "a" }, "n": 1 })))
            .with_method("log", move |_, args| {
                sink.borrow_mut().push(format!("method {} <- {}", args[0], args[1]));
                Ok(Value::Null)
            })
            .with_watch("n", WatchHandler::method("log"))
            .with_watch("user.name", WatchHandler::method("log").immediate());

        let vm = quiet().new_instance(options).unwrap();
        vm.set("n", 2).unwrap();
        vm.set("n", 2).unwrap();
        vm.set("user", json!({ "name": "b" })).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                "method \"a\" <- null".to_string(),
                "method 2 <- 1".to_string(),
                "method \"b\" <- \"a\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_watcher_error_wrapped() {
        let options = Options::new()
            .with_data(|_| Ok(json!({ "n": 1 })))
            .with_watch("n", WatchHandler::new(|_, _, _| Err(Error::msg("bad"))));

        let vm = quiet().new_instance(options).unwrap();
        let err = vm.set("n", 2).unwrap_err();
        assert!(matches!(err, Error::Watcher { ref key, .. } if key == "n"));
    }

    #[test]
    fn test_prop_mutation_warns_on_child() {
        let (runtime, seen) = collecting();
        let parent = runtime.new_instance(Options::new()).unwrap();
        let ctor = runtime.extend(Options::new().with_prop("value", PropOptions::default()));
        let child = Instance::create_child_for_vnode(
            &parent,
            Rc::new(VNode::component(&ctor, "field").with_props_data(json!({ "value": 1 }))),
        )
        .unwrap();

        child.set("value", 2).unwrap();
        assert_eq!(child.get("value"), Some(json!(2)));
        assert!(seen.borrow().iter().any(|m| m.starts_with("Avoid mutating a prop directly")));
    }

    #[test]
    fn test_watch_after_construction() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let vm = quiet().new_instance(Options::new().with_data(|_| Ok(json!({ "n": 0 })))).unwrap();
        vm.watch(
            "n",
            WatchHandler::new(move |_, new, old| {
                sink.borrow_mut().push((new.clone(), old.clone()));
                Ok(())
            }),
        )
        .unwrap();

        vm.set("n", 1).unwrap();
        assert_eq!(*seen.borrow(), vec![(json!(1), json!(0))]);
    }
}
