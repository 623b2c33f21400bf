//! `provide` / `inject`.
//!
//! An injection looks its `from` key up in the values provided by the
//! nearest ancestor that provides it. Injections resolve before the
//! instance's own state; its own provisions publish after.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::options::{keys, InjectMap, OptionValue, OptionsView};
use super::Instance;

/// Resolve every declared injection and store it as reactive state.
pub(crate) fn init_injections(vm: &Rc<Instance>) -> Result<()> {
    let Some(inject) = vm.options().inject() else {
        return Ok(());
    };
    let resolved = resolve_inject(&inject, vm);
    vm.state.borrow_mut().set_injected(resolved);
    Ok(())
}

/// Values for `inject`, looked up on `vm` and its ancestors.
///
/// Missing keys fall back to their declared default. Keys with neither a
/// provider nor a default warn and are left out.
pub fn resolve_inject(inject: &InjectMap, vm: &Rc<Instance>) -> Map<String, Value> {
    let mut result = Map::new();
    for (key, options) in inject {
        let mut source = Some(vm.clone());
        let mut found = None;
        while let Some(current) = source {
            if let Some(value) = current.provided.borrow().get(&options.from) {
                found = Some(value.clone());
                break;
            }
            source = current.parent();
        }
        match found.or_else(|| options.default.clone()) {
            Some(value) => {
                result.insert(key.clone(), value);
            }
            None => vm.diagnostics().warn(format_args!("Injection \"{key}\" not found")),
        }
    }
    result
}

/// Evaluate `provide` and publish the result for descendants.
pub(crate) fn init_provide(vm: &Rc<Instance>) -> Result<()> {
    let provided = match vm.options().get(keys::PROVIDE) {
        Some(OptionValue::Data(factory)) => factory(vm).map_err(|source| Error::Provide {
            uid: vm.uid(),
            source: Box::new(source),
        })?,
        Some(OptionValue::Value(value)) => (*value).clone(),
        Some(other) => {
            vm.diagnostics().warn(format_args!(
                "Invalid value for option \"provide\": expected an Object or a factory, but got {}.",
                other.kind()
            ));
            return Ok(());
        }
        None => return Ok(()),
    };
    match provided {
        Value::Object(map) => *vm.provided.borrow_mut() = map,
        Value::Null => {}
        other => vm.diagnostics().warn(format_args!(
            "provide() should return an object, got {other}"
        )),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    use crate::config::RuntimeConfig;
    use crate::options::{InjectOptions, Options};
    use crate::runtime::Runtime;
    use crate::vnode::VNode;

    fn collecting_runtime() -> (Runtime, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let config = RuntimeConfig::default()
            .diagnostics(true)
            .on_warn(move |m| sink.borrow_mut().push(m.to_string()));
        (Runtime::with_config(config), seen)
    }

    fn child_of(parent: &Rc<Instance>, options: Options) -> Rc<Instance> {
        let ctor = parent.runtime().extend(options);
        Instance::create_child_for_vnode(parent, Rc::new(VNode::component(&ctor, "child"))).unwrap()
    }

    #[test]
    fn test_nearest_provider_wins() {
        let (runtime, _) = collecting_runtime();
        let root = runtime
            .new_instance(Options::new().with_provide(|_| Ok(json!({ "theme": "dark", "size": 1 }))))
            .unwrap();
        let middle = child_of(&root, Options::new().with_provide(|_| Ok(json!({ "theme": "light" }))));
        let leaf = child_of(
            &middle,
            Options::new()
                .with_inject("theme", InjectOptions::from("theme"))
                .with_inject("scale", InjectOptions::from("size")),
        );

        assert_eq!(leaf.get("theme"), Some(json!("light")));
        assert_eq!(leaf.get("scale"), Some(json!(1)));
    }

    #[test]
    fn test_default_and_missing() {
        let (runtime, seen) = collecting_runtime();
        let root = runtime.new_instance(Options::new()).unwrap();
        let child = child_of(
            &root,
            Options::new()
                .with_inject("size", InjectOptions::from("size").with_default(3))
                .with_inject("absent", InjectOptions::from("absent")),
        );

        assert_eq!(child.get("size"), Some(json!(3)));
        assert_eq!(child.get("absent"), None);
        assert!(seen.borrow().iter().any(|m| m == "Injection \"absent\" not found"));
    }

    #[test]
    fn test_own_provide_not_visible_to_own_inject() {
        let (runtime, _) = collecting_runtime();
        let vm = runtime
            .new_instance(
                Options::new()
                    .with_provide_object(json!({ "x": 1 }))
                    .with_inject("x", InjectOptions::from("x").with_default(0)),
            )
            .unwrap();

        assert_eq!(vm.get("x"), Some(json!(0)));
        assert_eq!(vm.provided().get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_provide_error_wrapped() {
        let (runtime, _) = collecting_runtime();
        let err = runtime
            .new_instance(Options::new().with_provide(|_| Err(Error::msg("no"))))
            .unwrap_err();
        assert!(matches!(err, Error::Provide { .. }));
    }
}
