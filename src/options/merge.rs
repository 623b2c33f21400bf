//! Option merging.
//!
//! [`merge_options`] combines a parent options bag with a child one:
//!
//! 1. Normalize the child (`props` and `inject` syntaxes, component names).
//! 2. Unless the child is already a merge result, fold its `extends` and then
//!    its `mixins` into the parent.
//! 3. Merge every parent key, then every child-only key, through
//!    [`merge_field`](super::strategies).
//!
//! The result is a fresh bag. Neither input is modified.

use std::rc::Rc;

use serde_json::Value;

use crate::diagnostics::Diagnostics;
use super::bag::{Options, OptionsView};
use super::keys::{self, camelize, hyphenate, RESERVED_ATTRIBUTES, RESERVED_TAGS};
use super::strategies::{merge_field, MergeContext};
use super::value::{InjectMap, InjectOptions, OptionValue, PropOptions, PropsMap};

/// Merge `child` over `parent`.
///
/// # Example
///
/// ```ignore
/// let diagnostics = Diagnostics::disabled();
/// let merged = merge_options(&base, &child, MergeContext::extend(&diagnostics));
/// assert!(merged.is_merged());
/// ```
pub fn merge_options(parent: &Options, child: &Options, ctx: MergeContext<'_>) -> Options {
    let child = normalize(child, ctx);

    let mut folded: Option<Options> = None;
    if !child.is_merged() {
        if let Some(OptionValue::Extends(definition)) = child.get(keys::EXTENDS) {
            folded = Some(merge_options(parent, &definition.options(), ctx));
        }
        if let Some(OptionValue::Mixins(mixins)) = child.get(keys::MIXINS) {
            for mixin in mixins.iter() {
                let next = merge_options(folded.as_ref().unwrap_or(parent), &mixin.options(), ctx);
                folded = Some(next);
            }
        }
    }
    let parent = folded.as_ref().unwrap_or(parent);

    let mut merged = Options::new();
    let parent_keys = parent.keys();
    for key in &parent_keys {
        if let Some(value) = merge_field(key, parent.get(key), child.get(key), ctx) {
            merged.insert(key.clone(), value);
        }
    }
    for key in child.keys() {
        if parent_keys.contains(&key) {
            continue;
        }
        if let Some(value) = merge_field(&key, None, child.get(&key), ctx) {
            merged.insert(key, value);
        }
    }
    merged.mark_merged();
    merged
}

/// Warn when `name` is not usable as a component name.
pub fn validate_component_name(name: &str, diagnostics: &Diagnostics) {
    if !diagnostics.is_enabled() {
        return;
    }
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_') || !c.is_ascii());
    if !valid {
        diagnostics.warn(format_args!(
            "Invalid component name: \"{name}\". Component names should conform to valid custom element names in html5."
        ));
    }
    let built_in = name.eq_ignore_ascii_case("slot") || name.eq_ignore_ascii_case("component");
    if built_in || RESERVED_TAGS.contains(&name) {
        diagnostics.warn(format_args!(
            "Do not use built-in or reserved HTML elements as component id: {name}"
        ));
    }
}

// =============================================================================
// Normalization
// =============================================================================

fn normalize(child: &Options, ctx: MergeContext<'_>) -> Options {
    let normalized = child.clone();
    check_components(&normalized, ctx);
    normalize_props(&normalized, ctx);
    normalize_inject(&normalized, ctx);
    normalized
}

fn check_components(options: &Options, ctx: MergeContext<'_>) {
    if !ctx.diagnostics().is_enabled() {
        return;
    }
    if let Some(registry) = options.get_own(keys::COMPONENTS).as_ref().and_then(OptionValue::as_assets) {
        for id in registry.own_ids() {
            validate_component_name(&id, ctx.diagnostics());
        }
    }
}

fn normalize_props(options: &Options, ctx: MergeContext<'_>) {
    let Some(raw) = options.get_own(keys::PROPS) else {
        return;
    };
    let normalized: PropsMap = match &raw {
        OptionValue::Props(props) => {
            warn_reserved_props(props, ctx);
            return;
        }
        OptionValue::Value(value) => match value.as_ref() {
            Value::Array(names) => names
                .iter()
                .filter_map(|name| match name.as_str() {
                    Some(name) => Some((camelize(name), PropOptions::default())),
                    None => {
                        ctx.diagnostics().warn(format_args!("props must be strings when using array syntax."));
                        None
                    }
                })
                .collect(),
            Value::Object(map) => map.iter().map(|(name, raw)| (camelize(name), prop_from_json(raw))).collect(),
            other => {
                ctx.diagnostics().warn(format_args!(
                    "Invalid value for option \"props\": expected an Array or an Object, but got {other}."
                ));
                options.remove(keys::PROPS);
                return;
            }
        },
        other => {
            ctx.diagnostics().warn(format_args!(
                "Invalid value for option \"props\": expected an Array or an Object, but got {}.",
                other.kind()
            ));
            options.remove(keys::PROPS);
            return;
        }
    };
    warn_reserved_props(&normalized, ctx);
    options.insert(keys::PROPS, OptionValue::Props(Rc::new(normalized)));
}

fn warn_reserved_props(props: &PropsMap, ctx: MergeContext<'_>) {
    for key in props.keys() {
        if RESERVED_ATTRIBUTES.contains(&hyphenate(key).as_str()) {
            ctx.diagnostics().warn(format_args!(
                "\"{key}\" is a reserved attribute and cannot be used as component prop."
            ));
        }
    }
}

/// `{ type, default, required }`, a bare type name, or a list of type names.
fn prop_from_json(raw: &Value) -> PropOptions {
    let type_names = |value: &Value| -> Vec<String> {
        match value {
            Value::String(name) => vec![name.clone()],
            Value::Array(names) => names.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
            _ => Vec::new(),
        }
    };
    match raw {
        Value::Object(fields) => PropOptions {
            types: fields.get("type").map(type_names).unwrap_or_default(),
            default: fields.get("default").cloned(),
            required: fields.get("required").and_then(Value::as_bool).unwrap_or(false),
        },
        other => PropOptions {
            types: type_names(other),
            ..PropOptions::default()
        },
    }
}

fn normalize_inject(options: &Options, ctx: MergeContext<'_>) {
    let Some(raw) = options.get_own(keys::INJECT) else {
        return;
    };
    let invalid = |kind: &dyn std::fmt::Display| {
        ctx.diagnostics().warn(format_args!(
            "Invalid value for option \"inject\": expected an Array or an Object, but got {kind}."
        ));
        options.remove(keys::INJECT);
    };
    let normalized: InjectMap = match &raw {
        OptionValue::Inject(_) => return,
        OptionValue::Value(value) => match value.as_ref() {
            Value::Array(names) => names
                .iter()
                .filter_map(Value::as_str)
                .map(|name| (name.to_owned(), InjectOptions::from(name)))
                .collect(),
            Value::Object(map) => map
                .iter()
                .map(|(key, raw)| {
                    let inject = match raw {
                        Value::String(from) => InjectOptions::from(from.clone()),
                        Value::Object(fields) => InjectOptions {
                            from: fields.get("from").and_then(Value::as_str).unwrap_or(key).to_owned(),
                            default: fields.get("default").cloned(),
                        },
                        _ => InjectOptions::from(key.clone()),
                    };
                    (key.clone(), inject)
                })
                .collect(),
            other => {
                invalid(other);
                return;
            }
        },
        other => {
            invalid(&other.kind());
            return;
        }
    };
    options.insert(keys::INJECT, OptionValue::Inject(Rc::new(normalized)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::error::Result;
    use crate::instance::Instance;
    use crate::options::assets::{Asset, AssetRegistry};
    use crate::options::keys::{AssetKind, LifecycleHook};
    use crate::options::value::HookFn;

    fn ctx(diagnostics: &Diagnostics) -> MergeContext<'_> {
        MergeContext::extend(diagnostics)
    }

    fn collecting() -> (Diagnostics, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let diagnostics = Diagnostics::new(true).with_handler(move |m| sink.borrow_mut().push(m.to_string()));
        (diagnostics, seen)
    }

    fn noop(_: &Rc<Instance>) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_result_is_marked_merged() {
        let diagnostics = Diagnostics::disabled();
        let merged = merge_options(&Options::new(), &Options::new(), ctx(&diagnostics));
        assert!(merged.is_merged());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_parent_keys_first_then_child_keys() {
        let diagnostics = Diagnostics::disabled();
        let parent = Options::new().with_value("a", 1).with_value("b", 2);
        let child = Options::new().with_value("c", 3).with_value("a", 10);

        let merged = merge_options(&parent, &child, ctx(&diagnostics));

        assert_eq!(merged.keys(), vec!["a", "b", "c"]);
        assert_eq!(merged.get("a").and_then(|v| v.as_value().cloned()), Some(json!(10)));
    }

    #[test]
    fn test_inputs_untouched() {
        let diagnostics = Diagnostics::disabled();
        let parent = Options::new().with_value("a", 1);
        let child = Options::new().with_props_value(json!(["my-prop"]));

        merge_options(&parent, &child, ctx(&diagnostics));

        assert_eq!(parent.keys(), vec!["a"]);
        assert!(matches!(child.get_own("props"), Some(OptionValue::Value(_))));
    }

    #[test]
    fn test_props_array_syntax() {
        let diagnostics = Diagnostics::disabled();
        let child = Options::new().with_props_value(json!(["my-prop", "other"]));

        let merged = merge_options(&Options::new(), &child, ctx(&diagnostics));
        let props = merged.props().unwrap();

        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["myProp", "other"]);
        assert_eq!(props["myProp"], PropOptions::default());
    }

    #[test]
    fn test_props_object_syntax() {
        let diagnostics = Diagnostics::disabled();
        let child = Options::new().with_props_value(json!({
            "size": "Number",
            "label": { "type": ["String"], "default": "ok", "required": true },
        }));

        let merged = merge_options(&Options::new(), &child, ctx(&diagnostics));
        let props = merged.props().unwrap();

        assert_eq!(props["size"].types, vec!["Number".to_string()]);
        assert_eq!(
            props["label"],
            PropOptions {
                types: vec!["String".to_string()],
                default: Some(json!("ok")),
                required: true,
            }
        );
    }

    #[test]
    fn test_reserved_prop_warns() {
        let (diagnostics, seen) = collecting();
        let child = Options::new().with_props_value(json!(["key", "slotScope"]));

        merge_options(&Options::new(), &child, ctx(&diagnostics));

        assert_eq!(seen.borrow().len(), 2);
        assert!(seen.borrow()[0].contains("\"key\" is a reserved attribute"));
    }

    #[test]
    fn test_invalid_props_dropped() {
        let (diagnostics, seen) = collecting();
        let child = Options::new().with_props_value(json!(42));

        let merged = merge_options(&Options::new(), &child, ctx(&diagnostics));

        assert!(merged.props().is_none());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_inject_syntaxes() {
        let diagnostics = Diagnostics::disabled();
        let array = Options::new().with_inject_value(json!(["theme"]));
        let object = Options::new().with_inject_value(json!({
            "color": "theme",
            "size": { "from": "scale", "default": 2 },
            "plain": {},
        }));

        let merged = merge_options(&Options::new(), &array, ctx(&diagnostics));
        assert_eq!(merged.inject().unwrap()["theme"], InjectOptions::from("theme"));

        let merged = merge_options(&Options::new(), &object, ctx(&diagnostics));
        let inject = merged.inject().unwrap();
        assert_eq!(inject["color"], InjectOptions::from("theme"));
        assert_eq!(inject["size"], InjectOptions::from("scale").with_default(2));
        assert_eq!(inject["plain"], InjectOptions::from("plain"));
    }

    #[test]
    fn test_extends_then_mixins_then_own() {
        let diagnostics = Diagnostics::disabled();
        let handler = || -> HookFn { Rc::new(noop) };
        let (root_hook, extends_hook, a_hook, b_hook, own_hook) = (handler(), handler(), handler(), handler(), handler());
        let created = |hook: &HookFn| OptionValue::Hooks(Rc::from(vec![hook.clone()]));

        let first = Options::new().with("created", created(&a_hook)).with_value("title", "a");
        let second = Options::new().with("created", created(&b_hook)).with_value("title", "b");
        let base = Options::new().with("created", created(&extends_hook));
        let child = Options::new()
            .with_extends(base)
            .with_mixin(first)
            .with_mixin(second)
            .with("created", created(&own_hook));
        let root = Options::new().with("created", created(&root_hook));

        let merged = merge_options(&root, &child, ctx(&diagnostics));

        assert_eq!(merged.get("title").and_then(|v| v.as_str().map(str::to_owned)).as_deref(), Some("b"));
        let hooks = merged.hooks(LifecycleHook::Created).unwrap();
        let expected = [&root_hook, &extends_hook, &a_hook, &b_hook, &own_hook];
        assert_eq!(hooks.len(), expected.len());
        for (got, want) in hooks.iter().zip(expected) {
            assert!(Rc::ptr_eq(got, want));
        }
    }

    #[test]
    fn test_merged_child_skips_mixins() {
        let diagnostics = Diagnostics::disabled();
        let mixin = Options::new().with_value("fromMixin", true);
        let mut child = Options::new().with_mixin(mixin);
        child.mark_merged();

        let merged = merge_options(&Options::new(), &child, ctx(&diagnostics));

        assert!(!merged.contains("fromMixin"));
    }

    #[test]
    fn test_component_registry_falls_through() {
        let diagnostics = Diagnostics::disabled();
        let definition = Rc::new(Options::new());
        let parent_registry = Rc::new(AssetRegistry::new().with("Shared", Asset::Definition(definition.clone())));
        let parent = Options::new().with(keys::COMPONENTS, OptionValue::Assets(parent_registry));
        let child = Options::new().with_component("Local", Asset::Definition(definition));

        let merged = merge_options(&parent, &child, ctx(&diagnostics));
        let registry = merged.assets(AssetKind::Component).unwrap();

        assert!(registry.get("Local").is_some());
        assert!(registry.get("Shared").is_some());
        assert!(!registry.contains_own("Shared"));
    }

    #[test]
    fn test_invalid_component_names_warn() {
        let (diagnostics, seen) = collecting();
        let definition = Rc::new(Options::new());
        let child = Options::new()
            .with_component("1bad", Asset::Definition(definition.clone()))
            .with_component("div", Asset::Definition(definition.clone()))
            .with_component("my-widget", Asset::Definition(definition));

        merge_options(&Options::new(), &child, ctx(&diagnostics));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("Invalid component name: \"1bad\""));
        assert!(seen[1].contains("reserved HTML elements as component id: div"));
    }

    #[test]
    fn test_hook_free_function_merges() {
        let diagnostics = Diagnostics::disabled();
        let parent = Options::new().with_hook(LifecycleHook::Mounted, noop);
        let merged = merge_options(&parent, &Options::new(), ctx(&diagnostics));
        assert_eq!(merged.hooks(LifecycleHook::Mounted).map(|h| h.len()), Some(1));
    }
}
