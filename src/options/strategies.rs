//! Per-key merge strategies.
//!
//! | key | strategy |
//! |-----|----------|
//! | lifecycle hooks | parent handlers, then child handlers |
//! | `data`, `provide` | deferred factory; child object deep-merged over parent |
//! | `components`, `directives`, `filters` | child registrations over a parent fallback |
//! | `watch` | per key: parent handlers, then child handlers |
//! | `props`, `methods`, `inject`, `computed` | shallow, child wins |
//! | `el`, `propsData` | child wins; instance merges only |
//! | anything else | child wins |

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::instance::Instance;
use super::assets::AssetRegistry;
use super::keys::{self, AssetKind, LifecycleHook};
use super::value::{DataFn, HookFn, OptionValue};

// =============================================================================
// Merge Context
// =============================================================================

/// Where a merge happens.
///
/// Class-level merges (`extend`, mixins, resolver recomputation) and
/// instance-level merges (root construction) differ for `data`, `el` and
/// `propsData`.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    instance: bool,
    diagnostics: &'a Diagnostics,
}

impl<'a> MergeContext<'a> {
    /// Descriptor-to-descriptor merge.
    pub fn extend(diagnostics: &'a Diagnostics) -> Self {
        Self {
            instance: false,
            diagnostics,
        }
    }

    /// Merge for an instance under construction.
    pub fn instance(diagnostics: &'a Diagnostics) -> Self {
        Self {
            instance: true,
            diagnostics,
        }
    }

    pub fn is_instance(&self) -> bool {
        self.instance
    }

    pub fn diagnostics(&self) -> &'a Diagnostics {
        self.diagnostics
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Merge one key. `None` means the key is absent from the result.
pub(crate) fn merge_field(
    key: &str,
    parent: Option<OptionValue>,
    child: Option<OptionValue>,
    ctx: MergeContext<'_>,
) -> Option<OptionValue> {
    if LifecycleHook::from_key(key).is_some() {
        return merge_hooks(parent, child);
    }
    if let Some(kind) = AssetKind::from_key(key) {
        return merge_assets(kind, parent, child, ctx);
    }
    match key {
        keys::DATA => merge_data(parent, child, ctx),
        keys::PROVIDE => merge_data_or_fn(parent, child, ctx),
        keys::WATCH => merge_watch(parent, child, ctx),
        keys::PROPS | keys::METHODS | keys::INJECT | keys::COMPUTED => merge_record(key, parent, child, ctx),
        keys::EL | keys::PROPS_DATA => {
            if !ctx.is_instance() {
                ctx.diagnostics().warn(format_args!(
                    "option \"{key}\" can only be used during instance creation."
                ));
            }
            default_strategy(parent, child)
        }
        _ => default_strategy(parent, child),
    }
}

fn default_strategy(parent: Option<OptionValue>, child: Option<OptionValue>) -> Option<OptionValue> {
    child.or(parent)
}

// =============================================================================
// Hooks
// =============================================================================

fn merge_hooks(parent: Option<OptionValue>, child: Option<OptionValue>) -> Option<OptionValue> {
    let parent = parent.as_ref().and_then(OptionValue::as_hooks);
    let child = child.as_ref().and_then(OptionValue::as_hooks);
    let merged: Vec<HookFn> = match (parent, child) {
        (None, None) => return None,
        (Some(parent), None) => parent.to_vec(),
        (None, Some(child)) => child.to_vec(),
        (Some(parent), Some(child)) => parent.iter().chain(child.iter()).cloned().collect(),
    };
    Some(OptionValue::Hooks(dedupe_hooks(merged)))
}

/// Drop repeated handlers, keeping the first occurrence.
///
/// Re-resolving a descriptor folds its previously merged hook list back into
/// its extension options; without this the ancestor handlers would be
/// appended a second time.
fn dedupe_hooks(hooks: Vec<HookFn>) -> Rc<[HookFn]> {
    let mut unique: Vec<HookFn> = Vec::with_capacity(hooks.len());
    for hook in hooks {
        if !unique.iter().any(|seen| Rc::ptr_eq(seen, &hook)) {
            unique.push(hook);
        }
    }
    unique.into()
}

// =============================================================================
// Data / Provide
// =============================================================================

fn merge_data(
    parent: Option<OptionValue>,
    child: Option<OptionValue>,
    ctx: MergeContext<'_>,
) -> Option<OptionValue> {
    if !ctx.is_instance() {
        if let Some(child) = &child {
            if !matches!(child, OptionValue::Data(_)) {
                ctx.diagnostics().warn(format_args!(
                    "The \"data\" option should be a function that returns a per-instance value in component definitions."
                ));
                return parent;
            }
        }
    }
    merge_data_or_fn(parent, child, ctx)
}

fn merge_data_or_fn(
    parent: Option<OptionValue>,
    child: Option<OptionValue>,
    ctx: MergeContext<'_>,
) -> Option<OptionValue> {
    if !ctx.is_instance() {
        // Class level: nothing to combine unless both sides exist.
        return match (parent, child) {
            (parent, None) => parent,
            (None, child) => child,
            (Some(parent), Some(child)) => Some(OptionValue::Data(combine(Some(parent), Some(child)))),
        };
    }
    if parent.is_none() && child.is_none() {
        return None;
    }
    Some(OptionValue::Data(combine(parent, child)))
}

/// A factory that evaluates the child side, then the parent side, and
/// deep-merges the parent's object under the child's.
fn combine(parent: Option<OptionValue>, child: Option<OptionValue>) -> DataFn {
    Rc::new(move |vm: &Rc<Instance>| -> Result<Value> {
        let child_data = match &child {
            Some(child) => evaluate(child, vm)?,
            None => None,
        };
        let parent_data = match &parent {
            Some(parent) => evaluate(parent, vm)?,
            None => None,
        };
        Ok(merge_data_values(child_data, parent_data))
    })
}

fn evaluate(source: &OptionValue, vm: &Rc<Instance>) -> Result<Option<Value>> {
    match source {
        OptionValue::Data(factory) => factory(vm).map(Some),
        OptionValue::Value(value) => Ok(Some((**value).clone())),
        _ => Ok(None),
    }
}

/// Deep-merge `from` under `to`: keys missing from `to` are copied, nested
/// objects present on both sides recurse, everything else keeps `to`'s value.
pub fn merge_data_values(to: Option<Value>, from: Option<Value>) -> Value {
    match (to, from) {
        (Some(Value::Object(mut to)), Some(Value::Object(from))) => {
            merge_objects(&mut to, from);
            Value::Object(to)
        }
        (Some(to), _) if !to.is_null() => to,
        (_, from) => from.unwrap_or(Value::Null),
    }
}

fn merge_objects(to: &mut Map<String, Value>, from: Map<String, Value>) {
    for (key, from_value) in from {
        match to.get_mut(&key) {
            None => {
                to.insert(key, from_value);
            }
            Some(Value::Object(to_inner)) => {
                if let Value::Object(from_inner) = from_value {
                    merge_objects(to_inner, from_inner);
                }
            }
            Some(_) => {}
        }
    }
}

// =============================================================================
// Assets
// =============================================================================

fn merge_assets(
    kind: AssetKind,
    parent: Option<OptionValue>,
    child: Option<OptionValue>,
    ctx: MergeContext<'_>,
) -> Option<OptionValue> {
    let registry = match parent.as_ref().and_then(OptionValue::as_assets) {
        Some(parent) => AssetRegistry::inheriting(parent.clone()),
        None => AssetRegistry::new(),
    };
    if let Some(child) = child {
        match child.as_assets() {
            Some(own) => {
                for (id, asset) in own.entries() {
                    registry.register(id, asset);
                }
            }
            None => ctx.diagnostics().warn(format_args!(
                "Invalid value for option \"{}\": expected a registry, but got {}.",
                kind.key(),
                child.kind()
            )),
        }
    }
    Some(OptionValue::Assets(Rc::new(registry)))
}

// =============================================================================
// Watch
// =============================================================================

fn merge_watch(
    parent: Option<OptionValue>,
    child: Option<OptionValue>,
    ctx: MergeContext<'_>,
) -> Option<OptionValue> {
    let parent = parent.as_ref().and_then(OptionValue::as_watch).cloned();
    let child = match child {
        Some(child) => match child.as_watch() {
            Some(watch) => Some(watch.clone()),
            None => {
                ctx.diagnostics().warn(format_args!(
                    "Invalid value for option \"watch\": expected an Object, but got {}.",
                    child.kind()
                ));
                None
            }
        },
        None => None,
    };

    match (parent, child) {
        (None, None) => None,
        (Some(parent), None) => Some(OptionValue::Watch(Rc::new((*parent).clone()))),
        (None, Some(child)) => Some(OptionValue::Watch(child)),
        (Some(parent), Some(child)) => {
            let mut merged = (*parent).clone();
            for (key, handlers) in child.iter() {
                let existing = merged.entry(key.clone()).or_default();
                for handler in handlers {
                    if !existing.iter().any(|seen| seen.same(handler)) {
                        existing.push(handler.clone());
                    }
                }
            }
            Some(OptionValue::Watch(Rc::new(merged)))
        }
    }
}

// =============================================================================
// Props / Methods / Inject / Computed
// =============================================================================

fn merge_record(
    key: &str,
    parent: Option<OptionValue>,
    child: Option<OptionValue>,
    ctx: MergeContext<'_>,
) -> Option<OptionValue> {
    use OptionValue as O;
    match (parent, child) {
        (Some(O::Props(parent)), Some(O::Props(child))) => Some(O::Props(extend_map(&parent, &child))),
        (Some(O::Methods(parent)), Some(O::Methods(child))) => Some(O::Methods(extend_map(&parent, &child))),
        (Some(O::Inject(parent)), Some(O::Inject(child))) => Some(O::Inject(extend_map(&parent, &child))),
        (Some(O::Computed(parent)), Some(O::Computed(child))) => {
            Some(O::Computed(extend_map(&parent, &child)))
        }
        (parent, None) => parent,
        (None, child) => child,
        (Some(parent), Some(child)) => {
            ctx.diagnostics().warn(format_args!(
                "Invalid value for option \"{key}\": expected an Object, but got {}.",
                child.kind()
            ));
            Some(parent)
        }
    }
}

fn extend_map<T: Clone>(parent: &IndexMap<String, T>, child: &IndexMap<String, T>) -> Rc<IndexMap<String, T>> {
    let mut merged = parent.clone();
    for (key, value) in child {
        merged.insert(key.clone(), value.clone());
    }
    Rc::new(merged)
}
