//! Asset registries - `components`, `directives`, `filters`.
//!
//! A registry holds its own registrations and falls back to the registry it
//! was merged from:
//!
//! ```text
//! instance.components ──miss──▶ Sub.components ──miss──▶ base.components
//! ```
//!
//! Own entries live behind a `RefCell` so global registration and component
//! self-registration can add entries without changing the registry's
//! identity.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::descriptor::ComponentDescriptor;
use super::bag::Options;
use super::keys::{camelize, capitalize};
use super::value::FilterFn;

/// A registered asset.
#[derive(Clone)]
pub enum Asset {
    /// An extended component descriptor.
    Component(Rc<ComponentDescriptor>),
    /// A descriptor registered into its own registry under its name.
    Recursive(Weak<ComponentDescriptor>),
    /// A raw definition (unextended component options, directive hooks).
    Definition(Rc<Options>),
    Filter(FilterFn),
}

impl Asset {
    /// The component descriptor behind this asset, if it is one and still alive.
    pub fn descriptor(&self) -> Option<Rc<ComponentDescriptor>> {
        match self {
            Asset::Component(descriptor) => Some(descriptor.clone()),
            Asset::Recursive(weak) => weak.upgrade(),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&FilterFn> {
        match self {
            Asset::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn same(&self, other: &Asset) -> bool {
        match (self, other) {
            (Asset::Component(a), Asset::Component(b)) => Rc::ptr_eq(a, b),
            (Asset::Recursive(a), Asset::Recursive(b)) => Weak::ptr_eq(a, b),
            (Asset::Definition(a), Asset::Definition(b)) => Rc::ptr_eq(a, b),
            (Asset::Filter(a), Asset::Filter(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Component(descriptor) => write!(f, "Component(cid={})", descriptor.cid()),
            Asset::Recursive(weak) => match weak.upgrade() {
                Some(descriptor) => write!(f, "Recursive(cid={})", descriptor.cid()),
                None => f.write_str("Recursive(dropped)"),
            },
            Asset::Definition(_) => f.write_str("Definition"),
            Asset::Filter(_) => f.write_str("Filter"),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Two-level asset lookup: own registrations, then the parent registry.
#[derive(Default)]
pub struct AssetRegistry {
    own: RefCell<IndexMap<String, Asset>>,
    parent: Option<Rc<AssetRegistry>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry whose misses fall through to `parent`.
    pub fn inheriting(parent: Rc<AssetRegistry>) -> Self {
        Self {
            own: RefCell::new(IndexMap::new()),
            parent: Some(parent),
        }
    }

    /// Add or replace an own registration.
    pub fn register(&self, id: impl Into<String>, asset: Asset) {
        self.own.borrow_mut().insert(id.into(), asset);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(self, id: impl Into<String>, asset: Asset) -> Self {
        self.register(id, asset);
        self
    }

    pub fn parent(&self) -> Option<&Rc<AssetRegistry>> {
        self.parent.as_ref()
    }

    pub fn get_own(&self, id: &str) -> Option<Asset> {
        self.own.borrow().get(id).cloned()
    }

    pub fn contains_own(&self, id: &str) -> bool {
        self.own.borrow().contains_key(id)
    }

    /// Look `id` up here, then along the parent chain.
    pub fn get(&self, id: &str) -> Option<Asset> {
        if let Some(asset) = self.get_own(id) {
            return Some(asset);
        }
        self.parent.as_ref().and_then(|parent| parent.get(id))
    }

    /// Look up `id` as written, camelized and capitalized.
    ///
    /// Own registrations are checked in all three spellings before the
    /// parent chain is consulted.
    pub fn resolve(&self, id: &str) -> Option<Asset> {
        let camelized = camelize(id);
        let capitalized = capitalize(&camelized);
        let candidates = [id, camelized.as_str(), capitalized.as_str()];

        for candidate in candidates {
            if let Some(asset) = self.get_own(candidate) {
                return Some(asset);
            }
        }
        candidates.into_iter().find_map(|candidate| self.get(candidate))
    }

    /// Own registration ids, in registration order.
    pub fn own_ids(&self) -> Vec<String> {
        self.own.borrow().keys().cloned().collect()
    }

    /// Every visible registration: own entries first, then inherited ones
    /// not shadowed by a nearer registry.
    pub fn entries(&self) -> Vec<(String, Asset)> {
        let mut entries: IndexMap<String, Asset> = self.own.borrow().clone();
        let mut next = self.parent.clone();
        while let Some(registry) = next {
            for (id, asset) in registry.own.borrow().iter() {
                entries.entry(id.clone()).or_insert_with(|| asset.clone());
            }
            next = registry.parent.clone();
        }
        entries.into_iter().collect()
    }
}

impl fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("own", &self.own_ids())
            .field("inherits", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn filter() -> Asset {
        Asset::Filter(Rc::new(|v: &Value| v.clone()))
    }

    #[test]
    fn test_miss_falls_through_to_parent() {
        let base = Rc::new(AssetRegistry::new().with("upper", filter()));
        let child = AssetRegistry::inheriting(base.clone()).with("lower", filter());

        assert!(child.get("lower").is_some());
        assert!(child.get("upper").is_some());
        assert!(!child.contains_own("upper"));
        assert_eq!(child.own_ids(), vec!["lower".to_string()]);
    }

    #[test]
    fn test_registration_after_inheriting_is_visible() {
        let base = Rc::new(AssetRegistry::new());
        let child = AssetRegistry::inheriting(base.clone());

        assert!(child.get("late").is_none());
        base.register("late", filter());
        assert!(child.get("late").is_some());
    }

    #[test]
    fn test_resolve_spellings() {
        let registry = AssetRegistry::new().with("MyButton", filter());

        assert!(registry.resolve("my-button").is_some());
        assert!(registry.resolve("myButton").is_some());
        assert!(registry.resolve("other").is_none());
    }

    #[test]
    fn test_entries_shadowing() {
        let a = filter();
        let b = filter();
        let base = Rc::new(AssetRegistry::new().with("x", a.clone()).with("y", a.clone()));
        let child = AssetRegistry::inheriting(base).with("x", b.clone());

        let entries = child.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].1.same(&b));
        assert!(entries[1].1.same(&a));
    }
}
