//! Component descriptors.
//!
//! A [`ComponentDescriptor`] is a reusable component type. Descriptors form a
//! chain through [`extend`](ComponentDescriptor::extend), each one holding its
//! ancestor's options merged with its own extension options.
//!
//! # Late changes
//!
//! Ancestor options may change after a descendant was extended (a global
//! mixin replaces the base options). [`resolve_options`] notices because the
//! ancestor's resolved options are no longer the cached `Rc`, and re-merges:
//!
//! ```text
//! resolve(Sub)
//!   ├─ resolve(Super) ── same Rc as cached? ──▶ return Sub.options
//!   └─ changed:
//!        cache Super's options
//!        fold modified_options() into extend_options
//!        Sub.options = merge(Super, extend_options)
//!        register Sub under its name
//! ```
//!
//! Own-option changes made directly on `Sub.options` after extension are
//! picked up by comparing against the sealed snapshot taken at extension
//! time ([`modified_options`]).
//!
//! [`resolve_options`]: ComponentDescriptor::resolve_options
//! [`modified_options`]: ComponentDescriptor::modified_options

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::diagnostics::Diagnostics;
use crate::options::{
    merge_options, validate_component_name, Asset, AssetKind, AssetRegistry, MergeContext, OptionValue,
    Options,
};
use crate::runtime::UidCounter;

/// A component type: merged options plus the links needed to re-resolve them.
pub struct ComponentDescriptor {
    cid: u64,
    this: Weak<ComponentDescriptor>,
    /// Current merged options. May gain keys in place after extension.
    options: RefCell<Rc<Options>>,
    super_descriptor: Option<Weak<ComponentDescriptor>>,
    /// Ancestor's resolved options as of the last resolve.
    super_options: RefCell<Option<Rc<Options>>>,
    /// Options passed to `extend`, plus folded late modifications.
    extend_options: RefCell<Rc<Options>>,
    /// Shallow copy of `options` taken right after extension. Never mutated.
    sealed_options: Rc<Options>,
    cids: Rc<UidCounter>,
    diagnostics: Diagnostics,
}

impl ComponentDescriptor {
    /// A root descriptor with no ancestor.
    pub(crate) fn base(options: Options, cids: Rc<UidCounter>, diagnostics: Diagnostics) -> Rc<Self> {
        let cid = cids.next();
        let options = Rc::new(options);
        Rc::new_cyclic(|this| ComponentDescriptor {
            cid,
            this: this.clone(),
            sealed_options: Rc::new(options.shallow_copy()),
            options: RefCell::new(options),
            super_descriptor: None,
            super_options: RefCell::new(None),
            extend_options: RefCell::new(Rc::new(Options::new())),
            cids,
            diagnostics,
        })
    }

    /// Derive a new component type from this one.
    ///
    /// The sub-descriptor's options are this descriptor's options merged with
    /// `extend_options`. A named component registers itself in its own
    /// `components` registry so it can render itself recursively.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let counter = runtime.base().extend(
    ///     Options::new()
    ///         .with_name("counter")
    ///         .with_data(|_| Ok(json!({ "count": 0 }))),
    /// );
    /// ```
    pub fn extend(&self, extend_options: Options) -> Rc<ComponentDescriptor> {
        let extend_options = Rc::new(extend_options);
        let name = extend_options.name().or_else(|| self.name());
        if let Some(name) = &name {
            validate_component_name(name, &self.diagnostics);
        }

        let super_options = self.options();
        let merged = merge_options(&super_options, &extend_options, MergeContext::extend(&self.diagnostics));
        let cid = self.cids.next();

        let sub = Rc::new_cyclic(|this: &Weak<ComponentDescriptor>| {
            if let Some(name) = &name {
                register_self(&merged, name, this.clone());
            }
            ComponentDescriptor {
                cid,
                this: this.clone(),
                sealed_options: Rc::new(merged.shallow_copy()),
                options: RefCell::new(Rc::new(merged)),
                super_descriptor: Some(self.this.clone()),
                super_options: RefCell::new(Some(super_options)),
                extend_options: RefCell::new(extend_options),
                cids: self.cids.clone(),
                diagnostics: self.diagnostics.clone(),
            }
        });
        tracing::debug!(cid = sub.cid, super_cid = self.cid, name = name.as_deref(), "extended component");
        sub
    }

    /// Current options with every ancestor change applied.
    ///
    /// Returns the same `Rc` as long as no ancestor's resolved options
    /// changed, so callers may compare results with `Rc::ptr_eq`.
    pub fn resolve_options(&self) -> Rc<Options> {
        let Some(parent) = self.super_descriptor() else {
            return self.options();
        };
        let super_options = parent.resolve_options();
        let cached = self.super_options.borrow().clone();
        if cached.is_some_and(|cached| Rc::ptr_eq(&cached, &super_options)) {
            return self.options();
        }

        tracing::debug!(cid = self.cid, super_cid = parent.cid, "ancestor options changed, re-resolving");
        *self.super_options.borrow_mut() = Some(super_options.clone());

        let extend_options = self.extend_options.borrow().clone();
        if let Some(modified) = self.modified_options() {
            extend_options.assign(&modified);
        }
        let merged = merge_options(&super_options, &extend_options, MergeContext::extend(&self.diagnostics));
        if let Some(name) = merged.name() {
            register_self(&merged, &name, self.this.clone());
        }

        let merged = Rc::new(merged);
        *self.options.borrow_mut() = merged.clone();
        merged
    }

    /// Keys of the current options whose value differs from the sealed
    /// snapshot, or that the snapshot lacks. `None` when nothing changed.
    pub fn modified_options(&self) -> Option<Options> {
        let latest = self.options();
        let modified = Options::new();
        for (key, value) in latest.own_entries() {
            let unchanged = self.sealed_options.get_own(&key).is_some_and(|sealed| sealed.same(&value));
            if !unchanged {
                modified.insert(key, value);
            }
        }
        (!modified.is_empty()).then_some(modified)
    }

    /// Set a key on the current options in place.
    pub fn set_option(&self, key: impl Into<String>, value: OptionValue) {
        self.options().insert(key, value);
    }

    /// Swap in new options. Descendants re-resolve on their next resolve.
    pub fn replace_options(&self, options: Options) {
        *self.options.borrow_mut() = Rc::new(options);
    }

    /// Register an asset in this descriptor's own registry.
    pub fn register(&self, kind: AssetKind, id: impl Into<String>, asset: Asset) {
        let options = self.options();
        let registry = match options.assets(kind) {
            Some(registry) => registry,
            None => {
                let registry = Rc::new(AssetRegistry::new());
                options.insert(kind.key(), OptionValue::Assets(registry.clone()));
                registry
            }
        };
        registry.register(id, asset);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn cid(&self) -> u64 {
        self.cid
    }

    pub fn name(&self) -> Option<String> {
        self.options().name()
    }

    /// Current options without re-resolving.
    pub fn options(&self) -> Rc<Options> {
        self.options.borrow().clone()
    }

    /// The ancestor, if any and still alive.
    pub fn super_descriptor(&self) -> Option<Rc<ComponentDescriptor>> {
        self.super_descriptor.as_ref().and_then(Weak::upgrade)
    }

    pub fn super_options(&self) -> Option<Rc<Options>> {
        self.super_options.borrow().clone()
    }

    pub fn extend_options(&self) -> Rc<Options> {
        self.extend_options.borrow().clone()
    }

    pub fn sealed_options(&self) -> &Rc<Options> {
        &self.sealed_options
    }

    pub(crate) fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether `self` is `other` or derives from it.
    pub fn is_descendant_of(&self, other: &ComponentDescriptor) -> bool {
        if self.cid == other.cid {
            return true;
        }
        self.super_descriptor().is_some_and(|parent| parent.is_descendant_of(other))
    }
}

fn register_self(options: &Options, name: &str, this: Weak<ComponentDescriptor>) {
    let registry = match options.assets(AssetKind::Component) {
        Some(registry) => registry,
        None => {
            let registry = Rc::new(AssetRegistry::new());
            options.insert(AssetKind::Component.key(), OptionValue::Assets(registry.clone()));
            registry
        }
    };
    registry.register(name, Asset::Recursive(this));
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("cid", &self.cid)
            .field("name", &self.name())
            .field("super", &self.super_descriptor().map(|parent| parent.cid))
            .finish()
    }
}
