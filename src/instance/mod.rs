//! Component instances.
//!
//! An [`Instance`] is built by [`Instance::new`] (root) or
//! [`Instance::create_child_for_vnode`] (renderer-created child) and walks
//! through [`InitStage`] in a fixed order. See [`init`] for the sequence.
//!
//! Instances are single-threaded: everything lives behind `Rc`, `Cell` and
//! `RefCell`. No borrow is held while user code (hooks, factories, watchers,
//! listeners) runs, so user code may construct further instances.

pub mod events;
pub mod init;
pub mod inject;
pub mod lifecycle;
pub mod proxy;
pub mod render;
pub mod state;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::descriptor::ComponentDescriptor;
use crate::diagnostics::Diagnostics;
use crate::options::Options;
use crate::runtime::Runtime;
use crate::vnode::{Listeners, VNode};

pub use init::{InstanceOptions, InternalComponentOptions};
pub use proxy::{ProxyMode, RenderProxy};
use state::ReactiveState;

// =============================================================================
// Stage & Flags
// =============================================================================

/// Construction progress. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InitStage {
    Uninitialized,
    UidAssigned,
    OptionsResolved,
    ProxyOrDirectAccessSet,
    LifecycleLinked,
    EventsInitialized,
    RenderContextInitialized,
    BeforeCreateHookFired,
    InjectionsResolved,
    ReactiveStateInitialized,
    ProvisionsPublished,
    CreatedHookFired,
    Mounted,
}

bitflags! {
    /// Instance state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InstanceFlags: u8 {
        /// Built by this runtime. Set on every instance.
        const IS_FRAMEWORK_OWNED = 1 << 0;
        /// Created by the renderer through the internal fast path.
        const IS_COMPONENT = 1 << 1;
        const IS_MOUNTED = 1 << 2;
        const IS_BEING_DESTROYED = 1 << 3;
        const IS_DESTROYED = 1 << 4;
        /// Some listener is registered for a `hook:` event.
        const HAS_HOOK_EVENT = 1 << 5;
    }
}

// =============================================================================
// Instance
// =============================================================================

/// A live component instance.
pub struct Instance {
    uid: u64,
    this: Weak<Instance>,
    runtime: Runtime,
    descriptor: Rc<ComponentDescriptor>,
    options: RefCell<Rc<Options>>,
    stage: Cell<InitStage>,
    flags: Cell<InstanceFlags>,
    proxy_mode: Cell<ProxyMode>,

    // Lifecycle
    parent: RefCell<Weak<Instance>>,
    root: RefCell<Weak<Instance>>,
    children: RefCell<Vec<Rc<Instance>>>,

    // Events
    events: RefCell<Listeners>,

    // Render
    vnode: RefCell<Option<Rc<VNode>>>,
    render_vnode: RefCell<Option<VNode>>,
    slots: RefCell<IndexMap<String, Vec<VNode>>>,
    el: RefCell<Option<String>>,
    /// Children mounted during this instance's render whose `mounted` hook
    /// waits for the root to finish.
    pending_insert: RefCell<Vec<Rc<Instance>>>,

    // State
    state: RefCell<ReactiveState>,
    provided: RefCell<Map<String, Value>>,
}

impl Instance {
    fn blank(uid: u64, this: Weak<Instance>, runtime: Runtime, descriptor: Rc<ComponentDescriptor>) -> Self {
        Self {
            uid,
            this,
            runtime,
            descriptor,
            options: RefCell::new(Rc::new(Options::new())),
            stage: Cell::new(InitStage::UidAssigned),
            flags: Cell::new(InstanceFlags::empty()),
            proxy_mode: Cell::new(ProxyMode::Direct),
            parent: RefCell::new(Weak::new()),
            root: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            events: RefCell::new(Listeners::new()),
            vnode: RefCell::new(None),
            render_vnode: RefCell::new(None),
            slots: RefCell::new(IndexMap::new()),
            el: RefCell::new(None),
            pending_insert: RefCell::new(Vec::new()),
            state: RefCell::new(ReactiveState::default()),
            provided: RefCell::new(Map::new()),
        }
    }

    /// Move to `stage`.
    pub(crate) fn advance(&self, stage: InitStage) {
        self.stage.set(stage);
        tracing::trace!(uid = self.uid, stage = ?stage, "init stage");
    }

    pub(crate) fn insert_flags(&self, flags: InstanceFlags) {
        self.flags.set(self.flags.get() | flags);
    }

    pub(crate) fn remove_flags(&self, flags: InstanceFlags) {
        self.flags.set(self.flags.get() - flags);
    }

    /// This instance as an `Rc`. `None` only while the instance is dropping.
    pub(crate) fn rc(&self) -> Option<Rc<Instance>> {
        self.this.upgrade()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.runtime.diagnostics()
    }

    /// The constructor this instance was built from.
    pub fn descriptor(&self) -> &Rc<ComponentDescriptor> {
        &self.descriptor
    }

    /// `$options`.
    pub fn options(&self) -> Rc<Options> {
        self.options.borrow().clone()
    }

    pub fn stage(&self) -> InitStage {
        self.stage.get()
    }

    pub fn flags(&self) -> InstanceFlags {
        self.flags.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.flags().contains(InstanceFlags::IS_MOUNTED)
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags().contains(InstanceFlags::IS_DESTROYED)
    }

    pub fn name(&self) -> Option<String> {
        self.options().name()
    }

    /// `$parent`.
    pub fn parent(&self) -> Option<Rc<Instance>> {
        self.parent.borrow().upgrade()
    }

    /// `$root`. An instance without a parent is its own root.
    pub fn root(&self) -> Option<Rc<Instance>> {
        self.root.borrow().upgrade()
    }

    /// `$children`, in creation order.
    pub fn children(&self) -> Vec<Rc<Instance>> {
        self.children.borrow().clone()
    }

    /// `$vnode`: the placeholder vnode this instance was created for.
    pub fn vnode(&self) -> Option<Rc<VNode>> {
        self.vnode.borrow().clone()
    }

    /// The tree produced by the last render.
    pub fn render_vnode(&self) -> Option<VNode> {
        self.render_vnode.borrow().clone()
    }

    /// Mount target recorded by [`mount`](Self::mount).
    pub fn el(&self) -> Option<String> {
        self.el.borrow().clone()
    }

    /// Values this instance published with `provide`.
    pub fn provided(&self) -> Map<String, Value> {
        self.provided.borrow().clone()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.uid)
            .field("cid", &self.descriptor.cid())
            .field("name", &self.name())
            .field("stage", &self.stage.get())
            .field("flags", &self.flags.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_are_ordered() {
        assert!(InitStage::Uninitialized < InitStage::UidAssigned);
        assert!(InitStage::InjectionsResolved < InitStage::ReactiveStateInitialized);
        assert!(InitStage::CreatedHookFired < InitStage::Mounted);
    }

    #[test]
    fn test_flags_combine() {
        let flags = InstanceFlags::IS_FRAMEWORK_OWNED | InstanceFlags::IS_COMPONENT;
        assert!(flags.contains(InstanceFlags::IS_COMPONENT));
        assert!(!flags.contains(InstanceFlags::IS_MOUNTED));
        assert_eq!(flags - InstanceFlags::IS_COMPONENT, InstanceFlags::IS_FRAMEWORK_OWNED);
    }
}
