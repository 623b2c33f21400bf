//! Lifecycle: parent/root links, hooks, mount and destroy.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::options::LifecycleHook;
use super::{InitStage, Instance, InstanceFlags};

/// Link `vm` into its parent's children and record `$parent` and `$root`.
///
/// A non-abstract instance skips abstract ancestors: it becomes a child of
/// the nearest non-abstract one. Abstract instances are linked to their
/// direct parent but never listed among its children.
pub(crate) fn init_lifecycle(vm: &Rc<Instance>) -> Result<()> {
    let options = vm.options();
    let mut parent = options.parent_instance();

    if let Some(direct) = parent.clone() {
        if !options.is_abstract() {
            let mut nearest = direct;
            while nearest.options().is_abstract() {
                match nearest.parent() {
                    Some(next) => nearest = next,
                    None => break,
                }
            }
            nearest.children.borrow_mut().push(vm.clone());
            parent = Some(nearest);
        }
    }

    let root = match &parent {
        Some(parent) => parent.root.borrow().clone(),
        None => Rc::downgrade(vm),
    };
    *vm.parent.borrow_mut() = parent.as_ref().map(Rc::downgrade).unwrap_or_default();
    *vm.root.borrow_mut() = root;

    vm.remove_flags(InstanceFlags::IS_MOUNTED | InstanceFlags::IS_BEING_DESTROYED | InstanceFlags::IS_DESTROYED);
    Ok(())
}

/// Run every handler registered for `hook`, in order, bound to `vm`.
///
/// The first failing handler aborts the rest. Afterwards `hook:<name>` is
/// emitted when anything listens for it.
pub(crate) fn call_hook(vm: &Rc<Instance>, hook: LifecycleHook) -> Result<()> {
    if let Some(handlers) = vm.options().hooks(hook) {
        for handler in handlers.iter() {
            handler(vm).map_err(|source| Error::Hook {
                hook: hook.as_str(),
                uid: vm.uid(),
                source: Box::new(source),
            })?;
        }
    }
    if vm.flags().contains(InstanceFlags::HAS_HOOK_EVENT) {
        vm.emit(&format!("hook:{}", hook.as_str()), &[])?;
    }
    Ok(())
}

/// Default mount: record the target, render, build child components and
/// fire `mounted`.
///
/// Children built during render are queued. Only a root instance flushes
/// the queue: each child's `mounted` fires (deepest first), then the
/// root's own.
pub(crate) fn mount_component(vm: &Rc<Instance>, el: Option<&str>) -> Result<()> {
    *vm.el.borrow_mut() = el.map(str::to_owned);
    let options = vm.options();
    if options.render().is_none() && el.is_some() {
        vm.diagnostics().warn(format_args!(
            "Failed to mount component: render function not defined. (instance {})",
            vm.uid()
        ));
    }

    let hooks = vm.runtime().collaborators();
    hooks.call_hook(vm, LifecycleHook::BeforeMount)?;

    let inserted = super::render::render_and_patch(vm)?;

    if vm.vnode().is_some() {
        vm.pending_insert.borrow_mut().extend(inserted);
        return Ok(());
    }
    for child in inserted {
        if !child.is_mounted() {
            child.insert_flags(InstanceFlags::IS_MOUNTED);
            child.advance(InitStage::Mounted);
            hooks.call_hook(&child, LifecycleHook::Mounted)?;
        }
    }
    vm.insert_flags(InstanceFlags::IS_MOUNTED);
    vm.advance(InitStage::Mounted);
    hooks.call_hook(vm, LifecycleHook::Mounted)
}

impl Instance {
    /// Mount this instance onto `el`.
    pub fn mount(self: &Rc<Self>, el: Option<&str>) -> Result<()> {
        self.runtime().collaborators().mount(self, el)
    }

    /// Fire `hook` through the runtime's collaborators.
    pub fn call_hook(self: &Rc<Self>, hook: LifecycleHook) -> Result<()> {
        self.runtime().collaborators().call_hook(self, hook)
    }

    /// Tear this instance down.
    ///
    /// Fires `beforeDestroy`, unlinks from the parent, destroys child
    /// instances, fires `destroyed` and drops every listener. A second call
    /// is a no-op.
    pub fn destroy(self: &Rc<Self>) -> Result<()> {
        if self.flags().contains(InstanceFlags::IS_BEING_DESTROYED) {
            return Ok(());
        }
        self.call_hook(LifecycleHook::BeforeDestroy)?;
        self.insert_flags(InstanceFlags::IS_BEING_DESTROYED);

        if let Some(parent) = self.parent() {
            let parent_leaving = parent.flags().contains(InstanceFlags::IS_BEING_DESTROYED);
            if !parent_leaving && !self.options().is_abstract() {
                parent.children.borrow_mut().retain(|child| !Rc::ptr_eq(child, self));
            }
        }

        self.state.borrow_mut().clear_watchers();
        self.insert_flags(InstanceFlags::IS_DESTROYED);

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.destroy()?;
        }
        *self.render_vnode.borrow_mut() = None;

        self.call_hook(LifecycleHook::Destroyed)?;
        self.off(None);
        tracing::debug!(uid = self.uid(), "destroyed");
        Ok(())
    }
}
