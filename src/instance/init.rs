//! Instance construction.
//!
//! ```text
//! uid ─▶ flag ─▶ $options ─▶ proxy ─▶ lifecycle ─▶ events ─▶ render
//!     ─▶ beforeCreate ─▶ inject ─▶ state ─▶ provide ─▶ created ─▶ [mount]
//! ```
//!
//! `$options` comes from one of two places. A root instance merges its
//! constructor's resolved options with the options it was created with. A
//! renderer-created child takes the fast path: a thin bag that reads
//! through to the constructor's options, carrying only the placeholder
//! vnode's metadata as own fields.
//!
//! Errors from any step abort construction. Steps already taken are not
//! undone.

use std::rc::Rc;
use std::time::Instant;

use serde_json::Value;

use crate::descriptor::ComponentDescriptor;
use crate::error::{Error, Result};
use crate::options::keys::{self, LifecycleHook};
use crate::options::{merge_options, MergeContext, OptionValue, Options, RenderFn};
use crate::runtime::Runtime;
use crate::vnode::VNode;
use super::{InitStage, Instance, InstanceFlags};

/// How an instance is being created.
pub enum InstanceOptions {
    /// User-constructed: merged with the constructor's options.
    Root(Options),
    /// Renderer-constructed child of an existing instance.
    Internal(InternalComponentOptions),
}

impl From<Options> for InstanceOptions {
    fn from(options: Options) -> Self {
        InstanceOptions::Root(options)
    }
}

/// What the renderer knows when it creates a child component.
pub struct InternalComponentOptions {
    pub parent: Rc<Instance>,
    /// Placeholder vnode carrying the component metadata.
    pub parent_vnode: Rc<VNode>,
    /// Render functions supplied by the placeholder (inline templates).
    pub render: Option<RenderFn>,
    pub static_render_fns: Option<Rc<[RenderFn]>>,
}

impl InternalComponentOptions {
    pub fn new(parent: Rc<Instance>, parent_vnode: Rc<VNode>) -> Self {
        Self {
            parent,
            parent_vnode,
            render: None,
            static_render_fns: None,
        }
    }
}

impl Instance {
    /// Construct an instance of `descriptor`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let vm = Instance::new(&runtime, &counter, Options::new().with_el("#app"))?;
    /// assert!(vm.is_mounted());
    /// ```
    pub fn new(
        runtime: &Runtime,
        descriptor: &Rc<ComponentDescriptor>,
        options: impl Into<InstanceOptions>,
    ) -> Result<Rc<Instance>> {
        construct(runtime, descriptor, options.into())
    }

    /// Build the child component a placeholder vnode stands for.
    pub fn create_child_for_vnode(parent: &Rc<Instance>, vnode: Rc<VNode>) -> Result<Rc<Instance>> {
        let Some(component) = vnode.component_options.clone() else {
            return Err(Error::NotAComponent {
                tag: vnode.tag.clone().unwrap_or_default(),
            });
        };
        let options = InternalComponentOptions::new(parent.clone(), vnode);
        construct(parent.runtime(), &component.ctor, InstanceOptions::Internal(options))
    }
}

fn construct(
    runtime: &Runtime,
    descriptor: &Rc<ComponentDescriptor>,
    options: InstanceOptions,
) -> Result<Rc<Instance>> {
    let uid = runtime.next_uid();
    let started = runtime.config().performance.then(Instant::now);

    let vm = Rc::new_cyclic(|this| Instance::blank(uid, this.clone(), runtime.clone(), descriptor.clone()));
    vm.insert_flags(InstanceFlags::IS_FRAMEWORK_OWNED);

    let resolved = match options {
        InstanceOptions::Internal(internal) => {
            vm.insert_flags(InstanceFlags::IS_COMPONENT);
            init_internal_component(descriptor, internal)?
        }
        InstanceOptions::Root(options) => {
            let ctor_options = descriptor.resolve_options();
            merge_options(&ctor_options, &options, MergeContext::instance(runtime.diagnostics()))
        }
    };
    *vm.options.borrow_mut() = Rc::new(resolved);
    vm.advance(InitStage::OptionsResolved);

    let collaborators = runtime.collaborators();
    collaborators.init_proxy(&vm)?;
    vm.advance(InitStage::ProxyOrDirectAccessSet);

    let lifecycle = collaborators.init_lifecycle(&vm);
    vm.advance(InitStage::LifecycleLinked);
    let events = collaborators.init_events(&vm);
    vm.advance(InitStage::EventsInitialized);
    let render = collaborators.init_render(&vm);
    vm.advance(InitStage::RenderContextInitialized);
    lifecycle.and(events).and(render)?;

    collaborators.call_hook(&vm, LifecycleHook::BeforeCreate)?;
    vm.advance(InitStage::BeforeCreateHookFired);
    collaborators.init_injections(&vm)?;
    vm.advance(InitStage::InjectionsResolved);
    collaborators.init_state(&vm)?;
    vm.advance(InitStage::ReactiveStateInitialized);
    collaborators.init_provide(&vm)?;
    vm.advance(InitStage::ProvisionsPublished);
    collaborators.call_hook(&vm, LifecycleHook::Created)?;
    vm.advance(InitStage::CreatedHookFired);

    if let Some(started) = started {
        tracing::debug!(
            uid,
            name = vm.name().as_deref(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "init"
        );
    }

    if let Some(el) = vm.options().el() {
        vm.mount(Some(&el))?;
    }
    Ok(vm)
}

/// `$options` for a renderer-created child.
fn init_internal_component(
    descriptor: &Rc<ComponentDescriptor>,
    internal: InternalComponentOptions,
) -> Result<Options> {
    let InternalComponentOptions {
        parent,
        parent_vnode,
        render,
        static_render_fns,
    } = internal;
    let Some(component) = parent_vnode.component_options.clone() else {
        return Err(Error::NotAComponent {
            tag: parent_vnode.tag.clone().unwrap_or_default(),
        });
    };

    let options = Options::inheriting(descriptor.options());
    options.insert(keys::PARENT, OptionValue::Parent(Rc::downgrade(&parent)));
    options.insert(keys::PARENT_VNODE, OptionValue::VNode(parent_vnode));
    // Always own: absent metadata must shadow the constructor's options.
    let props_data = component.props_data.clone().unwrap_or(Value::Null);
    options.insert(keys::PROPS_DATA, OptionValue::value(props_data));
    let listeners = component.listeners.clone().unwrap_or_default();
    options.insert(keys::PARENT_LISTENERS, OptionValue::Listeners(listeners));
    let children = component.children.clone().unwrap_or_else(|| Rc::from(Vec::new()));
    options.insert(keys::RENDER_CHILDREN, OptionValue::Children(children));
    options.insert(keys::COMPONENT_TAG, OptionValue::value(component.tag.clone()));

    if let Some(render) = render {
        options.insert(keys::RENDER, OptionValue::Render(render));
        if let Some(fns) = static_render_fns {
            options.insert(keys::STATIC_RENDER_FNS, OptionValue::StaticRenderFns(fns));
        }
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::config::RuntimeConfig;
    use crate::options::OptionsView;

    fn runtime() -> Runtime {
        Runtime::with_config(RuntimeConfig::default().diagnostics(false))
    }

    #[test]
    fn test_root_reaches_created() {
        let runtime = runtime();
        let vm = runtime.new_instance(Options::new()).unwrap();

        assert_eq!(vm.stage(), InitStage::CreatedHookFired);
        assert!(vm.flags().contains(InstanceFlags::IS_FRAMEWORK_OWNED));
        assert!(!vm.flags().contains(InstanceFlags::IS_COMPONENT));
        assert!(vm.options().is_merged());
    }

    #[test]
    fn test_stage_seen_by_hooks() {
        let runtime = runtime();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());
        let options = Options::new()
            .with_hook(LifecycleHook::BeforeCreate, move |vm| {
                a.borrow_mut().push(vm.stage());
                Ok(())
            })
            .with_hook(LifecycleHook::Created, move |vm| {
                b.borrow_mut().push(vm.stage());
                Ok(())
            });

        runtime.new_instance(options).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![InitStage::RenderContextInitialized, InitStage::ProvisionsPublished]
        );
    }

    #[test]
    fn test_fast_path_reads_through() {
        let runtime = runtime();
        let parent = runtime.new_instance(Options::new()).unwrap();
        let child_ctor = runtime.extend(Options::new().with_name("child").with_value("color", "red"));
        let vnode = Rc::new(VNode::component(&child_ctor, "child").with_props_data(json!({ "size": 2 })));

        let child = Instance::create_child_for_vnode(&parent, vnode.clone()).unwrap();
        let options = child.options();

        assert!(child.flags().contains(InstanceFlags::IS_COMPONENT));
        assert!(Rc::ptr_eq(options.fallback().unwrap(), &child_ctor.options()));
        assert_eq!(options.get("color").and_then(|v| v.as_str().map(str::to_owned)).as_deref(), Some("red"));
        assert!(!options.contains_own("color"));
        assert_eq!(options.props_data(), json!({ "size": 2 }).as_object().cloned());
        assert_eq!(options.component_tag().as_deref(), Some("child"));
        assert!(Rc::ptr_eq(&options.parent_vnode().unwrap(), &vnode));
        assert!(Rc::ptr_eq(&options.parent_instance().unwrap(), &parent));
        assert!(options.render().is_none());
    }

    #[test]
    fn test_fast_path_absent_metadata_shadows_constructor() {
        let runtime = runtime();
        let parent = runtime.new_instance(Options::new()).unwrap();
        let ctor = runtime.extend(Options::new().with_props_data(json!({ "stale": 1 })));

        let child = Instance::create_child_for_vnode(&parent, Rc::new(VNode::component(&ctor, "child"))).unwrap();
        let options = child.options();

        assert!(ctor.options().props_data().is_some());
        assert!(options.contains_own(keys::PROPS_DATA));
        assert_eq!(options.props_data(), None);
        assert!(options.parent_listeners().is_some_and(|listeners| listeners.is_empty()));
        assert!(options.render_children().is_some_and(|children| children.is_empty()));
        assert!(child.slots().is_empty());
    }

    #[test]
    fn test_fast_path_inline_render() {
        let runtime = runtime();
        let parent = runtime.new_instance(Options::new()).unwrap();
        let ctor = runtime.extend(Options::new());
        let vnode = Rc::new(VNode::component(&ctor, "inline"));
        let render: RenderFn = Rc::new(|_: &Rc<Instance>| -> Result<VNode> { Ok(VNode::element("div")) });

        let mut internal = InternalComponentOptions::new(parent, vnode);
        internal.render = Some(render.clone());
        let child = Instance::new(&runtime, &ctor, InstanceOptions::Internal(internal)).unwrap();

        assert!(Rc::ptr_eq(&child.options().render().unwrap(), &render));
    }

    #[test]
    fn test_plain_vnode_rejected() {
        let runtime = runtime();
        let parent = runtime.new_instance(Options::new()).unwrap();

        let err = Instance::create_child_for_vnode(&parent, Rc::new(VNode::element("div"))).unwrap_err();
        assert!(matches!(err, Error::NotAComponent { ref tag } if tag == "div"));
    }
}
