//! Render context: slots, asset resolution, element creation and the
//! minimal patch that instantiates child components.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::options::keys::RESERVED_TAGS;
use crate::options::{Asset, AssetKind};
use crate::vnode::VNode;
use super::Instance;

/// Record `$vnode` and resolve `$slots` from the placeholder's children.
pub(crate) fn init_render(vm: &Rc<Instance>) -> Result<()> {
    let options = vm.options();
    *vm.render_vnode.borrow_mut() = None;
    *vm.vnode.borrow_mut() = options.parent_vnode();
    let slots = options
        .render_children()
        .map(|children| resolve_slots(&children))
        .unwrap_or_default();
    *vm.slots.borrow_mut() = slots;
    Ok(())
}

/// Group children into named slots.
///
/// Children carrying a `slot` go to that slot (a `template` contributes its
/// own children), everything else to `default`. Slots made only of
/// whitespace are dropped.
pub fn resolve_slots(children: &[VNode]) -> IndexMap<String, Vec<VNode>> {
    let mut slots: IndexMap<String, Vec<VNode>> = IndexMap::new();
    for child in children {
        match &child.slot {
            Some(name) => {
                let slot = slots.entry(name.clone()).or_default();
                if child.tag.as_deref() == Some("template") {
                    slot.extend(child.children.iter().cloned());
                } else {
                    slot.push(child.clone());
                }
            }
            None => slots.entry("default".to_string()).or_default().push(child.clone()),
        }
    }
    slots.retain(|_, nodes| !nodes.iter().all(VNode::is_whitespace));
    slots
}

/// Run the render function and build every child component in the result.
///
/// Returns the children waiting for `mounted`, deepest first.
pub(crate) fn render_and_patch(vm: &Rc<Instance>) -> Result<Vec<Rc<Instance>>> {
    let Some(render) = vm.options().render() else {
        return Ok(Vec::new());
    };
    let vnode = render(vm).map_err(|source| Error::Render {
        uid: vm.uid(),
        source: Box::new(source),
    })?;

    let mut inserted = Vec::new();
    instantiate_components(vm, &vnode, &mut inserted)?;
    *vm.render_vnode.borrow_mut() = Some(vnode);
    Ok(inserted)
}

fn instantiate_components(vm: &Rc<Instance>, vnode: &VNode, inserted: &mut Vec<Rc<Instance>>) -> Result<()> {
    if vnode.is_component() {
        let child = Instance::create_child_for_vnode(vm, Rc::new(vnode.clone()))?;
        child.mount(None)?;
        inserted.append(&mut *child.pending_insert.borrow_mut());
        inserted.push(child);
        return Ok(());
    }
    for child in &vnode.children {
        instantiate_components(vm, child, inserted)?;
    }
    Ok(())
}

impl Instance {
    /// `$slots`.
    pub fn slots(&self) -> IndexMap<String, Vec<VNode>> {
        self.slots.borrow().clone()
    }

    pub fn slot(&self, name: &str) -> Option<Vec<VNode>> {
        self.slots.borrow().get(name).cloned()
    }

    /// Look an asset up in `$options`: `id` as written, camelized, then
    /// capitalized; own registrations before inherited ones.
    pub fn resolve_asset(&self, kind: AssetKind, id: &str) -> Option<Asset> {
        let registry = self.options().assets(kind)?;
        let asset = registry.resolve(id);
        if asset.is_none() {
            self.diagnostics().warn(format_args!(
                "Failed to resolve {}: {id}",
                kind.key().trim_end_matches('s')
            ));
        }
        asset
    }

    /// Build a vnode for `tag`: a plain element for reserved tags, a
    /// component placeholder for registered components.
    pub fn create_element(&self, tag: &str, children: Vec<VNode>) -> VNode {
        if RESERVED_TAGS.contains(&tag) {
            return VNode::element(tag).with_children(children);
        }
        let registry = self.options().assets(AssetKind::Component);
        let descriptor = match registry.and_then(|registry| registry.resolve(tag)) {
            Some(Asset::Definition(definition)) => Some(self.runtime().extend_definition(&definition)),
            Some(asset) => asset.descriptor(),
            None => None,
        };
        match descriptor {
            Some(descriptor) => VNode::component(&descriptor, tag).with_children(children),
            None => {
                self.diagnostics().warn(format_args!(
                    "Unknown custom element: <{tag}> - did you register the component correctly?"
                ));
                VNode::element(tag).with_children(children)
            }
        }
    }
}
