//! Virtual nodes, reduced to what instance construction consumes.
//!
//! A component placeholder vnode carries [`VNodeComponentOptions`]: the
//! constructor plus the props data, listeners, children and tag the
//! renderer collected for it. The internal fast path copies them onto the
//! child's `$options`.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::descriptor::ComponentDescriptor;
use crate::error::Result;

/// Event listener. Receives the emitted arguments.
pub type EventHandler = Rc<dyn Fn(&[Value]) -> Result<()>>;

/// Event name to handlers, in registration order.
pub type Listeners = IndexMap<String, Vec<EventHandler>>;

/// Component metadata attached to a placeholder vnode.
#[derive(Clone)]
pub struct VNodeComponentOptions {
    pub ctor: Rc<ComponentDescriptor>,
    pub props_data: Option<Value>,
    pub listeners: Option<Rc<Listeners>>,
    pub children: Option<Rc<[VNode]>>,
    /// Tag the component was used under, e.g. `my-button`.
    pub tag: String,
}

impl fmt::Debug for VNodeComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNodeComponentOptions")
            .field("cid", &self.ctor.cid())
            .field("tag", &self.tag)
            .field("props_data", &self.props_data)
            .field("listeners", &self.listeners.as_ref().map(|l| l.keys().cloned().collect::<Vec<_>>()))
            .field("children", &self.children.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// A virtual node.
#[derive(Debug, Clone, Default)]
pub struct VNode {
    pub tag: Option<String>,
    pub text: Option<String>,
    /// Named slot this node is passed into.
    pub slot: Option<String>,
    pub is_comment: bool,
    pub children: Vec<VNode>,
    pub component_options: Option<Rc<VNodeComponentOptions>>,
}

impl VNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_comment: true,
            ..Self::default()
        }
    }

    /// A component placeholder for `ctor`, used under `tag`.
    ///
    /// Resolves the constructor's options first so ancestor changes made
    /// since it was extended are applied before any child is built from
    /// this vnode.
    pub fn component(ctor: &Rc<ComponentDescriptor>, tag: impl Into<String>) -> Self {
        let options = ctor.resolve_options();
        let tag = tag.into();
        let placeholder = match options.name() {
            Some(name) => format!("component-{}-{name}", ctor.cid()),
            None => format!("component-{}", ctor.cid()),
        };
        Self {
            tag: Some(placeholder),
            component_options: Some(Rc::new(VNodeComponentOptions {
                ctor: ctor.clone(),
                props_data: None,
                listeners: None,
                children: None,
                tag,
            })),
            ..Self::default()
        }
    }

    /// Children. On a component placeholder they become the component's
    /// slot content instead.
    pub fn with_children(mut self, children: Vec<VNode>) -> Self {
        match self.component_options.as_mut() {
            Some(component) => Rc::make_mut(component).children = Some(children.into()),
            None => self.children = children,
        }
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>) -> Self {
        self.slot = Some(name.into());
        self
    }

    /// Props data for a component placeholder. Ignored on other vnodes.
    pub fn with_props_data(mut self, props_data: Value) -> Self {
        if let Some(component) = self.component_options.as_mut() {
            Rc::make_mut(component).props_data = Some(props_data);
        }
        self
    }

    /// Add a listener to a component placeholder. Ignored on other vnodes.
    pub fn with_listener(
        mut self,
        event: impl Into<String>,
        handler: impl Fn(&[Value]) -> Result<()> + 'static,
    ) -> Self {
        if let Some(component) = self.component_options.as_mut() {
            let component = Rc::make_mut(component);
            let mut listeners = component.listeners.as_deref().cloned().unwrap_or_default();
            listeners.entry(event.into()).or_default().push(Rc::new(handler));
            component.listeners = Some(Rc::new(listeners));
        }
        self
    }

    pub fn is_component(&self) -> bool {
        self.component_options.is_some()
    }

    /// Whitespace text or a comment; dropped from default slots.
    pub fn is_whitespace(&self) -> bool {
        self.is_comment || self.text.as_deref() == Some(" ")
    }
}
