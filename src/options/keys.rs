//! Option keys with special merge or construction semantics.

pub const DATA: &str = "data";
pub const PROPS: &str = "props";
pub const COMPUTED: &str = "computed";
pub const WATCH: &str = "watch";
pub const METHODS: &str = "methods";
pub const INJECT: &str = "inject";
pub const PROVIDE: &str = "provide";
pub const COMPONENTS: &str = "components";
pub const DIRECTIVES: &str = "directives";
pub const FILTERS: &str = "filters";
pub const MIXINS: &str = "mixins";
pub const EXTENDS: &str = "extends";
pub const EL: &str = "el";
pub const PROPS_DATA: &str = "propsData";
pub const NAME: &str = "name";
pub const RENDER: &str = "render";
pub const STATIC_RENDER_FNS: &str = "staticRenderFns";
pub const ABSTRACT: &str = "abstract";

// Fields written by the internal component fast path.
pub const PARENT: &str = "parent";
pub const PARENT_VNODE: &str = "_parentVnode";
pub const PARENT_LISTENERS: &str = "_parentListeners";
pub const RENDER_CHILDREN: &str = "_renderChildren";
pub const COMPONENT_TAG: &str = "_componentTag";

/// Lifecycle hook slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
    Activated,
    Deactivated,
    ErrorCaptured,
    ServerPrefetch,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 12] = [
        LifecycleHook::BeforeCreate,
        LifecycleHook::Created,
        LifecycleHook::BeforeMount,
        LifecycleHook::Mounted,
        LifecycleHook::BeforeUpdate,
        LifecycleHook::Updated,
        LifecycleHook::BeforeDestroy,
        LifecycleHook::Destroyed,
        LifecycleHook::Activated,
        LifecycleHook::Deactivated,
        LifecycleHook::ErrorCaptured,
        LifecycleHook::ServerPrefetch,
    ];

    /// The option key this hook is declared under.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleHook::BeforeCreate => "beforeCreate",
            LifecycleHook::Created => "created",
            LifecycleHook::BeforeMount => "beforeMount",
            LifecycleHook::Mounted => "mounted",
            LifecycleHook::BeforeUpdate => "beforeUpdate",
            LifecycleHook::Updated => "updated",
            LifecycleHook::BeforeDestroy => "beforeDestroy",
            LifecycleHook::Destroyed => "destroyed",
            LifecycleHook::Activated => "activated",
            LifecycleHook::Deactivated => "deactivated",
            LifecycleHook::ErrorCaptured => "errorCaptured",
            LifecycleHook::ServerPrefetch => "serverPrefetch",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.as_str() == key)
    }
}

/// Asset registry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Component,
    Directive,
    Filter,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Component, AssetKind::Directive, AssetKind::Filter];

    /// The option key holding this registry.
    pub fn key(self) -> &'static str {
        match self {
            AssetKind::Component => COMPONENTS,
            AssetKind::Directive => DIRECTIVES,
            AssetKind::Filter => FILTERS,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// Attribute names a prop may not take.
pub const RESERVED_ATTRIBUTES: [&str; 5] = ["key", "ref", "slot", "slot-scope", "is"];

/// Tags a component may not be registered under.
pub const RESERVED_TAGS: &[&str] = &[
    "slot", "component", "html", "body", "base", "head", "link", "meta", "style", "title",
    "address", "article", "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6",
    "nav", "section", "div", "dd", "dl", "dt", "figcaption", "figure", "picture", "hr", "img",
    "li", "main", "ol", "p", "pre", "ul", "a", "b", "abbr", "br", "code", "em", "i", "q",
    "span", "strong", "sub", "sup", "time", "u", "var", "audio", "map", "track", "video",
    "embed", "object", "param", "source", "canvas", "script", "noscript", "table", "caption",
    "col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr", "button", "datalist",
    "fieldset", "form", "input", "label", "legend", "meter", "optgroup", "option", "output",
    "progress", "select", "textarea", "details", "dialog", "menu", "summary", "template",
    "svg", "math",
];

/// Whether `key` starts with `$` or `_`. Such data keys are kept off the instance surface.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with('$') || key.starts_with('_')
}

/// `foo-bar` to `fooBar`.
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            if upper {
                out.push('-');
            }
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    if upper {
        out.push('-');
    }
    out
}

/// `fooBar` to `FooBar`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `fooBar` to `foo-bar`.
pub fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('-');
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_round_trip() {
        for hook in LifecycleHook::ALL {
            assert_eq!(LifecycleHook::from_key(hook.as_str()), Some(hook));
        }
        assert_eq!(LifecycleHook::from_key("data"), None);
    }

    #[test]
    fn test_name_transforms() {
        assert_eq!(camelize("my-prop-name"), "myPropName");
        assert_eq!(camelize("plain"), "plain");
        assert_eq!(capitalize("myComp"), "MyComp");
        assert_eq!(hyphenate("slotScope"), "slot-scope");
    }
}
