//! # spark-components
//!
//! Component instance construction for reactive UI runtimes.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! reactive instance state.
//!
//! ## Architecture
//!
//! A component definition is an [`Options`] bag. [`Runtime::extend`] turns it
//! into a [`ComponentDescriptor`], a reusable component type whose options are
//! its ancestor's options merged with its own. Constructing an [`Instance`]
//! resolves the descriptor's options, merges in the instance's own options
//! and walks a fixed sequence of initialization steps:
//!
//! ```text
//! Options ──extend──▶ ComponentDescriptor ──resolve──▶ $options
//!                                                         │
//!   proxy → lifecycle → events → render → beforeCreate → inject
//!         → state → provide → created → [mount]
//! ```
//!
//! Renderer-created children skip the merge: their `$options` read through
//! to the constructor's options and only carry the placeholder vnode's
//! metadata.
//!
//! ## Modules
//!
//! - [`options`] - Option values, merge strategies, the option merger
//! - [`descriptor`] - Component types and the constructor option resolver
//! - [`instance`] - Instances and their initialization steps
//! - [`collaborators`] - Pluggable initialization steps
//! - [`runtime`] - Uids, the base descriptor, global registration
//! - [`vnode`] - Minimal vnodes for slots and child components

pub mod collaborators;
pub mod config;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod instance;
pub mod options;
pub mod runtime;
pub mod vnode;

pub use collaborators::{Collaborators, DefaultCollaborators};
pub use config::RuntimeConfig;
pub use descriptor::ComponentDescriptor;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
pub use instance::{
    InitStage, Instance, InstanceFlags, InstanceOptions, InternalComponentOptions, ProxyMode, RenderProxy,
};
pub use options::{
    merge_options, Asset, AssetKind, AssetRegistry, Definition, InjectOptions, LifecycleHook, MergeContext,
    OptionValue, Options, OptionsView, PropOptions, WatchHandler,
};
pub use runtime::{Runtime, UidCounter};
pub use vnode::{EventHandler, Listeners, VNode};
