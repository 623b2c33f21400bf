//! Component options - values, bags, registries and merging.

pub mod assets;
pub mod bag;
pub mod keys;
pub mod merge;
pub mod strategies;
pub mod value;

pub use assets::{Asset, AssetRegistry};
pub use bag::{Options, OptionsView};
pub use keys::{AssetKind, LifecycleHook};
pub use merge::{merge_options, validate_component_name};
pub use strategies::{merge_data_values, MergeContext};
pub use value::{
    ComputedFn, ComputedMap, DataFn, Definition, FilterFn, HookFn, InjectMap, InjectOptions, MethodFn,
    MethodsMap, OptionValue, PropOptions, PropsMap, RenderFn, WatchCallback, WatchHandler, WatchMap,
    WatchTarget,
};
