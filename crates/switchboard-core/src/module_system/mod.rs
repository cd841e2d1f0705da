//! # Switchboard Core Module System
//!
//! Registration, dependency resolution and lifecycle management for modules:
//! independently togglable units of functionality grouped into spaces.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`traits`]**: The [`Module`] trait modules implement, the [`Hook`]s
//!   the engine calls and the [`HookContext`] passed to them.
//! - **[`handle`]**: [`ModuleHandle`], a registered module with its declared
//!   dependencies plus running and forced-off flags.
//! - **[`dependency`]**: Module, plugin and theme dependencies, and the
//!   unregistered stand-in that is never met.
//! - **[`registry`]**: [`ModuleRegistry`] of spaces, modules and dependencies.
//! - **[`order`]**: [`order_modules`], the cycle-tolerant dependency orderer.
//! - **[`state`]**: [`Mode`], [`LifecycleState`] and the pure state derivation.
//! - **[`lifecycle`]**: [`LifecycleEngine`], which diffs saved against
//!   current states and fires hooks in dependency order.
//! - **[`manifest`]**: [`SiteManifest`], declaring modules and dependencies
//!   from a JSON, YAML or TOML file.
//! - **[`version`]**: Semver ranges for plugin and theme dependencies.
//! - **[`error`]**: [`ModuleSystemError`].
pub mod dependency;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod manifest;
pub mod order;
pub mod registry;
pub mod state;
pub mod traits;
pub mod version;

pub use dependency::{
    Dependency, DependencyKind, ModuleDependency, PluginDependency, ThemeDependency,
    UnregisteredDependency,
};
pub use error::ModuleSystemError;
pub use handle::{ModuleHandle, ModuleKey};
pub use lifecycle::{
    HookFailure, LifecycleEngine, ModuleRecord, ModuleStatus, PassReport, StateView, TransitionPlan,
};
pub use manifest::{ManifestModule, SiteManifest};
pub use order::{OrderedModules, order_modules};
pub use registry::{ModuleRegistry, Space};
pub use state::{LifecycleState, Mode, StateChange};
pub use traits::{Hook, HookContext, Module};
pub use version::VersionRange;

#[cfg(test)]
mod tests;
