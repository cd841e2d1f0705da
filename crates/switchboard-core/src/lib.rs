//! # Switchboard Core
//!
//! A module lifecycle engine for plugin frameworks. Modules register into
//! spaces, declare dependencies on other modules, host plugins and themes,
//! and are switched on, paused or off by an administrator. On every request
//! the engine orders modules by dependency, derives each one's state and
//! fires the hooks that move it from its saved state to its current one.
pub mod host;
pub mod kernel;
pub mod module_system;
pub mod storage;
pub mod ui_bridge;

// Re-export key public types/traits for easier use by the binary and embedders
pub use host::{HostEnvironment, StaticHost, ThemeInfo};
pub use kernel::error::Error as KernelError;
pub use kernel::{Framework, RequestReport};
pub use module_system::{
    Hook, HookContext, LifecycleState, Mode, Module, ModuleKey, ModuleStatus, PassReport,
    SiteManifest,
};
pub use storage::{FileOptionStore, MemoryOptionStore, OptionStore};
pub use ui_bridge::{StateChangeNotice, UiConnector};
