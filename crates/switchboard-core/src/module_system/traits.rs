use std::fmt;

use crate::kernel::error::Result;
use crate::module_system::handle::ModuleKey;
use crate::storage::provider::{ModuleOptions, OptionStore};

/// The module callbacks the lifecycle engine invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Load,
    Activate,
    Startup,
    Resume,
    Pause,
    Shutdown,
    Deactivate,
    Uninstall,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Load => "run_on_load",
            Hook::Activate => "run_on_activate",
            Hook::Startup => "run_on_startup",
            Hook::Resume => "run_on_resume",
            Hook::Pause => "run_on_pause",
            Hook::Shutdown => "run_on_shutdown",
            Hook::Deactivate => "run_on_deactivate",
            Hook::Uninstall => "run_on_uninstall",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook gets to see of the framework: its own identity and options.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    key: &'a ModuleKey,
    store: &'a dyn OptionStore,
}

impl<'a> HookContext<'a> {
    pub fn new(key: &'a ModuleKey, store: &'a dyn OptionStore) -> Self {
        Self { key, store }
    }

    /// The module being called
    pub fn key(&self) -> &'a ModuleKey {
        self.key
    }

    /// Options qualified by the module being called
    pub fn options(&self) -> ModuleOptions<'a> {
        ModuleOptions::new(self.store, &self.key.space, &self.key.module)
    }
}

/// Core trait that all modules must implement.
///
/// The engine only decides when each `run_on_*` hook fires and in which
/// order relative to other modules. Hooks should be idempotent: concurrent
/// requests may both observe a stale saved state.
pub trait Module {
    /// ID of the module, unique within its space
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// File of the plugin that ships this module, if any
    fn host_plugin(&self) -> Option<&str> {
        None
    }

    /// IDs of module dependencies
    fn module_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// IDs of plugin dependencies
    fn plugin_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// IDs of theme dependencies
    fn theme_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once when the module is registered
    fn run_on_load(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called when the module turns on from off, unknown or forced off
    fn run_on_activate(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called on every request while the module is on
    fn run_on_startup(&self, ctx: &HookContext<'_>) -> Result<()>;

    fn run_on_resume(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn run_on_pause(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called at the end of a request the module started up in
    fn run_on_shutdown(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn run_on_deactivate(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn run_on_uninstall(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }
}
