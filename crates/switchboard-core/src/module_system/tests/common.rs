use std::cell::RefCell;
use std::rc::Rc;

use crate::kernel::bootstrap::Framework;
use crate::kernel::error::{Error, Result};
use crate::module_system::dependency::ModuleDependency;
use crate::module_system::handle::ModuleKey;
use crate::module_system::traits::{Hook, HookContext, Module};

pub type Tracker = Rc<RefCell<Vec<String>>>;

pub fn tracker() -> Tracker {
    Rc::new(RefCell::new(Vec::new()))
}

/// Drain the calls recorded so far
pub fn take(tracker: &Tracker) -> Vec<String> {
    std::mem::take(&mut *tracker.borrow_mut())
}

pub fn key(module: &str) -> ModuleKey {
    ModuleKey::new(SPACE, module)
}

pub fn keys(modules: &[&str]) -> Vec<ModuleKey> {
    modules.iter().map(|module| key(module)).collect()
}

pub const SPACE: &str = "shop";

/// A module that records every hook call as "<hook>:<id>"
pub struct TrackedModule {
    id: String,
    name: String,
    module_deps: Vec<String>,
    plugin_deps: Vec<String>,
    theme_deps: Vec<String>,
    host_plugin: Option<String>,
    fail_on: Option<Hook>,
    tracker: Tracker,
}

impl TrackedModule {
    pub fn new(id: &str, tracker: &Tracker) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Module {}", id.to_uppercase()),
            module_deps: Vec::new(),
            plugin_deps: Vec::new(),
            theme_deps: Vec::new(),
            host_plugin: None,
            fail_on: None,
            tracker: Rc::clone(tracker),
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.module_deps.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn needs_plugin(mut self, id: &str) -> Self {
        self.plugin_deps.push(id.to_string());
        self
    }

    pub fn needs_theme(mut self, id: &str) -> Self {
        self.theme_deps.push(id.to_string());
        self
    }

    pub fn hosted_by(mut self, file: &str) -> Self {
        self.host_plugin = Some(file.to_string());
        self
    }

    pub fn failing_on(mut self, hook: Hook) -> Self {
        self.fail_on = Some(hook);
        self
    }

    fn track(&self, hook: Hook) -> Result<()> {
        let short = hook.as_str().trim_start_matches("run_on_");
        self.tracker.borrow_mut().push(format!("{}:{}", short, self.id));
        if self.fail_on == Some(hook) {
            return Err(Error::Other(format!("{} exploded", self.id)));
        }
        Ok(())
    }
}

impl Module for TrackedModule {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn host_plugin(&self) -> Option<&str> {
        self.host_plugin.as_deref()
    }

    fn module_dependencies(&self) -> Vec<String> {
        self.module_deps.clone()
    }

    fn plugin_dependencies(&self) -> Vec<String> {
        self.plugin_deps.clone()
    }

    fn theme_dependencies(&self) -> Vec<String> {
        self.theme_deps.clone()
    }

    fn run_on_load(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Load)
    }

    fn run_on_activate(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Activate)
    }

    fn run_on_startup(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Startup)
    }

    fn run_on_resume(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Resume)
    }

    fn run_on_pause(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Pause)
    }

    fn run_on_shutdown(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Shutdown)
    }

    fn run_on_deactivate(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Deactivate)
    }

    fn run_on_uninstall(&self, _ctx: &HookContext<'_>) -> Result<()> {
        self.track(Hook::Uninstall)
    }
}

/// An in-memory framework with the "shop" space and a module dependency
/// registered for each of `module_ids`
pub fn framework_with_space(module_ids: &[&str]) -> Framework {
    let mut framework = Framework::in_memory();
    framework
        .create_space(SPACE, "Shop")
        .expect("Failed to create space");
    for id in module_ids {
        framework
            .register_dependency(ModuleDependency::new(SPACE, id).into())
            .expect("Failed to register module dependency");
    }
    framework
}

pub fn register(framework: &mut Framework, module: TrackedModule) -> ModuleKey {
    framework
        .register_module(SPACE, Box::new(module))
        .expect("Failed to register module")
}
