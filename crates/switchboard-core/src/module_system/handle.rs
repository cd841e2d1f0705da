use std::cell::Cell;
use std::fmt;

use crate::kernel::error::Result;
use crate::module_system::registry::ModuleRegistry;
use crate::module_system::traits::{Hook, HookContext, Module};

/// Identity of a module: the owning space plus the module ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub space: String,
    pub module: String,
}

impl ModuleKey {
    pub fn new(space: &str, module: &str) -> Self {
        Self {
            space: space.to_string(),
            module: module.to_string(),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.space, self.module)
    }
}

/// A registered module together with its declared dependencies and the
/// transient per-process flags the engine maintains for it.
pub struct ModuleHandle {
    key: ModuleKey,
    module: Box<dyn Module>,
    module_deps: Vec<String>,
    plugin_deps: Vec<String>,
    theme_deps: Vec<String>,
    running: Cell<bool>,
    forced_off: Cell<bool>,
}

impl ModuleHandle {
    /// Wrap a module for registration into `space_id`, copying the
    /// dependencies it declares.
    pub fn new(space_id: &str, module: Box<dyn Module>) -> Self {
        let key = ModuleKey::new(space_id, module.id());
        let mut handle = Self {
            key,
            module_deps: Vec::new(),
            plugin_deps: Vec::new(),
            theme_deps: Vec::new(),
            running: Cell::new(false),
            forced_off: Cell::new(false),
            module,
        };
        for id in handle.module.module_dependencies() {
            handle.add_module_dependency(&id);
        }
        for id in handle.module.plugin_dependencies() {
            handle.add_plugin_dependency(&id);
        }
        for id in handle.module.theme_dependencies() {
            handle.add_theme_dependency(&id);
        }
        handle
    }

    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.key.module
    }

    pub fn space_id(&self) -> &str {
        &self.key.space
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }

    pub fn description(&self) -> &str {
        self.module.description()
    }

    pub fn host_plugin(&self) -> Option<&str> {
        self.module.host_plugin()
    }

    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    pub fn module_dependencies(&self) -> &[String] {
        &self.module_deps
    }

    pub fn plugin_dependencies(&self) -> &[String] {
        &self.plugin_deps
    }

    pub fn theme_dependencies(&self) -> &[String] {
        &self.theme_deps
    }

    pub fn add_module_dependency(&mut self, id: &str) {
        push_unique(&mut self.module_deps, id);
    }

    pub fn add_plugin_dependency(&mut self, id: &str) {
        push_unique(&mut self.plugin_deps, id);
    }

    pub fn add_theme_dependency(&mut self, id: &str) {
        push_unique(&mut self.theme_deps, id);
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn is_forced_off(&self) -> bool {
        self.forced_off.get()
    }

    pub(crate) fn set_forced_off(&self, forced_off: bool) {
        self.forced_off.set(forced_off);
    }

    /// Whether this module declares a module dependency resolving to `other`
    pub fn depends_on(&self, other: &ModuleHandle, registry: &ModuleRegistry) -> bool {
        self.module_deps.iter().any(|id| {
            registry
                .module_dependency(id)
                .module_target()
                .is_some_and(|target| target == other.key)
        })
    }

    /// Run the start-up hook unless the module is already running.
    ///
    /// Returns whether the hook ran. The running flag is set even if the
    /// hook fails, so the matching shutdown still fires.
    pub fn start_up(&self, ctx: &HookContext<'_>) -> Result<bool> {
        if self.running.get() {
            log::debug!("Module {} is already running, skipping start up", self.key);
            return Ok(false);
        }
        self.running.set(true);
        self.module.run_on_startup(ctx)?;
        Ok(true)
    }

    /// Run the shutdown hook if the module is running. Returns whether it ran.
    pub fn shut_down(&self, ctx: &HookContext<'_>) -> Result<bool> {
        if !self.running.get() {
            return Ok(false);
        }
        self.running.set(false);
        self.module.run_on_shutdown(ctx)?;
        Ok(true)
    }

    /// Invoke a hook directly, without any guards
    pub fn invoke(&self, hook: Hook, ctx: &HookContext<'_>) -> Result<()> {
        match hook {
            Hook::Load => self.module.run_on_load(ctx),
            Hook::Activate => self.module.run_on_activate(ctx),
            Hook::Startup => self.module.run_on_startup(ctx),
            Hook::Resume => self.module.run_on_resume(ctx),
            Hook::Pause => self.module.run_on_pause(ctx),
            Hook::Shutdown => self.module.run_on_shutdown(ctx),
            Hook::Deactivate => self.module.run_on_deactivate(ctx),
            Hook::Uninstall => self.module.run_on_uninstall(ctx),
        }
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("key", &self.key)
            .field("name", &self.module.name())
            .field("module_deps", &self.module_deps)
            .field("plugin_deps", &self.plugin_deps)
            .field("theme_deps", &self.theme_deps)
            .field("running", &self.running.get())
            .field("forced_off", &self.forced_off.get())
            .finish()
    }
}
