use crate::host::{HostEnvironment, StaticHost};
use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::module_system::dependency::Dependency;
use crate::module_system::error::ModuleSystemError;
use crate::module_system::handle::{ModuleHandle, ModuleKey};
use crate::module_system::lifecycle::{LifecycleEngine, ModuleRecord, ModuleStatus, PassReport};
use crate::module_system::registry::{ModuleRegistry, Space};
use crate::module_system::state::Mode;
use crate::module_system::traits::{HookContext, Module};
use crate::storage::memory::MemoryOptionStore;
use crate::storage::provider::OptionStore;
use crate::ui_bridge::{StateChangeNotice, UiBridge, UiConnector};

/// Outcome of one request: notices shown to administrators and the pass itself
#[derive(Debug, Default)]
pub struct RequestReport {
    pub notices: Vec<StateChangeNotice>,
    pub pass: PassReport,
}

/// The framework instance: owns the registry, the option store, the host
/// facts and the UI bridge, and exposes the host's trigger points.
pub struct Framework {
    registry: ModuleRegistry,
    store: Box<dyn OptionStore>,
    host: Box<dyn HostEnvironment>,
    ui: UiBridge,
    /// Modules started this request, in start order
    pending_shutdown: Vec<ModuleKey>,
}

impl Framework {
    pub fn new(store: Box<dyn OptionStore>, host: Box<dyn HostEnvironment>) -> Self {
        log::info!("Initializing {} v{}", constants::FRAMEWORK_NAME, constants::FRAMEWORK_VERSION);
        log::debug!("Using option store '{}'", store.name());
        Self {
            registry: ModuleRegistry::new(),
            store,
            host,
            ui: UiBridge::new(),
            pending_shutdown: Vec::new(),
        }
    }

    /// A framework with a volatile store and an empty host
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryOptionStore::new()), Box::new(StaticHost::new()))
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn OptionStore {
        self.store.as_ref()
    }

    pub fn host(&self) -> &dyn HostEnvironment {
        self.host.as_ref()
    }

    pub fn replace_host(&mut self, host: Box<dyn HostEnvironment>) {
        self.host = host;
    }

    pub fn register_connector(&mut self, connector: Box<dyn UiConnector>) {
        self.ui.register_connector(connector);
    }

    pub fn engine(&self) -> LifecycleEngine<'_> {
        LifecycleEngine::new(&self.registry, self.store.as_ref(), self.host.as_ref())
    }

    pub fn create_space(&mut self, id: &str, name: &str) -> Result<()> {
        self.registry.register_space(Space::new(id, name))
    }

    /// Register a module into a space and run its load hook.
    ///
    /// A failing load hook is logged; the module stays registered.
    pub fn register_module(&mut self, space_id: &str, module: Box<dyn Module>) -> Result<ModuleKey> {
        let handle = ModuleHandle::new(space_id, module);
        let key = handle.key().clone();
        self.registry.register_module(handle)?;

        if let Some(handle) = self.registry.module(&key) {
            let ctx = HookContext::new(handle.key(), self.store.as_ref());
            if let Err(e) = handle.module().run_on_load(&ctx) {
                log::error!("Hook run_on_load failed for module {}: {}", key, e);
            }
        }
        Ok(key)
    }

    pub fn register_dependency(&mut self, dependency: Dependency) -> Result<()> {
        self.registry.register_dependency(dependency)
    }

    fn require_module(&self, key: &ModuleKey) -> Result<&ModuleHandle> {
        self.registry
            .module(key)
            .ok_or_else(|| ModuleSystemError::UnknownModule(key.to_string()).into())
    }

    /// Store the administrator's requested mode; takes effect on the next request
    pub fn set_mode(&self, key: &ModuleKey, mode: Mode) -> Result<bool> {
        self.require_module(key)?;
        let changed = ModuleRecord::save_mode(self.store.as_ref(), key, mode)?;
        if changed {
            log::info!("Mode of module {} set to {}", key, mode);
        }
        Ok(changed)
    }

    pub fn mode(&self, key: &ModuleKey) -> Result<Mode> {
        self.require_module(key)?;
        Ok(ModuleRecord::load(self.store.as_ref(), key)?.mode)
    }

    /// Run at the start of every request: report dependency-driven state
    /// changes, then bring every module's lifecycle up to date.
    pub fn handle_request(&mut self) -> Result<RequestReport> {
        let report = {
            let engine = self.engine();
            let notices = engine.notify_state_changes()?;
            self.ui.broadcast(&notices);
            let pass = engine.run()?;
            RequestReport { notices, pass }
        };

        for key in &report.pass.started {
            if !self.pending_shutdown.contains(key) {
                self.pending_shutdown.push(key.clone());
            }
        }
        Ok(report)
    }

    /// Run at the end of a request: shut down what the request started
    pub fn end_request(&mut self) -> PassReport {
        let keys = std::mem::take(&mut self.pending_shutdown);
        self.engine().shut_down(&keys)
    }

    /// The framework itself is being deactivated: force every module off
    pub fn on_framework_deactivated(&self) -> Result<PassReport> {
        self.engine().force_deactivate(|_| true)
    }

    /// The framework itself is being uninstalled: uninstall every module
    pub fn on_framework_uninstalled(&self) -> Result<PassReport> {
        self.engine().force_uninstall(|_| true)
    }

    /// A plugin is being deactivated: force off the modules it ships
    pub fn on_plugin_deactivated(&self, plugin_file: &str) -> Result<PassReport> {
        log::info!("Plugin {} deactivated", plugin_file);
        self.engine()
            .force_deactivate(|handle| handle.host_plugin() == Some(plugin_file))
    }

    /// A plugin is being uninstalled: uninstall the modules it ships
    pub fn on_plugin_uninstalled(&self, plugin_file: &str) -> Result<PassReport> {
        log::info!("Plugin {} uninstalled", plugin_file);
        self.engine()
            .force_uninstall(|handle| handle.host_plugin() == Some(plugin_file))
    }

    /// Status of every module, in dependency order
    pub fn statuses(&self) -> Result<Vec<ModuleStatus>> {
        let engine = self.engine();
        let view = engine.view()?;
        Ok(engine.ordered().iter().map(|handle| view.status(handle)).collect())
    }

    pub fn status(&self, key: &ModuleKey) -> Result<ModuleStatus> {
        let handle = self.require_module(key)?;
        Ok(self.engine().view()?.status(handle))
    }

    /// Whether the module dependency registered under `id` is met right now
    pub fn module_dep_met(&self, id: &str) -> Result<bool> {
        let view = self.engine().view()?;
        Ok(self.registry.module_dependency(id).met(&view))
    }

    /// Whether the plugin dependency registered under `id` is met right now
    pub fn plugin_dep_met(&self, id: &str) -> Result<bool> {
        let view = self.engine().view()?;
        Ok(self.registry.plugin_dependency(id).met(&view))
    }

    /// Whether the theme dependency registered under `id` is met right now
    pub fn theme_dep_met(&self, id: &str) -> Result<bool> {
        let view = self.engine().view()?;
        Ok(self.registry.theme_dependency(id).met(&view))
    }
}

impl std::fmt::Debug for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framework")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("host", &self.host)
            .field("pending_shutdown", &self.pending_shutdown)
            .finish_non_exhaustive()
    }
}
