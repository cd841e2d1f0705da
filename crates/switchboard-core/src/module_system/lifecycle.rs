//! The lifecycle engine: derives each module's current state, diffs it
//! against the state saved by the previous pass, and invokes the matching
//! hooks in dependency order.
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::host::HostEnvironment;
use crate::kernel::error::Result;
use crate::module_system::dependency::Dependency;
use crate::module_system::handle::{ModuleHandle, ModuleKey};
use crate::module_system::order::{OrderedModules, order_modules};
use crate::module_system::registry::ModuleRegistry;
use crate::module_system::state::{LifecycleState, Mode, StateChange};
use crate::module_system::traits::{Hook, HookContext};
use crate::storage::provider::{OptionField, OptionKey, OptionStore};
use crate::ui_bridge::messages::{NoticeEntry, NoticeKind, StateChangeNotice};

/// The persisted part of a module: requested mode and last saved state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleRecord {
    pub mode: Mode,
    pub saved_state: LifecycleState,
}

impl ModuleRecord {
    pub fn mode_key(key: &ModuleKey) -> OptionKey {
        OptionKey::new(&key.space, &key.module, OptionField::Mode)
    }

    pub fn state_key(key: &ModuleKey) -> OptionKey {
        OptionKey::new(&key.space, &key.module, OptionField::State)
    }

    /// Read a module's record; absent or unreadable fields take their defaults
    pub fn load(store: &dyn OptionStore, key: &ModuleKey) -> Result<Self> {
        Ok(Self {
            mode: read_field(store, &Self::mode_key(key))?,
            saved_state: read_field(store, &Self::state_key(key))?,
        })
    }

    pub fn save_mode(store: &dyn OptionStore, key: &ModuleKey, mode: Mode) -> Result<bool> {
        store.update(&Self::mode_key(key), Value::from(mode.as_str()))
    }

    pub fn save_state(store: &dyn OptionStore, key: &ModuleKey, state: LifecycleState) -> Result<bool> {
        store.update(&Self::state_key(key), Value::from(state.as_str()))
    }

    /// Remove both mode and state records
    pub fn delete(store: &dyn OptionStore, key: &ModuleKey) -> Result<()> {
        store.delete(&Self::mode_key(key))?;
        store.delete(&Self::state_key(key))?;
        Ok(())
    }
}

fn read_field<T: DeserializeOwned + Default>(store: &dyn OptionStore, key: &OptionKey) -> Result<T> {
    let Some(value) = store.get(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            log::warn!("Ignoring invalid value for option '{}': {}", key, e);
            Ok(T::default())
        }
    }
}

/// Everything known about a module at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleStatus {
    pub key: ModuleKey,
    pub name: String,
    pub mode: Mode,
    pub saved_state: LifecycleState,
    pub current_state: LifecycleState,
    pub running: bool,
    pub forced_off: bool,
    /// Names of unmet dependencies, modules first, then plugins, then themes
    pub unmet: Vec<String>,
}

/// A snapshot of persisted records plus live dependency evaluation.
///
/// Records are read once at capture time, so saved states stay those of the
/// previous pass for as long as the view lives.
pub struct StateView<'a> {
    registry: &'a ModuleRegistry,
    host: &'a dyn HostEnvironment,
    records: HashMap<ModuleKey, ModuleRecord>,
    /// Modules whose state is being derived, to cut dependency cycles
    evaluating: RefCell<HashSet<ModuleKey>>,
    /// Times a cycle was cut; states derived across a cut are not memoized
    cycle_cuts: Cell<usize>,
    derived: RefCell<HashMap<ModuleKey, LifecycleState>>,
}

impl<'a> StateView<'a> {
    pub fn capture(
        registry: &'a ModuleRegistry,
        store: &dyn OptionStore,
        host: &'a dyn HostEnvironment,
    ) -> Result<Self> {
        let mut records = HashMap::new();
        for handle in registry.modules() {
            records.insert(handle.key().clone(), ModuleRecord::load(store, handle.key())?);
        }
        Ok(Self {
            registry,
            host,
            records,
            evaluating: RefCell::new(HashSet::new()),
            cycle_cuts: Cell::new(0),
            derived: RefCell::new(HashMap::new()),
        })
    }

    pub fn registry(&self) -> &'a ModuleRegistry {
        self.registry
    }

    pub fn host(&self) -> &'a dyn HostEnvironment {
        self.host
    }

    pub fn record(&self, key: &ModuleKey) -> ModuleRecord {
        self.records.get(key).copied().unwrap_or_default()
    }

    pub fn mode(&self, key: &ModuleKey) -> Mode {
        self.record(key).mode
    }

    pub fn saved_state(&self, key: &ModuleKey) -> LifecycleState {
        self.record(key).saved_state
    }

    /// Current state of a registered module, `None` if there is no such module
    pub fn state_of(&self, key: &ModuleKey) -> Option<LifecycleState> {
        self.registry.module(key).map(|handle| self.current_state(handle))
    }

    /// Derive a module's current state from its mode, its dependencies and
    /// the forced-off flag.
    ///
    /// A module reached again while its own state is still being derived
    /// reports `Unknown`, so every member of a dependency cycle sees an
    /// unmet dependency. Other states are computed once per view.
    pub fn current_state(&self, handle: &ModuleHandle) -> LifecycleState {
        if handle.is_forced_off() {
            return LifecycleState::ForcedOff;
        }
        if let Some(state) = self.derived.borrow().get(handle.key()) {
            return *state;
        }

        let first_visit = self.evaluating.borrow_mut().insert(handle.key().clone());
        if !first_visit {
            self.cycle_cuts.set(self.cycle_cuts.get() + 1);
            return LifecycleState::Unknown;
        }
        let cuts_before = self.cycle_cuts.get();
        let deps_met = self.meets_dependencies(handle);
        self.evaluating.borrow_mut().remove(handle.key());

        let state = LifecycleState::derive(self.mode(handle.key()), deps_met, false);
        if self.cycle_cuts.get() == cuts_before {
            self.derived.borrow_mut().insert(handle.key().clone(), state);
        }
        state
    }

    pub fn change(&self, handle: &ModuleHandle) -> StateChange {
        StateChange::new(self.saved_state(handle.key()), self.current_state(handle))
    }

    pub fn meets_dependencies(&self, handle: &ModuleHandle) -> bool {
        handle
            .module_dependencies()
            .iter()
            .all(|id| self.registry.module_dependency(id).met(self))
            && handle
                .plugin_dependencies()
                .iter()
                .all(|id| self.registry.plugin_dependency(id).met(self))
            && handle
                .theme_dependencies()
                .iter()
                .all(|id| self.registry.theme_dependency(id).met(self))
    }

    pub fn unmet_module_dependencies(&self, handle: &ModuleHandle) -> Vec<Dependency> {
        self.unmet(handle.module_dependencies(), |id| self.registry.module_dependency(id).into_owned())
    }

    pub fn unmet_plugin_dependencies(&self, handle: &ModuleHandle) -> Vec<Dependency> {
        self.unmet(handle.plugin_dependencies(), |id| self.registry.plugin_dependency(id).into_owned())
    }

    pub fn unmet_theme_dependencies(&self, handle: &ModuleHandle) -> Vec<Dependency> {
        self.unmet(handle.theme_dependencies(), |id| self.registry.theme_dependency(id).into_owned())
    }

    fn unmet(&self, ids: &[String], resolve: impl Fn(&str) -> Dependency) -> Vec<Dependency> {
        ids.iter()
            .map(|id| resolve(id.as_str()))
            .filter(|dep| !dep.met(self))
            .collect()
    }

    /// Names of every unmet dependency of a module
    pub fn unmet_dependency_names(&self, handle: &ModuleHandle) -> Vec<String> {
        self.unmet_module_dependencies(handle)
            .into_iter()
            .chain(self.unmet_plugin_dependencies(handle))
            .chain(self.unmet_theme_dependencies(handle))
            .map(|dep| dep.name(self.registry))
            .collect()
    }

    pub fn status(&self, handle: &ModuleHandle) -> ModuleStatus {
        let record = self.record(handle.key());
        ModuleStatus {
            key: handle.key().clone(),
            name: handle.name().to_string(),
            mode: record.mode,
            saved_state: record.saved_state,
            current_state: self.current_state(handle),
            running: handle.is_running(),
            forced_off: handle.is_forced_off(),
            unmet: self.unmet_dependency_names(handle),
        }
    }
}

impl fmt::Debug for StateView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateView")
            .field("records", &self.records)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Which modules each step of a pass touches, in execution order.
///
/// `pause` and `deactivate` are already reversed: dependents come before
/// their dependencies.
#[derive(Debug, Default)]
pub struct TransitionPlan<'a> {
    pub activate: Vec<&'a ModuleHandle>,
    pub start_up: Vec<&'a ModuleHandle>,
    pub resume: Vec<&'a ModuleHandle>,
    pub pause: Vec<&'a ModuleHandle>,
    pub deactivate: Vec<&'a ModuleHandle>,
    pub notify_resume: Vec<&'a ModuleHandle>,
    pub notify_pause: Vec<&'a ModuleHandle>,
}

impl<'a> TransitionPlan<'a> {
    pub fn build(ordered: &OrderedModules<'a>, view: &StateView<'_>) -> Self {
        let mut plan = Self::default();
        for handle in ordered.iter() {
            let change = view.change(handle);
            if change.activates() {
                plan.activate.push(handle);
            }
            if change.starts_up() {
                plan.start_up.push(handle);
            }
            if change.resumes() {
                plan.resume.push(handle);
            }
            if change.pauses() {
                plan.pause.push(handle);
            }
            if change.deactivates() {
                plan.deactivate.push(handle);
            }
            if change.notifies_resume() {
                plan.notify_resume.push(handle);
            }
            if change.notifies_pause() {
                plan.notify_pause.push(handle);
            }
        }
        plan.pause.reverse();
        plan.deactivate.reverse();
        plan
    }
}

/// A module hook that returned an error
#[derive(Debug, Clone, PartialEq)]
pub struct HookFailure {
    pub module: ModuleKey,
    pub hook: Hook,
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}: {}", self.hook, self.module, self.message)
    }
}

/// What a pass did, each list in the order it happened
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub activated: Vec<ModuleKey>,
    /// Modules whose start-up hook was invoked, including failed ones
    pub started: Vec<ModuleKey>,
    pub resumed: Vec<ModuleKey>,
    pub paused: Vec<ModuleKey>,
    pub deactivated: Vec<ModuleKey>,
    pub uninstalled: Vec<ModuleKey>,
    pub shut_down: Vec<ModuleKey>,
    pub persisted: Vec<(ModuleKey, LifecycleState)>,
    pub failures: Vec<HookFailure>,
}

impl PassReport {
    pub fn is_empty(&self) -> bool {
        *self == PassReport::default()
    }
}

/// Drives lifecycle passes over every registered module
pub struct LifecycleEngine<'a> {
    registry: &'a ModuleRegistry,
    store: &'a dyn OptionStore,
    host: &'a dyn HostEnvironment,
}

impl<'a> LifecycleEngine<'a> {
    pub fn new(
        registry: &'a ModuleRegistry,
        store: &'a dyn OptionStore,
        host: &'a dyn HostEnvironment,
    ) -> Self {
        Self { registry, store, host }
    }

    /// All registered modules in dependency order
    pub fn ordered(&self) -> OrderedModules<'a> {
        order_modules(self.registry, self.registry.modules())
    }

    pub fn view(&self) -> Result<StateView<'a>> {
        StateView::capture(self.registry, self.store, self.host)
    }

    /// Report modules whose dependencies changed out from under them since
    /// the last pass. Must run before [`LifecycleEngine::run`] saves new states.
    pub fn notify_state_changes(&self) -> Result<Vec<StateChangeNotice>> {
        let ordered = self.ordered();
        let view = self.view()?;
        let plan = TransitionPlan::build(&ordered, &view);

        let mut notices = Vec::new();
        if !plan.notify_resume.is_empty() {
            notices.push(self.notice(NoticeKind::Resumed, &plan.notify_resume));
        }
        if !plan.notify_pause.is_empty() {
            notices.push(self.notice(NoticeKind::Paused, &plan.notify_pause));
        }
        Ok(notices)
    }

    fn notice(&self, kind: NoticeKind, modules: &[&ModuleHandle]) -> StateChangeNotice {
        let entries = modules
            .iter()
            .map(|handle| NoticeEntry {
                space_name: self
                    .registry
                    .space(handle.space_id())
                    .map(|space| space.name.clone())
                    .unwrap_or_else(|| handle.space_id().to_string()),
                module_name: handle.name().to_string(),
            })
            .collect();
        StateChangeNotice::new(kind, entries)
    }

    /// Run one full lifecycle pass and persist the resulting states.
    ///
    /// Activate, start up and resume walk dependency order; pause and
    /// deactivate walk it backwards. Hook errors are logged and reported,
    /// store errors abort the pass.
    pub fn run(&self) -> Result<PassReport> {
        let ordered = self.ordered();
        let view = self.view()?;
        let plan = TransitionPlan::build(&ordered, &view);
        let mut report = PassReport::default();

        for handle in &plan.activate {
            log::info!("Activating module {}", handle.key());
            if self.call(handle, Hook::Activate, &mut report) {
                report.activated.push(handle.key().clone());
            }
        }

        for handle in &plan.start_up {
            let ctx = HookContext::new(handle.key(), self.store);
            match handle.start_up(&ctx) {
                Ok(true) => {
                    log::info!("Started module {}", handle.key());
                    report.started.push(handle.key().clone());
                }
                Ok(false) => {}
                Err(e) => {
                    report.started.push(handle.key().clone());
                    self.record_failure(handle, Hook::Startup, e.to_string(), &mut report);
                }
            }
        }

        for handle in &plan.resume {
            log::info!("Resuming module {}", handle.key());
            if self.call(handle, Hook::Resume, &mut report) {
                report.resumed.push(handle.key().clone());
            }
        }

        for handle in &plan.pause {
            log::info!("Pausing module {}", handle.key());
            if self.call(handle, Hook::Pause, &mut report) {
                report.paused.push(handle.key().clone());
            }
        }

        for handle in &plan.deactivate {
            log::info!("Deactivating module {}", handle.key());
            if self.call(handle, Hook::Deactivate, &mut report) {
                report.deactivated.push(handle.key().clone());
            }
        }

        for handle in ordered.iter() {
            let state = view.current_state(handle);
            ModuleRecord::save_state(self.store, handle.key(), state)?;
            log::debug!("Saved state {} for module {}", state, handle.key());
            report.persisted.push((handle.key().clone(), state));
        }

        Ok(report)
    }

    /// Force matching modules off and run their deactivate hooks, dependents first
    pub fn force_deactivate(&self, filter: impl Fn(&ModuleHandle) -> bool) -> Result<PassReport> {
        let ordered = self.ordered();
        let mut report = PassReport::default();

        for handle in ordered.iter_rev().filter(|&handle| filter(handle)) {
            log::info!("Forcing module {} off", handle.key());
            handle.set_forced_off(true);
            ModuleRecord::save_state(self.store, handle.key(), LifecycleState::ForcedOff)?;
            report.persisted.push((handle.key().clone(), LifecycleState::ForcedOff));
            if self.call(handle, Hook::Deactivate, &mut report) {
                report.deactivated.push(handle.key().clone());
            }
        }

        Ok(report)
    }

    /// Force matching modules off, run their uninstall hooks and delete
    /// their mode and state records, dependents first
    pub fn force_uninstall(&self, filter: impl Fn(&ModuleHandle) -> bool) -> Result<PassReport> {
        let ordered = self.ordered();
        let mut report = PassReport::default();

        for handle in ordered.iter_rev().filter(|&handle| filter(handle)) {
            log::info!("Uninstalling module {}", handle.key());
            handle.set_forced_off(true);
            ModuleRecord::save_state(self.store, handle.key(), LifecycleState::ForcedOff)?;
            if self.call(handle, Hook::Uninstall, &mut report) {
                report.uninstalled.push(handle.key().clone());
            }
            ModuleRecord::delete(self.store, handle.key())?;
        }

        Ok(report)
    }

    /// Shut down the given modules in order, skipping ones no longer running
    pub fn shut_down(&self, keys: &[ModuleKey]) -> PassReport {
        let mut report = PassReport::default();
        for key in keys {
            let Some(handle) = self.registry.module(key) else {
                continue;
            };
            let ctx = HookContext::new(handle.key(), self.store);
            match handle.shut_down(&ctx) {
                Ok(true) => {
                    log::info!("Shut down module {}", key);
                    report.shut_down.push(key.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    report.shut_down.push(key.clone());
                    self.record_failure(handle, Hook::Shutdown, e.to_string(), &mut report);
                }
            }
        }
        report
    }

    fn call(&self, handle: &ModuleHandle, hook: Hook, report: &mut PassReport) -> bool {
        let ctx = HookContext::new(handle.key(), self.store);
        match handle.invoke(hook, &ctx) {
            Ok(()) => true,
            Err(e) => {
                self.record_failure(handle, hook, e.to_string(), report);
                false
            }
        }
    }

    fn record_failure(&self, handle: &ModuleHandle, hook: Hook, message: String, report: &mut PassReport) {
        log::error!("Hook {} failed for module {}: {}", hook, handle.key(), message);
        report.failures.push(HookFailure {
            module: handle.key().clone(),
            hook,
            message,
        });
    }
}
