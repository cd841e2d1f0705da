use std::borrow::Cow;
use std::collections::HashMap;

use crate::kernel::error::Result;
use crate::module_system::dependency::{
    Dependency, DependencyKind, ModuleDependency, PluginDependency, ThemeDependency, UnregisteredDependency,
};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::handle::{ModuleHandle, ModuleKey};

/// A grouping namespace for modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub id: String,
    pub name: String,
}

impl Space {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Registry of spaces, modules and declared dependencies.
///
/// Entries are registered once and never removed. Dependency lookups by an
/// ID that was never registered yield the unregistered stand-in rather
/// than an error.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    spaces: Vec<Space>,
    modules: HashMap<ModuleKey, ModuleHandle>,
    /// Registration order
    order: Vec<ModuleKey>,
    module_deps: HashMap<String, Dependency>,
    plugin_deps: HashMap<String, Dependency>,
    theme_deps: HashMap<String, Dependency>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a space
    pub fn register_space(&mut self, space: Space) -> Result<()> {
        if self.space(&space.id).is_some() {
            return Err(ModuleSystemError::SpaceRegistration {
                space_id: space.id,
                message: "Space already registered".to_string(),
            }
            .into());
        }
        log::debug!("Registered space '{}'", space.id);
        self.spaces.push(space);
        Ok(())
    }

    pub fn space(&self, id: &str) -> Option<&Space> {
        self.spaces.iter().find(|space| space.id == id)
    }

    /// All spaces, in registration order
    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    /// Register a module into the space its handle names
    pub fn register_module(&mut self, handle: ModuleHandle) -> Result<()> {
        let key = handle.key().clone();
        if self.space(&key.space).is_none() {
            return Err(ModuleSystemError::UnknownSpace(key.space).into());
        }
        if self.modules.contains_key(&key) {
            return Err(ModuleSystemError::RegistrationError {
                module: key.to_string(),
                message: "Module already registered".to_string(),
            }
            .into());
        }

        log::debug!("Registered module '{}'", key);
        self.order.push(key.clone());
        self.modules.insert(key, handle);
        Ok(())
    }

    pub fn module(&self, key: &ModuleKey) -> Option<&ModuleHandle> {
        self.modules.get(key)
    }

    pub fn find_module(&self, space_id: &str, module_id: &str) -> Option<&ModuleHandle> {
        self.module(&ModuleKey::new(space_id, module_id))
    }

    pub fn has_module(&self, key: &ModuleKey) -> bool {
        self.modules.contains_key(key)
    }

    /// All modules, in registration order
    pub fn modules(&self) -> Vec<&ModuleHandle> {
        self.order.iter().filter_map(|key| self.modules.get(key)).collect()
    }

    /// Modules of one space, in registration order
    pub fn modules_in_space(&self, space_id: &str) -> Vec<&ModuleHandle> {
        self.modules()
            .into_iter()
            .filter(|handle| handle.space_id() == space_id)
            .collect()
    }

    /// Modules shipped by the given host plugin file
    pub fn modules_hosted_by(&self, plugin_file: &str) -> Vec<&ModuleHandle> {
        self.modules()
            .into_iter()
            .filter(|handle| handle.host_plugin() == Some(plugin_file))
            .collect()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Module dependencies share one ID namespace across spaces: modules
    /// declare them by bare ID, so only one space's module can answer to it.
    pub fn register_module_dependency(&mut self, dep: ModuleDependency) -> Result<()> {
        Self::insert_dependency(&mut self.module_deps, DependencyKind::Module, dep.id.clone(), dep.into())
    }

    pub fn register_plugin_dependency(&mut self, dep: PluginDependency) -> Result<()> {
        Self::insert_dependency(&mut self.plugin_deps, DependencyKind::Plugin, dep.id.clone(), dep.into())
    }

    pub fn register_theme_dependency(&mut self, dep: ThemeDependency) -> Result<()> {
        Self::insert_dependency(&mut self.theme_deps, DependencyKind::Theme, dep.id.clone(), dep.into())
    }

    /// Register a dependency of any kind
    pub fn register_dependency(&mut self, dep: Dependency) -> Result<()> {
        match dep {
            Dependency::Module(dep) => self.register_module_dependency(dep),
            Dependency::Plugin(dep) => self.register_plugin_dependency(dep),
            Dependency::Theme(dep) => self.register_theme_dependency(dep),
            Dependency::Unregistered(dep) => Err(ModuleSystemError::DependencyRegistration {
                dependency_id: dep.id,
                message: "The unregistered stand-in cannot be registered".to_string(),
            }
            .into()),
        }
    }

    fn insert_dependency(
        deps: &mut HashMap<String, Dependency>,
        kind: DependencyKind,
        id: String,
        dep: Dependency,
    ) -> Result<()> {
        if deps.contains_key(&id) {
            return Err(ModuleSystemError::DependencyRegistration {
                dependency_id: id,
                message: "Dependency already registered".to_string(),
            }
            .into());
        }
        log::debug!("Registered {} dependency '{}'", kind, id);
        deps.insert(id, dep);
        Ok(())
    }

    pub fn module_dependency(&self, id: &str) -> Cow<'_, Dependency> {
        Self::lookup(&self.module_deps, id)
    }

    pub fn plugin_dependency(&self, id: &str) -> Cow<'_, Dependency> {
        Self::lookup(&self.plugin_deps, id)
    }

    pub fn theme_dependency(&self, id: &str) -> Cow<'_, Dependency> {
        Self::lookup(&self.theme_deps, id)
    }

    fn lookup<'a>(deps: &'a HashMap<String, Dependency>, id: &str) -> Cow<'a, Dependency> {
        match deps.get(id) {
            Some(dep) => Cow::Borrowed(dep),
            None => {
                log::debug!("Dependency '{}' is not registered", id);
                Cow::Owned(Dependency::Unregistered(UnregisteredDependency::new(id)))
            }
        }
    }
}
