use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::host::StaticHost;
use crate::kernel::bootstrap::Framework;
use crate::kernel::error::{Error, Result};
use crate::module_system::dependency::{ModuleDependency, PluginDependency, ThemeDependency};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::traits::{Hook, HookContext, Module};
use crate::module_system::version::VersionRange;
use crate::storage::config::ConfigFormat;

/// Option under which manifest modules count their hook invocations
pub const RAN_OPTION: &str = "ran";

/// Describes a whole site: spaces with their modules, the dependencies those
/// modules may declare, and the host's activation records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteManifest {
    #[serde(default)]
    pub host: StaticHost,
    #[serde(default)]
    pub spaces: Vec<SpaceManifest>,
    #[serde(default)]
    pub module_dependencies: Vec<ModuleDependencyManifest>,
    #[serde(default)]
    pub plugin_dependencies: Vec<PluginDependencyManifest>,
    #[serde(default)]
    pub theme_dependencies: Vec<ThemeDependencyManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceManifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_plugin: Option<String>,
    #[serde(default)]
    pub module_dependencies: Vec<String>,
    #[serde(default)]
    pub plugin_dependencies: Vec<String>,
    #[serde(default)]
    pub theme_dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDependencyManifest {
    /// ID of the module depended upon
    pub id: String,
    /// Space owning that module
    pub space: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDependencyManifest {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub file: String,
    /// Semver constraint the active plugin's version must satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDependencyManifest {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub author: String,
    #[serde(default = "default_allow_child")]
    pub allow_child: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_allow_child() -> bool {
    true
}

fn parse_range(constraint: Option<&str>) -> Result<Option<VersionRange>> {
    constraint
        .map(|c| VersionRange::from_constraint(c).map_err(|e| Error::from(ModuleSystemError::from(e))))
        .transpose()
}

impl SiteManifest {
    /// Load a manifest, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::require_from_path(path)?;
        let content =
            fs::read_to_string(path).map_err(|e| Error::io(e, "read_to_string", path.to_path_buf()))?;
        Self::parse(&content, format)
    }

    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self> {
        let manifest: SiteManifest = format.deserialize(data)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check references that serde cannot
    pub fn validate(&self) -> Result<()> {
        let space_ids: HashSet<&str> = self.spaces.iter().map(|space| space.id.as_str()).collect();
        if space_ids.len() != self.spaces.len() {
            return Err(ModuleSystemError::ManifestError("Duplicate space ID".to_string()).into());
        }
        for dep in &self.module_dependencies {
            if !space_ids.contains(dep.space.as_str()) {
                return Err(ModuleSystemError::ManifestError(format!(
                    "Module dependency '{}' refers to undeclared space '{}'",
                    dep.id, dep.space
                ))
                .into());
            }
        }
        for dep in &self.plugin_dependencies {
            parse_range(dep.version.as_deref())?;
        }
        for dep in &self.theme_dependencies {
            parse_range(dep.version.as_deref())?;
        }
        Ok(())
    }

    /// Register everything the manifest describes with a framework and make
    /// its host records the framework's host
    pub fn install(&self, framework: &mut Framework) -> Result<()> {
        framework.replace_host(Box::new(self.host.clone()));

        for space in &self.spaces {
            framework.create_space(&space.id, &space.name)?;
        }

        for dep in &self.module_dependencies {
            framework.register_dependency(ModuleDependency::new(&dep.space, &dep.id).into())?;
        }
        for dep in &self.plugin_dependencies {
            let mut plugin = PluginDependency::new(&dep.id, &dep.name, &dep.file);
            plugin.url = dep.url.clone();
            plugin.version_range = parse_range(dep.version.as_deref())?;
            framework.register_dependency(plugin.into())?;
        }
        for dep in &self.theme_dependencies {
            let mut theme = ThemeDependency::new(&dep.id, &dep.name, &dep.author).allow_child(dep.allow_child);
            theme.url = dep.url.clone();
            theme.version_range = parse_range(dep.version.as_deref())?;
            framework.register_dependency(theme.into())?;
        }

        for space in &self.spaces {
            for module in &space.modules {
                framework.register_module(&space.id, Box::new(ManifestModule::new(module.clone())))?;
            }
        }

        log::info!(
            "Installed site manifest: {} spaces, {} modules",
            self.spaces.len(),
            self.spaces.iter().map(|space| space.modules.len()).sum::<usize>()
        );
        Ok(())
    }
}

/// A module declared in a manifest. Its hooks only log and count.
#[derive(Debug, Clone)]
pub struct ManifestModule {
    manifest: ModuleManifest,
}

impl ManifestModule {
    pub fn new(manifest: ModuleManifest) -> Self {
        Self { manifest }
    }

    fn record(&self, hook: Hook, ctx: &HookContext<'_>) -> Result<()> {
        log::info!("{} {}", ctx.key(), hook);
        let options = ctx.options();
        let mut ran: BTreeMap<String, u64> = options.get(RAN_OPTION, BTreeMap::new())?;
        *ran.entry(hook.as_str().to_string()).or_default() += 1;
        options.update(RAN_OPTION, ran)?;
        Ok(())
    }
}

impl Module for ManifestModule {
    fn id(&self) -> &str {
        &self.manifest.id
    }

    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn description(&self) -> &str {
        &self.manifest.description
    }

    fn host_plugin(&self) -> Option<&str> {
        self.manifest.host_plugin.as_deref()
    }

    fn module_dependencies(&self) -> Vec<String> {
        self.manifest.module_dependencies.clone()
    }

    fn plugin_dependencies(&self) -> Vec<String> {
        self.manifest.plugin_dependencies.clone()
    }

    fn theme_dependencies(&self) -> Vec<String> {
        self.manifest.theme_dependencies.clone()
    }

    fn run_on_load(&self, ctx: &HookContext<'_>) -> Result<()> {
        log::debug!("{} {}", ctx.key(), Hook::Load);
        Ok(())
    }

    fn run_on_activate(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Activate, ctx)
    }

    fn run_on_startup(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Startup, ctx)
    }

    fn run_on_resume(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Resume, ctx)
    }

    fn run_on_pause(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Pause, ctx)
    }

    fn run_on_shutdown(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Shutdown, ctx)
    }

    fn run_on_deactivate(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.record(Hook::Deactivate, ctx)
    }

    fn run_on_uninstall(&self, ctx: &HookContext<'_>) -> Result<()> {
        log::info!("{} {}", ctx.key(), Hook::Uninstall);
        ctx.options().delete(RAN_OPTION)?;
        Ok(())
    }
}
