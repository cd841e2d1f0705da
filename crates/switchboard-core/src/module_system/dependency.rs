use std::fmt;

use crate::host::HostEnvironment;
use crate::module_system::handle::ModuleKey;
use crate::module_system::lifecycle::StateView;
use crate::module_system::registry::ModuleRegistry;
use crate::module_system::state::LifecycleState;
use crate::module_system::version::VersionRange;

/// The three kinds of dependency a module can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Module,
    Plugin,
    Theme,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Module => write!(f, "module"),
            DependencyKind::Plugin => write!(f, "plugin"),
            DependencyKind::Theme => write!(f, "theme"),
        }
    }
}

/// A dependency on another module, met while that module is fully on
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDependency {
    /// ID of the module depended upon
    pub id: String,
    /// Space owning that module
    pub space_id: String,
}

impl ModuleDependency {
    pub fn new(space_id: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            space_id: space_id.to_string(),
        }
    }

    pub fn target(&self) -> ModuleKey {
        ModuleKey::new(&self.space_id, &self.id)
    }

    pub fn met(&self, view: &StateView<'_>) -> bool {
        view.state_of(&self.target()) == Some(LifecycleState::OnCanActivate)
    }
}

/// A dependency on a plugin of the hosting application, identified by file
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDependency {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    /// The plugin's identifying file, e.g. "woocommerce/woocommerce.php"
    pub file: String,
    pub version_range: Option<VersionRange>,
}

impl PluginDependency {
    pub fn new(id: &str, name: &str, file: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            file: file.to_string(),
            version_range: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = Some(range);
        self
    }

    pub fn met(&self, host: &dyn HostEnvironment) -> bool {
        host.is_plugin_active(&self.file)
            && version_matches(self.version_range.as_ref(), host.plugin_version(&self.file))
    }
}

/// A dependency on the active theme, or its parent when child themes are allowed
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeDependency {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    /// Disambiguates themes sharing a name
    pub author: String,
    pub allow_child: bool,
    pub version_range: Option<VersionRange>,
}

impl ThemeDependency {
    pub fn new(id: &str, name: &str, author: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            author: author.to_string(),
            allow_child: true,
            version_range: None,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn allow_child(mut self, allow_child: bool) -> Self {
        self.allow_child = allow_child;
        self
    }

    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = Some(range);
        self
    }

    pub fn display_name(&self) -> String {
        if self.allow_child {
            format!("{} (or child theme)", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn met(&self, host: &dyn HostEnvironment) -> bool {
        let Some(theme) = host.active_theme() else {
            return false;
        };

        let wanted = self.name.to_lowercase();
        let name_matches = theme.name.to_lowercase() == wanted
            || (self.allow_child
                && theme
                    .template
                    .as_deref()
                    .is_some_and(|template| template.to_lowercase() == wanted));

        name_matches
            && theme.author.to_lowercase() == self.author.to_lowercase()
            && version_matches(self.version_range.as_ref(), theme.version)
    }
}

/// Stand-in for an ID nothing was registered under; never met
#[derive(Debug, Clone, PartialEq)]
pub struct UnregisteredDependency {
    pub id: String,
}

impl UnregisteredDependency {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// Any dependency a module can be gated on
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    Module(ModuleDependency),
    Plugin(PluginDependency),
    Theme(ThemeDependency),
    Unregistered(UnregisteredDependency),
}

impl Dependency {
    pub fn id(&self) -> &str {
        match self {
            Dependency::Module(dep) => &dep.id,
            Dependency::Plugin(dep) => &dep.id,
            Dependency::Theme(dep) => &dep.id,
            Dependency::Unregistered(dep) => &dep.id,
        }
    }

    /// `None` for the unregistered stand-in
    pub fn kind(&self) -> Option<DependencyKind> {
        match self {
            Dependency::Module(_) => Some(DependencyKind::Module),
            Dependency::Plugin(_) => Some(DependencyKind::Plugin),
            Dependency::Theme(_) => Some(DependencyKind::Theme),
            Dependency::Unregistered(_) => None,
        }
    }

    pub fn is_registered(&self) -> bool {
        !matches!(self, Dependency::Unregistered(_))
    }

    /// The module a module dependency points at
    pub fn module_target(&self) -> Option<ModuleKey> {
        match self {
            Dependency::Module(dep) => Some(dep.target()),
            _ => None,
        }
    }

    pub fn met(&self, view: &StateView<'_>) -> bool {
        match self {
            Dependency::Module(dep) => dep.met(view),
            Dependency::Plugin(dep) => dep.met(view.host()),
            Dependency::Theme(dep) => dep.met(view.host()),
            Dependency::Unregistered(_) => false,
        }
    }

    /// Human-readable name, as listed among a module's unmet dependencies
    pub fn name(&self, registry: &ModuleRegistry) -> String {
        match self {
            Dependency::Module(dep) => registry
                .module(&dep.target())
                .map(|handle| handle.name().to_string())
                .unwrap_or_else(|| dep.id.clone()),
            Dependency::Plugin(dep) => dep.name.clone(),
            Dependency::Theme(dep) => dep.display_name(),
            Dependency::Unregistered(dep) => format!("(Unregistered dependency: \"{}\")", dep.id),
        }
    }

    pub fn author_url(&self) -> Option<&str> {
        match self {
            Dependency::Plugin(dep) => dep.url.as_deref(),
            Dependency::Theme(dep) => dep.url.as_deref(),
            Dependency::Module(_) | Dependency::Unregistered(_) => None,
        }
    }
}

impl From<ModuleDependency> for Dependency {
    fn from(dep: ModuleDependency) -> Self {
        Dependency::Module(dep)
    }
}

impl From<PluginDependency> for Dependency {
    fn from(dep: PluginDependency) -> Self {
        Dependency::Plugin(dep)
    }
}

impl From<ThemeDependency> for Dependency {
    fn from(dep: ThemeDependency) -> Self {
        Dependency::Theme(dep)
    }
}

/// No range accepts any version; a range needs a version that parses into it
fn version_matches(range: Option<&VersionRange>, version: Option<String>) -> bool {
    match (range, version) {
        (None, _) => true,
        (Some(range), Some(version)) => range.includes_str(&version),
        (Some(_), None) => false,
    }
}
