//! # Switchboard Core Host Environment
//!
//! Facts about the hosting application that plugin and theme dependencies
//! are checked against: which plugin files are active (and at which
//! version), and which theme is active.
//!
//! [`HostEnvironment`] is the seam; [`StaticHost`] is a serde-loadable
//! snapshot used by the CLI and by tests.
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// The active theme as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeInfo {
    pub name: String,
    /// Parent theme name when the active theme is a child theme
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ThemeInfo {
    pub fn new(name: &str, author: &str) -> Self {
        Self {
            name: name.to_string(),
            template: None,
            author: author.to_string(),
            version: None,
        }
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }
}

/// An active plugin file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePlugin {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Query interface onto the hosting application's activation records
pub trait HostEnvironment: Debug {
    /// Whether the plugin identified by `file` is active
    fn is_plugin_active(&self, file: &str) -> bool;

    /// Version of an active plugin, if the host knows it
    fn plugin_version(&self, file: &str) -> Option<String>;

    /// The currently active theme, if any
    fn active_theme(&self) -> Option<ThemeInfo>;
}

/// A fixed snapshot of host activation facts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticHost {
    #[serde(default)]
    pub active_plugins: Vec<ActivePlugin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeInfo>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, file: &str, version: Option<&str>) -> Self {
        self.activate_plugin(file, version);
        self
    }

    pub fn with_theme(mut self, theme: ThemeInfo) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Mark a plugin active, replacing any recorded version
    pub fn activate_plugin(&mut self, file: &str, version: Option<&str>) {
        self.deactivate_plugin(file);
        self.active_plugins.push(ActivePlugin {
            file: file.to_string(),
            version: version.map(str::to_string),
        });
    }

    /// Returns whether the plugin was active
    pub fn deactivate_plugin(&mut self, file: &str) -> bool {
        let before = self.active_plugins.len();
        self.active_plugins.retain(|plugin| plugin.file != file);
        before != self.active_plugins.len()
    }

    pub fn set_theme(&mut self, theme: Option<ThemeInfo>) {
        self.theme = theme;
    }
}

impl HostEnvironment for StaticHost {
    fn is_plugin_active(&self, file: &str) -> bool {
        self.active_plugins.iter().any(|plugin| plugin.file == file)
    }

    fn plugin_version(&self, file: &str) -> Option<String> {
        self.active_plugins
            .iter()
            .find(|plugin| plugin.file == file)
            .and_then(|plugin| plugin.version.clone())
    }

    fn active_theme(&self) -> Option<ThemeInfo> {
        self.theme.clone()
    }
}
