use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Like [`ConfigFormat::from_path`], but an unknown extension is an error.
    pub fn require_from_path(path: &Path) -> Result<Self> {
        Self::from_path(path)
            .ok_or_else(|| StorageSystemError::UnsupportedConfigFormat(path.to_path_buf()).into())
    }

    /// Serialize a value to a string in this format
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
        let serialized = match self {
            ConfigFormat::Json => serde_json::to_string_pretty(value)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(value)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(value)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        };
        serialized.map_err(|source| {
            StorageSystemError::SerializationError {
                format: self.extension().to_string(),
                source,
            }
            .into()
        })
    }

    /// Deserialize a value from a string in this format
    pub fn deserialize<T: DeserializeOwned>(&self, data: &str) -> Result<T> {
        let parsed = match self {
            ConfigFormat::Json => serde_json::from_str(data)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        };
        parsed.map_err(|source| {
            StorageSystemError::DeserializationError {
                format: self.extension().to_string(),
                source,
            }
            .into()
        })
    }
}
