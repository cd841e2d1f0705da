use std::fmt;
use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;

/// The field of a module record an option addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionField {
    /// The administrator's requested mode
    Mode,
    /// The last persisted lifecycle state
    State,
    /// A module-defined option
    Custom(String),
}

impl OptionField {
    pub fn as_str(&self) -> &str {
        match self {
            OptionField::Mode => "mode",
            OptionField::State => "state",
            OptionField::Custom(name) => name,
        }
    }
}

/// Fully qualified address of a persisted option.
///
/// Options are qualified by a namespace (the owning space), the module ID and
/// the field, so two modules with the same ID in different spaces never share
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionKey {
    pub namespace: String,
    pub module: String,
    pub field: OptionField,
}

impl OptionKey {
    pub fn new(namespace: &str, module: &str, field: OptionField) -> Self {
        Self {
            namespace: namespace.to_string(),
            module: module.to_string(),
            field,
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.namespace, self.module, self.field.as_str())
    }
}

/// Key-value persistence for module modes, states and module-defined options.
///
/// Mirrors the semantics of a typical options table: `update` reports whether
/// anything was written and `delete` whether anything was removed.
pub trait OptionStore: Debug {
    /// Get the name of this store
    fn name(&self) -> &str;

    /// Read an option, `None` if it was never written
    fn get(&self, key: &OptionKey) -> Result<Option<Value>>;

    /// Write an option. Returns false if the stored value was already equal.
    fn update(&self, key: &OptionKey, value: Value) -> Result<bool>;

    /// Remove an option. Returns false if there was nothing to remove.
    fn delete(&self, key: &OptionKey) -> Result<bool>;

    /// Read an option, falling back to `default` when it is absent
    fn get_or(&self, key: &OptionKey, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

/// Options qualified by one module, handed to module code through its hooks.
#[derive(Debug, Clone, Copy)]
pub struct ModuleOptions<'a> {
    store: &'a dyn OptionStore,
    namespace: &'a str,
    module: &'a str,
}

impl<'a> ModuleOptions<'a> {
    pub fn new(store: &'a dyn OptionStore, namespace: &'a str, module: &'a str) -> Self {
        Self { store, namespace, module }
    }

    /// The store key for a module-defined option
    pub fn qualify(&self, name: &str) -> OptionKey {
        OptionKey::new(self.namespace, self.module, OptionField::Custom(name.to_string()))
    }

    /// Get an option value, or `default` when unset
    pub fn get<T: DeserializeOwned>(&self, name: &str, default: T) -> Result<T> {
        let key = self.qualify(name);
        match self.store.get(&key)? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                StorageSystemError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                }
                .into()
            }),
            None => Ok(default),
        }
    }

    /// Set an option value
    pub fn update<T: Serialize>(&self, name: &str, value: T) -> Result<bool> {
        let key = self.qualify(name);
        let value = serde_json::to_value(value).map_err(|e| StorageSystemError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.update(&key, value)
    }

    /// Remove an option
    pub fn delete(&self, name: &str) -> Result<bool> {
        self.store.delete(&self.qualify(name))
    }
}
