use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::kernel::error::{Error, Result};
use crate::storage::config::ConfigFormat;
use crate::storage::provider::{OptionField, OptionKey, OptionStore};

/// Everything persisted for one module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ModuleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mode: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, Value>,
}

impl ModuleEntry {
    fn slot(&mut self, field: &OptionField) -> Option<&mut Value> {
        match field {
            OptionField::Mode => self.mode.as_mut(),
            OptionField::State => self.state.as_mut(),
            OptionField::Custom(name) => self.options.get_mut(name),
        }
    }

    fn get(&self, field: &OptionField) -> Option<&Value> {
        match field {
            OptionField::Mode => self.mode.as_ref(),
            OptionField::State => self.state.as_ref(),
            OptionField::Custom(name) => self.options.get(name),
        }
    }

    fn set(&mut self, field: &OptionField, value: Value) {
        match field {
            OptionField::Mode => self.mode = Some(value),
            OptionField::State => self.state = Some(value),
            OptionField::Custom(name) => {
                self.options.insert(name.clone(), value);
            }
        }
    }

    fn remove(&mut self, field: &OptionField) -> bool {
        match field {
            OptionField::Mode => self.mode.take().is_some(),
            OptionField::State => self.state.take().is_some(),
            OptionField::Custom(name) => self.options.remove(name).is_some(),
        }
    }

    fn is_empty(&self) -> bool {
        self.mode.is_none() && self.state.is_none() && self.options.is_empty()
    }
}

/// namespace -> module -> entry
type OptionDocument = BTreeMap<String, BTreeMap<String, ModuleEntry>>;

/// Option store persisted to a single JSON, YAML or TOML file.
///
/// The document is read lazily on first access and cached; every successful
/// `update`/`delete` rewrites the file atomically. A failed write leaves both
/// the file and the cache as they were.
pub struct FileOptionStore {
    path: PathBuf,
    format: ConfigFormat,
    cache: RefCell<Option<OptionDocument>>,
}

impl FileOptionStore {
    /// Create a store backed by `path`; the format follows the file extension
    pub fn new(path: PathBuf) -> Result<Self> {
        let format = ConfigFormat::require_from_path(&path)?;
        Ok(Self {
            path,
            format,
            cache: RefCell::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// Drop the cached document so the next access re-reads the file
    pub fn invalidate_cache(&self) {
        self.cache.borrow_mut().take();
    }

    fn read_document(&self) -> Result<OptionDocument> {
        if !self.path.exists() {
            return Ok(OptionDocument::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::io(e, "read_to_string", self.path.clone()))?;
        if content.trim().is_empty() {
            return Ok(OptionDocument::new());
        }
        self.format.deserialize(&content)
    }

    fn with_document<R>(&self, f: impl FnOnce(&OptionDocument) -> R) -> Result<R> {
        let mut cache = self.cache.borrow_mut();
        if cache.is_none() {
            *cache = Some(self.read_document()?);
        }
        let document = cache.get_or_insert_with(OptionDocument::new);
        Ok(f(document))
    }

    /// Apply `change` to a copy of the document. When it reports a change the
    /// copy is written out and only then replaces the cached document.
    fn commit(&self, change: impl FnOnce(&mut OptionDocument) -> bool) -> Result<bool> {
        let mut next = self.with_document(OptionDocument::clone)?;
        if !change(&mut next) {
            return Ok(false);
        }
        self.write_document(&next)?;
        *self.cache.borrow_mut() = Some(next);
        Ok(true)
    }

    fn write_document(&self, document: &OptionDocument) -> Result<()> {
        let contents = self.format.serialize(document)?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| Error::io(e, "create_dir_all", parent.clone()))?;

        // Write next to the target, then atomically replace it
        let temp_file = NamedTempFile::new_in(&parent)
            .map_err(|e| Error::io(e, "create_temp_file", parent.clone()))?;
        temp_file
            .as_file()
            .write_all(contents.as_bytes())
            .map_err(|e| Error::io(e, "write_to_temp_file", temp_file.path().to_path_buf()))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| Error::io(e.error, "persist_temp_file", self.path.clone()))?;

        log::debug!("Wrote option store {}", self.path.display());
        Ok(())
    }
}

impl OptionStore for FileOptionStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &OptionKey) -> Result<Option<Value>> {
        self.with_document(|document| {
            document
                .get(&key.namespace)
                .and_then(|modules| modules.get(&key.module))
                .and_then(|entry| entry.get(&key.field))
                .cloned()
        })
    }

    fn update(&self, key: &OptionKey, value: Value) -> Result<bool> {
        self.commit(|document| {
            let entry = document
                .entry(key.namespace.clone())
                .or_default()
                .entry(key.module.clone())
                .or_default();
            if entry.slot(&key.field).is_some_and(|current| *current == value) {
                return false;
            }
            entry.set(&key.field, value);
            true
        })
    }

    fn delete(&self, key: &OptionKey) -> Result<bool> {
        self.commit(|document| {
            let Some(modules) = document.get_mut(&key.namespace) else {
                return false;
            };
            let removed = match modules.get_mut(&key.module) {
                Some(entry) => {
                    let removed = entry.remove(&key.field);
                    if entry.is_empty() {
                        modules.remove(&key.module);
                    }
                    removed
                }
                None => false,
            };
            if modules.is_empty() {
                document.remove(&key.namespace);
            }
            removed
        })
    }
}

impl fmt::Debug for FileOptionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileOptionStore")
            .field("path", &self.path)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
