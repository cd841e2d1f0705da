use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::kernel::error::Result;
use crate::storage::provider::{OptionKey, OptionStore};

/// In-memory option store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    values: RefCell<BTreeMap<OptionKey, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored options
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// All stored keys, in key order
    pub fn keys(&self) -> Vec<OptionKey> {
        self.values.borrow().keys().cloned().collect()
    }
}

impl OptionStore for MemoryOptionStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &OptionKey) -> Result<Option<Value>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn update(&self, key: &OptionKey, value: Value) -> Result<bool> {
        let mut values = self.values.borrow_mut();
        if values.get(key) == Some(&value) {
            return Ok(false);
        }
        values.insert(key.clone(), value);
        Ok(true)
    }

    fn delete(&self, key: &OptionKey) -> Result<bool> {
        Ok(self.values.borrow_mut().remove(key).is_some())
    }
}
