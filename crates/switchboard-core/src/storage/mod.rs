//! # Switchboard Core Storage
//!
//! Persistence for module modes, lifecycle states and module-defined options.
//!
//! - **`provider`**: [`OptionStore`], the key-value seam, plus [`OptionKey`]
//!   and the module-scoped [`ModuleOptions`] view.
//! - **`memory`**: [`MemoryOptionStore`], a volatile store for tests and
//!   embedding.
//! - **`local`**: [`FileOptionStore`], one JSON/YAML/TOML document on disk,
//!   rewritten atomically.
//! - **`config`**: [`ConfigFormat`], shared by the file store and the site
//!   manifest loader.
//! - **`error`**: [`StorageSystemError`].
pub mod config;
pub mod error;
pub mod local;
pub mod memory;
pub mod provider;

pub use config::ConfigFormat;
pub use error::StorageSystemError;
pub use local::FileOptionStore;
pub use memory::MemoryOptionStore;
pub use provider::{ModuleOptions, OptionField, OptionKey, OptionStore};
