//! # Switchboard Core Module System Errors
//!
//! Defines [`ModuleSystemError`], covering failures while registering spaces,
//! modules and dependencies, running module hooks, loading site manifests
//! and parsing version constraints.
//!
//! Unmet or unregistered dependencies are deliberately absent: they are
//! lifecycle states, not errors.
use crate::module_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum ModuleSystemError {
    #[error("Space registration error for '{space_id}': {message}")]
    SpaceRegistration { space_id: String, message: String },

    #[error("Module registration error for '{module}': {message}")]
    RegistrationError { module: String, message: String },

    #[error("Dependency registration error for '{dependency_id}': {message}")]
    DependencyRegistration {
        dependency_id: String,
        message: String,
    },

    #[error("Unknown module '{0}'")]
    UnknownModule(String),

    #[error("Unknown space '{0}'")]
    UnknownSpace(String),

    #[error("Invalid mode '{0}', expected one of: off, pause, on")]
    InvalidMode(String),

    #[error("Hook '{hook}' failed for module '{module}': {message}")]
    HookFailed {
        module: String,
        hook: String,
        message: String,
    },

    #[error("Site manifest error: {0}")]
    ManifestError(String),

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),
}
