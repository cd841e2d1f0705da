//! # Switchboard Core Kernel
//!
//! The `kernel` module wires the module system, the option store, the host
//! environment and the UI bridge together into a [`Framework`].
//!
//! ## Key Responsibilities & Components:
//!
//! - **Framework Bootstrapping**: the [`Framework`](bootstrap::Framework)
//!   struct owns the module registry and exposes the host trigger points
//!   (every request, framework deactivation/uninstall, per-plugin
//!   deactivation/uninstall).
//! - **Core Constants**: system-wide constants via the `constants` submodule.
//! - **Error Handling**: the top-level [`Error`](error::Error) and the
//!   `Result` alias in the `error` submodule.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::{Framework, RequestReport};
pub use error::{Error, Result};
