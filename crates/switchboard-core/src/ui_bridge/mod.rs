//! # Switchboard Core UI Bridge
//!
//! Delivers [`StateChangeNotice`]s produced by the lifecycle engine to
//! whatever renders them. The core has no rendering of its own; a
//! front end registers a [`UiConnector`] with the [`UiBridge`].
pub mod messages;

use std::fmt;

pub use messages::{NoticeEntry, NoticeKind, StateChangeNotice};

/// UI message severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageSeverity {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning message
    Warning,
    /// Error message
    Error,
    /// Critical error message
    Critical,
}

impl fmt::Display for MessageSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSeverity::Debug => write!(f, "debug"),
            MessageSeverity::Info => write!(f, "info"),
            MessageSeverity::Warning => write!(f, "warning"),
            MessageSeverity::Error => write!(f, "error"),
            MessageSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Trait for anything that can display notices to an administrator
pub trait UiConnector: fmt::Debug {
    /// Get the name of this connector
    fn name(&self) -> &str;

    /// Display one notice
    fn handle_notice(&self, notice: &StateChangeNotice);
}

/// Fans notices out to every registered connector
#[derive(Debug, Default)]
pub struct UiBridge {
    connectors: Vec<Box<dyn UiConnector>>,
}

impl UiBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connector(&mut self, connector: Box<dyn UiConnector>) {
        log::debug!("Registered UI connector '{}'", connector.name());
        self.connectors.push(connector);
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Send each non-empty notice to all connectors
    pub fn broadcast(&self, notices: &[StateChangeNotice]) {
        for notice in notices.iter().filter(|notice| !notice.is_empty()) {
            for connector in &self.connectors {
                connector.handle_notice(notice);
            }
        }
    }
}
