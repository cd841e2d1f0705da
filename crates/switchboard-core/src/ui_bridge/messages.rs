use std::fmt;

use crate::ui_bridge::MessageSeverity;

const CHANGE_INTRO: &str =
    "A plugin, theme, or module has changed state, and dependent modules have changed as a result.";
const PAUSED_INTRO: &str = "The following modules have been paused:";
const RESUMED_INTRO: &str = "The following modules have been resumed:";
const CHAIN_NOTE: &str = "Some of these may be chain reactions from other modules.";
const REVIEW_NOTE: &str = "Go to the Modules page to review these changes.";

/// Direction of a state change reported to administrators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Paused,
    Resumed,
}

/// One module listed in a notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeEntry {
    pub space_name: String,
    pub module_name: String,
}

impl fmt::Display for NoticeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.space_name, self.module_name)
    }
}

/// Modules that were paused or resumed because their dependencies changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeNotice {
    pub kind: NoticeKind,
    pub modules: Vec<NoticeEntry>,
}

impl StateChangeNotice {
    pub fn new(kind: NoticeKind, modules: Vec<NoticeEntry>) -> Self {
        Self { kind, modules }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn severity(&self) -> MessageSeverity {
        match self.kind {
            NoticeKind::Paused => MessageSeverity::Warning,
            NoticeKind::Resumed => MessageSeverity::Info,
        }
    }
}

impl fmt::Display for StateChangeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let intro = match self.kind {
            NoticeKind::Paused => PAUSED_INTRO,
            NoticeKind::Resumed => RESUMED_INTRO,
        };
        writeln!(f, "{}", CHANGE_INTRO)?;
        writeln!(f, "{}", intro)?;
        for entry in &self.modules {
            writeln!(f, "  {}", entry)?;
        }
        writeln!(f, "{}", CHAIN_NOTE)?;
        write!(f, "{}", REVIEW_NOTE)
    }
}
