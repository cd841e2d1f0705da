use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::module_system::error::ModuleSystemError;

/// The administrator's requested setting for a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Off,
    Pause,
    /// Modules are on until an administrator says otherwise
    #[default]
    On,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Pause => "pause",
            Mode::On => "on",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ModuleSystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(Mode::Off),
            "pause" => Ok(Mode::Pause),
            "on" => Ok(Mode::On),
            _ => Err(ModuleSystemError::InvalidMode(s.to_string())),
        }
    }
}

/// Derived lifecycle state of a module.
///
/// Never set directly: always computed by [`LifecycleState::derive`] from the
/// mode, dependency satisfaction and the forced-off flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Never evaluated before
    #[default]
    Unknown,
    OffCannotActivate,
    OffCanActivate,
    PauseCannotActivate,
    PauseCanActivate,
    OnCanActivate,
    /// The host plugin or the framework itself was deactivated
    ForcedOff,
}

impl LifecycleState {
    pub fn derive(mode: Mode, deps_met: bool, forced_off: bool) -> Self {
        if forced_off {
            return LifecycleState::ForcedOff;
        }
        match (mode, deps_met) {
            (Mode::Off, true) => LifecycleState::OffCanActivate,
            (Mode::Off, false) => LifecycleState::OffCannotActivate,
            (Mode::Pause, true) => LifecycleState::PauseCanActivate,
            (Mode::Pause, false) => LifecycleState::PauseCannotActivate,
            (Mode::On, true) => LifecycleState::OnCanActivate,
            // Keeps the administrator's intent: resumes once dependencies return
            (Mode::On, false) => LifecycleState::PauseCannotActivate,
        }
    }

    pub fn is_on(&self) -> bool {
        *self == LifecycleState::OnCanActivate
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            LifecycleState::PauseCannotActivate | LifecycleState::PauseCanActivate
        )
    }

    pub fn is_off(&self) -> bool {
        matches!(
            self,
            LifecycleState::OffCannotActivate | LifecycleState::OffCanActivate
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Unknown => "unknown",
            LifecycleState::OffCannotActivate => "off_cannot_activate",
            LifecycleState::OffCanActivate => "off_can_activate",
            LifecycleState::PauseCannotActivate => "pause_cannot_activate",
            LifecycleState::PauseCanActivate => "pause_can_activate",
            LifecycleState::OnCanActivate => "on_can_activate",
            LifecycleState::ForcedOff => "forced_off",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module's saved state from the previous pass paired with its current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub saved: LifecycleState,
    pub current: LifecycleState,
}

impl StateChange {
    pub fn new(saved: LifecycleState, current: LifecycleState) -> Self {
        Self { saved, current }
    }

    pub fn activates(&self) -> bool {
        self.current.is_on()
            && matches!(
                self.saved,
                LifecycleState::Unknown
                    | LifecycleState::OffCannotActivate
                    | LifecycleState::OnCanActivate
                    | LifecycleState::ForcedOff
            )
    }

    pub fn starts_up(&self) -> bool {
        self.current.is_on()
    }

    pub fn resumes(&self) -> bool {
        self.current.is_on() && self.saved.is_paused()
    }

    pub fn pauses(&self) -> bool {
        self.saved.is_on() && self.current.is_paused()
    }

    pub fn deactivates(&self) -> bool {
        self.saved.is_on() && self.current.is_off()
    }

    /// Dependencies came back without the administrator doing anything
    pub fn notifies_resume(&self) -> bool {
        self.current.is_on() && self.saved == LifecycleState::PauseCannotActivate
    }

    /// Dependencies vanished from under a module that was on
    pub fn notifies_pause(&self) -> bool {
        self.saved.is_on() && self.current == LifecycleState::PauseCannotActivate
    }
}
