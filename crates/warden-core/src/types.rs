//! Core types for filter-module and service supervision.
//!
//! Names are validated once at the boundary and compared with an ordinal,
//! locale-invariant ignore-case rule. Service states keep the raw values the
//! Service Control Manager reports.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WardenError};

/// Compares two names ignoring case, without locale tables.
///
/// Each character is mapped through its Unicode lowercase mapping and the
/// resulting sequences are compared ordinally. `"FILTER"` equals `"filter"`,
/// while the Turkish dotted and dotless i do not fold onto ASCII `i`.
#[must_use]
pub fn names_equal(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn validate_name(kind: &str, raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(WardenError::invalid_argument(format!(
            "{kind} name must not be empty"
        )));
    }
    Ok(raw.to_string())
}

/// Name of a kernel filter module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterModuleName(String);

impl FilterModuleName {
    /// Validates and wraps a filter module name.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::InvalidArgument`] for empty or whitespace-only
    /// names.
    pub fn parse(raw: &str) -> Result<Self> {
        validate_name("filter module", raw).map(Self)
    }

    /// Returns the name as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `other` names the same module.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        names_equal(&self.0, other)
    }
}

impl AsRef<str> for FilterModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FilterModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal name of a service entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);

impl ServiceName {
    /// Validates and wraps a service name.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::InvalidArgument`] for empty or whitespace-only
    /// names.
    pub fn parse(raw: &str) -> Result<Self> {
        validate_name("service", raw).map(Self)
    }

    /// Returns the name as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Success value of every mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The change was issued.
    Applied,
    /// Nothing needed doing.
    AlreadyInDesiredState,
}

impl Outcome {
    /// Returns true if a change was issued.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::AlreadyInDesiredState => write!(f, "already in desired state"),
        }
    }
}

/// Runtime state of a service, with the OS's raw values.
///
/// ```text
/// Stopped ─start→ StartPending → Running ─stop→ StopPending → Stopped
///                                   ↕
///                 PausePending → Paused → ContinuePending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ServiceRuntimeState {
    /// Not running.
    Stopped = 1,
    /// Starting.
    StartPending = 2,
    /// Stopping.
    StopPending = 3,
    /// Running.
    Running = 4,
    /// Continue is pending.
    ContinuePending = 5,
    /// Pause is pending.
    PausePending = 6,
    /// Paused.
    Paused = 7,
}

impl ServiceRuntimeState {
    /// Converts a raw OS state value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Stopped),
            2 => Some(Self::StartPending),
            3 => Some(Self::StopPending),
            4 => Some(Self::Running),
            5 => Some(Self::ContinuePending),
            6 => Some(Self::PausePending),
            7 => Some(Self::Paused),
            _ => None,
        }
    }

    /// Returns the raw OS state value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Returns true for the transitional states.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(
            self,
            Self::StartPending | Self::StopPending | Self::ContinuePending | Self::PausePending
        )
    }
}

impl std::fmt::Display for ServiceRuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::StartPending => "start-pending",
            Self::StopPending => "stop-pending",
            Self::Running => "running",
            Self::ContinuePending => "continue-pending",
            Self::PausePending => "pause-pending",
            Self::Paused => "paused",
        };
        f.write_str(s)
    }
}

bitflags::bitflags! {
    /// Acceptance set for bounded waits. A state contributes `1 << raw`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateSet: u32 {
        /// [`ServiceRuntimeState::Stopped`]
        const STOPPED = 1 << 1;
        /// [`ServiceRuntimeState::StartPending`]
        const START_PENDING = 1 << 2;
        /// [`ServiceRuntimeState::StopPending`]
        const STOP_PENDING = 1 << 3;
        /// [`ServiceRuntimeState::Running`]
        const RUNNING = 1 << 4;
        /// [`ServiceRuntimeState::ContinuePending`]
        const CONTINUE_PENDING = 1 << 5;
        /// [`ServiceRuntimeState::PausePending`]
        const PAUSE_PENDING = 1 << 6;
        /// [`ServiceRuntimeState::Paused`]
        const PAUSED = 1 << 7;
    }
}

impl StateSet {
    /// Returns the single-state set for `state`.
    #[must_use]
    pub const fn of(state: ServiceRuntimeState) -> Self {
        Self::from_bits_retain(1 << state.as_raw())
    }

    /// Returns true if `state` is in the set.
    #[must_use]
    pub const fn accepts(self, state: ServiceRuntimeState) -> bool {
        self.contains(Self::of(state))
    }
}

impl From<ServiceRuntimeState> for StateSet {
    fn from(state: ServiceRuntimeState) -> Self {
        Self::of(state)
    }
}

/// A status snapshot of a service entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Current state.
    pub state: ServiceRuntimeState,
    /// Service's estimate of time until its next status update.
    pub wait_hint: Duration,
    /// Progress counter for pending operations.
    pub checkpoint: u32,
}

impl ServiceStatus {
    /// Creates a status with no wait hint.
    #[must_use]
    pub const fn new(state: ServiceRuntimeState) -> Self {
        Self {
            state,
            wait_hint: Duration::ZERO,
            checkpoint: 0,
        }
    }

    /// Sets the wait hint.
    #[must_use]
    pub const fn with_wait_hint(mut self, wait_hint: Duration) -> Self {
        self.wait_hint = wait_hint;
        self
    }
}

/// Automatic restart policy applied at install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecoveryPolicy {
    /// Delay before each restart.
    pub restart_delay: Duration,
    /// Number of consecutive restart actions.
    pub restart_attempts: u32,
    /// Period after which the failure counter resets.
    pub reset_period: Duration,
}

impl FailureRecoveryPolicy {
    /// Three restarts, 500 ms apart, counter reset after a day.
    pub const STANDARD: Self = Self {
        restart_delay: Duration::from_millis(500),
        restart_attempts: 3,
        reset_period: Duration::from_secs(24 * 60 * 60),
    };
}

/// Everything needed to create a service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Internal name.
    pub name: String,

    /// Name shown in management tools. Defaults to `name` when empty.
    #[serde(default)]
    pub display_name: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Path to the service binary.
    pub binary_path: PathBuf,
}

impl ServiceDescriptor {
    /// Creates a descriptor with empty display name and description.
    #[must_use]
    pub fn new(name: impl Into<String>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            binary_path: binary_path.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the display name, falling back to the internal name.
    #[must_use]
    pub fn effective_display_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Validates the descriptor and returns its service name.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::InvalidArgument`] if the name or binary path
    /// is empty.
    pub fn validate(&self) -> Result<ServiceName> {
        let name = ServiceName::parse(&self.name)?;
        if self.binary_path.as_os_str().is_empty() {
            return Err(WardenError::invalid_argument(
                "service binary path must not be empty",
            ));
        }
        Ok(name)
    }
}
