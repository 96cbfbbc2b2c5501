//! Error types for warden-core.
//!
//! Every public operation returns its failures as values. "Already in the
//! desired state" is not an error: it is reported as
//! [`Outcome::AlreadyInDesiredState`](crate::types::Outcome).

use std::fmt;
use std::time::Duration;

/// Result type alias for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Result type returned by backend seams.
pub type OsResult<T> = std::result::Result<T, OsError>;

/// A raw operating-system error code.
///
/// Codes are kept in their Win32 form. HRESULTs carrying `FACILITY_WIN32`
/// are unwrapped to the underlying Win32 code so callers compare against a
/// single set of constants regardless of which API produced the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsError {
    code: u32,
}

impl OsError {
    /// `ERROR_FILE_NOT_FOUND`
    pub const FILE_NOT_FOUND: Self = Self::from_code(2);
    /// `ERROR_ACCESS_DENIED`
    pub const ACCESS_DENIED: Self = Self::from_code(5);
    /// `ERROR_INVALID_HANDLE`
    pub const INVALID_HANDLE: Self = Self::from_code(6);
    /// `ERROR_GEN_FAILURE`
    pub const GEN_FAILURE: Self = Self::from_code(31);
    /// `ERROR_NOT_SUPPORTED`
    pub const NOT_SUPPORTED: Self = Self::from_code(50);
    /// `ERROR_INVALID_PARAMETER`
    pub const INVALID_PARAMETER: Self = Self::from_code(87);
    /// `ERROR_INSUFFICIENT_BUFFER`
    pub const INSUFFICIENT_BUFFER: Self = Self::from_code(122);
    /// `ERROR_BAD_FILE_TYPE`: a registry value of an unexpected type.
    pub const BAD_FILE_TYPE: Self = Self::from_code(222);
    /// `ERROR_NO_MORE_ITEMS`: end of an enumeration, not a failure.
    pub const NO_MORE_ITEMS: Self = Self::from_code(259);
    /// `ERROR_NO_TOKEN`
    pub const NO_TOKEN: Self = Self::from_code(1008);
    /// `ERROR_SERVICE_ALREADY_RUNNING`
    pub const SERVICE_ALREADY_RUNNING: Self = Self::from_code(1056);
    /// `ERROR_SERVICE_DOES_NOT_EXIST`
    pub const SERVICE_DOES_NOT_EXIST: Self = Self::from_code(1060);
    /// `ERROR_SERVICE_CANNOT_ACCEPT_CTRL`
    pub const SERVICE_CANNOT_ACCEPT_CTRL: Self = Self::from_code(1061);
    /// `ERROR_SERVICE_NOT_ACTIVE`
    pub const SERVICE_NOT_ACTIVE: Self = Self::from_code(1062);
    /// `ERROR_SERVICE_MARKED_FOR_DELETE`
    pub const SERVICE_MARKED_FOR_DELETE: Self = Self::from_code(1072);
    /// `ERROR_SERVICE_EXISTS`
    pub const SERVICE_EXISTS: Self = Self::from_code(1073);
    /// `ERROR_NOT_ALL_ASSIGNED`
    pub const NOT_ALL_ASSIGNED: Self = Self::from_code(1300);
    /// `ERROR_TIMEOUT`
    pub const TIMEOUT: Self = Self::from_code(1460);

    /// Wraps a Win32 error code.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        Self { code }
    }

    /// Wraps an HRESULT, unwrapping `FACILITY_WIN32` values.
    #[must_use]
    pub const fn from_hresult(hr: i32) -> Self {
        let raw = hr as u32;
        if raw & 0xFFFF_0000 == 0x8007_0000 {
            Self { code: raw & 0xFFFF }
        } else {
            Self { code: raw }
        }
    }

    /// Converts an I/O error, falling back to `ERROR_GEN_FAILURE` when it
    /// carries no OS code.
    #[must_use]
    pub fn from_io(err: &std::io::Error) -> Self {
        err.raw_os_error()
            .map_or(Self::GEN_FAILURE, |code| Self::from_code(code as u32))
    }

    /// Returns the raw code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self.code
    }

    /// Returns the symbolic name for well-known codes.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.code {
            2 => Some("ERROR_FILE_NOT_FOUND"),
            5 => Some("ERROR_ACCESS_DENIED"),
            6 => Some("ERROR_INVALID_HANDLE"),
            31 => Some("ERROR_GEN_FAILURE"),
            50 => Some("ERROR_NOT_SUPPORTED"),
            87 => Some("ERROR_INVALID_PARAMETER"),
            122 => Some("ERROR_INSUFFICIENT_BUFFER"),
            222 => Some("ERROR_BAD_FILE_TYPE"),
            259 => Some("ERROR_NO_MORE_ITEMS"),
            1008 => Some("ERROR_NO_TOKEN"),
            1056 => Some("ERROR_SERVICE_ALREADY_RUNNING"),
            1060 => Some("ERROR_SERVICE_DOES_NOT_EXIST"),
            1061 => Some("ERROR_SERVICE_CANNOT_ACCEPT_CTRL"),
            1062 => Some("ERROR_SERVICE_NOT_ACTIVE"),
            1072 => Some("ERROR_SERVICE_MARKED_FOR_DELETE"),
            1073 => Some("ERROR_SERVICE_EXISTS"),
            1300 => Some("ERROR_NOT_ALL_ASSIGNED"),
            1460 => Some("ERROR_TIMEOUT"),
            _ => None,
        }
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "os error {} ({name})", self.code),
            None => write!(f, "os error {:#010x}", self.code),
        }
    }
}

impl std::error::Error for OsError {}

/// The OS step that produced an [`OsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsOperation {
    /// Loading a filter module.
    FilterLoad,
    /// Unloading a filter module.
    FilterUnload,
    /// Walking the filter registry.
    FilterEnumerate,
    /// Reading the attach opt-out list.
    ReadPolicy,
    /// Writing the attach opt-out list.
    WritePolicy,
    /// Creating a service entry.
    CreateService,
    /// Opening a service entry (or its manager connection).
    OpenService,
    /// Updating a service description.
    SetDescription,
    /// Updating a service's failure actions.
    SetFailureActions,
    /// Issuing a start request.
    StartService,
    /// Issuing a stop control.
    ControlStop,
    /// Querying service status.
    QueryStatus,
    /// Deleting a service entry.
    DeleteService,
}

impl OsOperation {
    /// Returns the operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FilterLoad => "filter-load",
            Self::FilterUnload => "filter-unload",
            Self::FilterEnumerate => "filter-enumerate",
            Self::ReadPolicy => "read-policy",
            Self::WritePolicy => "write-policy",
            Self::CreateService => "create-service",
            Self::OpenService => "open-service",
            Self::SetDescription => "set-description",
            Self::SetFailureActions => "set-failure-actions",
            Self::StartService => "start-service",
            Self::ControlStop => "control-stop",
            Self::QueryStatus => "query-status",
            Self::DeleteService => "delete-service",
        }
    }
}

impl fmt::Display for OsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to enable a privilege on the process token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PrivilegeError {
    /// The process token could not be opened.
    #[error("cannot open process token: {0}")]
    NoToken(OsError),

    /// The token handle was opened but is not usable.
    #[error("process token handle is invalid")]
    InvalidToken,

    /// The privilege adjustment was rejected.
    #[error("privilege adjustment failed: {0}")]
    AdjustFailed(OsError),
}

impl PrivilegeError {
    /// Returns true if the account does not hold the privilege at all.
    #[must_use]
    pub fn is_not_held(&self) -> bool {
        matches!(self, Self::AdjustFailed(e) if *e == OsError::NOT_ALL_ASSIGNED)
    }
}

/// Comprehensive error type for warden operations.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// A required name or argument was empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Privilege elevation failed.
    #[error("permission denied: {0}")]
    PermissionDenied(#[from] PrivilegeError),

    /// A module or service entry is absent where presence was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// A bounded wait expired.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A zero-timeout call returned before the transition completed.
    #[error("operation pending")]
    Pending,

    /// An OS call failed.
    #[error("{op} failed: {source}")]
    Os {
        /// The step that failed.
        op: OsOperation,
        /// The raw OS error.
        source: OsError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WardenError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wraps an OS failure with the step that produced it.
    #[must_use]
    pub const fn os(op: OsOperation, source: OsError) -> Self {
        Self::Os { op, source }
    }

    /// Returns the raw OS error, if this is an OS failure.
    #[must_use]
    pub const fn os_error(&self) -> Option<OsError> {
        match self {
            Self::Os { source, .. } => Some(*source),
            Self::PermissionDenied(PrivilegeError::NoToken(e) | PrivilegeError::AdjustFailed(e)) => {
                Some(*e)
            }
            _ => None,
        }
    }

    /// Returns the raw OS code, if any.
    #[must_use]
    pub const fn os_code(&self) -> Option<u32> {
        match self.os_error() {
            Some(e) => Some(e.code()),
            None => None,
        }
    }

    /// Returns true for [`WardenError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for [`WardenError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns true for [`WardenError::Pending`].
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true for [`WardenError::InvalidArgument`].
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
