//! Process privilege elevation.
//!
//! Loading and unloading filter modules requires the load-driver privilege to
//! be enabled on the calling process's token. Administrators hold the
//! privilege but it is disabled by default.

use crate::backend::TokenBackend;
use crate::error::PrivilegeError;

/// A token privilege, identified by its LUID low part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Privilege(u32);

impl Privilege {
    /// `SE_LOAD_DRIVER_PRIVILEGE`
    pub const LOAD_DRIVER: Self = Self(10);

    /// Wraps a raw privilege LUID value.
    #[must_use]
    pub const fn from_luid(luid: u32) -> Self {
        Self(luid)
    }

    /// Returns the raw LUID value.
    #[must_use]
    pub const fn luid(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::LOAD_DRIVER => f.write_str("SeLoadDriverPrivilege"),
            Self(luid) => write!(f, "privilege {luid}"),
        }
    }
}

/// Enables privileges on the current process.
///
/// There is no revert. Concurrent calls enabling different privileges need
/// external synchronization.
pub trait PrivilegeElevator: Send + Sync {
    /// Enables `privilege` on the current process token.
    ///
    /// # Errors
    ///
    /// Returns a [`PrivilegeError`] describing which step failed.
    fn enable(&self, privilege: Privilege) -> Result<(), PrivilegeError>;
}

/// Elevator that adjusts the real process token through a [`TokenBackend`].
#[derive(Debug, Default)]
pub struct TokenElevator<B> {
    backend: B,
}

impl<B: TokenBackend> TokenElevator<B> {
    /// Creates an elevator over `backend`.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: TokenBackend> PrivilegeElevator for TokenElevator<B> {
    fn enable(&self, privilege: Privilege) -> Result<(), PrivilegeError> {
        let token = self.backend.open_process_token().map_err(|e| {
            tracing::warn!(privilege = %privilege, error = %e, "cannot open process token");
            PrivilegeError::NoToken(e)
        })?;

        if !self.backend.is_usable(&token) {
            tracing::warn!(privilege = %privilege, "process token handle is invalid");
            return Err(PrivilegeError::InvalidToken);
        }

        self.backend
            .enable(&token, privilege.luid())
            .map_err(|e| {
                let err = PrivilegeError::AdjustFailed(e);
                if err.is_not_held() {
                    tracing::warn!(privilege = %privilege, "privilege not held by this account");
                } else {
                    tracing::warn!(privilege = %privilege, error = %e, "privilege adjustment failed");
                }
                err
            })?;

        tracing::debug!(privilege = %privilege, "privilege enabled");
        Ok(())
    }
}

/// Elevator for processes that already hold every privilege they need.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreElevated;

impl PrivilegeElevator for PreElevated {
    fn enable(&self, _privilege: Privilege) -> Result<(), PrivilegeError> {
        Ok(())
    }
}
