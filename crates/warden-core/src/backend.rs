//! Backend seams between the controllers and the operating system.
//!
//! Every OS-owned resource is reached through one of these traits. Native
//! implementations live in `warden-platform`; deterministic fakes live in
//! this crate's test module. Backends report raw [`OsError`]s and the
//! controllers attach the failing [`OsOperation`].
//!
//! [`OsError`]: crate::error::OsError
//! [`OsOperation`]: crate::error::OsOperation

use crate::error::OsResult;
use crate::types::{FailureRecoveryPolicy, ServiceDescriptor, ServiceStatus};

// =============================================================================
// Token
// =============================================================================

/// Access to the current process token.
pub trait TokenBackend: Send + Sync {
    /// An open token handle. Dropping it closes the handle.
    type Token;

    /// Opens the current process token with adjust-privilege access.
    fn open_process_token(&self) -> OsResult<Self::Token>;

    /// Returns true if the handle refers to a live token.
    fn is_usable(&self, token: &Self::Token) -> bool;

    /// Enables a single privilege by its LUID value.
    ///
    /// Must fail with [`OsError::NOT_ALL_ASSIGNED`] when the OS accepts the
    /// call but does not grant the privilege.
    ///
    /// [`OsError::NOT_ALL_ASSIGNED`]: crate::error::OsError::NOT_ALL_ASSIGNED
    fn enable(&self, token: &Self::Token, luid: u32) -> OsResult<()>;
}

// =============================================================================
// Filter registry
// =============================================================================

/// The OS registry of attached filter modules.
pub trait FilterRegistry: Send + Sync {
    /// Loads a filter module by name.
    fn load(&self, name: &str) -> OsResult<()>;

    /// Unloads a filter module by name.
    fn unload(&self, name: &str) -> OsResult<()>;

    /// Opens an enumeration cursor over the attached filters.
    fn find(&self) -> OsResult<Box<dyn FilterFind + '_>>;
}

/// A live enumeration cursor. Dropping it closes the cursor.
pub trait FilterFind {
    /// Fills `page` with the next batch of records and returns the number of
    /// bytes written.
    ///
    /// The end of the sequence is reported as [`OsError::NO_MORE_ITEMS`].
    ///
    /// [`OsError::NO_MORE_ITEMS`]: crate::error::OsError::NO_MORE_ITEMS
    fn next_page(&mut self, page: &mut [u8]) -> OsResult<usize>;
}

// =============================================================================
// Policy store
// =============================================================================

/// Raw contents of the persisted opt-out list value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredList {
    /// The value does not exist.
    Absent,
    /// The value holds a list of strings.
    Strings(Vec<String>),
    /// The value exists but has an unexpected type or encoding.
    Malformed,
}

impl StoredList {
    /// Returns the stored strings, treating absent and malformed values as
    /// empty.
    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        match self {
            Self::Strings(entries) => entries,
            Self::Absent | Self::Malformed => Vec::new(),
        }
    }
}

/// Persistent storage for a multi-string value.
pub trait PolicyStore: Send + Sync {
    /// Reads the current value.
    fn read(&self) -> OsResult<StoredList>;

    /// Replaces the value in a single write.
    fn write(&self, entries: &[String]) -> OsResult<()>;
}

// =============================================================================
// Service manager
// =============================================================================

bitflags::bitflags! {
    /// Rights requested when opening a service entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntryAccess: u32 {
        /// Query status.
        const QUERY = 1 << 0;
        /// Issue start requests.
        const START = 1 << 1;
        /// Issue stop controls.
        const STOP = 1 << 2;
        /// Change description and failure actions.
        const CONFIGURE = 1 << 3;
        /// Delete the entry.
        const DELETE = 1 << 4;
    }
}

/// The OS service manager.
pub trait ServiceBackend: Send + Sync {
    /// Creates an own-process, auto-start entry.
    ///
    /// Fails with [`OsError::SERVICE_EXISTS`] if the name is taken.
    ///
    /// [`OsError::SERVICE_EXISTS`]: crate::error::OsError::SERVICE_EXISTS
    fn create(&self, descriptor: &ServiceDescriptor) -> OsResult<Box<dyn ServiceEntry>>;

    /// Opens an existing entry.
    ///
    /// Fails with [`OsError::SERVICE_DOES_NOT_EXIST`] if there is none.
    ///
    /// [`OsError::SERVICE_DOES_NOT_EXIST`]: crate::error::OsError::SERVICE_DOES_NOT_EXIST
    fn open(&self, name: &str, access: EntryAccess) -> OsResult<Box<dyn ServiceEntry>>;
}

/// An open service entry. Dropping it closes the handle.
pub trait ServiceEntry {
    /// Sets the description.
    fn set_description(&self, description: &str) -> OsResult<()>;

    /// Sets the failure actions.
    fn set_failure_policy(&self, policy: &FailureRecoveryPolicy) -> OsResult<()>;

    /// Issues a start request without waiting.
    fn start(&self) -> OsResult<()>;

    /// Issues a stop control and returns the status it reports.
    fn stop(&self) -> OsResult<ServiceStatus>;

    /// Queries the current status.
    fn query_status(&self) -> OsResult<ServiceStatus>;

    /// Marks the entry for deletion.
    fn delete(&self) -> OsResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OsError;

    #[test]
    fn test_stored_list_into_entries() {
        assert!(StoredList::Absent.into_entries().is_empty());
        assert!(StoredList::Malformed.into_entries().is_empty());
        assert_eq!(
            StoredList::Strings(vec!["a".into(), "b".into()]).into_entries(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_entry_access_composes() {
        let access = EntryAccess::QUERY | EntryAccess::STOP;
        assert!(access.contains(EntryAccess::QUERY));
        assert!(!access.contains(EntryAccess::DELETE));
    }

    #[test]
    fn test_end_of_sequence_code() {
        assert_eq!(OsError::NO_MORE_ITEMS.code(), 259);
    }
}
