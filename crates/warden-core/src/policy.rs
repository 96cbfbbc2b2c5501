//! Dev Drive attach policy.
//!
//! The persisted list is opt-out shaped: a module named in it is excluded
//! from attaching to developer volumes, and "allowed" means absent. Changing
//! the list affects future attachments only; filters already attached stay
//! attached.
//!
//! The Filter Manager's own `DevDriveAllowedFilters` value is the inverse
//! (presence means allowed), so it is rejected as a location by
//! [`AttachPolicyLocation::validate`](crate::config::AttachPolicyLocation::validate).
//! The default location is a dedicated opt-out value,
//! [`DEFAULT_POLICY_VALUE`](crate::config::DEFAULT_POLICY_VALUE). Nothing here
//! translates that list into the OS allow-list.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::PolicyStore;
use crate::error::{OsOperation, Result, WardenError};
use crate::types::{FilterModuleName, Outcome};

/// Returns `list` with `name` toggled.
///
/// `is_allowed == true` drops every case-insensitive match; `false` appends
/// `name` unless a match is already present. Other entries keep their order.
#[must_use]
pub fn toggle_entry(list: &[String], name: &FilterModuleName, is_allowed: bool) -> Vec<String> {
    if is_allowed {
        list.iter()
            .filter(|entry| !name.matches(entry))
            .cloned()
            .collect()
    } else {
        let mut updated = list.to_vec();
        if !list.iter().any(|entry| name.matches(entry)) {
            updated.push(name.as_str().to_string());
        }
        updated
    }
}

/// Reads and updates the attach opt-out list.
///
/// Entries are modules opted out of attaching. This is not the Filter
/// Manager's allow-list, which lists the modules that may attach.
pub struct AttachPolicyManager {
    store: Arc<dyn PolicyStore>,
    update: Mutex<()>,
}

impl AttachPolicyManager {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            update: Mutex::new(()),
        }
    }

    /// Adds `name` to the list (`is_allowed == false`) or removes it
    /// (`is_allowed == true`).
    ///
    /// An absent or unreadable value counts as an empty list. Nothing is
    /// written when the list would not change.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] for an empty name
    /// - [`WardenError::Os`] with [`OsOperation::ReadPolicy`] or
    ///   [`OsOperation::WritePolicy`]
    pub fn set_allowed(&self, name: &str, is_allowed: bool) -> Result<Outcome> {
        let name = FilterModuleName::parse(name)?;

        let _guard = self.update.lock();
        let current = self.entries()?;
        let updated = toggle_entry(&current, &name, is_allowed);
        if updated == current {
            tracing::debug!(filter = %name, is_allowed, "attach policy unchanged");
            return Ok(Outcome::AlreadyInDesiredState);
        }

        self.store.write(&updated).map_err(|e| {
            tracing::warn!(filter = %name, error = %e, "attach policy write failed");
            WardenError::os(OsOperation::WritePolicy, e)
        })?;
        tracing::info!(filter = %name, is_allowed, entries = updated.len(), "attach policy updated");
        Ok(Outcome::Applied)
    }

    /// Returns the persisted list.
    ///
    /// # Errors
    ///
    /// Returns [`OsOperation::ReadPolicy`] if the store cannot be read.
    pub fn entries(&self) -> Result<Vec<String>> {
        self.store
            .read()
            .map(|stored| stored.into_entries())
            .map_err(|e| {
                tracing::warn!(error = %e, "attach policy read failed");
                WardenError::os(OsOperation::ReadPolicy, e)
            })
    }

    /// Returns true if `name` appears in the list.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::InvalidArgument`] for an empty name or the read
    /// failure.
    pub fn is_listed(&self, name: &str) -> Result<bool> {
        let name = FilterModuleName::parse(name)?;
        Ok(self.entries()?.iter().any(|entry| name.matches(entry)))
    }
}

impl std::fmt::Debug for AttachPolicyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachPolicyManager").finish_non_exhaustive()
    }
}
