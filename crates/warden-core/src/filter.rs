//! Kernel filter module control.
//!
//! Load and unload are idempotent. The registry is read as a live snapshot on
//! every call; nothing is cached. Between [`FilterModuleController::is_loaded`]
//! and the unload request another process may change the registry, and that
//! window is not guarded.

use std::sync::Arc;

use crate::backend::FilterRegistry;
use crate::config::{FilterConfig, MIN_PAGE_SIZE};
use crate::error::{OsError, OsOperation, Result, WardenError};
use crate::privilege::{Privilege, PrivilegeElevator};
use crate::record::{FilterRecord, decode_page};
use crate::types::{FilterModuleName, Outcome};

/// Loads, unloads and enumerates filter modules.
pub struct FilterModuleController {
    registry: Arc<dyn FilterRegistry>,
    elevator: Arc<dyn PrivilegeElevator>,
    page_size: usize,
}

impl FilterModuleController {
    /// Creates a controller with the default enumeration page size.
    #[must_use]
    pub fn new(registry: Arc<dyn FilterRegistry>, elevator: Arc<dyn PrivilegeElevator>) -> Self {
        Self {
            registry,
            elevator,
            page_size: FilterConfig::default().page_size,
        }
    }

    /// Sets the enumeration buffer size, never below one record header.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(MIN_PAGE_SIZE);
        self
    }

    /// Returns the enumeration buffer size.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Loads a filter module.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] for an empty name
    /// - [`WardenError::PermissionDenied`] if the load-driver privilege
    ///   cannot be enabled; no load is attempted
    /// - [`WardenError::Os`] with [`OsOperation::FilterLoad`] otherwise
    pub fn load(&self, name: &str) -> Result<Outcome> {
        let name = FilterModuleName::parse(name)?;
        self.elevator.enable(Privilege::LOAD_DRIVER)?;

        match self.registry.load(name.as_str()) {
            Ok(()) => {
                tracing::info!(filter = %name, "filter module loaded");
                Ok(Outcome::Applied)
            }
            Err(e) if e == OsError::SERVICE_ALREADY_RUNNING => {
                tracing::debug!(filter = %name, "filter module already loaded");
                Ok(Outcome::AlreadyInDesiredState)
            }
            Err(e) => {
                tracing::warn!(filter = %name, error = %e, "filter module load failed");
                Err(WardenError::os(OsOperation::FilterLoad, e))
            }
        }
    }

    /// Unloads a filter module if it is loaded.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] for an empty name
    /// - [`WardenError::PermissionDenied`] if elevation fails
    /// - [`WardenError::Os`] with [`OsOperation::FilterEnumerate`] if the
    ///   loaded check fails, or [`OsOperation::FilterUnload`]
    pub fn unload(&self, name: &str) -> Result<Outcome> {
        let name = FilterModuleName::parse(name)?;
        self.elevator.enable(Privilege::LOAD_DRIVER)?;

        if !self.contains(&name)? {
            tracing::debug!(filter = %name, "filter module not loaded");
            return Ok(Outcome::AlreadyInDesiredState);
        }

        self.registry.unload(name.as_str()).map_err(|e| {
            tracing::warn!(filter = %name, error = %e, "filter module unload failed");
            WardenError::os(OsOperation::FilterUnload, e)
        })?;
        tracing::info!(filter = %name, "filter module unloaded");
        Ok(Outcome::Applied)
    }

    /// Returns true if a module with this name is attached.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::InvalidArgument`] for an empty name or the
    /// enumeration failure.
    pub fn is_loaded(&self, name: &str) -> Result<bool> {
        let name = FilterModuleName::parse(name)?;
        self.contains(&name)
    }

    /// Lists attached module names, first occurrence first, without exact
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`OsOperation::FilterEnumerate`] on any failure other than the
    /// end of the sequence.
    pub fn enumerate(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for record in self.records()? {
            if !names.contains(&record.name) {
                names.push(record.name);
            }
        }
        Ok(names)
    }

    /// Returns every decoded record, including repeats across frames.
    ///
    /// # Errors
    ///
    /// Returns [`OsOperation::FilterEnumerate`] on any failure other than the
    /// end of the sequence.
    pub fn records(&self) -> Result<Vec<FilterRecord>> {
        let fail = |e: OsError| {
            tracing::warn!(error = %e, "filter enumeration failed");
            WardenError::os(OsOperation::FilterEnumerate, e)
        };

        let mut cursor = self.registry.find().map_err(fail)?;
        let mut page = vec![0u8; self.page_size];
        let mut records = Vec::new();
        loop {
            match cursor.next_page(&mut page) {
                Ok(written) => records.extend(decode_page(&page[..written.min(page.len())])),
                Err(e) if e == OsError::NO_MORE_ITEMS => break,
                Err(e) => return Err(fail(e)),
            }
        }
        tracing::debug!(count = records.len(), "enumerated filter records");
        Ok(records)
    }

    fn contains(&self, name: &FilterModuleName) -> Result<bool> {
        Ok(self
            .enumerate()?
            .iter()
            .any(|loaded| name.matches(loaded)))
    }
}

impl std::fmt::Debug for FilterModuleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterModuleController")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}
