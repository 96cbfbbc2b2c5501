//! Service lifecycle control.
//!
//! All operations block the calling thread. Waits poll the service manager
//! with [`wait_for_state`] until the expected state is reached or the timeout
//! elapses.
//!
//! State checks and control requests are separate OS calls. Another process
//! may change the service in between; the controller reports what the OS
//! says at the time of each call and does not lock against that.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{EntryAccess, ServiceBackend, ServiceEntry};
use crate::config::{PollPolicy, ServiceConfig};
use crate::error::{OsError, OsOperation, Result, WardenError};
use crate::types::{
    FailureRecoveryPolicy, Outcome, ServiceDescriptor, ServiceName, ServiceRuntimeState,
    ServiceStatus, StateSet,
};
use crate::wait::wait_for_state;

/// Installs, starts, stops, uninstalls and queries services.
pub struct ServiceLifecycleController {
    backend: Arc<dyn ServiceBackend>,
    poll: PollPolicy,
    default_timeout: Duration,
}

impl ServiceLifecycleController {
    /// Creates a controller with default polling and a 30 s default timeout.
    #[must_use]
    pub fn new(backend: Arc<dyn ServiceBackend>) -> Self {
        Self {
            backend,
            poll: PollPolicy::default(),
            default_timeout: ServiceConfig::default().timeout,
        }
    }

    /// Sets the polling schedule.
    #[must_use]
    pub const fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the bound used by [`uninstall`](Self::uninstall).
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns the bound used by [`uninstall`](Self::uninstall).
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Creates (or reuses) the entry, applies description and failure
    /// recovery, and requests a start without waiting.
    ///
    /// An existing entry keeps its binary path and start type; only the
    /// description and recovery actions are refreshed. A start request
    /// answered with `ERROR_SERVICE_ALREADY_RUNNING` counts as success.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] for an invalid descriptor
    /// - [`WardenError::Os`] tagged with the failing step
    pub fn install(&self, descriptor: &ServiceDescriptor) -> Result<Outcome> {
        let name = descriptor.validate()?;

        let entry = match self.backend.create(descriptor) {
            Ok(entry) => {
                tracing::info!(
                    service = %name,
                    binary = %descriptor.binary_path.display(),
                    "service entry created"
                );
                entry
            }
            Err(e) if e == OsError::SERVICE_EXISTS => {
                tracing::debug!(service = %name, "service entry exists, reusing it");
                self.backend
                    .open(name.as_str(), EntryAccess::all())
                    .map_err(|e| fail(&name, OsOperation::OpenService, e))?
            }
            Err(e) => return Err(fail(&name, OsOperation::CreateService, e)),
        };

        entry
            .set_description(&descriptor.description)
            .map_err(|e| fail(&name, OsOperation::SetDescription, e))?;
        entry
            .set_failure_policy(&FailureRecoveryPolicy::STANDARD)
            .map_err(|e| fail(&name, OsOperation::SetFailureActions, e))?;

        match entry.start() {
            Ok(()) => tracing::info!(service = %name, "service start requested"),
            Err(e) if e == OsError::SERVICE_ALREADY_RUNNING => {
                tracing::debug!(service = %name, "service already running");
            }
            Err(e) => return Err(fail(&name, OsOperation::StartService, e)),
        }
        Ok(Outcome::Applied)
    }

    /// Stops the service if needed and, unless `keep_entry` is set, deletes
    /// its entry.
    ///
    /// `ERROR_SERVICE_DOES_NOT_EXIST` on open is reported as
    /// [`Outcome::AlreadyInDesiredState`]. `ERROR_SERVICE_NOT_ACTIVE` from the
    /// stop control is not an error.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] for an empty name
    /// - [`WardenError::Timeout`] if the service does not stop in time
    /// - [`WardenError::Os`] tagged with the failing step
    pub fn uninstall(&self, name: &str, keep_entry: bool) -> Result<Outcome> {
        let name = ServiceName::parse(name)?;

        let access = EntryAccess::QUERY | EntryAccess::STOP | EntryAccess::DELETE;
        let entry = match self.backend.open(name.as_str(), access) {
            Ok(entry) => entry,
            Err(e) if e == OsError::SERVICE_DOES_NOT_EXIST => {
                tracing::debug!(service = %name, "service not installed");
                return Ok(Outcome::AlreadyInDesiredState);
            }
            Err(e) => return Err(fail(&name, OsOperation::OpenService, e)),
        };

        let settled = StateSet::all().difference(StateSet::STOP_PENDING);
        let status = wait_for_state(entry.as_ref(), settled, self.default_timeout, &self.poll)?;
        if status.state != ServiceRuntimeState::Stopped {
            self.stop_entry(&name, entry.as_ref(), self.default_timeout)?;
        }

        if !keep_entry {
            entry
                .delete()
                .map_err(|e| fail(&name, OsOperation::DeleteService, e))?;
            tracing::info!(service = %name, "service entry deleted");
        }
        Ok(Outcome::Applied)
    }

    /// Starts the service and waits up to `timeout` for it to run.
    ///
    /// `ERROR_SERVICE_ALREADY_RUNNING` from the start request means a start is
    /// already in flight; the call keeps waiting for Running.
    ///
    /// # Errors
    ///
    /// - [`WardenError::NotFound`] if the entry does not exist
    /// - [`WardenError::Pending`] if `timeout` is zero and the start was
    ///   issued
    /// - [`WardenError::Timeout`] if the service is not running in time
    /// - [`WardenError::Os`] tagged with the failing step
    pub fn start(&self, name: &str, timeout: Duration) -> Result<Outcome> {
        let name = ServiceName::parse(name)?;
        let entry = self.open_existing(&name, EntryAccess::QUERY | EntryAccess::START)?;

        if current_state(entry.as_ref()) == Some(ServiceRuntimeState::Running) {
            tracing::debug!(service = %name, "service already running");
            return Ok(Outcome::AlreadyInDesiredState);
        }

        match entry.start() {
            Ok(()) => tracing::info!(service = %name, "service start requested"),
            Err(e) if e == OsError::SERVICE_ALREADY_RUNNING => {
                tracing::debug!(service = %name, "service start already in progress");
            }
            Err(e) => return Err(fail(&name, OsOperation::StartService, e)),
        }

        if timeout.is_zero() {
            return Err(WardenError::Pending);
        }
        wait_for_state(entry.as_ref(), StateSet::RUNNING, timeout, &self.poll)?;
        tracing::info!(service = %name, "service running");
        Ok(Outcome::Applied)
    }

    /// Stops the service and waits up to `timeout` for it to stop.
    ///
    /// `ERROR_SERVICE_NOT_ACTIVE` from the stop control is reported as
    /// [`Outcome::AlreadyInDesiredState`].
    ///
    /// # Errors
    ///
    /// - [`WardenError::NotFound`] if the entry does not exist
    /// - [`WardenError::Pending`] if `timeout` is zero and the service has
    ///   not stopped yet
    /// - [`WardenError::Timeout`] if the service is not stopped in time
    /// - [`WardenError::Os`] tagged with the failing step
    pub fn stop(&self, name: &str, timeout: Duration) -> Result<Outcome> {
        let name = ServiceName::parse(name)?;
        let entry = self.open_existing(&name, EntryAccess::QUERY | EntryAccess::STOP)?;

        if current_state(entry.as_ref()) == Some(ServiceRuntimeState::Stopped) {
            tracing::debug!(service = %name, "service already stopped");
            return Ok(Outcome::AlreadyInDesiredState);
        }
        self.stop_entry(&name, entry.as_ref(), timeout)
    }

    /// Returns the current state, or `None` if it cannot be determined.
    #[must_use]
    pub fn query_state(&self, name: &str) -> Option<ServiceRuntimeState> {
        match self.query_status(name) {
            Ok(status) => Some(status.state),
            Err(e) => {
                tracing::debug!(service = name, error = %e, "service state unavailable");
                None
            }
        }
    }

    /// Returns the current status.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] for an empty name
    /// - [`WardenError::NotFound`] if the entry does not exist
    /// - [`WardenError::Os`] with [`OsOperation::QueryStatus`]
    pub fn query_status(&self, name: &str) -> Result<ServiceStatus> {
        let name = ServiceName::parse(name)?;
        let entry = self.open_existing(&name, EntryAccess::QUERY)?;
        entry
            .query_status()
            .map_err(|e| WardenError::os(OsOperation::QueryStatus, e))
    }

    /// Returns true if the service is running.
    #[must_use]
    pub fn is_running(&self, name: &str) -> bool {
        self.query_state(name) == Some(ServiceRuntimeState::Running)
    }

    fn open_existing(&self, name: &ServiceName, access: EntryAccess) -> Result<Box<dyn ServiceEntry>> {
        self.backend.open(name.as_str(), access).map_err(|e| {
            if e == OsError::SERVICE_DOES_NOT_EXIST {
                WardenError::not_found(format!("service {name}"))
            } else {
                fail(name, OsOperation::OpenService, e)
            }
        })
    }

    fn stop_entry(
        &self,
        name: &ServiceName,
        entry: &dyn ServiceEntry,
        timeout: Duration,
    ) -> Result<Outcome> {
        let status = match entry.stop() {
            Ok(status) => status,
            Err(e) if e == OsError::SERVICE_NOT_ACTIVE => {
                tracing::debug!(service = %name, "service stopped before the control arrived");
                return Ok(Outcome::AlreadyInDesiredState);
            }
            Err(e) => return Err(fail(name, OsOperation::ControlStop, e)),
        };
        tracing::info!(service = %name, "service stop requested");

        if status.state == ServiceRuntimeState::Stopped {
            return Ok(Outcome::Applied);
        }
        if timeout.is_zero() {
            return Err(WardenError::Pending);
        }
        wait_for_state(entry, StateSet::STOPPED, timeout, &self.poll)?;
        tracing::info!(service = %name, "service stopped");
        Ok(Outcome::Applied)
    }
}

impl std::fmt::Debug for ServiceLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLifecycleController")
            .field("poll", &self.poll)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

fn current_state(entry: &dyn ServiceEntry) -> Option<ServiceRuntimeState> {
    entry.query_status().ok().map(|status| status.state)
}

fn fail(name: &ServiceName, op: OsOperation, e: OsError) -> WardenError {
    tracing::warn!(service = %name, op = %op, error = %e, "service operation failed");
    WardenError::os(op, e)
}
