//! Backends for platforms without a Filter Manager or Service Control
//! Manager.
//!
//! Every OS request fails with `ERROR_NOT_SUPPORTED`. Privilege elevation is
//! a no-op.

use std::sync::Arc;

use warden_core::{
    AttachPolicyLocation, EntryAccess, FilterFind, FilterRegistry, OsError, OsResult, PolicyStore,
    PreElevated, PrivilegeElevator, ServiceBackend, ServiceDescriptor, ServiceEntry, StoredList,
};

/// Backend that rejects every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl FilterRegistry for Unsupported {
    fn load(&self, _name: &str) -> OsResult<()> {
        Err(OsError::NOT_SUPPORTED)
    }

    fn unload(&self, _name: &str) -> OsResult<()> {
        Err(OsError::NOT_SUPPORTED)
    }

    fn find(&self) -> OsResult<Box<dyn FilterFind + '_>> {
        Err(OsError::NOT_SUPPORTED)
    }
}

impl PolicyStore for Unsupported {
    fn read(&self) -> OsResult<StoredList> {
        Err(OsError::NOT_SUPPORTED)
    }

    fn write(&self, _entries: &[String]) -> OsResult<()> {
        Err(OsError::NOT_SUPPORTED)
    }
}

impl ServiceBackend for Unsupported {
    fn create(&self, _descriptor: &ServiceDescriptor) -> OsResult<Box<dyn ServiceEntry>> {
        Err(OsError::NOT_SUPPORTED)
    }

    fn open(&self, _name: &str, _access: EntryAccess) -> OsResult<Box<dyn ServiceEntry>> {
        Err(OsError::NOT_SUPPORTED)
    }
}

/// No-op elevator.
#[must_use]
pub fn privilege_elevator() -> Arc<dyn PrivilegeElevator> {
    Arc::new(PreElevated)
}

/// Filter registry that rejects every request.
#[must_use]
pub fn filter_registry() -> Arc<dyn FilterRegistry> {
    Arc::new(Unsupported)
}

/// Policy store that rejects every request.
#[must_use]
pub fn policy_store(_location: &AttachPolicyLocation) -> Arc<dyn PolicyStore> {
    Arc::new(Unsupported)
}

/// Service backend that rejects every request.
#[must_use]
pub fn service_backend() -> Arc<dyn ServiceBackend> {
    Arc::new(Unsupported)
}
