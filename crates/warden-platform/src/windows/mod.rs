//! Windows backends.

mod filter;
mod registry;
mod scm;
mod token;

use std::sync::Arc;

use warden_core::{
    AttachPolicyLocation, FilterRegistry, PolicyStore, PrivilegeElevator, ServiceBackend,
    TokenElevator,
};

pub use filter::FilterManager;
pub use registry::RegistryPolicyStore;
pub use scm::ServiceControlManager;
pub use token::{NativeToken, ProcessToken};

/// Elevator adjusting the current process token.
#[must_use]
pub fn privilege_elevator() -> Arc<dyn PrivilegeElevator> {
    Arc::new(TokenElevator::new(NativeToken))
}

/// The system Filter Manager.
#[must_use]
pub fn filter_registry() -> Arc<dyn FilterRegistry> {
    Arc::new(FilterManager)
}

/// Registry-backed attach opt-out list at `location`.
#[must_use]
pub fn policy_store(location: &AttachPolicyLocation) -> Arc<dyn PolicyStore> {
    Arc::new(RegistryPolicyStore::new(location.clone()))
}

/// The local Service Control Manager.
#[must_use]
pub fn service_backend() -> Arc<dyn ServiceBackend> {
    Arc::new(ServiceControlManager)
}
