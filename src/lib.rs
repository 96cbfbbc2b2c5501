// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Warden: filter-module and service supervision for virtual filesystem
//! deployments.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use warden::prelude::*;
//!
//! let config = WardenConfig::default();
//! warden::init_logging(&config.logging)?;
//!
//! let warden = Warden::native(&config)?;
//! warden.filters().load("P4vfsFlt")?;
//! warden.services().start("P4VFS.Service", Duration::from_secs(30))?;
//! # Ok::<(), warden::core::WardenError>(())
//! ```

#![warn(missing_docs)]

mod logging;

use std::sync::Arc;

pub use warden_core as core;
pub use warden_platform as platform;

pub use logging::{env_filter, init_logging};

use warden_core::{
    AttachPolicyManager, FilterModuleController, FilterRegistry, PolicyStore, PrivilegeElevator,
    Result, ServiceBackend, ServiceLifecycleController, WardenConfig,
};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::Warden;
    pub use warden_core::{
        AttachPolicyManager, FilterModuleController, Outcome, ServiceDescriptor,
        ServiceLifecycleController, ServiceRuntimeState, WardenConfig, WardenError,
    };
}

/// The four supervisors wired to one set of backends.
#[derive(Debug)]
pub struct Warden {
    filters: FilterModuleController,
    attach_policy: AttachPolicyManager,
    services: ServiceLifecycleController,
}

impl Warden {
    /// Wires controllers to the given backends using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Config`](warden_core::WardenError::Config) if
    /// `config` is invalid.
    pub fn with_backends(
        config: &WardenConfig,
        registry: Arc<dyn FilterRegistry>,
        elevator: Arc<dyn PrivilegeElevator>,
        store: Arc<dyn PolicyStore>,
        services: Arc<dyn ServiceBackend>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filters: FilterModuleController::new(registry, elevator)
                .with_page_size(config.filter.page_size),
            attach_policy: AttachPolicyManager::new(store),
            services: ServiceLifecycleController::new(services)
                .with_poll_policy(config.poll)
                .with_default_timeout(config.service.timeout),
        })
    }

    /// Wires controllers to this platform's native backends.
    ///
    /// # Errors
    ///
    /// Returns [`WardenError::Config`](warden_core::WardenError::Config) if
    /// `config` is invalid.
    pub fn native(config: &WardenConfig) -> Result<Self> {
        Self::with_backends(
            config,
            warden_platform::filter_registry(),
            warden_platform::privilege_elevator(),
            warden_platform::policy_store(&config.attach_policy),
            warden_platform::service_backend(),
        )
    }

    /// Filter module control.
    #[must_use]
    pub const fn filters(&self) -> &FilterModuleController {
        &self.filters
    }

    /// Dev Drive attach opt-out list.
    #[must_use]
    pub const fn attach_policy(&self) -> &AttachPolicyManager {
        &self.attach_policy
    }

    /// Service lifecycle control.
    #[must_use]
    pub const fn services(&self) -> &ServiceLifecycleController {
        &self.services
    }
}
