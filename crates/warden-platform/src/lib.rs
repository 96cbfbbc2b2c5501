// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # warden-platform
//!
//! Native backends for `warden-core`.
//!
//! ## Platform Support
//!
//! | Platform | Token | Filters | Attach policy | Services |
//! |----------|-------|---------|---------------|----------|
//! | Windows  | `AdjustTokenPrivileges` | Filter Manager (`fltlib`) | `HKLM` `REG_MULTI_SZ` | Service Control Manager |
//! | Others   | no-op | `ERROR_NOT_SUPPORTED` | `ERROR_NOT_SUPPORTED` | `ERROR_NOT_SUPPORTED` |
//!
//! ```rust,ignore
//! use warden_core::FilterModuleController;
//!
//! let filters = FilterModuleController::new(
//!     warden_platform::filter_registry(),
//!     warden_platform::privilege_elevator(),
//! );
//! println!("{:?}", filters.enumerate()?);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, rust_2018_idioms)]

#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
mod unsupported;

#[cfg(windows)]
pub use windows::{
    FilterManager, NativeToken, ProcessToken, RegistryPolicyStore, ServiceControlManager,
    filter_registry, policy_store, privilege_elevator, service_backend,
};

#[cfg(not(windows))]
pub use unsupported::{
    Unsupported, filter_registry, policy_store, privilege_elevator, service_backend,
};
