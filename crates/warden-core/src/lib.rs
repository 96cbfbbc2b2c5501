// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # warden-core
//!
//! Supervision primitives for the OS components a virtual filesystem relies
//! on: a kernel filter module and a user-mode background service.
//!
//! - [`FilterModuleController`] loads, unloads and enumerates filter modules
//! - [`AttachPolicyManager`] edits the Dev Drive attach opt-out list
//! - [`ServiceLifecycleController`] installs, starts, stops, uninstalls and
//!   queries a service with bounded waits
//! - [`PrivilegeElevator`] enables the privileges filter control needs
//!
//! Controllers talk to the OS only through the traits in [`backend`]. Native
//! implementations are provided by `warden-platform`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_core::{FilterModuleController, Outcome};
//!
//! let filters = FilterModuleController::new(registry, elevator);
//! match filters.load("P4vfsFlt")? {
//!     Outcome::Applied => println!("loaded"),
//!     Outcome::AlreadyInDesiredState => println!("already loaded"),
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod policy;
pub mod privilege;
pub mod record;
pub mod service;
#[cfg(test)]
pub mod tests;
pub mod types;
pub mod wait;

pub use backend::{
    EntryAccess, FilterFind, FilterRegistry, PolicyStore, ServiceBackend, ServiceEntry, StoredList,
    TokenBackend,
};
pub use config::{
    AttachPolicyLocation, FilterConfig, LoggingConfig, PollPolicy, ServiceConfig, WardenConfig,
};
pub use error::{OsError, OsOperation, OsResult, PrivilegeError, Result, WardenError};
pub use filter::FilterModuleController;
pub use policy::AttachPolicyManager;
pub use privilege::{PreElevated, Privilege, PrivilegeElevator, TokenElevator};
pub use record::{FilterRecord, decode_page};
pub use service::ServiceLifecycleController;
pub use types::{
    FailureRecoveryPolicy, FilterModuleName, Outcome, ServiceDescriptor, ServiceName,
    ServiceRuntimeState, ServiceStatus, StateSet, names_equal,
};
pub use wait::wait_for_state;
