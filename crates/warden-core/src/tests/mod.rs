//! Scenario tests against deterministic fake backends.
//!
//! | Module | Covers |
//! |--------|--------|
//! | `filter` | load, unload, is-loaded, enumeration paging |
//! | `policy` | attach opt-out list toggling and persistence |
//! | `service` | install, start, stop, uninstall, bounded waits |
//! | `privilege` | elevation failures gating filter control |

pub mod filter;
pub mod service;

pub use mocks::{
    CountingElevator, FakeFilterRegistry, FakeServiceBackend, MemoryPolicyStore, ServiceCall,
};
