//! Local directories backing dispatch and shutdown.
//!
//! # Data Flow
//! ```text
//! startup:   put(service) → ServiceDirectory + RegistrationCache
//! steady:    network server → DirectoryLookup::lookup (concurrent reads)
//! shutdown:  RegistrationCache::entries() → remove from both
//! ```
//!
//! # Design Decisions
//! - Both tables are `DashMap`s owned by the controller, not globals
//! - A `put` is visible to dispatch as soon as it returns
//! - No transaction spans the two tables

pub mod registrations;
pub mod services;

pub use registrations::RegistrationCache;
pub use services::{DirectoryEntry, DirectoryLookup, LookupError, ServiceDirectory};
