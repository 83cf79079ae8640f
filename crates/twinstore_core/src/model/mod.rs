//! Record types stored by both backends.
//!
//! # Responsibility
//! - Define the capability contract every stored record must satisfy.
//! - Define the concrete customer and session records.
//!
//! # Invariants
//! - Every record is identified by an opaque string id that never changes
//!   after creation.
//! - Deletion is a `deleted_at` marker first; physical removal is an explicit
//!   admin operation.

pub mod customer;
pub mod entity;
pub mod session;
