//! Use-case services over the two stores.
//!
//! # Responsibility
//! - Coordinate writes across the relational and document stores.
//! - Route reads to the store chosen per call.
//! - Build per-record-type orchestrators from shared store handles.

pub mod dual_store;
pub mod read_source;
pub mod stores;
