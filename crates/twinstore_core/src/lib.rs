//! Core of twinstore: customer and session records kept in step across a
//! relational store and a document store.
//!
//! Writes go through `DualStore`, which applies them to the primary store,
//! then the secondary, and compensates on the primary when the secondary
//! rejects a write. Reads go to whichever store the caller selects.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::customer::{Customer, CustomerPublic, Role};
pub use model::entity::{Entity, Timestamp};
pub use model::session::Session;
pub use repo::document_store::DocumentStore;
pub use repo::sql_record::SqlRecord;
pub use repo::sqlite_store::SqliteStore;
pub use repo::{RecordStore, StoreError, StoreResult};
pub use service::dual_store::{DualResult, DualStore, DualStoreError, Operation, Stage};
pub use service::read_source::{ReadPolicy, ReadSource, StoreKind};
pub use service::stores::StoreHandles;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
