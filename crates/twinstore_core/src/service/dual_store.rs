//! Dual-store orchestrator.
//!
//! # Responsibility
//! - Apply every logical write to the primary store, then the secondary.
//! - Undo the primary's committed effect when the secondary rejects a write.
//! - Route reads to exactly one store chosen by the caller.
//!
//! # Invariants
//! - The `(primary, secondary)` order is fixed at construction.
//! - A primary failure never reaches the secondary.
//! - A secondary write failure always triggers compensation on the primary;
//!   a failed compensation is reported as `RollbackFailure`, never dropped.
//! - Update and admin update keep the stored delete marker, so neither
//!   changes the logical state (live or soft-deleted) of a record.
//!
//! # Concurrency
//! Calls are not serialized per record id. Two concurrent writes to the same
//! id can land in opposite orders on the two stores, leaving each store with
//! a different (whole) value. Callers that need a single winner must
//! serialize writes per id themselves.

use crate::model::entity::{new_id, Entity};
use crate::repo::{RecordStore, StoreError, StoreResult};
use crate::service::read_source::ReadSource;
use log::{debug, error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type DualResult<T> = Result<T, DualStoreError>;

/// Orchestrator operation, carried by every error for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    SoftDelete,
    HardDelete,
    AdminUpdate,
    Get,
    GetOne,
    GetByEmail,
    AdminGet,
    AdminGetOne,
    AdminGetByEmail,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::SoftDelete => "soft_delete",
            Self::HardDelete => "hard_delete",
            Self::AdminUpdate => "admin_update",
            Self::Get => "get",
            Self::GetOne => "get_one",
            Self::GetByEmail => "get_by_email",
            Self::AdminGet => "admin_get",
            Self::AdminGetOne => "admin_get_one",
            Self::AdminGetByEmail => "admin_get_by_email",
        }
    }
}

/// Step of an orchestrator call at which a store error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrimaryRead,
    PrimaryWrite,
    SecondaryRead,
    SecondaryWrite,
    CompensationRead,
    CompensationWrite,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrimaryRead => "primary-read",
            Self::PrimaryWrite => "primary-write",
            Self::SecondaryRead => "secondary-read",
            Self::SecondaryWrite => "secondary-write",
            Self::CompensationRead => "compensation-read",
            Self::CompensationWrite => "compensation-write",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator error taxonomy.
#[derive(Debug)]
pub enum DualStoreError {
    /// The targeted store has no matching record. Nothing was mutated.
    NotFound {
        operation: Operation,
        stage: Stage,
        source: StoreError,
    },
    /// The primary rejected the call; the secondary was not touched.
    PrimaryFailure {
        operation: Operation,
        stage: Stage,
        source: StoreError,
    },
    /// The secondary rejected the call. For writes, the primary has been
    /// restored to its pre-call state.
    SecondaryFailure {
        operation: Operation,
        stage: Stage,
        source: StoreError,
    },
    /// The secondary rejected a write and undoing it on the primary failed
    /// too. The stores now disagree and need reconciliation.
    RollbackFailure {
        operation: Operation,
        secondary: StoreError,
        stage: Stage,
        compensation: StoreError,
    },
}

impl DualStoreError {
    pub fn operation(&self) -> Operation {
        match self {
            Self::NotFound { operation, .. }
            | Self::PrimaryFailure { operation, .. }
            | Self::SecondaryFailure { operation, .. }
            | Self::RollbackFailure { operation, .. } => *operation,
        }
    }

    /// Stage of the last failing step.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NotFound { stage, .. }
            | Self::PrimaryFailure { stage, .. }
            | Self::SecondaryFailure { stage, .. }
            | Self::RollbackFailure { stage, .. } => *stage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true when primary and secondary may now hold different states.
    pub fn is_divergent(&self) -> bool {
        matches!(self, Self::RollbackFailure { .. })
    }
}

impl Display for DualStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                operation,
                stage,
                source,
            } => write!(f, "{} failed at {stage}: {source}", operation.as_str()),
            Self::PrimaryFailure {
                operation,
                stage,
                source,
            } => write!(
                f,
                "{} rejected by primary store at {stage}: {source}",
                operation.as_str()
            ),
            Self::SecondaryFailure {
                operation,
                stage,
                source,
            } => write!(
                f,
                "{} rejected by secondary store at {stage}: {source}",
                operation.as_str()
            ),
            Self::RollbackFailure {
                operation,
                secondary,
                stage,
                compensation,
            } => write!(
                f,
                "{} left stores divergent: secondary failed ({secondary}) and rollback failed at {stage}: {compensation}",
                operation.as_str()
            ),
        }
    }
}

impl Error for DualStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound { source, .. }
            | Self::PrimaryFailure { source, .. }
            | Self::SecondaryFailure { source, .. } => Some(source),
            Self::RollbackFailure { compensation, .. } => Some(compensation),
        }
    }
}

type CompensationResult = Result<(), (Stage, StoreError)>;

/// Keeps one record type in step across a primary and a secondary store.
pub struct DualStore<T: Entity> {
    primary: Arc<dyn RecordStore<T>>,
    secondary: Arc<dyn RecordStore<T>>,
}

impl<T: Entity> Clone for DualStore<T> {
    fn clone(&self) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            secondary: Arc::clone(&self.secondary),
        }
    }
}

impl<T: Entity> DualStore<T> {
    pub fn new(primary: Arc<dyn RecordStore<T>>, secondary: Arc<dyn RecordStore<T>>) -> Self {
        Self { primary, secondary }
    }

    /// Inserts a record into both stores, assigning an id first if unset.
    ///
    /// On secondary failure the primary insert is hard-deleted again.
    pub fn create(&self, entity: &mut T) -> DualResult<()> {
        if entity.id().is_empty() {
            entity.set_id(new_id());
        }
        let id = entity.id().to_string();
        debug!(
            "event=dual_write module=service op=create collection={} id={id} status=start",
            self.primary.collection()
        );

        self.primary
            .create(entity)
            .map_err(|err| primary_error(Operation::Create, Stage::PrimaryWrite, err))?;

        let entity: &T = entity;
        self.mirror(
            Operation::Create,
            &id,
            |secondary| secondary.create(entity),
            |primary| {
                primary
                    .hard_delete(&id)
                    .map_err(|err| (Stage::CompensationWrite, err))
            },
        )
    }

    /// Replaces the fields of a live record in both stores.
    ///
    /// On secondary failure the primary gets its previous values back.
    pub fn update(&self, id: &str, mut entity: T) -> DualResult<()> {
        let original = self
            .primary
            .get_one(id)
            .map_err(|err| primary_error(Operation::Update, Stage::PrimaryRead, err))?;
        entity.set_id(id.to_string());
        entity.set_deleted(original.deleted_at());

        self.primary
            .update(id, &entity)
            .map_err(|err| primary_error(Operation::Update, Stage::PrimaryWrite, err))?;

        self.mirror(
            Operation::Update,
            id,
            |secondary| secondary.update(id, &entity),
            |primary| {
                primary
                    .update(id, &original)
                    .map_err(|err| (Stage::CompensationWrite, err))
            },
        )
    }

    /// Marks a live record deleted in both stores.
    ///
    /// On secondary failure the primary's marker is cleared again.
    pub fn soft_delete(&self, id: &str) -> DualResult<()> {
        self.primary
            .soft_delete(id)
            .map_err(|err| primary_error(Operation::SoftDelete, Stage::PrimaryWrite, err))?;

        self.mirror(
            Operation::SoftDelete,
            id,
            |secondary| secondary.soft_delete(id),
            |primary| {
                let mut record = primary
                    .admin_get_one(id)
                    .map_err(|err| (Stage::CompensationRead, err))?;
                record.set_deleted(None);
                primary
                    .admin_update(id, &record)
                    .map_err(|err| (Stage::CompensationWrite, err))
            },
        )
    }

    /// Physically removes a record, live or soft-deleted, from both stores.
    ///
    /// On secondary failure the exact pre-delete record is recreated on the
    /// primary.
    pub fn hard_delete(&self, id: &str) -> DualResult<()> {
        let original = self
            .primary
            .admin_get_one(id)
            .map_err(|err| primary_error(Operation::HardDelete, Stage::PrimaryRead, err))?;

        self.primary
            .hard_delete(id)
            .map_err(|err| primary_error(Operation::HardDelete, Stage::PrimaryWrite, err))?;

        self.mirror(
            Operation::HardDelete,
            id,
            |secondary| secondary.hard_delete(id),
            |primary| {
                primary
                    .create(&original)
                    .map_err(|err| (Stage::CompensationWrite, err))
            },
        )
    }

    /// Replaces the fields of a record regardless of its delete marker.
    pub fn admin_update(&self, id: &str, mut entity: T) -> DualResult<()> {
        let original = self
            .primary
            .admin_get_one(id)
            .map_err(|err| primary_error(Operation::AdminUpdate, Stage::PrimaryRead, err))?;
        entity.set_id(id.to_string());
        entity.set_deleted(original.deleted_at());

        self.primary
            .admin_update(id, &entity)
            .map_err(|err| primary_error(Operation::AdminUpdate, Stage::PrimaryWrite, err))?;

        self.mirror(
            Operation::AdminUpdate,
            id,
            |secondary| secondary.admin_update(id, &entity),
            |primary| {
                primary
                    .admin_update(id, &original)
                    .map_err(|err| (Stage::CompensationWrite, err))
            },
        )
    }

    pub fn get(&self, source: ReadSource) -> DualResult<Vec<T>> {
        let (store, stage) = self.route(source);
        store
            .get()
            .map_err(|err| read_error(Operation::Get, stage, err))
    }

    pub fn get_one(&self, id: &str, source: ReadSource) -> DualResult<T> {
        let (store, stage) = self.route(source);
        store
            .get_one(id)
            .map_err(|err| read_error(Operation::GetOne, stage, err))
    }

    pub fn get_by_email(&self, email: &str, source: ReadSource) -> DualResult<T> {
        let (store, stage) = self.route(source);
        store
            .get_by_email(email)
            .map_err(|err| read_error(Operation::GetByEmail, stage, err))
    }

    pub fn admin_get(&self, source: ReadSource) -> DualResult<Vec<T>> {
        let (store, stage) = self.route(source);
        store
            .admin_get()
            .map_err(|err| read_error(Operation::AdminGet, stage, err))
    }

    pub fn admin_get_one(&self, id: &str, source: ReadSource) -> DualResult<T> {
        let (store, stage) = self.route(source);
        store
            .admin_get_one(id)
            .map_err(|err| read_error(Operation::AdminGetOne, stage, err))
    }

    pub fn admin_get_by_email(&self, email: &str, source: ReadSource) -> DualResult<T> {
        let (store, stage) = self.route(source);
        store
            .admin_get_by_email(email)
            .map_err(|err| read_error(Operation::AdminGetByEmail, stage, err))
    }

    fn route(&self, source: ReadSource) -> (&dyn RecordStore<T>, Stage) {
        match source {
            ReadSource::Primary => (self.primary.as_ref(), Stage::PrimaryRead),
            ReadSource::Secondary => (self.secondary.as_ref(), Stage::SecondaryRead),
        }
    }

    /// Applies an already-committed primary write to the secondary and
    /// compensates on the primary if the secondary rejects it.
    fn mirror(
        &self,
        operation: Operation,
        id: &str,
        write: impl FnOnce(&dyn RecordStore<T>) -> StoreResult<()>,
        compensate: impl FnOnce(&dyn RecordStore<T>) -> CompensationResult,
    ) -> DualResult<()> {
        let collection = self.primary.collection();
        let secondary_error = match write(self.secondary.as_ref()) {
            Ok(()) => {
                debug!(
                    "event=dual_write module=service op={} collection={collection} id={id} status=ok",
                    operation.as_str()
                );
                return Ok(());
            }
            Err(err) => err,
        };

        warn!(
            "event=secondary_write module=service op={} collection={collection} id={id} status=error error={secondary_error}",
            operation.as_str()
        );

        match compensate(self.primary.as_ref()) {
            Ok(()) => {
                warn!(
                    "event=compensation module=service op={} collection={collection} id={id} status=ok",
                    operation.as_str()
                );
                Err(DualStoreError::SecondaryFailure {
                    operation,
                    stage: Stage::SecondaryWrite,
                    source: secondary_error,
                })
            }
            Err((stage, compensation_error)) => {
                error!(
                    "event=compensation module=service op={} collection={collection} id={id} status=divergent stage={stage} error={compensation_error}",
                    operation.as_str()
                );
                Err(DualStoreError::RollbackFailure {
                    operation,
                    secondary: secondary_error,
                    stage,
                    compensation: compensation_error,
                })
            }
        }
    }
}

fn primary_error(operation: Operation, stage: Stage, source: StoreError) -> DualStoreError {
    if source.is_not_found() {
        DualStoreError::NotFound {
            operation,
            stage,
            source,
        }
    } else {
        DualStoreError::PrimaryFailure {
            operation,
            stage,
            source,
        }
    }
}

fn read_error(operation: Operation, stage: Stage, source: StoreError) -> DualStoreError {
    if source.is_not_found() {
        DualStoreError::NotFound {
            operation,
            stage,
            source,
        }
    } else if stage == Stage::SecondaryRead {
        DualStoreError::SecondaryFailure {
            operation,
            stage,
            source,
        }
    } else {
        DualStoreError::PrimaryFailure {
            operation,
            stage,
            source,
        }
    }
}
