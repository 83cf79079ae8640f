#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use twinstore_core::db::{open_db_in_memory, open_document_db_in_memory, share};
use twinstore_core::{
    Customer, DocumentStore, DualStore, Entity, RecordStore, SqliteStore, StoreError, StoreKind,
    StoreResult,
};

/// Driver operation, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Create,
    Get,
    GetOne,
    GetByEmail,
    Update,
    SoftDelete,
    HardDelete,
    AdminGet,
    AdminGetOne,
    AdminGetByEmail,
    AdminUpdate,
}

/// Wraps a real driver, records every call and fails the calls it is told to.
pub struct FlakyStore<T: Entity> {
    inner: Arc<dyn RecordStore<T>>,
    /// Calls to fail, with the number of calls of that kind still let through.
    failing: Mutex<HashMap<Call, usize>>,
    calls: Mutex<Vec<Call>>,
}

impl<T: Entity> FlakyStore<T> {
    pub fn new(inner: Arc<dyn RecordStore<T>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_on(&self, call: Call) {
        self.fail_after(call, 0);
    }

    /// Lets `passes` calls of this kind through, then fails every later one.
    pub fn fail_after(&self, call: Call, passes: usize) {
        self.failing.lock().insert(call, passes);
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Direct access to the wrapped driver, bypassing injection and counting.
    pub fn inner(&self) -> &dyn RecordStore<T> {
        self.inner.as_ref()
    }

    fn enter(&self, call: Call) -> StoreResult<()> {
        self.calls.lock().push(call);
        match self.failing.lock().get_mut(&call) {
            Some(0) => Err(StoreError::InvalidData(format!(
                "injected failure on {call:?}"
            ))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<T: Entity> RecordStore<T> for FlakyStore<T> {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    fn create(&self, entity: &T) -> StoreResult<()> {
        self.enter(Call::Create)?;
        self.inner.create(entity)
    }

    fn get(&self) -> StoreResult<Vec<T>> {
        self.enter(Call::Get)?;
        self.inner.get()
    }

    fn get_one(&self, id: &str) -> StoreResult<T> {
        self.enter(Call::GetOne)?;
        self.inner.get_one(id)
    }

    fn get_by_email(&self, email: &str) -> StoreResult<T> {
        self.enter(Call::GetByEmail)?;
        self.inner.get_by_email(email)
    }

    fn update(&self, id: &str, entity: &T) -> StoreResult<()> {
        self.enter(Call::Update)?;
        self.inner.update(id, entity)
    }

    fn soft_delete(&self, id: &str) -> StoreResult<()> {
        self.enter(Call::SoftDelete)?;
        self.inner.soft_delete(id)
    }

    fn hard_delete(&self, id: &str) -> StoreResult<()> {
        self.enter(Call::HardDelete)?;
        self.inner.hard_delete(id)
    }

    fn admin_get(&self) -> StoreResult<Vec<T>> {
        self.enter(Call::AdminGet)?;
        self.inner.admin_get()
    }

    fn admin_get_one(&self, id: &str) -> StoreResult<T> {
        self.enter(Call::AdminGetOne)?;
        self.inner.admin_get_one(id)
    }

    fn admin_get_by_email(&self, email: &str) -> StoreResult<T> {
        self.enter(Call::AdminGetByEmail)?;
        self.inner.admin_get_by_email(email)
    }

    fn admin_update(&self, id: &str, entity: &T) -> StoreResult<()> {
        self.enter(Call::AdminUpdate)?;
        self.inner.admin_update(id, entity)
    }
}

pub fn sqlite_customers() -> Arc<dyn RecordStore<Customer>> {
    let conn = share(open_db_in_memory().unwrap());
    Arc::new(SqliteStore::<Customer>::try_new(conn, "customers").unwrap())
}

pub fn document_customers() -> Arc<dyn RecordStore<Customer>> {
    let db = Arc::new(open_document_db_in_memory().unwrap());
    Arc::new(
        DocumentStore::<Customer>::try_new(db, "customers")
            .unwrap()
            .with_unique_field("email")
            .unwrap(),
    )
}

/// Both drivers wrapped for injection, ordered by the primary kind.
pub struct Harness {
    pub primary: Arc<FlakyStore<Customer>>,
    pub secondary: Arc<FlakyStore<Customer>>,
    pub dual: DualStore<Customer>,
}

impl Harness {
    /// Relational primary, document secondary.
    pub fn new() -> Self {
        Self::with_primary(StoreKind::Relational)
    }

    pub fn with_primary(kind: StoreKind) -> Self {
        let (primary, secondary) = match kind {
            StoreKind::Relational => (sqlite_customers(), document_customers()),
            StoreKind::Document => (document_customers(), sqlite_customers()),
        };
        let primary = FlakyStore::new(primary);
        let secondary = FlakyStore::new(secondary);
        let dual = DualStore::new(
            primary.clone() as Arc<dyn RecordStore<Customer>>,
            secondary.clone() as Arc<dyn RecordStore<Customer>>,
        );
        Self {
            primary,
            secondary,
            dual,
        }
    }

    /// Creates a customer in both stores through the orchestrator.
    pub fn seed(&self, name: &str, email: &str) -> Customer {
        let mut customer = Customer::new(name, email, "555-000-1234");
        self.dual.create(&mut customer).unwrap();
        self.primary.reset_calls();
        self.secondary.reset_calls();
        customer
    }
}
