//! Session record.
//!
//! Sessions are keyed by an opaque token issued outside core. A session is
//! valid while it is live and `ttl` lies in the future.

use crate::model::entity::{new_id, now, Entity, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Lifetime of a freshly issued session.
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub customer_id: String,
    pub email: String,
    pub token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ttl: Timestamp,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub deleted_at: Option<Timestamp>,
}

impl Session {
    pub fn new(
        customer_id: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            customer_id: customer_id.into(),
            email: email.into(),
            token: token.into(),
            ttl: now() + Duration::days(SESSION_TTL_DAYS),
            deleted_at: None,
        }
    }

    pub fn is_expired(&self, at: Timestamp) -> bool {
        self.ttl <= at
    }
}

impl Entity for Session {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }

    fn set_deleted(&mut self, deleted_at: Option<Timestamp>) {
        self.deleted_at = deleted_at;
    }
}
