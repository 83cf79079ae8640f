//! Customer record.
//!
//! # Invariants
//! - `email` is unique across live and soft-deleted customers in both stores.
//! - `hashed_password` holds an already-hashed credential; hashing happens
//!   outside core.
//! - Timestamps carry millisecond precision.

use crate::model::entity::{new_id, now, Entity, Timestamp};
use serde::{Deserialize, Serialize};

/// Access role of a customer account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Customer account as persisted in both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "password")]
    pub hashed_password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: Timestamp,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: Timestamp,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub deleted_at: Option<Timestamp>,
}

impl Customer {
    /// Creates a live customer with a generated id and role `user`.
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        let created_at = now();
        Self {
            id: new_id(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            hashed_password: String::new(),
            role: Role::User,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Builder-style setter for the stored credential hash.
    pub fn with_hashed_password(mut self, hashed_password: impl Into<String>) -> Self {
        self.hashed_password = hashed_password.into();
        self
    }

    /// Projection that is safe to hand to clients.
    pub fn to_public(&self) -> CustomerPublic {
        CustomerPublic {
            name: self.name.clone(),
            email: mask(&self.email),
            phone: mask(&self.phone),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Entity for Customer {
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

/// Client-facing customer view: no id, no delete marker, masked contact data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerPublic {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}...{tail}")
}
