//! Process configuration read from environment variables.
//!
//! # Invariants
//! - Empty values are treated as unset.
//! - Loading never touches the filesystem; paths are validated by the code
//!   that opens them.

use crate::logging::default_log_level;
use crate::service::read_source::StoreKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_SQLITE_PATH: &str = "TWINSTORE_SQLITE_PATH";
pub const ENV_DOCUMENT_PATH: &str = "TWINSTORE_DOCUMENT_PATH";
pub const ENV_PRIMARY: &str = "TWINSTORE_PRIMARY";
pub const ENV_LOG_LEVEL: &str = "TWINSTORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TWINSTORE_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} is not set"),
            Self::Invalid { key, value } => write!(f, "{key} has unsupported value `{value}`"),
        }
    }
}

impl Error for ConfigError {}

/// Settings needed to open both stores and start logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub sqlite_path: PathBuf,
    pub document_path: PathBuf,
    pub primary: StoreKind,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let sqlite_path = get(ENV_SQLITE_PATH).ok_or(ConfigError::Missing(ENV_SQLITE_PATH))?;
        let document_path =
            get(ENV_DOCUMENT_PATH).ok_or(ConfigError::Missing(ENV_DOCUMENT_PATH))?;
        let primary = match get(ENV_PRIMARY) {
            Some(value) => StoreKind::parse(&value).ok_or(ConfigError::Invalid {
                key: ENV_PRIMARY,
                value,
            })?,
            None => StoreKind::Relational,
        };

        Ok(Self {
            sqlite_path: PathBuf::from(sqlite_path),
            document_path: PathBuf::from(document_path),
            primary,
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(ENV_LOG_DIR),
        })
    }
}
