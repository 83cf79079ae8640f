//! Read routing inputs for the dual-store orchestrator.
//!
//! The orchestrator only consumes a resolved `ReadSource`; turning a
//! caller-supplied hint (for example a `storage` query parameter) into one is
//! the job of `ReadPolicy`.

use std::fmt::{Display, Formatter};

/// Which store answers a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReadSource {
    #[default]
    Primary,
    Secondary,
}

/// Concrete backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Relational,
    Document,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Document => "document",
        }
    }

    /// Parses a backend name. Accepts generic and product-style aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relational" | "sql" | "sqlite" | "postgres" => Some(Self::Relational),
            "document" | "doc" | "mongo" | "mongodb" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Relational => Self::Document,
            Self::Document => Self::Relational,
        }
    }
}

impl Display for StoreKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps per-request hints onto a `ReadSource` for a given store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    primary: StoreKind,
}

impl ReadPolicy {
    pub fn new(primary: StoreKind) -> Self {
        Self { primary }
    }

    pub fn primary(&self) -> StoreKind {
        self.primary
    }

    pub fn secondary(&self) -> StoreKind {
        self.primary.other()
    }

    /// Resolves a hint. `secondary` or a name of the secondary backend reads
    /// from the secondary; everything else, including no hint, reads from
    /// the primary.
    pub fn resolve(&self, hint: Option<&str>) -> ReadSource {
        let Some(hint) = hint.map(str::trim).filter(|hint| !hint.is_empty()) else {
            return ReadSource::Primary;
        };
        if hint.eq_ignore_ascii_case("secondary") {
            return ReadSource::Secondary;
        }
        match StoreKind::parse(hint) {
            Some(kind) if kind == self.secondary() => ReadSource::Secondary,
            _ => ReadSource::Primary,
        }
    }
}
