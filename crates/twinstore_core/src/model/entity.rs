//! Entity capability contract.
//!
//! The dual-store orchestrator only touches records through this trait, so a
//! record type that cannot expose identity or a soft-delete marker does not
//! compile against it.

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// Point in time used for record timestamps and the soft-delete marker.
pub type Timestamp = DateTime<Utc>;

/// Identity and soft-delete capabilities required from every stored record.
pub trait Entity {
    /// Returns the record id. Empty means "not assigned yet".
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    /// Returns the soft-delete marker. `None` means the record is live.
    fn deleted_at(&self) -> Option<Timestamp>;
    fn set_deleted(&mut self, deleted_at: Option<Timestamp>);

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

/// Generates a fresh record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time truncated to milliseconds.
///
/// Both stores persist timestamps as epoch milliseconds; truncating up front
/// keeps a value equal to itself after a round trip through either store.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::{new_id, now};
    use chrono::Timelike;

    #[test]
    fn new_ids_are_unique_uuids() {
        let first = new_id();
        let second = new_id();
        assert_ne!(first, second);
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn now_has_millisecond_precision() {
        assert_eq!(now().nanosecond() % 1_000_000, 0);
    }
}
