// Persistence seam
//
// The core never owns a store. Services and the reconciliation engine receive
// a `CountRepository`; SQLite (`db::SqliteRepository`) and the in-memory
// implementation below are the two provided.

use crate::count::{CountRecord, CountType};
use crate::entities::DrawerSettings;
use crate::error::{CashError, Result};
use crate::reconciliation::select_baseline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// RECORD FILTER
// ============================================================================

/// Query for `list_records`. Empty filter = everything. Date bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub drawer_id: Option<String>,
    pub count_type: Option<CountType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RecordFilter {
    pub fn drawer(drawer_id: &str) -> Self {
        RecordFilter {
            drawer_id: Some(drawer_id.to_string()),
            ..Default::default()
        }
    }

    pub fn of_type(mut self, count_type: CountType) -> Self {
        self.count_type = Some(count_type);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn matches(&self, record: &CountRecord) -> bool {
        self.drawer_id.as_deref().map_or(true, |id| record.drawer_id == id)
            && self.count_type.map_or(true, |t| record.count_type == t)
            && self.from.map_or(true, |from| record.timestamp >= from)
            && self.to.map_or(true, |to| record.timestamp <= to)
    }
}

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

pub trait CountRepository {
    /// Persist a new record. Assigns `sequence`; rejects a repeated
    /// `submission_hash`.
    fn create_record(&self, record: CountRecord) -> Result<CountRecord>;

    fn get_record(&self, id: &str) -> Result<CountRecord>;

    /// Matching records, newest first (timestamp, then write order).
    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<CountRecord>>;

    /// Replace a stored record wholesale. Counts as a new write.
    fn update_record(&self, record: CountRecord) -> Result<CountRecord>;

    fn delete_record(&self, id: &str) -> Result<()>;

    /// Most recent opening of `drawer_id` at or before `at`; ties go to the
    /// latest write.
    fn latest_opening_at_or_before(
        &self,
        drawer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CountRecord>>;

    fn get_drawer_settings(&self, drawer_id: &str) -> Result<DrawerSettings>;

    fn save_drawer_settings(&self, settings: &DrawerSettings) -> Result<()>;

    fn list_drawers(&self) -> Result<Vec<DrawerSettings>>;
}

/// Newest first: timestamp descending, later write first on ties.
pub fn sort_newest_first(records: &mut [CountRecord]) {
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then(b.sequence.cmp(&a.sequence))
    });
}

// ============================================================================
// IN-MEMORY REPOSITORY
// ============================================================================

#[derive(Debug, Default)]
struct Store {
    records: Vec<CountRecord>,
    drawers: BTreeMap<String, DrawerSettings>,
    last_sequence: u64,
}

impl Store {
    fn next_sequence(&mut self) -> u64 {
        self.last_sequence += 1;
        self.last_sequence
    }

    fn hash_taken(&self, hash: &str, except_id: Option<&str>) -> bool {
        self.records
            .iter()
            .any(|r| r.submission_hash == hash && Some(r.id.as_str()) != except_id)
    }
}

/// Process-local repository for tests and embedding. Cloning shares the
/// same store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CountRepository for InMemoryRepository {
    fn create_record(&self, mut record: CountRecord) -> Result<CountRecord> {
        let mut store = self.write();
        if store.hash_taken(&record.submission_hash, None) {
            return Err(CashError::DuplicateSubmission {
                drawer_id: record.drawer_id,
                hash: record.submission_hash,
            });
        }
        record.sequence = store.next_sequence();
        store.records.push(record.clone());
        Ok(record)
    }

    fn get_record(&self, id: &str) -> Result<CountRecord> {
        self.read()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| CashError::record_not_found(id))
    }

    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<CountRecord>> {
        let mut records: Vec<CountRecord> = self
            .read()
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    fn update_record(&self, mut record: CountRecord) -> Result<CountRecord> {
        let mut store = self.write();
        let position = store
            .records
            .iter()
            .position(|r| r.id == record.id)
            .ok_or_else(|| CashError::record_not_found(&record.id))?;
        if store.hash_taken(&record.submission_hash, Some(record.id.as_str())) {
            return Err(CashError::DuplicateSubmission {
                drawer_id: record.drawer_id,
                hash: record.submission_hash,
            });
        }
        record.sequence = store.next_sequence();
        store.records[position] = record.clone();
        Ok(record)
    }

    fn delete_record(&self, id: &str) -> Result<()> {
        let mut store = self.write();
        let before = store.records.len();
        store.records.retain(|r| r.id != id);
        if store.records.len() == before {
            return Err(CashError::record_not_found(id));
        }
        Ok(())
    }

    fn latest_opening_at_or_before(
        &self,
        drawer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CountRecord>> {
        let store = self.read();
        Ok(select_baseline(drawer_id, at, &store.records).cloned())
    }

    fn get_drawer_settings(&self, drawer_id: &str) -> Result<DrawerSettings> {
        self.read()
            .drawers
            .get(drawer_id)
            .cloned()
            .ok_or_else(|| CashError::drawer_not_found(drawer_id))
    }

    fn save_drawer_settings(&self, settings: &DrawerSettings) -> Result<()> {
        self.write()
            .drawers
            .insert(settings.id.clone(), settings.clone());
        Ok(())
    }

    fn list_drawers(&self) -> Result<Vec<DrawerSettings>> {
        Ok(self.read().drawers.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::CountSubmission;
    use crate::denominations::{Denomination, DenominationCount};
    use crate::entities::TargetProfile;
    use chrono::TimeZone;

    fn record(drawer: &str, count_type: CountType, hour: u32, ones: u32) -> CountRecord {
        let submission = CountSubmission::new(
            drawer,
            count_type,
            DenominationCount::ZERO.with(Denomination::Ones, ones),
        )
        .at(Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap());
        CountRecord::from_submission(&submission, &TargetProfile::default()).unwrap()
    }

    #[test]
    fn test_create_assigns_increasing_sequence() {
        let repo = InMemoryRepository::new();
        let a = repo.create_record(record("front", CountType::Opening, 9, 10)).unwrap();
        let b = repo.create_record(record("front", CountType::Closing, 18, 12)).unwrap();
        assert!(b.sequence > a.sequence);
        assert_eq!(repo.get_record(&a.id).unwrap(), a);
    }

    #[test]
    fn test_duplicate_submission_rejected() {
        let repo = InMemoryRepository::new();
        let first = record("front", CountType::Opening, 9, 10);
        let mut again = first.clone();
        again.id = "other".to_string();

        repo.create_record(first).unwrap();
        let err = repo.create_record(again).unwrap_err();
        assert!(matches!(err, CashError::DuplicateSubmission { .. }));
    }

    #[test]
    fn test_list_filters_and_orders_newest_first() {
        let repo = InMemoryRepository::new();
        repo.create_record(record("front", CountType::Opening, 9, 10)).unwrap();
        repo.create_record(record("front", CountType::Closing, 18, 12)).unwrap();
        repo.create_record(record("back", CountType::Opening, 10, 5)).unwrap();

        let front = repo.list_records(&RecordFilter::drawer("front")).unwrap();
        assert_eq!(front.len(), 2);
        assert_eq!(front[0].count_type, CountType::Closing);

        let openings = repo
            .list_records(&RecordFilter::default().of_type(CountType::Opening))
            .unwrap();
        assert_eq!(openings.len(), 2);
        assert_eq!(openings[0].drawer_id, "back");

        let morning = repo
            .list_records(&RecordFilter::drawer("front").between(
                None,
                Some(Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()),
            ))
            .unwrap();
        assert_eq!(morning.len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let repo = InMemoryRepository::new();
        let stored = repo.create_record(record("front", CountType::Opening, 9, 10)).unwrap();

        let mut replacement = stored.clone();
        replacement.submitted_by = "corrected".to_string();
        let updated = repo.update_record(replacement).unwrap();
        assert!(updated.sequence > stored.sequence);
        assert_eq!(repo.get_record(&stored.id).unwrap().submitted_by, "corrected");

        repo.delete_record(&stored.id).unwrap();
        assert!(repo.get_record(&stored.id).unwrap_err().is_not_found());
        assert!(repo.delete_record(&stored.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_drawer_settings_round_trip() {
        let repo = InMemoryRepository::new();
        assert!(repo.get_drawer_settings("front").unwrap_err().is_not_found());

        let drawer = DrawerSettings::new("front", "Front Counter", TargetProfile::default());
        repo.save_drawer_settings(&drawer).unwrap();
        assert_eq!(repo.get_drawer_settings("front").unwrap(), drawer);
        assert_eq!(repo.list_drawers().unwrap().len(), 1);
    }
}
