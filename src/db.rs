use crate::count::{CountRecord, CountType};
use crate::denominations::DenominationCount;
use crate::entities::{DrawerSettings, TargetProfile};
use crate::error::{CashError, Result};
use crate::money::Money;
use crate::repository::{CountRepository, RecordFilter};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Event for audit trail: every write to a drawer or count record
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Fixed-width UTC text (microseconds, `Z`): lexical order == time order,
/// which the baseline index relies on.
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS drawers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            target TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            show_details INTEGER NOT NULL DEFAULT 0,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Derived columns (cash_out, totals) are written once per create/replace
    // and never recomputed on read.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS count_records (
            id TEXT PRIMARY KEY,
            drawer_id TEXT NOT NULL,
            count_type TEXT NOT NULL CHECK (count_type IN ('opening', 'closing')),
            denominations TEXT NOT NULL,
            cash_out TEXT NOT NULL,
            total_cash INTEGER NOT NULL,
            total_for_deposit INTEGER NOT NULL,
            sms_cash INTEGER,
            timestamp TEXT NOT NULL,
            submitted_by TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            submission_hash TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_count_baseline
         ON count_records(drawer_id, count_type, timestamp, sequence)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_count_timestamp ON count_records(timestamp)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            format_time(event.timestamp),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok(Event {
                event_id: row.get(0)?,
                timestamp: time_column(row, 1)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: json_column(row, 5)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

const RECORD_COLUMNS: &str = "id, drawer_id, count_type, denominations, cash_out, total_cash,
     total_for_deposit, sms_cash, timestamp, submitted_by, sequence, submission_hash";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CountRecord> {
    let count_type: String = row.get(2)?;
    let sequence: i64 = row.get(10)?;
    let sms_cash: Option<i64> = row.get(7)?;

    Ok(CountRecord {
        id: row.get(0)?,
        drawer_id: row.get(1)?,
        count_type: count_type.parse::<CountType>().map_err(|e| conversion_error(2, e))?,
        denominations: json_column(row, 3)?,
        cash_out: json_column(row, 4)?,
        total_cash: Money::from_cents(row.get(5)?),
        total_for_deposit: Money::from_cents(row.get(6)?),
        sms_cash: sms_cash.map(Money::from_cents),
        timestamp: time_column(row, 8)?,
        submitted_by: row.get(9)?,
        sequence: u64::try_from(sequence).unwrap_or_default(),
        submission_hash: row.get(11)?,
    })
}

fn drawer_from_row(row: &Row<'_>) -> rusqlite::Result<DrawerSettings> {
    let target: DenominationCount = json_column(row, 2)?;
    Ok(DrawerSettings {
        id: row.get(0)?,
        name: row.get(1)?,
        target: TargetProfile::new(target),
        active: row.get(3)?,
        show_details: row.get(4)?,
    })
}

/// True only when the `submission_hash` UNIQUE index refused the row. Other
/// constraint failures (primary key, CHECK) stay storage errors.
fn is_duplicate_hash(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && msg.contains("count_records.submission_hash")
    )
}

// ============================================================================
// SQLITE REPOSITORY
// ============================================================================

/// `CountRepository` backed by one SQLite connection.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteRepository { conn })
    }

    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening drawer database");
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn count_records(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM count_records", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn events_for_record(&self, record_id: &str) -> Result<Vec<Event>> {
        get_events_for_entity(&self.conn, "count_record", record_id)
    }

    fn record_event(&self, event_type: &str, record: &CountRecord, actor: &str) -> Result<()> {
        let event = Event::new(
            event_type,
            "count_record",
            &record.id,
            serde_json::json!({
                "drawer_id": record.drawer_id,
                "count_type": record.count_type,
                "total_cash": record.total_cash,
                "total_for_deposit": record.total_for_deposit,
                "sms_cash": record.sms_cash,
                "sequence": record.sequence,
            }),
            actor,
        );
        insert_event(&self.conn, &event)
    }

    fn duplicate(record: CountRecord) -> CashError {
        CashError::DuplicateSubmission {
            drawer_id: record.drawer_id,
            hash: record.submission_hash,
        }
    }
}

impl CountRepository for SqliteRepository {
    fn create_record(&self, mut record: CountRecord) -> Result<CountRecord> {
        let tx = self.conn.unchecked_transaction()?;

        let inserted = tx.query_row(
            "INSERT INTO count_records (
                id, drawer_id, count_type, denominations, cash_out, total_cash,
                total_for_deposit, sms_cash, timestamp, submitted_by, sequence, submission_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                (SELECT COALESCE(MAX(sequence), 0) + 1 FROM count_records), ?11)
            RETURNING sequence",
            params![
                record.id,
                record.drawer_id,
                record.count_type.as_str(),
                serde_json::to_string(&record.denominations)?,
                serde_json::to_string(&record.cash_out)?,
                record.total_cash.cents(),
                record.total_for_deposit.cents(),
                record.sms_cash.map(Money::cents),
                format_time(record.timestamp),
                record.submitted_by,
                record.submission_hash,
            ],
            |row| row.get::<_, i64>(0),
        );

        let sequence = match inserted {
            Ok(sequence) => sequence,
            Err(e) if is_duplicate_hash(&e) => return Err(Self::duplicate(record)),
            Err(e) => return Err(e.into()),
        };
        record.sequence = u64::try_from(sequence).unwrap_or_default();

        self.record_event("count_created", &record, &record.submitted_by)?;
        tx.commit()?;

        info!(
            record_id = %record.id,
            drawer_id = %record.drawer_id,
            count_type = %record.count_type,
            total_cash = %record.total_cash,
            "count record created"
        );
        Ok(record)
    }

    fn get_record(&self, id: &str) -> Result<CountRecord> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM count_records WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], record_from_row)
            .optional()?
            .ok_or_else(|| CashError::record_not_found(id))
    }

    fn list_records(&self, filter: &RecordFilter) -> Result<Vec<CountRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(drawer_id) = &filter.drawer_id {
            values.push(drawer_id.clone());
            clauses.push("drawer_id = ?");
        }
        if let Some(count_type) = filter.count_type {
            values.push(count_type.as_str().to_string());
            clauses.push("count_type = ?");
        }
        if let Some(from) = filter.from {
            values.push(format_time(from));
            clauses.push("timestamp >= ?");
        }
        if let Some(to) = filter.to {
            values.push(format_time(to));
            clauses.push("timestamp <= ?");
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM count_records {where_clause}
             ORDER BY timestamp DESC, sequence DESC"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), "listed count records");
        Ok(records)
    }

    fn update_record(&self, mut record: CountRecord) -> Result<CountRecord> {
        let tx = self.conn.unchecked_transaction()?;

        let updated = tx
            .query_row(
                "UPDATE count_records SET
                    drawer_id = ?2,
                    count_type = ?3,
                    denominations = ?4,
                    cash_out = ?5,
                    total_cash = ?6,
                    total_for_deposit = ?7,
                    sms_cash = ?8,
                    timestamp = ?9,
                    submitted_by = ?10,
                    submission_hash = ?11,
                    sequence = (SELECT COALESCE(MAX(sequence), 0) + 1 FROM count_records)
                 WHERE id = ?1
                 RETURNING sequence",
                params![
                    record.id,
                    record.drawer_id,
                    record.count_type.as_str(),
                    serde_json::to_string(&record.denominations)?,
                    serde_json::to_string(&record.cash_out)?,
                    record.total_cash.cents(),
                    record.total_for_deposit.cents(),
                    record.sms_cash.map(Money::cents),
                    format_time(record.timestamp),
                    record.submitted_by,
                    record.submission_hash,
                ],
                |row| row.get::<_, i64>(0),
            )
            .optional();

        let sequence = match updated {
            Ok(Some(sequence)) => sequence,
            Ok(None) => return Err(CashError::record_not_found(&record.id)),
            Err(e) if is_duplicate_hash(&e) => return Err(Self::duplicate(record)),
            Err(e) => return Err(e.into()),
        };
        record.sequence = u64::try_from(sequence).unwrap_or_default();

        self.record_event("count_replaced", &record, &record.submitted_by)?;
        tx.commit()?;

        info!(record_id = %record.id, drawer_id = %record.drawer_id, "count record replaced");
        Ok(record)
    }

    fn delete_record(&self, id: &str) -> Result<()> {
        let record = self.get_record(id)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM count_records WHERE id = ?1", params![id])?;
        self.record_event("count_deleted", &record, "system")?;
        tx.commit()?;

        info!(record_id = %id, drawer_id = %record.drawer_id, "count record deleted");
        Ok(())
    }

    fn latest_opening_at_or_before(
        &self,
        drawer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<CountRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM count_records
             WHERE drawer_id = ?1 AND count_type = ?2 AND timestamp <= ?3
             ORDER BY timestamp DESC, sequence DESC
             LIMIT 1"
        );
        let baseline = self
            .conn
            .query_row(
                &sql,
                params![drawer_id, CountType::Opening.as_str(), format_time(at)],
                record_from_row,
            )
            .optional()?;

        debug!(drawer_id, found = baseline.is_some(), "baseline lookup");
        Ok(baseline)
    }

    fn get_drawer_settings(&self, drawer_id: &str) -> Result<DrawerSettings> {
        self.conn
            .query_row(
                "SELECT id, name, target, active, show_details FROM drawers WHERE id = ?1",
                params![drawer_id],
                drawer_from_row,
            )
            .optional()?
            .ok_or_else(|| CashError::drawer_not_found(drawer_id))
    }

    fn save_drawer_settings(&self, settings: &DrawerSettings) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO drawers (id, name, target, active, show_details)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                target = excluded.target,
                active = excluded.active,
                show_details = excluded.show_details,
                updated_at = CURRENT_TIMESTAMP",
            params![
                settings.id,
                settings.name,
                serde_json::to_string(settings.target.counts())?,
                settings.active,
                settings.show_details,
            ],
        )?;
        insert_event(
            &self.conn,
            &Event::new(
                "drawer_saved",
                "drawer",
                &settings.id,
                serde_json::to_value(settings)?,
                "system",
            ),
        )?;
        tx.commit()?;

        info!(drawer_id = %settings.id, active = settings.active, "drawer settings saved");
        Ok(())
    }

    fn list_drawers(&self) -> Result<Vec<DrawerSettings>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, target, active, show_details FROM drawers ORDER BY id")?;
        let drawers = stmt
            .query_map([], drawer_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(drawers)
    }
}

// ============================================================================
// COUNT SHEETS (CSV)
// ============================================================================

#[derive(Debug, Deserialize)]
struct SheetRow {
    denomination: String,
    count: String,
}

/// Read a count sheet with header `denomination,count`. Rows missing from
/// the sheet count as zero.
pub fn read_count_sheet<R: Read>(reader: R) -> Result<DenominationCount> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let rows = rdr
        .deserialize()
        .map(|result| result.map(|row: SheetRow| (row.denomination, row.count)))
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    Ok(DenominationCount::ZERO.with_text_entries(rows)?)
}

pub fn load_count_sheet(path: &Path) -> Result<DenominationCount> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let counts = read_count_sheet(file)?;
    debug!(path = %path.display(), counts = %counts, "count sheet loaded");
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count::CountSubmission;
    use crate::denominations::Denomination;
    use crate::error::ValidationError;
    use chrono::TimeZone;

    fn repo() -> SqliteRepository {
        SqliteRepository::open_in_memory().unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, 0, 0).unwrap()
    }

    fn record(drawer: &str, count_type: CountType, hour: u32, ones: u32) -> CountRecord {
        let mut submission = CountSubmission::new(
            drawer,
            count_type,
            DenominationCount::ZERO.with(Denomination::Ones, ones),
        )
        .by("tester")
        .at(at(hour));
        if count_type == CountType::Closing {
            submission.sms_cash = Some(Money::from_cents(1_250));
        }
        CountRecord::from_submission(&submission, &TargetProfile::default()).unwrap()
    }

    #[test]
    fn test_record_round_trip() {
        let repo = repo();
        let stored = repo
            .create_record(record("front", CountType::Closing, 18, 42))
            .unwrap();

        let loaded = repo.get_record(&stored.id).unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.sms_cash, Some(Money::from_cents(1_250)));
        assert_eq!(loaded.total_cash, Money::from_cents(4_200));
        assert_eq!(repo.count_records().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_submission_is_rejected() {
        let repo = repo();
        let first = record("front", CountType::Opening, 9, 10);
        let mut again = first.clone();
        again.id = uuid::Uuid::new_v4().to_string();

        repo.create_record(first).unwrap();
        let err = repo.create_record(again).unwrap_err();
        assert!(matches!(err, CashError::DuplicateSubmission { .. }));
        assert_eq!(repo.count_records().unwrap(), 1);
    }

    #[test]
    fn test_reused_id_is_not_reported_as_duplicate_submission() {
        let repo = repo();
        let first = repo.create_record(record("front", CountType::Opening, 9, 10)).unwrap();
        let mut clash = record("front", CountType::Opening, 10, 20);
        clash.id = first.id.clone();

        let err = repo.create_record(clash).unwrap_err();
        assert!(matches!(err, CashError::Storage(_)), "{err:?}");
        assert_eq!(repo.count_records().unwrap(), 1);
    }

    #[test]
    fn test_list_orders_newest_first_and_filters() {
        let repo = repo();
        repo.create_record(record("front", CountType::Opening, 9, 10)).unwrap();
        repo.create_record(record("front", CountType::Closing, 18, 20)).unwrap();
        repo.create_record(record("back", CountType::Opening, 11, 30)).unwrap();

        let all = repo.list_records(&RecordFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].timestamp, at(18));
        assert_eq!(all[2].timestamp, at(9));

        let front_openings = repo
            .list_records(&RecordFilter::drawer("front").of_type(CountType::Opening))
            .unwrap();
        assert_eq!(front_openings.len(), 1);

        let window = repo
            .list_records(&RecordFilter::default().between(Some(at(10)), Some(at(12))))
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].drawer_id, "back");
    }

    #[test]
    fn test_baseline_lookup_uses_timestamp_then_write_order() {
        let repo = repo();
        let early = repo.create_record(record("front", CountType::Opening, 8, 10)).unwrap();
        let late = repo.create_record(record("front", CountType::Opening, 10, 20)).unwrap();
        repo.create_record(record("front", CountType::Opening, 19, 30)).unwrap();

        let baseline = repo.latest_opening_at_or_before("front", at(18)).unwrap().unwrap();
        assert_eq!(baseline.id, late.id);

        // Rewriting the earlier record does not move it past a later timestamp.
        repo.update_record(early.clone()).unwrap();
        let baseline = repo.latest_opening_at_or_before("front", at(18)).unwrap().unwrap();
        assert_eq!(baseline.id, late.id);

        assert!(repo.latest_opening_at_or_before("front", at(7)).unwrap().is_none());
        assert!(repo.latest_opening_at_or_before("back", at(18)).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_record_is_not_found() {
        let repo = repo();
        let err = repo
            .update_record(record("front", CountType::Opening, 9, 10))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_writes_audit_trail() {
        let repo = repo();
        let stored = repo.create_record(record("front", CountType::Opening, 9, 10)).unwrap();
        repo.delete_record(&stored.id).unwrap();

        assert!(repo.get_record(&stored.id).unwrap_err().is_not_found());
        let events = repo.events_for_record(&stored.id).unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert!(kinds.contains(&"count_created"));
        assert!(kinds.contains(&"count_deleted"));
        assert!(repo.delete_record(&stored.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_drawer_upsert() {
        let repo = repo();
        let target = TargetProfile::new(DenominationCount::ZERO.with(Denomination::Quarters, 40));
        let mut drawer = DrawerSettings::new("front", "Front Counter", target);
        repo.save_drawer_settings(&drawer).unwrap();

        drawer.name = "Front Register".to_string();
        drawer.deactivate();
        repo.save_drawer_settings(&drawer).unwrap();

        let loaded = repo.get_drawer_settings("front").unwrap();
        assert_eq!(loaded, drawer);
        assert_eq!(repo.list_drawers().unwrap().len(), 1);
        assert!(repo.get_drawer_settings("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_read_count_sheet() {
        let sheet = "denomination,count\nquarters, 60\nOnes,50\n";
        let counts = read_count_sheet(sheet.as_bytes()).unwrap();
        assert_eq!(counts.get(Denomination::Quarters), 60);
        assert_eq!(counts.get(Denomination::Ones), 50);
        assert_eq!(counts.get(Denomination::Hundreds), 0);

        let bad = "denomination,count\nquarters,-4\n";
        assert!(matches!(
            read_count_sheet(bad.as_bytes()),
            Err(CashError::Validation(_))
        ));

        let unknown = "denomination,count\ndoubloons,4\n";
        assert!(read_count_sheet(unknown.as_bytes()).is_err());

        let repeated = "denomination,count\nones,5\nONES,7\n";
        assert!(matches!(
            read_count_sheet(repeated.as_bytes()),
            Err(CashError::Validation(ValidationError::DuplicateDenomination(_)))
        ));
    }
}
