use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{named_params, params, Connection, Row};

use super::{AuditError, AuditFilter, AuditRecord, AuditStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS audit_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        event_type TEXT NOT NULL,
        ticket_id TEXT,
        actor TEXT,
        data TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
    CREATE INDEX IF NOT EXISTS idx_audit_events_ticket_id ON audit_events(ticket_id);
    CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
";

// Every filter is optional: a NULL parameter disables its condition.
const MATCHES: &str = "(:ticket_id IS NULL OR ticket_id = :ticket_id) \
     AND (:event_type IS NULL OR event_type = :event_type) \
     AND (:actor IS NULL OR actor = :actor) \
     AND (:from IS NULL OR timestamp >= :from) \
     AND (:to IS NULL OR timestamp <= :to)";

/// Audit store on the same SQLite file as the tickets, over its own
/// connection.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        Self::with_connection(Connection::open(path).map_err(db_err)?)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        // The ticket repository writes to the same file.
        conn.busy_timeout(Duration::from_secs(5)).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn
            .lock()
            .map_err(|_| AuditError::Database("connection lock poisoned".to_string()))
    }
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, ticket_id, actor, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                timestamp(&record.timestamp),
                record.event_type,
                record.ticket_id,
                record.actor,
                data,
            ],
        )
        .map_err(db_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let (from, to) = bounds(filter);
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, timestamp, data FROM audit_events WHERE {} \
                 ORDER BY timestamp DESC, id DESC LIMIT :limit OFFSET :offset",
                MATCHES
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(
                named_params! {
                    ":ticket_id": filter.ticket_id,
                    ":event_type": filter.event_type,
                    ":actor": filter.actor,
                    ":from": from,
                    ":to": to,
                    ":limit": filter.limit,
                    ":offset": filter.offset,
                },
                read_row,
            )
            .map_err(db_err)?;

        rows.map(|row| row.map_err(db_err).and_then(into_record)).collect()
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let (from, to) = bounds(filter);
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_events WHERE {}", MATCHES),
            named_params! {
                ":ticket_id": filter.ticket_id,
                ":event_type": filter.event_type,
                ":actor": filter.actor,
                ":from": from,
                ":to": to,
            },
            |row| row.get(0),
        )
        .map_err(db_err)
    }
}

type RawRow = (i64, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

// event_type, ticket_id and actor are derived from the event itself, so only
// the payload needs decoding.
fn into_record((id, stored_at, data): RawRow) -> Result<AuditRecord, AuditError> {
    let timestamp = DateTime::parse_from_rfc3339(&stored_at)
        .map_err(|e| AuditError::Database(format!("invalid timestamp {}: {}", stored_at, e)))?
        .with_timezone(&Utc);
    let event =
        serde_json::from_str(&data).map_err(|e| AuditError::Serialization(e.to_string()))?;

    Ok(AuditRecord {
        id,
        ..AuditRecord::unsaved(timestamp, event)
    })
}

fn bounds(filter: &AuditFilter) -> (Option<String>, Option<String>) {
    (
        filter.from.as_ref().map(timestamp),
        filter.to.as_ref().map(timestamp),
    )
}

// Fixed-width UTC so that string comparison orders chronologically.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_err(e: rusqlite::Error) -> AuditError {
    AuditError::Database(e.to_string())
}
