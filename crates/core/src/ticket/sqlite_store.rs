//! SQLite-backed ticket repository implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::store::{RepositoryError, TicketRepository};
use super::types::{
    Client, ClientDetails, DeliveryMethod, Handler, NewTicket, Priority, Project, ProjectDetails,
    Report, Ticket, TicketStatus, TicketUpdate, TicketView,
};
use crate::identifier::{allocate_and_insert, AllocationError, IdentifierAllocator};

const TICKET_COLUMNS: &str = "t.id, t.client_id, t.handler_id, t.category_id, t.project_id, \
     t.requester, t.priority, t.status, t.motive, t.environment, t.analysis, t.procedures, \
     t.solution, t.observations, t.recommendations, t.occurrence_minutes, t.service_minutes, \
     t.created_at, t.closed_at, t.updated_at";

const REPORT_COLUMNS: &str =
    "id, ticket_id, artifact, generated_at, sent, delivery_method, sent_at";

/// SQLite-backed ticket repository.
pub struct SqliteTicketRepository {
    conn: Mutex<Connection>,
}

impl SqliteTicketRepository {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory repository (useful for testing).
    pub fn in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RepositoryError> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(db_err)?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                document TEXT NOT NULL DEFAULT '',
                contact TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS handlers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                phone TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL DEFAULT '',
                manager TEXT NOT NULL DEFAULT '',
                manager_email TEXT NOT NULL DEFAULT '',
                manager_phone TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                client_id INTEGER NOT NULL REFERENCES clients(id),
                handler_id INTEGER NOT NULL REFERENCES handlers(id),
                category_id INTEGER NOT NULL REFERENCES categories(id),
                project_id INTEGER REFERENCES projects(id),
                requester TEXT NOT NULL DEFAULT '',
                priority TEXT NOT NULL,
                status TEXT NOT NULL,
                motive TEXT NOT NULL DEFAULT '',
                environment TEXT NOT NULL DEFAULT '',
                analysis TEXT NOT NULL DEFAULT '',
                procedures TEXT NOT NULL DEFAULT '',
                solution TEXT NOT NULL DEFAULT '',
                observations TEXT NOT NULL DEFAULT '',
                recommendations TEXT NOT NULL DEFAULT '',
                occurrence_minutes INTEGER,
                service_minutes INTEGER,
                created_at TEXT NOT NULL,
                closed_at TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets(created_at);

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticket_id TEXT NOT NULL UNIQUE REFERENCES tickets(id),
                artifact TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                sent INTEGER NOT NULL DEFAULT 0,
                delivery_method TEXT NOT NULL DEFAULT 'none',
                sent_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_reports_sent ON reports(sent);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Database("connection lock poisoned".to_string()))
    }

    fn max_identifier_on(conn: &Connection) -> Result<Option<String>, RepositoryError> {
        // Longer suffixes are numerically greater (RAC10000 > RAC9999).
        conn.query_row(
            "SELECT id FROM tickets ORDER BY LENGTH(id) DESC, id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn insert_ticket_on(
        conn: &Connection,
        id: &str,
        ticket: &NewTicket,
    ) -> Result<Ticket, RepositoryError> {
        let client_id = Self::ensure_client(conn, &ticket.client_name, &ticket.requester)?;
        let handler_id = Self::ensure_handler(conn, &ticket.handler_name)?;
        let category_id = Self::ensure_category(conn, &ticket.category_name)?;
        let project_id = match ticket.project_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(Self::ensure_project(conn, code)?),
            _ => None,
        };

        let now = Utc::now().trunc_subsecs(6);
        let status = ticket.initial_status();
        let closed_at = (status == TicketStatus::Resolved).then_some(now);

        conn.execute(
            "INSERT INTO tickets (id, client_id, handler_id, category_id, project_id, requester, \
             priority, status, motive, environment, analysis, procedures, solution, observations, \
             recommendations, occurrence_minutes, service_minutes, \
             created_at, closed_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                id,
                client_id,
                handler_id,
                category_id,
                project_id,
                ticket.requester,
                ticket.priority.as_str(),
                status.as_str(),
                ticket.motive,
                ticket.environment,
                ticket.analysis,
                ticket.procedures,
                ticket.solution,
                ticket.observations,
                ticket.recommendations,
                ticket.occurrence_minutes,
                ticket.service_minutes,
                timestamp(&now),
                closed_at.as_ref().map(timestamp),
                timestamp(&now),
            ],
        )
        .map_err(|e| {
            if is_primary_key_violation(&e) {
                RepositoryError::DuplicateIdentifier(id.to_string())
            } else {
                db_err(e)
            }
        })?;

        Ok(Ticket {
            id: id.to_string(),
            client_id,
            handler_id,
            category_id,
            project_id,
            requester: ticket.requester.clone(),
            priority: ticket.priority,
            status,
            motive: ticket.motive.clone(),
            environment: ticket.environment.clone(),
            analysis: ticket.analysis.clone(),
            procedures: ticket.procedures.clone(),
            solution: ticket.solution.clone(),
            observations: ticket.observations.clone(),
            recommendations: ticket.recommendations.clone(),
            occurrence_minutes: ticket.occurrence_minutes,
            service_minutes: ticket.service_minutes,
            created_at: now,
            closed_at,
            updated_at: now,
        })
    }

    /// Find a client by name, creating it with `contact` when missing.
    fn ensure_client(conn: &Connection, name: &str, contact: &str) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT OR IGNORE INTO clients (name, contact) VALUES (?1, ?2)",
            params![name, contact],
        )
        .map_err(db_err)?;
        conn.query_row("SELECT id FROM clients WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .map_err(db_err)
    }

    fn ensure_handler(conn: &Connection, name: &str) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT OR IGNORE INTO handlers (name) VALUES (?1)",
            params![name],
        )
        .map_err(db_err)?;
        conn.query_row("SELECT id FROM handlers WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .map_err(db_err)
    }

    fn ensure_category(conn: &Connection, name: &str) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
            params![name],
        )
        .map_err(db_err)?;
        conn.query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    fn ensure_project(conn: &Connection, code: &str) -> Result<i64, RepositoryError> {
        conn.execute(
            "INSERT OR IGNORE INTO projects (code, name) VALUES (?1, ?1)",
            params![code],
        )
        .map_err(db_err)?;
        conn.query_row("SELECT id FROM projects WHERE code = ?1", params![code], |row| {
            row.get(0)
        })
        .map_err(db_err)
    }

    fn get_ticket_on(conn: &Connection, id: &str) -> Result<Option<Ticket>, RepositoryError> {
        conn.query_row(
            &format!("SELECT {} FROM tickets t WHERE t.id = ?1", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(db_err)
    }

    fn get_report_by_ticket_on(
        conn: &Connection,
        ticket_id: &str,
    ) -> Result<Option<Report>, RepositoryError> {
        conn.query_row(
            &format!("SELECT {} FROM reports WHERE ticket_id = ?1", REPORT_COLUMNS),
            params![ticket_id],
            Self::row_to_report,
        )
        .optional()
        .map_err(db_err)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let priority: String = row.get(6)?;
        let status: String = row.get(7)?;
        let created_at: String = row.get(17)?;
        let closed_at: Option<String> = row.get(18)?;
        let updated_at: String = row.get(19)?;

        Ok(Ticket {
            id: row.get(0)?,
            client_id: row.get(1)?,
            handler_id: row.get(2)?,
            category_id: row.get(3)?,
            project_id: row.get(4)?,
            requester: row.get(5)?,
            priority: Priority::parse(&priority).map_err(|e| conversion_err(6, e))?,
            status: TicketStatus::parse(&status).map_err(|e| conversion_err(7, e))?,
            motive: row.get(8)?,
            environment: row.get(9)?,
            analysis: row.get(10)?,
            procedures: row.get(11)?,
            solution: row.get(12)?,
            observations: row.get(13)?,
            recommendations: row.get(14)?,
            occurrence_minutes: row.get(15)?,
            service_minutes: row.get(16)?,
            created_at: parse_timestamp(17, &created_at)?,
            closed_at: closed_at
                .map(|value| parse_timestamp(18, &value))
                .transpose()?,
            updated_at: parse_timestamp(19, &updated_at)?,
        })
    }

    fn row_to_view(row: &rusqlite::Row) -> rusqlite::Result<TicketView> {
        let ticket = Self::row_to_ticket(row)?;
        let client = Client {
            id: row.get(20)?,
            name: row.get(21)?,
            document: row.get(22)?,
            contact: row.get(23)?,
            phone: row.get(24)?,
            email: row.get(25)?,
        };
        let handler = Handler {
            id: row.get(26)?,
            name: row.get(27)?,
            phone: row.get(28)?,
            email: row.get(29)?,
        };
        let category: String = row.get(30)?;
        let project_id: Option<i64> = row.get(31)?;
        let project = match project_id {
            Some(id) => Some(Project {
                id,
                code: row.get(32)?,
                name: row.get(33)?,
                manager: row.get(34)?,
                manager_email: row.get(35)?,
                manager_phone: row.get(36)?,
            }),
            None => None,
        };

        Ok(TicketView {
            ticket,
            client,
            handler,
            category,
            project,
        })
    }

    fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<Report> {
        let generated_at: String = row.get(3)?;
        let method: String = row.get(5)?;
        let sent_at: Option<String> = row.get(6)?;

        Ok(Report {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            artifact: row.get(2)?,
            generated_at: parse_timestamp(3, &generated_at)?,
            sent: row.get(4)?,
            delivery_method: DeliveryMethod::parse(&method).map_err(|e| conversion_err(5, e))?,
            sent_at: sent_at.map(|value| parse_timestamp(6, &value)).transpose()?,
        })
    }
}

impl TicketRepository for SqliteTicketRepository {
    fn max_ticket_identifier(&self) -> Result<Option<String>, RepositoryError> {
        let conn = self.conn()?;
        Self::max_identifier_on(&conn)
    }

    fn insert_ticket(&self, id: &str, ticket: &NewTicket) -> Result<Ticket, RepositoryError> {
        let conn = self.conn()?;
        Self::insert_ticket_on(&conn, id, ticket)
    }

    /// Read-max and insert run inside one `BEGIN IMMEDIATE` transaction, so
    /// writers in other processes are serialized as well. The primary key
    /// still guards the insert.
    fn create_ticket(
        &self,
        allocator: &IdentifierAllocator,
        max_attempts: u32,
        ticket: &NewTicket,
    ) -> Result<Ticket, AllocationError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let created = allocate_and_insert(
            allocator,
            max_attempts,
            || Self::max_identifier_on(&tx),
            |id| Self::insert_ticket_on(&tx, id, ticket),
        )?;

        tx.commit().map_err(db_err)?;
        Ok(created)
    }

    fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, RepositoryError> {
        let conn = self.conn()?;
        Self::get_ticket_on(&conn, id)
    }

    fn get_ticket_view(&self, id: &str) -> Result<Option<TicketView>, RepositoryError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {}, \
             c.id, c.name, c.document, c.contact, c.phone, c.email, \
             h.id, h.name, h.phone, h.email, \
             cat.name, \
             p.id, p.code, p.name, p.manager, p.manager_email, p.manager_phone \
             FROM tickets t \
             JOIN clients c ON c.id = t.client_id \
             JOIN handlers h ON h.id = t.handler_id \
             JOIN categories cat ON cat.id = t.category_id \
             LEFT JOIN projects p ON p.id = t.project_id \
             WHERE t.id = ?1",
            TICKET_COLUMNS
        );

        conn.query_row(&sql, params![id], Self::row_to_view)
            .optional()
            .map_err(db_err)
    }

    fn update_ticket(&self, id: &str, update: &TicketUpdate) -> Result<Ticket, RepositoryError> {
        if update.is_empty() {
            return Err(RepositoryError::InvalidUpdate(
                "update carries no fields".to_string(),
            ));
        }

        let conn = self.conn()?;
        let current = Self::get_ticket_on(&conn, id)?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        let now = Utc::now().trunc_subsecs(6);
        let closed_at = match update.status {
            Some(next) => current.status.transition(next, current.closed_at, now)?,
            None => current.closed_at,
        };

        conn.execute(
            "UPDATE tickets SET \
             environment = COALESCE(?1, environment), \
             occurrence_minutes = COALESCE(?2, occurrence_minutes), \
             analysis = COALESCE(?3, analysis), \
             procedures = COALESCE(?4, procedures), \
             solution = COALESCE(?5, solution), \
             status = COALESCE(?6, status), \
             service_minutes = COALESCE(?7, service_minutes), \
             observations = COALESCE(?8, observations), \
             recommendations = COALESCE(?9, recommendations), \
             priority = COALESCE(?10, priority), \
             closed_at = ?11, \
             updated_at = ?12 \
             WHERE id = ?13",
            params![
                update.environment,
                update.occurrence_minutes,
                update.analysis,
                update.procedures,
                update.solution,
                update.status.map(|s| s.as_str()),
                update.service_minutes,
                update.observations,
                update.recommendations,
                update.priority.map(|p| p.as_str()),
                closed_at.as_ref().map(timestamp),
                timestamp(&now),
                id,
            ],
        )
        .map_err(db_err)?;

        Self::get_ticket_on(&conn, id)?.ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    fn search_tickets(&self, term: &str, limit: usize) -> Result<Vec<Ticket>, RepositoryError> {
        let conn = self.conn()?;
        let pattern = format!("%{}%", escape_like(term.trim()));
        let sql = format!(
            "SELECT {} FROM tickets t JOIN clients c ON c.id = t.client_id \
             WHERE t.id LIKE ?1 ESCAPE '\\' \
             OR c.name LIKE ?1 ESCAPE '\\' \
             OR t.requester LIKE ?1 ESCAPE '\\' \
             OR t.motive LIKE ?1 ESCAPE '\\' \
             OR t.environment LIKE ?1 ESCAPE '\\' \
             OR t.analysis LIKE ?1 ESCAPE '\\' \
             OR t.procedures LIKE ?1 ESCAPE '\\' \
             OR t.solution LIKE ?1 ESCAPE '\\' \
             OR t.observations LIKE ?1 ESCAPE '\\' \
             OR t.recommendations LIKE ?1 ESCAPE '\\' \
             ORDER BY t.created_at DESC, LENGTH(t.id) DESC, t.id DESC \
             LIMIT ?2",
            TICKET_COLUMNS
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], Self::row_to_ticket)
            .map_err(db_err)?;

        let mut tickets = Vec::new();
        for row in rows {
            tickets.push(row.map_err(db_err)?);
        }
        Ok(tickets)
    }

    fn upsert_client(&self, details: &ClientDetails) -> Result<Client, RepositoryError> {
        if details.name.trim().is_empty() {
            return Err(RepositoryError::InvalidUpdate(
                "client name cannot be empty".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO clients (name, document, contact, phone, email) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(name) DO UPDATE SET document = excluded.document, \
             contact = excluded.contact, phone = excluded.phone, email = excluded.email",
            params![
                details.name,
                details.document,
                details.contact,
                details.phone,
                details.email
            ],
        )
        .map_err(db_err)?;

        conn.query_row(
            "SELECT id, name, document, contact, phone, email FROM clients WHERE name = ?1",
            params![details.name],
            |row| {
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    document: row.get(2)?,
                    contact: row.get(3)?,
                    phone: row.get(4)?,
                    email: row.get(5)?,
                })
            },
        )
        .map_err(db_err)
    }

    fn upsert_project(&self, details: &ProjectDetails) -> Result<Project, RepositoryError> {
        let code = details.code.trim();
        if code.is_empty() {
            return Err(RepositoryError::InvalidUpdate(
                "project code cannot be empty".to_string(),
            ));
        }
        let name = if details.name.is_empty() {
            code
        } else {
            details.name.as_str()
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO projects (code, name, manager, manager_email, manager_phone) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(code) DO UPDATE SET name = excluded.name, manager = excluded.manager, \
             manager_email = excluded.manager_email, manager_phone = excluded.manager_phone",
            params![
                code,
                name,
                details.manager,
                details.manager_email,
                details.manager_phone
            ],
        )
        .map_err(db_err)?;

        conn.query_row(
            "SELECT id, code, name, manager, manager_email, manager_phone \
             FROM projects WHERE code = ?1",
            params![code],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                    manager: row.get(3)?,
                    manager_email: row.get(4)?,
                    manager_phone: row.get(5)?,
                })
            },
        )
        .map_err(db_err)
    }

    fn list_resolved_without_report(&self) -> Result<Vec<String>, RepositoryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.id FROM tickets t LEFT JOIN reports r ON r.ticket_id = t.id \
                 WHERE t.status = ?1 AND r.id IS NULL \
                 ORDER BY t.created_at ASC, LENGTH(t.id) ASC, t.id ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![TicketStatus::Resolved.as_str()], |row| row.get(0))
            .map_err(db_err)?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(db_err)?);
        }
        Ok(ids)
    }

    fn upsert_report(
        &self,
        ticket_id: &str,
        artifact: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Report, RepositoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reports (ticket_id, artifact, generated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(ticket_id) DO UPDATE SET artifact = excluded.artifact, \
             generated_at = excluded.generated_at",
            params![ticket_id, artifact, timestamp(&generated_at)],
        )
        .map_err(db_err)?;

        Self::get_report_by_ticket_on(&conn, ticket_id)?
            .ok_or_else(|| RepositoryError::NotFound(ticket_id.to_string()))
    }

    fn get_report(&self, report_id: i64) -> Result<Option<Report>, RepositoryError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS),
            params![report_id],
            Self::row_to_report,
        )
        .optional()
        .map_err(db_err)
    }

    fn get_report_for_ticket(&self, ticket_id: &str) -> Result<Option<Report>, RepositoryError> {
        let conn = self.conn()?;
        Self::get_report_by_ticket_on(&conn, ticket_id)
    }

    fn list_unsent_reports(&self) -> Result<Vec<Report>, RepositoryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM reports WHERE sent = 0 ORDER BY generated_at ASC, id ASC",
                REPORT_COLUMNS
            ))
            .map_err(db_err)?;
        let rows = stmt.query_map([], Self::row_to_report).map_err(db_err)?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row.map_err(db_err)?);
        }
        Ok(reports)
    }

    fn mark_report_sent(
        &self,
        report_id: i64,
        method: DeliveryMethod,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE reports SET sent = 1, delivery_method = ?1, sent_at = ?2 \
                 WHERE id = ?3 AND sent = 0",
                params![method.as_str(), timestamp(&sent_at), report_id],
            )
            .map_err(db_err)?;
        Ok(changed == 1)
    }
}

fn db_err(e: rusqlite::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn is_primary_key_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn conversion_err(idx: usize, e: super::types::UnknownVariant) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
