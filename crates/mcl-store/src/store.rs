use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use mcl_core::{MclError, Result};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction};
use tracing::{debug, info};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        task_description TEXT NOT NULL,
        repo_path TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        priority TEXT NOT NULL DEFAULT 'normal',
        budget INTEGER NOT NULL DEFAULT 100,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS decisions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent_id TEXT NOT NULL REFERENCES agents(id),
        request_data TEXT NOT NULL,
        decision TEXT NOT NULL,
        confidence_score REAL NOT NULL,
        autonomy_level TEXT NOT NULL,
        model_used TEXT NOT NULL,
        user_feedback TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS interaction_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent_id TEXT NOT NULL REFERENCES agents(id),
        session_id TEXT NOT NULL,
        interaction_type TEXT NOT NULL,
        direction TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT,
        timestamp TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS manager_config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS approval_queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent_id TEXT NOT NULL REFERENCES agents(id),
        decision_id INTEGER REFERENCES decisions(id),
        request_type TEXT NOT NULL,
        request_data TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_agents_status ON agents(status);
    CREATE INDEX IF NOT EXISTS idx_decisions_agent ON decisions(agent_id);
    CREATE INDEX IF NOT EXISTS idx_decisions_created ON decisions(created_at);
    CREATE INDEX IF NOT EXISTS idx_logs_agent ON interaction_logs(agent_id);
    CREATE INDEX IF NOT EXISTS idx_logs_session ON interaction_logs(session_id);
    CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON interaction_logs(timestamp);
    CREATE INDEX IF NOT EXISTS idx_queue_agent ON approval_queue(agent_id);
";

/// Persistent state of the supervisor: agents, decisions, interaction logs,
/// manager settings and the approval queue, all in one SQLite database.
///
/// The connection sits behind a mutex so the store is `Send + Sync`; every
/// call runs to completion on the calling thread.
pub struct ManagerStore {
    db: Arc<Mutex<Connection>>,
    clock: StoreClock,
}

impl ManagerStore {
    /// Open or create the manager database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening manager store");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(db_err)?;
        // WAL for concurrent readers (the CLI and a long-running caller)
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(db_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(db_err)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            clock: StoreClock::default(),
        })
    }

    /// Raw connection for ad-hoc queries.
    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock()
    }

    /// Run `f` inside one SQLite transaction. Any error rolls back every
    /// statement `f` issued.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut db = self.db.lock();
        let tx = db.transaction().map_err(db_err)?;
        let value = f(&tx)?;
        tx.commit().map_err(db_err)?;
        Ok(value)
    }

    /// Next timestamp from the store clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Next timestamp from the store clock, formatted for storage.
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.clock.now())
    }
}

/// Hands out strictly increasing UTC instants at microsecond resolution, even
/// when the wall clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct StoreClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl StoreClock {
    pub fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let mut now = Utc::now().trunc_subsecs(6);
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

/// Fixed-width RFC 3339 (`2024-05-01T12:00:00.000001Z`), so text order is time order.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ── Row helpers ────────────────────────────────────────────────

pub(crate) fn db_err(e: rusqlite::Error) -> MclError {
    MclError::Store(e.to_string())
}

/// Read a TEXT column holding one of our string enums.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = MclError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = MclError>,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

/// Read a TEXT column holding JSON.
pub(crate) fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_json_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<serde_json::Value>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        }),
        None => Ok(None),
    }
}

/// Fail with `NotFound` unless the agent row exists.
pub(crate) fn ensure_agent(conn: &Connection, agent_id: &str) -> Result<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM agents WHERE id = ?1)",
            [agent_id],
            |row| row.get(0),
        )
        .map_err(db_err)?;
    if exists {
        Ok(())
    } else {
        debug!(agent_id, "agent lookup missed");
        Err(MclError::not_found("agent", agent_id))
    }
}
