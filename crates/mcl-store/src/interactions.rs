use mcl_core::{AgentId, Direction, InteractionType, Result, SessionId};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{ManagerStore, db_err, ensure_agent, optional_json_column, parse_column};

/// Search results when the caller gives no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// One entry of the append-only interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub id: i64,
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub interaction_type: InteractionType,
    pub direction: Direction,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: String,
}

/// An entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub interaction_type: InteractionType,
    pub direction: Direction,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

impl NewInteraction {
    pub fn new(
        agent_id: impl Into<AgentId>,
        session_id: impl Into<SessionId>,
        interaction_type: InteractionType,
        direction: Direction,
        content: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            interaction_type,
            direction,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Conjunctive filters for [`ManagerStore::get_logs`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub agent_id: Option<AgentId>,
    pub session_id: Option<SessionId>,
    pub interaction_type: Option<InteractionType>,
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn for_agent(agent_id: impl Into<AgentId>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::default()
        }
    }

    pub fn session(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn of_type(mut self, interaction_type: InteractionType) -> Self {
        self.interaction_type = Some(interaction_type);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Aggregate view of one session of an agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub started_at: String,
    pub ended_at: String,
    pub interaction_count: u64,
}

/// Per-agent overview of the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentLogSummary {
    pub agent_id: AgentId,
    pub task_description: Option<String>,
    pub entry_count: u64,
    pub first_timestamp: String,
    pub last_timestamp: String,
}

const ENTRY_COLUMNS: &str =
    "id, agent_id, session_id, interaction_type, direction, content, metadata, timestamp";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<InteractionEntry> {
    Ok(InteractionEntry {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        session_id: row.get(2)?,
        interaction_type: parse_column(row, 3)?,
        direction: parse_column(row, 4)?,
        content: row.get(5)?,
        metadata: optional_json_column(row, 6)?,
        timestamp: row.get(7)?,
    })
}

/// Append one entry on an open connection or transaction. Returns the row id.
pub(crate) fn append(conn: &Connection, entry: &NewInteraction, timestamp: &str) -> Result<i64> {
    let metadata = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO interaction_logs
            (agent_id, session_id, interaction_type, direction, content, metadata, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.agent_id,
            entry.session_id,
            entry.interaction_type.as_str(),
            entry.direction.as_str(),
            entry.content,
            metadata,
            timestamp,
        ],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl ManagerStore {
    /// Append an entry to the interaction log.
    pub fn log_interaction(&self, entry: &NewInteraction) -> Result<i64> {
        let db = self.db();
        ensure_agent(&db, &entry.agent_id)?;
        let timestamp = self.timestamp();
        let id = append(&db, entry, &timestamp)?;
        debug!(
            agent_id = %entry.agent_id,
            session_id = %entry.session_id,
            kind = %entry.interaction_type,
            "interaction logged"
        );
        Ok(id)
    }

    /// Entries matching every set filter, in insertion order.
    pub fn get_logs(&self, query: &LogQuery) -> Result<Vec<InteractionEntry>> {
        let mut clauses = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(agent_id) = &query.agent_id {
            values.push(SqlValue::Text(agent_id.clone()));
            clauses.push(format!("agent_id = ?{}", values.len()));
        }
        if let Some(session_id) = &query.session_id {
            values.push(SqlValue::Text(session_id.clone()));
            clauses.push(format!("session_id = ?{}", values.len()));
        }
        if let Some(kind) = query.interaction_type {
            values.push(SqlValue::Text(kind.as_str().to_string()));
            clauses.push(format!("interaction_type = ?{}", values.len()));
        }

        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM interaction_logs");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id ASC");
        if let Some(limit) = query.limit {
            values.push(SqlValue::Integer(sql_limit(limit)));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        let db = self.db();
        let mut stmt = db.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), entry_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Sessions of an agent, most recently started first.
    pub fn get_sessions(&self, agent_id: &str) -> Result<Vec<SessionSummary>> {
        let db = self.db();
        let mut stmt = db
            .prepare(
                "SELECT session_id, MIN(timestamp), MAX(timestamp), COUNT(*), MIN(id) AS first_id
                 FROM interaction_logs
                 WHERE agent_id = ?1
                 GROUP BY session_id
                 ORDER BY MIN(timestamp) DESC, first_id DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([agent_id], |row| {
                Ok(SessionSummary {
                    session_id: row.get(0)?,
                    started_at: row.get(1)?,
                    ended_at: row.get(2)?,
                    interaction_count: count(row.get(3)?),
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Case-sensitive substring search over raw content, newest first.
    pub fn search_logs(
        &self,
        term: &str,
        agent_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<InteractionEntry>> {
        let limit = sql_limit(limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
        let db = self.db();
        let mut stmt = db
            .prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM interaction_logs
                 WHERE instr(content, ?1) > 0
                   AND (?2 IS NULL OR agent_id = ?2)
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?3"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![term, agent_id, limit], entry_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// One row per agent that has log entries, most recently active first.
    pub fn agent_log_summaries(&self) -> Result<Vec<AgentLogSummary>> {
        let db = self.db();
        let mut stmt = db
            .prepare(
                "SELECT l.agent_id, a.task_description, COUNT(*), MIN(l.timestamp), MAX(l.timestamp)
                 FROM interaction_logs l
                 LEFT JOIN agents a ON a.id = l.agent_id
                 GROUP BY l.agent_id
                 ORDER BY MAX(l.timestamp) DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AgentLogSummary {
                    agent_id: row.get(0)?,
                    task_description: row.get(1)?,
                    entry_count: count(row.get(2)?),
                    first_timestamp: row.get(3)?,
                    last_timestamp: row.get(4)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }
}
