use mcl_core::{AgentId, AgentStatus, MclError, Priority, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::info;

use crate::interactions::{self, NewInteraction};
use crate::store::{ManagerStore, db_err, ensure_agent, parse_column};

/// A supervised agent session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub task_description: String,
    pub repo_path: String,
    pub status: AgentStatus,
    pub priority: Priority,
    pub budget: i64,
    pub created_at: String,
}

/// Input for registering an agent.
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub id: AgentId,
    pub task_description: String,
    pub repo_path: String,
    pub priority: Priority,
    pub budget: i64,
}

const AGENT_COLUMNS: &str = "id, task_description, repo_path, status, priority, budget, created_at";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get(0)?,
        task_description: row.get(1)?,
        repo_path: row.get(2)?,
        status: parse_column(row, 3)?,
        priority: parse_column(row, 4)?,
        budget: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_agents(conn: &Connection, sql: &str) -> Result<Vec<AgentRecord>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt
        .query_map([], agent_from_row)
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;
    Ok(rows)
}

impl ManagerStore {
    /// Insert an agent (status `active`) and its spawn event in one transaction.
    pub fn register_agent(
        &self,
        agent: &NewAgent,
        spawn_event: &NewInteraction,
    ) -> Result<AgentRecord> {
        let created_at = self.transaction(|tx| {
            let created_at = self.timestamp();
            let event_at = self.timestamp();
            tx.execute(
                "INSERT INTO agents (id, task_description, repo_path, status, priority, budget, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    agent.id,
                    agent.task_description,
                    agent.repo_path,
                    AgentStatus::Active.as_str(),
                    agent.priority.as_str(),
                    agent.budget,
                    created_at,
                ],
            )
            .map_err(db_err)?;
            interactions::append(tx, spawn_event, &event_at)?;
            Ok(created_at)
        })?;

        info!(agent_id = %agent.id, priority = %agent.priority, budget = agent.budget, "agent registered");

        Ok(AgentRecord {
            id: agent.id.clone(),
            task_description: agent.task_description.clone(),
            repo_path: agent.repo_path.clone(),
            status: AgentStatus::Active,
            priority: agent.priority,
            budget: agent.budget,
            created_at,
        })
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        let db = self.db();
        db.query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
            [agent_id],
            agent_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    /// Agents whose status is `active`, newest first.
    pub fn active_agents(&self) -> Result<Vec<AgentRecord>> {
        let db = self.db();
        query_agents(
            &db,
            &format!(
                "SELECT {AGENT_COLUMNS} FROM agents WHERE status = 'active'
                 ORDER BY created_at DESC, rowid DESC"
            ),
        )
    }

    /// Every agent regardless of status, newest first.
    pub fn all_agents(&self) -> Result<Vec<AgentRecord>> {
        let db = self.db();
        query_agents(
            &db,
            &format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at DESC, rowid DESC"),
        )
    }

    pub fn agent_exists(&self, agent_id: &str) -> Result<bool> {
        match ensure_agent(&self.db(), agent_id) {
            Ok(()) => Ok(true),
            Err(MclError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Change an agent's lifecycle status.
    pub fn update_agent_status(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        let db = self.db();
        let rows = db
            .execute(
                "UPDATE agents SET status = ?1 WHERE id = ?2",
                params![status.as_str(), agent_id],
            )
            .map_err(db_err)?;
        if rows == 0 {
            return Err(MclError::not_found("agent", agent_id));
        }
        info!(agent_id, %status, "agent status updated");
        Ok(())
    }
}
