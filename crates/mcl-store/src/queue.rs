use mcl_core::{AgentId, DecisionId, Direction, InteractionType, MclError, Result, Verdict};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::interactions::{self, NewInteraction};
use crate::store::{ManagerStore, db_err, ensure_agent, json_column};

/// A request waiting for a human verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalItem {
    pub id: i64,
    pub agent_id: AgentId,
    pub decision_id: Option<DecisionId>,
    pub request_type: String,
    pub request_data: serde_json::Value,
    pub created_at: String,
    pub task_description: Option<String>,
}

/// Request type recorded for agent tool requests.
pub const TOOL_REQUEST: &str = "tool_request";

/// Outcome of a human resolving a queued item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedApproval {
    pub item: ApprovalItem,
    pub verdict: Verdict,
    pub session_id: String,
    pub log_id: i64,
}

const ITEM_SELECT: &str = "
    SELECT q.id, q.agent_id, q.decision_id, q.request_type, q.request_data, q.created_at,
           a.task_description
    FROM approval_queue q
    LEFT JOIN agents a ON a.id = q.agent_id";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ApprovalItem> {
    Ok(ApprovalItem {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        decision_id: row.get(2)?,
        request_type: row.get(3)?,
        request_data: json_column(row, 4)?,
        created_at: row.get(5)?,
        task_description: row.get(6)?,
    })
}

pub(crate) fn insert(
    conn: &Connection,
    agent_id: &str,
    decision_id: Option<DecisionId>,
    request: &serde_json::Value,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO approval_queue (agent_id, decision_id, request_type, request_data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            agent_id,
            decision_id,
            TOOL_REQUEST,
            serde_json::to_string(request)?,
            created_at,
        ],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

impl ManagerStore {
    /// Queue a request for human review without an associated decision.
    pub fn enqueue_approval(&self, agent_id: &str, request: &serde_json::Value) -> Result<i64> {
        let id = self.transaction(|tx| {
            ensure_agent(tx, agent_id)?;
            insert(tx, agent_id, None, request, &self.timestamp())
        })?;
        info!(agent_id, item_id = id, "request queued for approval");
        Ok(id)
    }

    /// Pending items, oldest first.
    pub fn approval_queue(&self) -> Result<Vec<ApprovalItem>> {
        let db = self.db();
        let mut stmt = db
            .prepare(&format!("{ITEM_SELECT} ORDER BY q.created_at ASC, q.id ASC"))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], item_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    pub fn get_approval(&self, item_id: i64) -> Result<Option<ApprovalItem>> {
        let db = self.db();
        db.query_row(&format!("{ITEM_SELECT} WHERE q.id = ?1"), [item_id], item_from_row)
            .optional()
            .map_err(db_err)
    }

    /// Remove an item from the queue and log the human verdict as a
    /// manager_response, in one transaction.
    pub fn resolve_approval(&self, item_id: i64, verdict: Verdict) -> Result<ResolvedApproval> {
        let session_id = format!("approval_{item_id}");

        let resolved = self.transaction(|tx| {
            let item = tx
                .query_row(&format!("{ITEM_SELECT} WHERE q.id = ?1"), [item_id], item_from_row)
                .optional()
                .map_err(db_err)?
                .ok_or_else(|| MclError::not_found("approval item", item_id))?;
            tx.execute("DELETE FROM approval_queue WHERE id = ?1", [item_id])
                .map_err(db_err)?;

            let verb = match verdict {
                Verdict::Approve => "approved",
                Verdict::Deny => "denied",
                Verdict::Escalate => "re-escalated",
            };
            let response = NewInteraction::new(
                item.agent_id.as_str(),
                session_id.as_str(),
                InteractionType::ManagerResponse,
                Direction::ManagerToAgent,
                format!("Human {verb} queued {}", item.request_type),
            )
            .with_metadata(json!({
                "queue_item_id": item.id,
                "decision_id": item.decision_id,
                "decision": verdict,
                "resolved_by": "human",
                "request": item.request_data,
            }));
            let log_id = interactions::append(tx, &response, &self.timestamp())?;

            Ok(ResolvedApproval {
                item,
                verdict,
                session_id: session_id.clone(),
                log_id,
            })
        })?;

        info!(
            item_id,
            agent_id = %resolved.item.agent_id,
            decision = %verdict,
            "approval resolved"
        );
        Ok(resolved)
    }
}
