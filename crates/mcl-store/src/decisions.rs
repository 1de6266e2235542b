use chrono::{DateTime, Utc};
use mcl_autonomy::{AutonomyLevel, FeedbackStats};
use mcl_core::{
    AgentId, DecisionId, Direction, Feedback, InteractionType, MclError, Result, Verdict,
};
use rusqlite::{OptionalExtension, Row, params};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::interactions::{self, NewInteraction};
use crate::queue;
use crate::store::{
    ManagerStore, db_err, ensure_agent, format_timestamp, json_column, parse_column,
    parse_optional_column,
};

/// A decision about to be recorded.
#[derive(Debug, Clone)]
pub struct NewDecision {
    pub agent_id: AgentId,
    pub request: serde_json::Value,
    pub decision: Verdict,
    pub confidence_score: f64,
    pub autonomy_level: AutonomyLevel,
    pub model_used: String,
}

/// A persisted decision. `task_description` is filled by history queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub id: DecisionId,
    pub agent_id: AgentId,
    pub request_data: serde_json::Value,
    pub decision: Verdict,
    pub confidence_score: f64,
    pub autonomy_level: AutonomyLevel,
    pub model_used: String,
    pub user_feedback: Option<Feedback>,
    pub created_at: String,
    pub task_description: Option<String>,
}

/// Row ids written by [`ManagerStore::record_decision`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedDecision {
    pub decision_id: DecisionId,
    pub session_id: String,
    pub request_log_id: i64,
    pub response_log_id: i64,
    pub queue_item_id: Option<i64>,
}

/// How a decision is written alongside its log entries.
#[derive(Debug, Clone, Default)]
pub struct RecordOptions<'a> {
    /// Session for the two log entries; synthesized from the clock when absent.
    pub session_id: Option<&'a str>,
    /// Human-readable explanation stored in the response metadata.
    pub reasoning: Option<&'a str>,
    /// Also place the request on the approval queue.
    pub enqueue: bool,
}

fn decision_from_row(row: &Row<'_>) -> rusqlite::Result<DecisionRecord> {
    Ok(DecisionRecord {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        request_data: json_column(row, 2)?,
        decision: parse_column(row, 3)?,
        confidence_score: row.get(4)?,
        autonomy_level: parse_column(row, 5)?,
        model_used: row.get(6)?,
        user_feedback: parse_optional_column(row, 7)?,
        created_at: row.get(8)?,
        task_description: row.get(9)?,
    })
}

const DECISION_SELECT: &str = "
    SELECT d.id, d.agent_id, d.request_data, d.decision, d.confidence_score,
           d.autonomy_level, d.model_used, d.user_feedback, d.created_at, a.task_description
    FROM decisions d
    LEFT JOIN agents a ON a.id = d.agent_id";

/// Session id used when a decision is recorded outside any conversation.
pub fn synthesized_session_id(at: &DateTime<Utc>) -> String {
    format!("decision_{}", at.format("%Y%m%d_%H%M%S"))
}

fn default_reasoning(decision: &NewDecision) -> String {
    format!(
        "{} at confidence {:.2} under {} autonomy",
        decision.decision, decision.confidence_score, decision.autonomy_level
    )
}

impl ManagerStore {
    /// Persist a decision together with the agent_request and manager_response
    /// log entries (and optionally an approval queue item) in one transaction.
    pub fn record_decision(
        &self,
        decision: &NewDecision,
        options: &RecordOptions<'_>,
    ) -> Result<RecordedDecision> {
        let confidence = decision.confidence_score.clamp(0.0, 1.0);
        let request_json = serde_json::to_string(&decision.request)?;
        let reasoning = options
            .reasoning
            .map(str::to_string)
            .unwrap_or_else(|| default_reasoning(decision));

        let recorded = self.transaction(|tx| {
            ensure_agent(tx, &decision.agent_id)?;

            let created_at = self.now();
            let session_id = match options.session_id {
                Some(s) => s.to_string(),
                None => synthesized_session_id(&created_at),
            };
            let created_at = format_timestamp(&created_at);
            let request_at = self.timestamp();
            let response_at = self.timestamp();

            tx.execute(
                "INSERT INTO decisions
                    (agent_id, request_data, decision, confidence_score, autonomy_level, model_used, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    decision.agent_id,
                    request_json,
                    decision.decision.as_str(),
                    confidence,
                    decision.autonomy_level.as_str(),
                    decision.model_used,
                    created_at,
                ],
            )
            .map_err(db_err)?;
            let decision_id = tx.last_insert_rowid();

            let request_log_id = interactions::append(
                tx,
                &NewInteraction::new(
                    decision.agent_id.as_str(),
                    session_id.as_str(),
                    InteractionType::AgentRequest,
                    Direction::AgentToManager,
                    request_json.as_str(),
                ),
                &request_at,
            )?;

            let response = NewInteraction::new(
                decision.agent_id.as_str(),
                session_id.as_str(),
                InteractionType::ManagerResponse,
                Direction::ManagerToAgent,
                format!("Decision: {} ({})", decision.decision, reasoning),
            )
            .with_metadata(json!({
                "decision_id": decision_id,
                "decision": decision.decision,
                "confidence_score": confidence,
                "autonomy_level": decision.autonomy_level,
                "model_used": decision.model_used,
                "reasoning": reasoning,
            }));
            let response_log_id = interactions::append(tx, &response, &response_at)?;

            let queue_item_id = if options.enqueue {
                Some(queue::insert(
                    tx,
                    &decision.agent_id,
                    Some(decision_id),
                    &decision.request,
                    &created_at,
                )?)
            } else {
                None
            };

            Ok(RecordedDecision {
                decision_id,
                session_id,
                request_log_id,
                response_log_id,
                queue_item_id,
            })
        })?;

        info!(
            agent_id = %decision.agent_id,
            decision_id = recorded.decision_id,
            decision = %decision.decision,
            confidence = confidence,
            posture = %decision.autonomy_level,
            "decision recorded"
        );
        Ok(recorded)
    }

    /// Attach human feedback to a decision. Last write wins.
    pub fn provide_feedback(&self, decision_id: DecisionId, feedback: Feedback) -> Result<()> {
        let db = self.db();
        let rows = db
            .execute(
                "UPDATE decisions SET user_feedback = ?1 WHERE id = ?2",
                params![feedback.as_str(), decision_id],
            )
            .map_err(db_err)?;
        if rows == 0 {
            return Err(MclError::not_found("decision", decision_id));
        }
        info!(decision_id, %feedback, "feedback recorded");
        Ok(())
    }

    pub fn get_decision(&self, decision_id: DecisionId) -> Result<Option<DecisionRecord>> {
        let db = self.db();
        db.query_row(
            &format!("{DECISION_SELECT} WHERE d.id = ?1"),
            [decision_id],
            decision_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    /// Most recent decisions first, with the agent's task for display.
    pub fn decision_history(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let db = self.db();
        let mut stmt = db
            .prepare(&format!(
                "{DECISION_SELECT} ORDER BY d.created_at DESC, d.id DESC LIMIT ?1"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([limit], decision_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Aggregate feedback over decisions created at or after `since`.
    pub fn feedback_stats(&self, since: &DateTime<Utc>) -> Result<FeedbackStats> {
        let db = self.db();
        let (total, correct, avg): (i64, Option<i64>, Option<f64>) = db
            .query_row(
                "SELECT COUNT(*),
                        SUM(CASE WHEN user_feedback = 'correct' THEN 1 ELSE 0 END),
                        AVG(confidence_score)
                 FROM decisions
                 WHERE user_feedback IS NOT NULL AND created_at >= ?1",
                [format_timestamp(since)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(db_err)?;

        Ok(FeedbackStats {
            total: u64::try_from(total).unwrap_or(0),
            correct: u64::try_from(correct.unwrap_or(0)).unwrap_or(0),
            avg_confidence: avg.unwrap_or(0.0),
        })
    }
}
