use chrono::Duration;
use mcl_autonomy::{
    AutonomyLevel, ConfidenceEstimator, EscalationOutcome, EscalationPolicy, EvaluationModel,
    ExplorationSource, assess_risk,
};
use mcl_config::ManagerConfig;
use mcl_core::{
    AgentId, AgentStatus, DecisionId, Direction, ExportFormat, Feedback, InteractionType,
    MclError, Priority, Result, SessionId, Verdict, new_agent_id, new_session_id,
};
use mcl_store::{
    AUTONOMY_LEVEL_KEY, AgentLogSummary, AgentRecord, ApprovalItem, DecisionRecord,
    EVALUATION_MODEL_KEY, InteractionEntry, LogQuery, ManagerStore, NewAgent, NewDecision,
    NewInteraction, RecordOptions, RecordedDecision, ResolvedApproval, SessionSummary,
    format_timestamp,
};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::export;
use crate::notes::{FsTaskNotes, TaskNote, TaskNotes};
use crate::simulate;

/// Posture and evaluation model, read from `manager_config` once at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerSettings {
    pub autonomy_level: AutonomyLevel,
    pub evaluation_model: EvaluationModel,
}

impl ManagerSettings {
    /// Load from the store; missing or unreadable keys fall back to defaults.
    pub fn load(store: &ManagerStore) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(raw) = store.get_setting(AUTONOMY_LEVEL_KEY)? {
            match raw.parse() {
                Ok(level) => settings.autonomy_level = level,
                Err(e) => warn!(error = %e, "ignoring stored autonomy level"),
            }
        }
        if let Some(raw) = store.get_setting(EVALUATION_MODEL_KEY)? {
            match raw.parse() {
                Ok(model) => settings.evaluation_model = model,
                Err(e) => warn!(error = %e, "ignoring stored evaluation model"),
            }
        }
        Ok(settings)
    }
}

/// Result of evaluating one agent request.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub decision_id: DecisionId,
    pub session_id: SessionId,
    pub verdict: Verdict,
    pub outcome: EscalationOutcome,
    /// Set when the request was escalated and queued for a human.
    pub queue_item_id: Option<i64>,
}

impl Evaluation {
    pub fn escalated(&self) -> bool {
        self.verdict == Verdict::Escalate
    }
}

/// Central supervisor: registers agents, evaluates their requests, records
/// decisions and feedback, and answers queries over the interaction log.
pub struct Manager {
    store: ManagerStore,
    notes: Box<dyn TaskNotes>,
    policy: EscalationPolicy,
    estimator: ConfidenceEstimator,
    settings: RwLock<ManagerSettings>,
    default_budget: i64,
}

impl Manager {
    pub const DEFAULT_BUDGET: i64 = 100;

    /// Build a manager over an open store, loading persisted settings once.
    pub fn new(store: ManagerStore, notes: Box<dyn TaskNotes>) -> Result<Self> {
        let settings = ManagerSettings::load(&store)?;
        info!(
            posture = %settings.autonomy_level,
            model = %settings.evaluation_model,
            "manager initialized"
        );
        Ok(Self {
            store,
            notes,
            policy: EscalationPolicy::default(),
            estimator: ConfidenceEstimator::default(),
            settings: RwLock::new(settings),
            default_budget: Self::DEFAULT_BUDGET,
        })
    }

    /// Open the database and task-note directory described by the config.
    pub fn open(config: &ManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = ManagerStore::open(&config.db_path())?;
        let notes = FsTaskNotes::new(config.agents_dir());
        Ok(Self::new(store, Box::new(notes))?.with_default_budget(config.default_budget))
    }

    /// Replace the exploration randomness (deterministic tests, replays).
    pub fn with_exploration(mut self, source: Box<dyn ExplorationSource>) -> Self {
        self.policy = EscalationPolicy::new(source);
        self
    }

    pub fn with_default_budget(mut self, budget: i64) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn store(&self) -> &ManagerStore {
        &self.store
    }

    pub fn default_budget(&self) -> i64 {
        self.default_budget
    }

    // ── Agents ─────────────────────────────────────────────────

    /// Register a new agent for a task. Returns the agent id and the session
    /// the spawn event was logged under.
    pub fn spawn_agent(
        &self,
        task_description: Option<&str>,
        repo_path: &str,
        priority: Priority,
        budget: Option<i64>,
    ) -> Result<(AgentId, SessionId)> {
        let task = task_description
            .ok_or_else(|| MclError::MissingField("task_description".into()))?;
        if task.trim().is_empty() {
            return Err(MclError::Validation {
                field: "task_description".into(),
                reason: "task description must not be empty".into(),
            });
        }
        let budget = budget.unwrap_or(self.default_budget);
        if budget < 0 {
            return Err(MclError::Validation {
                field: "budget".into(),
                reason: format!("budget must not be negative (got {budget})"),
            });
        }

        let agent_id = self.fresh_agent_id()?;
        let session_id = new_session_id();
        let created_at = self.store.timestamp();

        self.notes.write(&TaskNote {
            agent_id: &agent_id,
            task,
            repo_path,
            priority,
            budget,
            created_at: &created_at,
        })?;

        let agent = NewAgent {
            id: agent_id.clone(),
            task_description: task.to_string(),
            repo_path: repo_path.to_string(),
            priority,
            budget,
        };
        let event = NewInteraction::new(
            agent_id.as_str(),
            session_id.as_str(),
            InteractionType::SystemEvent,
            Direction::System,
            format!("Agent spawned for task: {task}"),
        )
        .with_metadata(json!({
            "repo_path": repo_path,
            "priority": priority,
            "budget": budget,
        }));
        if let Err(e) = self.store.register_agent(&agent, &event) {
            if let Err(cleanup) = self.notes.discard(&agent_id) {
                warn!(%agent_id, error = %cleanup, "failed to remove task note of aborted spawn");
            }
            return Err(e);
        }

        info!(%agent_id, %session_id, "agent spawned");
        Ok((agent_id, session_id))
    }

    pub fn update_agent_status(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        self.store.update_agent_status(agent_id, status)
    }

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        self.store.get_agent(agent_id)
    }

    pub fn active_agents(&self) -> Result<Vec<AgentRecord>> {
        self.store.active_agents()
    }

    pub fn all_agents(&self) -> Result<Vec<AgentRecord>> {
        self.store.all_agents()
    }

    /// Draw agent ids until one is not taken.
    fn fresh_agent_id(&self) -> Result<AgentId> {
        const ATTEMPTS: usize = 8;
        for _ in 0..ATTEMPTS {
            let id = new_agent_id();
            if !self.store.agent_exists(&id)? {
                return Ok(id);
            }
            debug!(agent_id = %id, "agent id already taken, drawing another");
        }
        Err(MclError::Validation {
            field: "agent_id".into(),
            reason: format!("no free agent id after {ATTEMPTS} attempts"),
        })
    }

    fn require_agent(&self, agent_id: &str) -> Result<()> {
        if self.store.agent_exists(agent_id)? {
            Ok(())
        } else {
            Err(MclError::not_found("agent", agent_id))
        }
    }

    // ── Settings ───────────────────────────────────────────────

    pub fn settings(&self) -> ManagerSettings {
        self.settings.read().clone()
    }

    pub fn autonomy_level(&self) -> AutonomyLevel {
        self.settings.read().autonomy_level
    }

    /// Validate, persist, and apply a new posture.
    pub fn set_autonomy_level(&self, level: &str) -> Result<AutonomyLevel> {
        let level: AutonomyLevel = level.parse()?;
        self.store.set_setting(AUTONOMY_LEVEL_KEY, level.as_str())?;
        self.settings.write().autonomy_level = level;
        info!(posture = %level, "autonomy level changed");
        Ok(level)
    }

    pub fn evaluation_model(&self) -> EvaluationModel {
        self.settings.read().evaluation_model.clone()
    }

    /// Validate, persist, and apply a new evaluation model.
    pub fn set_evaluation_model(&self, model: &str) -> Result<EvaluationModel> {
        let model: EvaluationModel = model.parse()?;
        self.store.set_setting(EVALUATION_MODEL_KEY, model.as_str())?;
        self.settings.write().evaluation_model = model.clone();
        info!(%model, "evaluation model changed");
        Ok(model)
    }

    // ── Evaluation ─────────────────────────────────────────────

    pub fn assess_risk(&self, request: &Value) -> f64 {
        assess_risk(request)
    }

    /// Confidence from feedback over the trailing window, computed fresh.
    pub fn confidence_score(&self) -> Result<f64> {
        let since = self.store.now() - Duration::days(self.estimator.window_days);
        let stats = self.store.feedback_stats(&since)?;
        Ok(self.estimator.score(&stats))
    }

    pub fn should_escalate(&self, request: &Value, confidence: f64) -> bool {
        self.policy
            .should_escalate(request, confidence, self.autonomy_level())
    }

    /// Score a request, decide, and persist the decision with its log entries.
    /// Escalated requests are also placed on the approval queue.
    pub fn evaluate(
        &self,
        agent_id: &str,
        request: &Value,
        session_id: Option<&str>,
    ) -> Result<Evaluation> {
        self.require_agent(agent_id)?;

        let confidence = self.confidence_score()?;
        let settings = self.settings();
        let outcome = self
            .policy
            .evaluate(request, confidence, settings.autonomy_level);
        let verdict = if outcome.escalate {
            Verdict::Escalate
        } else {
            Verdict::Approve
        };

        let recorded = self.store.record_decision(
            &NewDecision {
                agent_id: agent_id.to_string(),
                request: request.clone(),
                decision: verdict,
                confidence_score: confidence,
                autonomy_level: settings.autonomy_level,
                model_used: settings.evaluation_model.to_string(),
            },
            &RecordOptions {
                session_id,
                reasoning: Some(outcome.reason.as_str()),
                enqueue: outcome.escalate,
            },
        )?;

        Ok(Evaluation {
            decision_id: recorded.decision_id,
            session_id: recorded.session_id,
            verdict,
            outcome,
            queue_item_id: recorded.queue_item_id,
        })
    }

    // ── Decisions ──────────────────────────────────────────────

    /// Record a decision made elsewhere, tagged with the current posture.
    /// `model_used` defaults to the configured evaluation model.
    pub fn record_decision(
        &self,
        agent_id: &str,
        request: &Value,
        decision: Verdict,
        confidence_score: f64,
        model_used: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<RecordedDecision> {
        self.require_agent(agent_id)?;
        let settings = self.settings();
        let model_used = model_used
            .map(str::to_string)
            .unwrap_or_else(|| settings.evaluation_model.to_string());

        self.store.record_decision(
            &NewDecision {
                agent_id: agent_id.to_string(),
                request: request.clone(),
                decision,
                confidence_score,
                autonomy_level: settings.autonomy_level,
                model_used,
            },
            &RecordOptions {
                session_id,
                ..RecordOptions::default()
            },
        )
    }

    /// Attach `correct` / `incorrect` feedback to a decision.
    pub fn provide_feedback(&self, decision_id: DecisionId, feedback: &str) -> Result<Feedback> {
        let feedback: Feedback = feedback.parse()?;
        self.store.provide_feedback(decision_id, feedback)?;
        Ok(feedback)
    }

    pub fn decision_history(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        self.store.decision_history(limit)
    }

    // ── Interaction log ────────────────────────────────────────

    pub fn log_interaction(&self, entry: &NewInteraction) -> Result<i64> {
        self.store.log_interaction(entry)
    }

    pub fn get_logs(&self, query: &LogQuery) -> Result<Vec<InteractionEntry>> {
        self.store.get_logs(query)
    }

    pub fn get_sessions(&self, agent_id: &str) -> Result<Vec<SessionSummary>> {
        self.store.get_sessions(agent_id)
    }

    pub fn search_logs(
        &self,
        term: &str,
        agent_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<InteractionEntry>> {
        self.store.search_logs(term, agent_id, limit)
    }

    pub fn agent_log_summaries(&self) -> Result<Vec<AgentLogSummary>> {
        self.store.agent_log_summaries()
    }

    /// Export every log entry of an agent as `json` or `text`.
    pub fn export_logs(&self, agent_id: &str, format: &str) -> Result<String> {
        let format: ExportFormat = format.parse()?;
        let entries = self.store.get_logs(&LogQuery::for_agent(agent_id))?;
        let exported_at = format_timestamp(&self.store.now());
        export::render(agent_id, &entries, format, &exported_at)
    }

    // ── Approval queue ─────────────────────────────────────────

    pub fn approval_queue(&self) -> Result<Vec<ApprovalItem>> {
        self.store.approval_queue()
    }

    /// Settle a queued request with a human verdict.
    pub fn resolve_approval(&self, item_id: i64, approve: bool) -> Result<ResolvedApproval> {
        let verdict = if approve { Verdict::Approve } else { Verdict::Deny };
        self.store.resolve_approval(item_id, verdict)
    }

    // ── Simulation ─────────────────────────────────────────────

    /// Replay requests as if an agent sent them: evaluate each in order, then
    /// log the agent's synthetic output for that verdict.
    pub fn simulate(
        &self,
        agent_id: &str,
        session_id: &str,
        requests: &[Value],
    ) -> Result<Vec<Evaluation>> {
        self.require_agent(agent_id)?;
        let mut evaluations = Vec::with_capacity(requests.len());

        for request in requests {
            let evaluation = self.evaluate(agent_id, request, Some(session_id))?;
            let (content, status) = simulate::agent_output(request, evaluation.verdict);
            self.store.log_interaction(
                &NewInteraction::new(
                    agent_id,
                    session_id,
                    InteractionType::AgentOutput,
                    Direction::AgentToManager,
                    content,
                )
                .with_metadata(json!({
                    "decision_id": evaluation.decision_id,
                    "status": status,
                })),
            )?;
            evaluations.push(evaluation);
        }

        info!(
            agent_id,
            session_id,
            requests = requests.len(),
            escalated = evaluations.iter().filter(|e| e.escalated()).count(),
            "simulation finished"
        );
        Ok(evaluations)
    }

    /// Session id for a simulation started now.
    pub fn new_simulation_session(&self) -> SessionId {
        simulate::simulation_session_id(&self.store.now().format("%Y%m%d_%H%M%S").to_string())
    }
}
