use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use mcl_autonomy::{AutonomyLevel, EvaluationModel};
use mcl_config::{ConfigLoader, MclConfig};
use mcl_core::{AgentStatus, MclError, Priority, Result};
use mcl_manager::{Manager, sample_requests};
use mcl_store::LogQuery;

use crate::render;

/// 🧠 mcl: supervise parallel coding agents with risk-scored approvals
#[derive(Parser)]
#[command(name = "mcl", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to mcl.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding manager.db and agent task notes
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new agent for a task
    Spawn {
        /// Task description
        task: String,
        /// Repository the agent works in
        #[arg(short, long, default_value = ".")]
        repo: String,
        /// low, normal, or high
        #[arg(short, long, default_value = "normal")]
        priority: String,
        /// Budget in dollars (defaults to manager.default_budget)
        #[arg(short, long)]
        budget: Option<i64>,
    },
    /// Show active agents
    Status {
        /// Include completed, failed and cancelled agents
        #[arg(long)]
        all: bool,
    },
    /// Mark an agent as finished
    Complete {
        agent_id: String,
        /// Mark as failed instead of completed
        #[arg(long)]
        failed: bool,
    },
    /// Evaluate a tool request (JSON) on behalf of an agent
    Evaluate {
        agent_id: String,
        /// Request payload, e.g. '{"tool":"bash","command":"ls"}'
        request: String,
        /// Session to log the exchange under
        #[arg(short, long)]
        session: Option<String>,
    },
    /// List requests awaiting human approval
    Queue,
    /// Approve or deny a queued request
    Resolve {
        item_id: i64,
        #[arg(long, conflicts_with = "deny", required_unless_present = "deny")]
        approve: bool,
        #[arg(long)]
        deny: bool,
    },
    /// Show or change the autonomy level and evaluation model
    Config {
        /// conservative, balanced, or aggressive
        #[arg(long)]
        autonomy: Option<String>,
        /// Evaluation model label
        #[arg(long)]
        model: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record whether a decision was correct
    Feedback {
        decision_id: i64,
        /// correct or incorrect
        feedback: String,
    },
    /// Show recent decisions
    History {
        /// Number of decisions to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Show interaction logs (lists agents with logs when no agent is given)
    Logs {
        agent_id: Option<String>,
        /// Only this session
        #[arg(short, long)]
        session: Option<String>,
        /// Only this interaction type (agent_request, manager_response, agent_output, system_event)
        #[arg(short = 't', long = "type")]
        interaction_type: Option<String>,
        /// Maximum entries to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Case-sensitive text search across log content
        #[arg(long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the sessions of an agent
    Sessions { agent_id: String },
    /// Export an agent's interaction log
    Export {
        agent_id: String,
        /// json or text
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay a set of sample tool requests through the manager
    Simulate { agent_id: String },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let mut config = config_loader.get();
        if let Some(dir) = &self.data_dir {
            config.manager.data_dir = dir.clone();
        }

        // --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug".to_string()
        } else if self.quiet {
            "error".to_string()
        } else {
            self.log_level
                .clone()
                .unwrap_or_else(|| config.logging.level.clone())
        };
        init_tracing(&config, &log_level);
        debug!(
            config = %config_loader.path().display(),
            data_dir = %config.manager.data_dir.display(),
            "configuration loaded"
        );

        let manager = Manager::open(&config.manager)?;

        match self.command {
            Commands::Spawn {
                task,
                repo,
                priority,
                budget,
            } => cmd_spawn(&manager, &task, &repo, &priority, budget),
            Commands::Status { all } => cmd_status(&manager, all),
            Commands::Complete { agent_id, failed } => cmd_complete(&manager, &agent_id, failed),
            Commands::Evaluate {
                agent_id,
                request,
                session,
            } => cmd_evaluate(&manager, &agent_id, &request, session.as_deref()),
            Commands::Queue => cmd_queue(&manager),
            Commands::Resolve { item_id, approve, .. } => cmd_resolve(&manager, item_id, approve),
            Commands::Config {
                autonomy,
                model,
                json,
            } => cmd_config(&manager, &config, autonomy, model, json),
            Commands::Feedback {
                decision_id,
                feedback,
            } => cmd_feedback(&manager, decision_id, &feedback),
            Commands::History { limit } => cmd_history(&manager, limit),
            Commands::Logs {
                agent_id,
                session,
                interaction_type,
                limit,
                search,
                json,
            } => match search {
                Some(term) => cmd_search(&manager, &term, agent_id.as_deref(), limit, json),
                None => match log_query(agent_id, session, interaction_type.as_deref(), limit)? {
                    Some(query) => cmd_logs(&manager, &query, json),
                    None => cmd_log_agents(&manager),
                },
            },
            Commands::Sessions { agent_id } => cmd_sessions(&manager, &agent_id),
            Commands::Export {
                agent_id,
                format,
                output,
            } => cmd_export(&manager, &agent_id, &format, output),
            Commands::Simulate { agent_id } => cmd_simulate(&manager, &agent_id),
        }
    }
}

fn init_tracing(config: &MclConfig, log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format.as_str() {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.compact().with_target(false).init(),
        _ => builder.with_target(false).init(),
    }
}

fn cmd_spawn(
    manager: &Manager,
    task: &str,
    repo: &str,
    priority: &str,
    budget: Option<i64>,
) -> Result<()> {
    let priority: Priority = priority.parse()?;
    let (agent_id, session_id) = manager.spawn_agent(Some(task), repo, priority, budget)?;
    let agent = manager
        .get_agent(&agent_id)?
        .ok_or_else(|| MclError::not_found("agent", &agent_id))?;

    println!("🤖 Task queued with agent {agent_id}");
    println!("   Task:     {}", agent.task_description);
    println!("   Repo:     {}", agent.repo_path);
    println!("   Priority: {}", agent.priority);
    println!("   Budget:   ${}", agent.budget);
    println!("   Session:  {session_id}");
    Ok(())
}

fn cmd_status(manager: &Manager, all: bool) -> Result<()> {
    let agents = if all {
        manager.all_agents()?
    } else {
        manager.active_agents()?
    };
    if agents.is_empty() {
        println!("📭 No active agents");
        return Ok(());
    }

    let settings = manager.settings();
    println!(
        "{} ({} agents, {} autonomy)",
        render::heading("AGENTS:"),
        agents.len(),
        settings.autonomy_level
    );
    println!("{}", render::rule());
    for agent in &agents {
        println!(
            "{}  {:<9}  {:<6}  ${:<5}  {}",
            agent.id,
            agent.status,
            agent.priority,
            agent.budget,
            render::truncate(&agent.task_description, 40)
        );
        println!(
            "          {}  {}",
            render::short_time(&agent.created_at),
            agent.repo_path
        );
    }
    Ok(())
}

fn cmd_complete(manager: &Manager, agent_id: &str, failed: bool) -> Result<()> {
    let status = if failed {
        AgentStatus::Failed
    } else {
        AgentStatus::Completed
    };
    manager.update_agent_status(agent_id, status)?;
    println!("✅ Agent {agent_id} marked {status}");
    Ok(())
}

fn cmd_evaluate(
    manager: &Manager,
    agent_id: &str,
    request: &str,
    session: Option<&str>,
) -> Result<()> {
    let request: serde_json::Value = serde_json::from_str(request)?;
    let evaluation = manager.evaluate(agent_id, &request, session)?;

    println!(
        "{}  decision #{}",
        render::verdict(evaluation.verdict),
        evaluation.decision_id
    );
    println!(
        "   Risk:       {} ({})",
        render::risk(evaluation.outcome.risk.score),
        evaluation.outcome.risk.describe()
    );
    println!("   Confidence: {:.2}", evaluation.outcome.confidence);
    println!("   Autonomy:   {}", evaluation.outcome.level);
    println!("   Reason:     {}", evaluation.outcome.reason);
    println!("   Session:    {}", evaluation.session_id);
    if let Some(item) = evaluation.queue_item_id {
        println!("   ⏳ Queued for approval as item {item} (mcl resolve {item} --approve|--deny)");
    }
    Ok(())
}

fn cmd_queue(manager: &Manager) -> Result<()> {
    let queue = manager.approval_queue()?;
    if queue.is_empty() {
        println!("📭 No pending approvals");
        return Ok(());
    }

    println!("{} ({})", render::heading("PENDING APPROVALS:"), queue.len());
    println!("{}", render::rule());
    for item in &queue {
        println!(
            "#{:<4} {}  {}  {}",
            item.id,
            item.agent_id,
            item.request_type,
            render::truncate(item.task_description.as_deref().unwrap_or("-"), 40)
        );
        println!(
            "      {}  {}",
            render::short_time(&item.created_at),
            render::truncate(&item.request_data.to_string(), 80)
        );
    }
    Ok(())
}

fn cmd_resolve(manager: &Manager, item_id: i64, approve: bool) -> Result<()> {
    let resolved = manager.resolve_approval(item_id, approve)?;
    println!(
        "{} item {} for agent {}",
        render::verdict(resolved.verdict),
        item_id,
        resolved.item.agent_id
    );
    Ok(())
}

fn cmd_config(
    manager: &Manager,
    config: &MclConfig,
    autonomy: Option<String>,
    model: Option<String>,
    json: bool,
) -> Result<()> {
    if let Some(level) = autonomy {
        let level = manager.set_autonomy_level(&level)?;
        println!("✅ Autonomy level set to {level}");
    }
    if let Some(model) = model {
        let model = manager.set_evaluation_model(&model)?;
        println!("✅ Evaluation model set to {model}");
    }

    let settings = manager.settings();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "autonomy_level": settings.autonomy_level,
                "evaluation_model": settings.evaluation_model,
                "confidence_score": manager.confidence_score()?,
                "data_dir": config.manager.data_dir,
                "default_budget": config.manager.default_budget,
            }))?
        );
        return Ok(());
    }

    println!("{}", render::heading("CURRENT CONFIGURATION:"));
    println!(
        "   Autonomy level:   {} ({})",
        settings.autonomy_level,
        settings.autonomy_level.description()
    );
    println!("   Evaluation model: {}", settings.evaluation_model);
    println!("   Confidence:       {:.2}", manager.confidence_score()?);
    println!("   Data directory:   {}", config.manager.data_dir.display());
    println!("   Default budget:   ${}", config.manager.default_budget);
    println!();
    println!("   Autonomy levels:");
    for level in AutonomyLevel::ALL {
        let t = level.thresholds();
        println!(
            "     {:<13} confidence ≥ {:.1}, risk ≤ {:.1}  {}",
            level.as_str(),
            t.confidence,
            t.risk,
            level.description()
        );
    }
    println!("   Models: {}", EvaluationModel::ALLOWED.join(", "));
    Ok(())
}

fn cmd_feedback(manager: &Manager, decision_id: i64, feedback: &str) -> Result<()> {
    let feedback = manager.provide_feedback(decision_id, feedback)?;
    println!("✅ Feedback recorded for decision {decision_id}: {feedback}");
    Ok(())
}

fn cmd_history(manager: &Manager, limit: usize) -> Result<()> {
    let decisions = manager.decision_history(limit)?;
    if decisions.is_empty() {
        println!("📭 No decisions recorded");
        return Ok(());
    }

    println!("{}", render::heading("DECISION HISTORY:"));
    println!("{}", render::rule());
    for d in &decisions {
        let feedback = d
            .user_feedback
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<4} {}  {}  conf {:.2}  {}  feedback: {}",
            d.id,
            render::short_time(&d.created_at),
            render::verdict(d.decision),
            d.confidence_score,
            d.autonomy_level,
            feedback
        );
        println!(
            "      {} ({})  {}",
            d.agent_id,
            render::truncate(d.task_description.as_deref().unwrap_or("-"), 30),
            render::truncate(&d.request_data.to_string(), 60)
        );
    }
    Ok(())
}

fn print_entry(entry: &mcl_store::InteractionEntry, show_agent: bool) {
    let agent = if show_agent {
        format!("{} ", entry.agent_id)
    } else {
        String::new()
    };
    println!(
        "[{}] {}{} {:<16} {}",
        render::short_time(&entry.timestamp),
        agent,
        render::direction(entry.direction),
        entry.interaction_type,
        render::truncate(&entry.content, 100)
    );
    if let Some(metadata) = &entry.metadata {
        println!("      📋 {}", render::truncate(&metadata.to_string(), 100));
    }
}

/// Query for `mcl logs`. `None` when neither an agent nor a filter was given,
/// which lists the agents that have logs instead.
fn log_query(
    agent_id: Option<String>,
    session: Option<String>,
    interaction_type: Option<&str>,
    limit: Option<usize>,
) -> Result<Option<LogQuery>> {
    if agent_id.is_none() && session.is_none() && interaction_type.is_none() {
        return Ok(None);
    }
    Ok(Some(LogQuery {
        agent_id,
        session_id: session,
        interaction_type: interaction_type.map(str::parse).transpose()?,
        limit,
    }))
}

fn cmd_logs(manager: &Manager, query: &LogQuery, json: bool) -> Result<()> {
    let entries = manager.get_logs(query)?;
    let scope = match &query.agent_id {
        Some(agent_id) => format!("agent {agent_id}"),
        None => "all agents".to_string(),
    };
    if entries.is_empty() {
        println!("📭 No logs found for {scope}");
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "{} ({} entries)",
        render::heading(&format!("INTERACTION LOGS FOR {}:", scope.to_uppercase())),
        entries.len()
    );
    println!("{}", render::rule());
    let mut current_session: Option<&str> = None;
    for entry in &entries {
        if current_session != Some(entry.session_id.as_str()) {
            println!("── session {}", entry.session_id);
            current_session = Some(entry.session_id.as_str());
        }
        print_entry(entry, query.agent_id.is_none());
    }
    Ok(())
}

fn cmd_search(
    manager: &Manager,
    term: &str,
    agent_id: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let results = manager.search_logs(term, agent_id, limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    println!("{}", render::heading(&format!("SEARCH RESULTS FOR '{term}':")));
    println!("{}", render::rule());
    if results.is_empty() {
        println!("📭 No matching log entries");
        return Ok(());
    }
    for entry in &results {
        print_entry(entry, true);
    }
    Ok(())
}

fn cmd_log_agents(manager: &Manager) -> Result<()> {
    let summaries = manager.agent_log_summaries()?;
    if summaries.is_empty() {
        println!("📭 No interaction logs yet");
        return Ok(());
    }

    println!("{}", render::heading("AGENTS WITH INTERACTION LOGS:"));
    println!("{}", render::rule());
    for s in &summaries {
        println!(
            "{}  {:>5} entries  {} → {}  {}",
            s.agent_id,
            s.entry_count,
            render::short_time(&s.first_timestamp),
            render::short_time(&s.last_timestamp),
            render::truncate(s.task_description.as_deref().unwrap_or("-"), 40)
        );
    }
    println!();
    println!("Use `mcl logs <agent_id>` to view an agent's log.");
    Ok(())
}

fn cmd_sessions(manager: &Manager, agent_id: &str) -> Result<()> {
    let sessions = manager.get_sessions(agent_id)?;
    println!("{}", render::heading(&format!("SESSIONS FOR AGENT {agent_id}:")));
    println!("{}", render::rule());
    if sessions.is_empty() {
        println!("📭 No sessions found");
        return Ok(());
    }
    for s in &sessions {
        println!(
            "{:<40} {:>4} interactions  {} → {}",
            s.session_id,
            s.interaction_count,
            render::short_time(&s.started_at),
            render::short_time(&s.ended_at)
        );
    }
    Ok(())
}

fn cmd_export(
    manager: &Manager,
    agent_id: &str,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let exported = manager.export_logs(agent_id, format)?;
    match output {
        Some(path) => {
            std::fs::write(&path, &exported)?;
            println!("✅ Exported logs for agent {agent_id} to {}", path.display());
        }
        None => println!("{exported}"),
    }
    Ok(())
}

fn cmd_simulate(manager: &Manager, agent_id: &str) -> Result<()> {
    let session_id = manager.new_simulation_session();
    let requests = sample_requests();
    println!(
        "🎭 Simulating {} tool requests for agent {agent_id} (session {session_id})",
        requests.len()
    );

    let evaluations = manager.simulate(agent_id, &session_id, &requests)?;
    for (request, evaluation) in requests.iter().zip(&evaluations) {
        println!(
            "   {}  risk {}  {}",
            render::verdict(evaluation.verdict),
            render::risk(evaluation.outcome.risk.score),
            request
        );
    }

    let escalated = evaluations.iter().filter(|e| e.escalated()).count();
    println!();
    println!(
        "✅ {} approved, {} escalated. View with `mcl logs {agent_id} --session {session_id}`",
        evaluations.len() - escalated,
        escalated
    );
    Ok(())
}
