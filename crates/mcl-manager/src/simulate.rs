use mcl_core::Verdict;
use serde_json::{Value, json};

/// The canned requests `mcl simulate` replays: a spread from harmless reads
/// to a destructive command.
pub fn sample_requests() -> Vec<Value> {
    vec![
        json!({"tool": "read", "file": "src/main.py"}),
        json!({"tool": "grep", "pattern": "TODO", "path": "src/"}),
        json!({"tool": "edit", "file": "src/auth.py", "content": "add password hashing"}),
        json!({"tool": "bash", "command": "pytest tests/"}),
        json!({"tool": "bash", "command": "rm -rf build/"}),
    ]
}

/// Session id for a simulation started at `stamp` (`YYYYmmdd_HHMMSS`).
pub fn simulation_session_id(stamp: &str) -> String {
    format!("sim_session_{stamp}")
}

/// Synthetic agent output following a verdict: (content, status).
pub(crate) fn agent_output(request: &Value, verdict: Verdict) -> (String, &'static str) {
    let tool = request.get("tool").and_then(Value::as_str).unwrap_or("operation");
    let target = ["file", "command", "pattern"]
        .iter()
        .find_map(|k| request.get(*k).and_then(Value::as_str));
    let subject = match target {
        Some(t) => format!("{tool} `{t}`"),
        None => tool.to_string(),
    };

    match verdict {
        Verdict::Approve => (format!("Executed {subject}: completed successfully"), "completed"),
        Verdict::Escalate => (format!("Paused on {subject}: awaiting approval"), "awaiting_approval"),
        Verdict::Deny => (format!("Skipped {subject}: denied by manager"), "denied"),
    }
}
