use std::fmt::Write as _;

use mcl_core::{ExportFormat, Result};
use mcl_store::InteractionEntry;

const RULE: &str = "================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------";

/// Render an agent's log entries (in insertion order) in the given format.
pub fn render(
    agent_id: &str,
    entries: &[InteractionEntry],
    format: ExportFormat,
    exported_at: &str,
) -> Result<String> {
    match format {
        ExportFormat::Json => render_json(entries),
        ExportFormat::Text => Ok(render_text(agent_id, entries, exported_at)),
    }
}

/// Pretty JSON array; metadata is emitted as a decoded object, not a string.
pub fn render_json(entries: &[InteractionEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Human-readable transcript, one block per session in chronological order.
pub fn render_text(agent_id: &str, entries: &[InteractionEntry], exported_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "INTERACTION LOG - Agent {agent_id}");
    let _ = writeln!(out, "Exported: {exported_at}");
    let _ = writeln!(out, "Entries: {}", entries.len());
    let _ = writeln!(out, "{RULE}");

    for (session_id, session) in group_by_session(entries) {
        let _ = writeln!(out);
        let _ = writeln!(out, "SESSION {session_id}");
        let _ = writeln!(out, "{THIN_RULE}");
        for entry in session {
            let _ = writeln!(
                out,
                "[{}] {} {}",
                entry.timestamp,
                entry.direction.glyph(),
                entry.interaction_type
            );
            for line in entry.content.lines() {
                let _ = writeln!(out, "    {line}");
            }
            if let Some(metadata) = &entry.metadata {
                let _ = writeln!(out, "    📋 {metadata}");
            }
        }
    }
    out
}

/// Sessions ordered by their first entry; entries keep their order inside a session.
fn group_by_session(entries: &[InteractionEntry]) -> Vec<(&str, Vec<&InteractionEntry>)> {
    let mut groups: Vec<(&str, Vec<&InteractionEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(id, _)| *id == entry.session_id) {
            Some((_, session)) => session.push(entry),
            None => groups.push((entry.session_id.as_str(), vec![entry])),
        }
    }
    groups
}
