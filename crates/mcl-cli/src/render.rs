use console::style;
use mcl_core::{Direction, Verdict};

/// `2024-05-01T12:00:00.000001Z` → `2024-05-01 12:00:00`.
pub fn short_time(ts: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(ts) {
        Ok(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}

/// Cut to at most `max` characters on a char boundary, marking the cut.
pub fn truncate(s: &str, max: usize) -> String {
    let single_line = s.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

pub fn verdict(v: Verdict) -> String {
    match v {
        Verdict::Approve => style("✅ approve").green().to_string(),
        Verdict::Deny => style("🚫 deny").red().to_string(),
        Verdict::Escalate => style("⚠️  escalate").yellow().to_string(),
    }
}

pub fn direction(d: Direction) -> String {
    match d {
        Direction::AgentToManager => style(d.glyph()).cyan().to_string(),
        Direction::ManagerToAgent => style(d.glyph()).magenta().to_string(),
        Direction::System => style(d.glyph()).dim().to_string(),
    }
}

/// Risk score colored by band.
pub fn risk(score: f64) -> String {
    let text = format!("{score:.2}");
    if score >= 0.9 {
        style(text).red().bold().to_string()
    } else if score >= 0.5 {
        style(text).yellow().to_string()
    } else {
        style(text).green().to_string()
    }
}

pub fn heading(text: &str) -> String {
    style(text).bold().to_string()
}

pub fn rule() -> String {
    "-".repeat(72)
}
