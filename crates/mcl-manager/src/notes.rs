use std::path::PathBuf;

use mcl_core::{Priority, Result};
use tracing::debug;

/// Everything written into an agent's task note at spawn time.
#[derive(Debug, Clone, Copy)]
pub struct TaskNote<'a> {
    pub agent_id: &'a str,
    pub task: &'a str,
    pub repo_path: &'a str,
    pub priority: Priority,
    pub budget: i64,
    pub created_at: &'a str,
}

/// Destination for per-agent task notes.
pub trait TaskNotes: Send + Sync {
    /// Persist the note. Returns where it was written, if anywhere.
    fn write(&self, note: &TaskNote<'_>) -> Result<Option<PathBuf>>;

    /// Remove whatever `write` left for this agent.
    fn discard(&self, agent_id: &str) -> Result<()>;
}

/// Writes `<root>/<agent_id>/TASK_MEMORY.md`.
#[derive(Debug, Clone)]
pub struct FsTaskNotes {
    root: PathBuf,
}

impl FsTaskNotes {
    pub const FILE_NAME: &'static str = "TASK_MEMORY.md";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, agent_id: &str) -> PathBuf {
        self.root.join(agent_id).join(Self::FILE_NAME)
    }
}

impl TaskNotes for FsTaskNotes {
    fn write(&self, note: &TaskNote<'_>) -> Result<Option<PathBuf>> {
        let path = self.path_for(note.agent_id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, render_task_note(note))?;
        debug!(agent_id = note.agent_id, ?path, "task note written");
        Ok(Some(path))
    }

    fn discard(&self, agent_id: &str) -> Result<()> {
        let dir = self.root.join(agent_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(agent_id, ?dir, "task note discarded");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Markdown body of a task note.
pub fn render_task_note(note: &TaskNote<'_>) -> String {
    format!(
        "# Task Memory\n\
         \n\
         **Agent:** {agent}\n\
         **Created:** {created}\n\
         **Priority:** {priority}\n\
         **Budget:** ${budget}\n\
         **Repository:** {repo}\n\
         \n\
         ## Task\n\
         \n\
         {task}\n\
         \n\
         ## Supervision\n\
         \n\
         This agent works under manager supervision. Tool requests are scored for risk\n\
         and either approved automatically or escalated for human approval.\n\
         \n\
         ### Work Log\n\
         \n\
         - [{created}] Agent spawned, TASK_MEMORY.md created\n",
        agent = note.agent_id,
        created = note.created_at,
        priority = note.priority,
        budget = note.budget,
        repo = note.repo_path,
        task = note.task,
    )
}
