#[cfg(test)]
mod tests {
    use std::path::Path;

    use mcl_core::{AgentStatus, Direction, InteractionType, MclError, Priority, Verdict};
    use mcl_manager::{FsTaskNotes, Manager};
    use mcl_store::{LogQuery, ManagerStore, NewInteraction, format_timestamp};
    use serde_json::json;

    /// In-memory store, notes under `dir`, exploration never fires.
    fn manager(dir: &Path) -> Manager {
        Manager::new(
            ManagerStore::open_in_memory().unwrap(),
            Box::new(FsTaskNotes::new(dir.join("agents"))),
        )
        .unwrap()
        .with_exploration(Box::new(|| 0.99))
    }

    fn spawn(manager: &Manager, task: &str) -> String {
        manager
            .spawn_agent(Some(task), "/repo", Priority::Normal, None)
            .unwrap()
            .0
    }

    // ── Spawning ───────────────────────────────────────────────

    mod spawn {
        use super::*;

        #[test]
        fn test_spawn_logs_one_system_event() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let (agent_id, session_id) = manager
                .spawn_agent(Some("Fix bug"), "/repo", Priority::High, Some(150))
                .unwrap();
            assert_eq!(agent_id.len(), 8);
            assert_ne!(agent_id, session_id);

            let logs = manager.get_logs(&LogQuery::for_agent(agent_id.as_str())).unwrap();
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].interaction_type, InteractionType::SystemEvent);
            assert_eq!(logs[0].direction, Direction::System);
            assert_eq!(logs[0].session_id, session_id);
            assert!(logs[0].content.contains("Agent spawned for task"));
            let meta = logs[0].metadata.as_ref().unwrap();
            assert_eq!(meta["repo_path"], "/repo");
            assert_eq!(meta["priority"], "high");
            assert_eq!(meta["budget"], 150);
        }

        #[test]
        fn test_spawn_writes_task_note() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let (agent_id, _) = manager
                .spawn_agent(Some("Add login page"), "/test/repo", Priority::High, Some(150))
                .unwrap();

            let path = dir.path().join("agents").join(&agent_id).join("TASK_MEMORY.md");
            let note = std::fs::read_to_string(path).unwrap();
            assert!(note.contains("Add login page"));
            assert!(note.contains("high"));
            assert!(note.contains("$150"));
            assert!(note.contains("/test/repo"));
            assert!(note.contains("manager supervision"));
        }

        #[test]
        fn test_failed_spawn_leaves_no_task_note() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let first = spawn(&manager, "first");
            manager
                .store()
                .db()
                .execute_batch(
                    "CREATE TRIGGER reject_second BEFORE INSERT ON agents
                     WHEN NEW.task_description = 'second'
                     BEGIN SELECT RAISE(ABORT, 'boom'); END;",
                )
                .unwrap();

            let err = manager
                .spawn_agent(Some("second"), "/repo", Priority::Normal, None)
                .unwrap_err();
            assert!(matches!(err, MclError::Store(_)));

            let notes: Vec<String> = std::fs::read_dir(dir.path().join("agents"))
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            assert_eq!(notes, vec![first]);
            assert_eq!(manager.all_agents().unwrap().len(), 1);
        }

        #[test]
        fn test_spawn_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent_id = spawn(&manager, "Fix bug");
            let agent = manager.get_agent(&agent_id).unwrap().unwrap();
            assert_eq!(agent.budget, 100);
            assert_eq!(agent.priority, Priority::Normal);
            assert_eq!(agent.status, AgentStatus::Active);
        }

        #[test]
        fn test_spawn_rejects_missing_and_empty_task() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());

            let err = manager
                .spawn_agent(None, "/repo", Priority::Normal, None)
                .unwrap_err();
            assert!(matches!(err, MclError::MissingField(_)));

            for task in ["", "   "] {
                let err = manager
                    .spawn_agent(Some(task), "/repo", Priority::Normal, None)
                    .unwrap_err();
                assert!(matches!(err, MclError::Validation { .. }));
            }

            let err = manager
                .spawn_agent(Some("Fix"), "/repo", Priority::Normal, Some(-1))
                .unwrap_err();
            assert!(err.is_validation());
            assert!(manager.all_agents().unwrap().is_empty());
        }

        #[test]
        fn test_complete_removes_from_active() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let a1 = spawn(&manager, "Task 1");
            let a2 = spawn(&manager, "Task 2");
            manager
                .update_agent_status(&a2, AgentStatus::Completed)
                .unwrap();
            let active: Vec<String> = manager
                .active_agents()
                .unwrap()
                .into_iter()
                .map(|a| a.id)
                .collect();
            assert_eq!(active, vec![a1]);
        }
    }

    // ── Settings ───────────────────────────────────────────────

    mod settings {
        use super::*;
        use mcl_autonomy::AutonomyLevel;
        use mcl_config::ManagerConfig;

        #[test]
        fn test_defaults() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            assert_eq!(manager.autonomy_level(), AutonomyLevel::Balanced);
            assert_eq!(manager.evaluation_model().as_str(), "claude-3.5-sonnet");
        }

        #[test]
        fn test_settings_persist_across_instances() {
            let dir = tempfile::tempdir().unwrap();
            let config = ManagerConfig {
                data_dir: dir.path().join("data"),
                default_budget: 250,
            };
            {
                let manager = Manager::open(&config).unwrap();
                manager.set_autonomy_level("aggressive").unwrap();
                manager.set_evaluation_model("gpt-4o").unwrap();
            }
            let manager = Manager::open(&config).unwrap();
            assert_eq!(manager.autonomy_level(), AutonomyLevel::Aggressive);
            assert_eq!(manager.evaluation_model().as_str(), "gpt-4o");
            assert_eq!(manager.default_budget(), 250);
        }

        #[test]
        fn test_invalid_values_rejected_and_unchanged() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());

            let err = manager.set_autonomy_level("reckless").unwrap_err();
            assert!(err.to_string().contains("autonomy level must be one of"));
            assert_eq!(manager.autonomy_level(), AutonomyLevel::Balanced);

            let err = manager.set_evaluation_model("invalid-model").unwrap_err();
            assert!(err.to_string().contains("evaluation model must be one of"));
            assert_eq!(manager.evaluation_model().as_str(), "claude-3.5-sonnet");
        }
    }

    // ── Evaluation ─────────────────────────────────────────────

    mod evaluation {
        use super::*;

        #[test]
        fn test_confidence_neutral_then_learned() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            assert_eq!(manager.confidence_score().unwrap(), 0.5);

            let request = json!({"tool": "read", "file": "main.py"});
            for i in 0..12 {
                let confidence = if i < 10 { 0.8 } else { 0.6 };
                let recorded = manager
                    .record_decision(&agent, &request, Verdict::Approve, confidence, None, None)
                    .unwrap();
                let feedback = if i < 10 { "correct" } else { "incorrect" };
                manager
                    .provide_feedback(recorded.decision_id, feedback)
                    .unwrap();
            }

            let expected = 0.7 * (10.0 / 12.0) + 0.3 * (9.2 / 12.0);
            let score = manager.confidence_score().unwrap();
            assert!((score - expected).abs() < 0.05, "got {score}");
        }

        #[test]
        fn test_confidence_ignores_feedback_older_than_window() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            let recorded = manager
                .record_decision(&agent, &json!({"tool": "read"}), Verdict::Approve, 0.9, None, None)
                .unwrap();
            manager
                .provide_feedback(recorded.decision_id, "incorrect")
                .unwrap();
            let learned = manager.confidence_score().unwrap();
            assert!((learned - 0.27).abs() < 1e-9, "got {learned}");

            let backdate = |days: i64| {
                let at = format_timestamp(&(chrono::Utc::now() - chrono::Duration::days(days)));
                manager
                    .store()
                    .db()
                    .execute_batch(&format!("UPDATE decisions SET created_at = '{at}'"))
                    .unwrap();
            };

            backdate(29);
            assert!((manager.confidence_score().unwrap() - learned).abs() < 1e-9);

            backdate(31);
            assert_eq!(manager.confidence_score().unwrap(), 0.5);
        }

        #[test]
        fn test_evaluate_approves_safe_request() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            manager.set_autonomy_level("aggressive").unwrap();
            let agent = spawn(&manager, "Fix bug");

            let evaluation = manager
                .evaluate(&agent, &json!({"tool": "read", "file": "main.py"}), Some("s1"))
                .unwrap();
            assert_eq!(evaluation.verdict, Verdict::Approve);
            assert!(evaluation.queue_item_id.is_none());
            assert!(manager.approval_queue().unwrap().is_empty());

            let history = manager.decision_history(1).unwrap();
            assert_eq!(history[0].id, evaluation.decision_id);
            assert_eq!(history[0].autonomy_level.as_str(), "aggressive");
            assert_eq!(history[0].confidence_score, 0.5);
        }

        #[test]
        fn test_evaluate_escalates_and_queues_dangerous_request() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            manager.set_autonomy_level("aggressive").unwrap();
            let agent = spawn(&manager, "Fix bug");

            let evaluation = manager
                .evaluate(&agent, &json!({"tool": "bash", "command": "rm -rf /"}), None)
                .unwrap();
            assert!(evaluation.escalated());
            assert_eq!(evaluation.outcome.rule.as_deref(), Some("risk_ceiling"));
            assert!(evaluation.session_id.starts_with("decision_"));

            let queue = manager.approval_queue().unwrap();
            assert_eq!(queue.len(), 1);
            assert_eq!(queue[0].decision_id, Some(evaluation.decision_id));
            assert_eq!(queue[0].task_description.as_deref(), Some("Fix bug"));
        }

        #[test]
        fn test_balanced_neutral_confidence_escalates() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            // 0.5 < balanced confidence threshold 0.6
            let evaluation = manager
                .evaluate(&agent, &json!({"tool": "read", "file": "main.py"}), None)
                .unwrap();
            assert_eq!(evaluation.outcome.rule.as_deref(), Some("confidence_floor"));
        }

        #[test]
        fn test_evaluate_unknown_agent() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let err = manager
                .evaluate("ghost", &json!({"tool": "read"}), None)
                .unwrap_err();
            assert!(matches!(err, MclError::NotFound { .. }));
        }

        #[test]
        fn test_should_escalate_uses_current_posture() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let request = json!({"tool": "edit", "file": "src/lib.rs"});
            // files 0.4: above conservative 0.3, below aggressive 0.7
            manager.set_autonomy_level("conservative").unwrap();
            assert!(manager.should_escalate(&request, 0.95));
            manager.set_autonomy_level("aggressive").unwrap();
            assert!(!manager.should_escalate(&request, 0.95));
            assert_eq!(manager.assess_risk(&request), 0.4);
        }
    }

    // ── Feedback ───────────────────────────────────────────────

    mod feedback {
        use super::*;
        use mcl_core::Feedback;

        #[test]
        fn test_feedback_roundtrip_and_rejection() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            let recorded = manager
                .record_decision(&agent, &json!({"tool": "read"}), Verdict::Approve, 0.8, None, None)
                .unwrap();

            let err = manager
                .provide_feedback(recorded.decision_id, "maybe")
                .unwrap_err();
            assert!(err.is_validation());
            assert!(err.to_string().contains("feedback must be one of: correct, incorrect"));
            assert_eq!(manager.decision_history(1).unwrap()[0].user_feedback, None);

            manager
                .provide_feedback(recorded.decision_id, "correct")
                .unwrap();
            let history = manager.decision_history(1).unwrap();
            assert_eq!(history[0].user_feedback, Some(Feedback::Correct));
            assert_eq!(history[0].model_used, "claude-3.5-sonnet");
        }

        #[test]
        fn test_feedback_unknown_decision() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let err = manager.provide_feedback(404, "correct").unwrap_err();
            assert!(matches!(err, MclError::NotFound { .. }));
        }
    }

    // ── Export ─────────────────────────────────────────────────

    mod export {
        use super::*;

        fn logged_agent(manager: &Manager) -> (String, String) {
            let (agent, session) = manager
                .spawn_agent(Some("Test export"), "/test/repo", Priority::Normal, None)
                .unwrap();
            for (kind, direction, content) in [
                (InteractionType::AgentRequest, Direction::AgentToManager, "Agent requests file read"),
                (InteractionType::ManagerResponse, Direction::ManagerToAgent, "Manager approves request"),
                (InteractionType::AgentOutput, Direction::AgentToManager, "File content retrieved\nline two"),
            ] {
                manager
                    .log_interaction(
                        &NewInteraction::new(agent.as_str(), session.as_str(), kind, direction, content)
                            .with_metadata(json!({"tool": "read", "priority": "high"})),
                    )
                    .unwrap();
            }
            (agent, session)
        }

        #[test]
        fn test_json_export_decodes_metadata() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let (agent, session) = logged_agent(&manager);

            let exported = manager.export_logs(&agent, "json").unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&exported).unwrap();
            let entries = parsed.as_array().unwrap();
            assert_eq!(entries.len(), 4);

            let request = entries
                .iter()
                .find(|e| e["interaction_type"] == "agent_request")
                .unwrap();
            assert_eq!(request["agent_id"], agent.as_str());
            assert_eq!(request["session_id"], session.as_str());
            assert_eq!(request["direction"], "agent_to_manager");
            assert_eq!(request["content"], "Agent requests file read");
            assert_eq!(request["metadata"]["tool"], "read");
            assert_eq!(request["metadata"]["priority"], "high");
        }

        #[test]
        fn test_text_export() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let (agent, session) = logged_agent(&manager);

            let text = manager.export_logs(&agent, "text").unwrap();
            assert!(text.contains(&format!("SESSION {session}")));
            assert!(text.contains("🤖→🧠"));
            assert!(text.contains("🧠→🤖"));
            assert!(text.contains("⚙️"));
            assert!(text.contains("Manager approves request"));
            assert!(text.contains("    line two"));
            assert!(text.contains("📋"));
        }

        #[test]
        fn test_text_export_orders_sessions_chronologically() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            for session in ["first", "second"] {
                manager
                    .log_interaction(&NewInteraction::new(
                        agent.as_str(),
                        session,
                        InteractionType::AgentOutput,
                        Direction::AgentToManager,
                        "out",
                    ))
                    .unwrap();
            }
            let text = manager.export_logs(&agent, "text").unwrap();
            let first = text.find("SESSION first").unwrap();
            let second = text.find("SESSION second").unwrap();
            assert!(first < second);
        }

        #[test]
        fn test_unsupported_format() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            let err = manager.export_logs(&agent, "invalid").unwrap_err();
            assert!(matches!(err, MclError::UnsupportedFormat(_)));
            assert!(err.to_string().contains("Unsupported format"));
        }
    }

    // ── Approval queue ─────────────────────────────────────────

    mod queue {
        use super::*;

        #[test]
        fn test_resolve_deny() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            let evaluation = manager
                .evaluate(&agent, &json!({"tool": "bash", "command": "sudo reboot"}), None)
                .unwrap();
            let item = evaluation.queue_item_id.unwrap();

            let resolved = manager.resolve_approval(item, false).unwrap();
            assert_eq!(resolved.verdict, Verdict::Deny);
            assert!(manager.approval_queue().unwrap().is_empty());

            let logs = manager
                .get_logs(&LogQuery::for_agent(agent.as_str()).session(resolved.session_id.as_str()))
                .unwrap();
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].metadata.as_ref().unwrap()["decision"], "deny");

            let err = manager.resolve_approval(item, true).unwrap_err();
            assert!(matches!(err, MclError::NotFound { .. }));
        }
    }

    // ── Simulation ─────────────────────────────────────────────

    mod simulation {
        use super::*;
        use mcl_manager::sample_requests;

        #[test]
        fn test_simulate_logs_every_request() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            manager.set_autonomy_level("aggressive").unwrap();
            let agent = spawn(&manager, "Fix bug");
            let session = manager.new_simulation_session();
            assert!(session.starts_with("sim_session_"));

            let requests = sample_requests();
            let evaluations = manager.simulate(&agent, &session, &requests).unwrap();
            assert_eq!(evaluations.len(), 5);

            let logs = manager
                .get_logs(&LogQuery::for_agent(agent.as_str()).session(session.as_str()))
                .unwrap();
            assert_eq!(logs.len(), 15);
            let kinds: Vec<InteractionType> = logs.iter().take(3).map(|l| l.interaction_type).collect();
            assert_eq!(
                kinds,
                vec![
                    InteractionType::AgentRequest,
                    InteractionType::ManagerResponse,
                    InteractionType::AgentOutput,
                ]
            );

            // rm -rf is always escalated and left waiting
            let last = evaluations.last().unwrap();
            assert!(last.escalated());
            assert!(logs[14].content.contains("awaiting approval"));
            assert_eq!(
                manager.approval_queue().unwrap().len(),
                evaluations.iter().filter(|e| e.escalated()).count()
            );

            // the first request (a read) was approved
            assert_eq!(evaluations[0].verdict, Verdict::Approve);
            assert!(logs[2].content.contains("completed"));
        }

        #[test]
        fn test_simulate_unknown_agent() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let err = manager
                .simulate("ghost", "sim", &sample_requests())
                .unwrap_err();
            assert!(matches!(err, MclError::NotFound { .. }));
        }
    }

    // ── Search & sessions ──────────────────────────────────────

    mod queries {
        use super::*;

        #[test]
        fn test_search_three_of_five() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            for content in [
                "Implementing authentication system",
                "Reading config files",
                "Fixed authentication bug",
                "Added tests for authentication",
                "Updated documentation",
            ] {
                manager
                    .log_interaction(&NewInteraction::new(
                        agent.as_str(),
                        "s1",
                        InteractionType::AgentOutput,
                        Direction::AgentToManager,
                        content,
                    ))
                    .unwrap();
            }
            let results = manager.search_logs("authentication", None, None).unwrap();
            assert_eq!(results.len(), 3);
            assert!(results.iter().all(|r| r.content.contains("authentication")));
        }

        #[test]
        fn test_sessions_counts() {
            let dir = tempfile::tempdir().unwrap();
            let manager = manager(dir.path());
            let agent = spawn(&manager, "Fix bug");
            for (session, n) in [("session_1", 3), ("session_2", 2)] {
                for _ in 0..n {
                    manager
                        .log_interaction(&NewInteraction::new(
                            agent.as_str(),
                            session,
                            InteractionType::AgentOutput,
                            Direction::AgentToManager,
                            "x",
                        ))
                        .unwrap();
                }
            }
            let sessions = manager.get_sessions(&agent).unwrap();
            assert_eq!(sessions.len(), 3);
            assert_eq!(sessions[0].session_id, "session_2");
            assert_eq!(sessions[0].interaction_count, 2);
            assert_eq!(sessions[1].session_id, "session_1");
            assert_eq!(sessions[1].interaction_count, 3);

            let summaries = manager.agent_log_summaries().unwrap();
            assert_eq!(summaries[0].entry_count, 6);
        }
    }
}
