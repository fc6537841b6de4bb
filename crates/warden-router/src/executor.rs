// executor.rs — Dispatch a plan to its handler.
//
//   Query            → search backend, else execution backend, else fixed text
//   Command / System → advisory below DocsTests; re-verify named paths;
//                      dispatch; advisory fallback on any backend failure
//   everything else  → execution backend, else a fixed per-category reply
//
// Advisory-tier and demoted intents never reach the execution backend; they
// are answered locally.
//
// Backend calls run under the configured timeout. A timeout is handled
// exactly like a backend error.

use std::sync::Arc;
use std::time::Duration;

use warden_intent::IntentCategory;
use warden_policy::{evaluate_permission, AutonomyTier, PermissionBackend, WRITE_OPERATION};

use crate::backend::{ExecutionBackend, ExecutionTask, SearchBackend, SearchResults};
use crate::degradation::Degradation;
use crate::plan::ExecutionPlan;

const SEARCH_LIMIT: usize = 5;

const SEARCH_UNAVAILABLE: &str =
    "I can't search the project right now. Please try again in a little while.";

/// Reply to a sender whose request was demoted for lack of authority.
pub const DEMOTED_REPLY: &str = "I can't run commands or make changes on your behalf, \
     but I'm happy to answer questions about the project.";

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub text: String,
    /// Whether the execution backend was actually called and answered.
    pub dispatched: bool,
    pub degradation: Option<Degradation>,
}

impl ExecutionOutput {
    fn dispatched(text: String) -> Self {
        Self {
            text,
            dispatched: true,
            degradation: None,
        }
    }

    fn local(text: String, degradation: Option<Degradation>) -> Self {
        Self {
            text,
            dispatched: false,
            degradation,
        }
    }
}

/// Runs plans against the configured backends.
pub struct Executor {
    execution: Option<Arc<dyn ExecutionBackend>>,
    search: Option<Arc<dyn SearchBackend>>,
    permission: Option<Arc<dyn PermissionBackend>>,
    agent_id: String,
    timeout: Duration,
}

impl Executor {
    pub fn new(
        execution: Option<Arc<dyn ExecutionBackend>>,
        search: Option<Arc<dyn SearchBackend>>,
        permission: Option<Arc<dyn PermissionBackend>>,
        agent_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            execution,
            search,
            permission,
            agent_id: agent_id.into(),
            timeout,
        }
    }

    pub fn execution_available(&self) -> bool {
        self.execution.is_some()
    }

    /// Produce reply text for a plan. Never fails; backend problems become
    /// a local reply plus a [`Degradation`].
    pub async fn execute(&self, plan: &ExecutionPlan) -> ExecutionOutput {
        match plan.category() {
            IntentCategory::Query => self.answer_query(plan).await,
            IntentCategory::Command | IntentCategory::System => self.run_mutating(plan).await,
            category if !may_dispatch(plan) => {
                ExecutionOutput::local(local_reply(plan, category).to_string(), None)
            }
            category => match self.dispatch(plan).await {
                Ok(text) => ExecutionOutput::dispatched(text),
                Err(degradation) => {
                    ExecutionOutput::local(fixed_reply(category).to_string(), Some(degradation))
                }
            },
        }
    }

    async fn answer_query(&self, plan: &ExecutionPlan) -> ExecutionOutput {
        let query = plan.intent.extracted_task();
        if let Some(search) = &self.search {
            match tokio::time::timeout(self.timeout, search.search(query, SEARCH_LIMIT)).await {
                Ok(Ok(results)) => return ExecutionOutput::local(format_results(&results), None),
                Ok(Err(e)) => tracing::warn!(error = %e, "search backend failed"),
                Err(_) => tracing::warn!(timeout_secs = self.timeout.as_secs(), "search timed out"),
            }
        }
        if !may_dispatch(plan) {
            return ExecutionOutput::local(SEARCH_UNAVAILABLE.to_string(), None);
        }
        match self.dispatch(plan).await {
            Ok(text) => ExecutionOutput::dispatched(text),
            Err(degradation) => {
                ExecutionOutput::local(SEARCH_UNAVAILABLE.to_string(), Some(degradation))
            }
        }
    }

    async fn run_mutating(&self, plan: &ExecutionPlan) -> ExecutionOutput {
        if plan.tier < AutonomyTier::DocsTests {
            return ExecutionOutput::local(
                advisory_fallback(plan, "this request can only be handled in advisory mode"),
                None,
            );
        }

        for path in &plan.target_files {
            let decision = evaluate_permission(
                self.permission.as_deref(),
                &self.agent_id,
                WRITE_OPERATION,
                Some(path.as_str()),
            );
            if let Some(reason) = decision.reason() {
                tracing::warn!(
                    tag = "PERMISSION_DENIED",
                    sender = plan.intent.sender(),
                    path = %path,
                    reason,
                    "pre-dispatch permission check refused a path"
                );
                return ExecutionOutput::local(
                    denial_message(Some(path.as_str()), reason),
                    Some(Degradation::SourcePermissionDenied),
                );
            }
        }

        match self.dispatch(plan).await {
            Ok(text) => ExecutionOutput::dispatched(text),
            Err(degradation) => {
                let why = match degradation {
                    Degradation::ExecutionBackendUnavailable => "no execution backend is connected",
                    _ => "the execution backend did not complete the task",
                };
                ExecutionOutput::local(advisory_fallback(plan, why), Some(degradation))
            }
        }
    }

    async fn dispatch(&self, plan: &ExecutionPlan) -> Result<String, Degradation> {
        let Some(backend) = &self.execution else {
            return Err(Degradation::ExecutionBackendUnavailable);
        };
        let task = ExecutionTask {
            task_type: plan.category().as_str().to_string(),
            task: plan.intent.extracted_task().to_string(),
            source: plan.route.clone(),
            sender: plan.intent.sender().to_string(),
            channel: plan.intent.channel().to_string(),
            target_files: plan.target_files.clone(),
            tier: plan.tier.as_str().to_string(),
        };

        tracing::info!(
            backend = backend.name(),
            task_type = %task.task_type,
            tier = %task.tier,
            files = task.target_files.len(),
            "dispatching task"
        );

        match tokio::time::timeout(self.timeout, backend.execute(&task)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                tracing::warn!(backend = backend.name(), error = %e, "execution backend failed");
                Err(Degradation::ExecutionBackendError)
            }
            Err(_) => {
                tracing::warn!(
                    backend = backend.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "execution backend timed out"
                );
                Err(Degradation::ExecutionBackendError)
            }
        }
    }
}

/// Deterministic reply when a mutating task can't run automatically.
pub fn advisory_fallback(plan: &ExecutionPlan, why: &str) -> String {
    format!(
        "I recognized this as a {category} request: \"{task}\".\n\
         Automatic execution isn't available right now ({why}). You can:\n\
         - run it manually,\n\
         - try again later, or\n\
         - ask me a read-only question about it instead.",
        category = plan.category(),
        task = plan.intent.extracted_task(),
    )
}

/// User-facing text for a permission refusal.
pub fn denial_message(path: Option<&str>, reason: &str) -> String {
    match path {
        Some(path) => format!(
            "I can't make that change: permission to write {path} was denied ({reason}). \
             Nothing was executed."
        ),
        None => format!("I can't make that change: permission was denied ({reason}). Nothing was executed."),
    }
}

/// Only elevated, undemoted intents are handed to the execution backend.
fn may_dispatch(plan: &ExecutionPlan) -> bool {
    plan.tier.is_elevated() && plan.preflight_passed && !plan.intent.was_demoted()
}

fn local_reply(plan: &ExecutionPlan, category: IntentCategory) -> &'static str {
    if plan.intent.was_demoted() || !plan.preflight_passed {
        DEMOTED_REPLY
    } else {
        fixed_reply(category)
    }
}

fn fixed_reply(category: IntentCategory) -> &'static str {
    match category {
        IntentCategory::Monitor => {
            "Status reporting isn't available at the moment. Please try again shortly."
        }
        IntentCategory::Social => "I can't reach the social tools right now, so nothing was posted.",
        IntentCategory::Schedule => {
            "Scheduling isn't available right now, so nothing was scheduled. Please try again later."
        }
        _ => "I'm here. I can answer questions about the project or report on its status.",
    }
}

fn format_results(results: &SearchResults) -> String {
    if results.is_empty() {
        return "I couldn't find anything about that in the code or the documentation.".to_string();
    }
    let mut out = String::from("Here's what I found:");
    for (title, hits) in [("Code", &results.code_hits), ("Docs", &results.doc_hits)] {
        if hits.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}:"));
        for hit in hits.iter().take(SEARCH_LIMIT) {
            if hit.snippet.is_empty() {
                out.push_str(&format!("\n- {}", hit.location));
            } else {
                out.push_str(&format!("\n- {}: {}", hit.location, hit.snippet.trim()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchHit;
    use crate::error::RouterError;
    use crate::plan::plan;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use warden_intent::Intent;
    use warden_policy::{PermissionVerdict, PolicyError};

    #[derive(Default)]
    struct Recording {
        tasks: Mutex<Vec<ExecutionTask>>,
        fail: bool,
    }

    #[async_trait]
    impl ExecutionBackend for Recording {
        async fn execute(&self, task: &ExecutionTask) -> Result<String, RouterError> {
            self.tasks.lock().unwrap().push(task.clone());
            if self.fail {
                Err(RouterError::Backend("boom".into()))
            } else {
                Ok(format!("done: {}", task.task))
            }
        }
        fn name(&self) -> &str {
            "recording"
        }
    }

    struct Slow;

    #[async_trait]
    impl ExecutionBackend for Slow {
        async fn execute(&self, _task: &ExecutionTask) -> Result<String, RouterError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
        fn name(&self) -> &str {
            "slow"
        }
    }

    struct DenyAll;

    impl PermissionBackend for DenyAll {
        fn check_permission(
            &self,
            _agent_id: &str,
            _operation: &str,
            _path: Option<&str>,
        ) -> Result<PermissionVerdict, PolicyError> {
            Ok(PermissionVerdict::deny("read-only tree"))
        }
    }

    struct Docs;

    #[async_trait]
    impl SearchBackend for Docs {
        async fn search(&self, _query: &str, _limit: usize) -> Result<SearchResults, RouterError> {
            Ok(SearchResults {
                code_hits: vec![SearchHit {
                    location: "src/parser.rs".into(),
                    snippet: "fn parse()".into(),
                }],
                doc_hits: Vec::new(),
            })
        }
    }

    struct BrokenSearch;

    #[async_trait]
    impl SearchBackend for BrokenSearch {
        async fn search(&self, _query: &str, _limit: usize) -> Result<SearchResults, RouterError> {
            Err(RouterError::Backend("index offline".into()))
        }
    }

    fn command_plan(message: &str, tier: AutonomyTier, files: &[&str]) -> ExecutionPlan {
        let intent = Intent::new(message, IntentCategory::Command, 0.8, "owner", "webhook", true);
        plan(intent, tier, true, files.iter().map(|s| s.to_string()).collect())
    }

    fn executor(
        execution: Option<Arc<dyn ExecutionBackend>>,
        permission: Option<Arc<dyn PermissionBackend>>,
    ) -> Executor {
        Executor::new(execution, None, permission, "router", Duration::from_millis(200))
    }

    #[tokio::test]
    async fn advisory_tier_never_dispatches() {
        let backend = Arc::new(Recording::default());
        let exec = executor(Some(backend.clone()), None);
        let out = exec
            .execute(&command_plan("run the deploy", AutonomyTier::Advisory, &[]))
            .await;
        assert!(!out.dispatched);
        assert!(out.text.contains("Automatic execution isn't available"));
        assert!(backend.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refused_path_blocks_dispatch() {
        let backend = Arc::new(Recording::default());
        let exec = executor(Some(backend.clone()), Some(Arc::new(DenyAll)));
        let out = exec
            .execute(&command_plan(
                "edit src/lib.rs",
                AutonomyTier::Source,
                &["src/lib.rs"],
            ))
            .await;
        assert_eq!(out.degradation, Some(Degradation::SourcePermissionDenied));
        assert!(out.text.contains("src/lib.rs"));
        assert!(out.text.contains("read-only tree"));
        assert!(backend.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_and_absence_fall_back() {
        let failing = Arc::new(Recording {
            fail: true,
            ..Recording::default()
        });
        let out = executor(Some(failing), None)
            .execute(&command_plan("run the tests", AutonomyTier::DocsTests, &[]))
            .await;
        assert_eq!(out.degradation, Some(Degradation::ExecutionBackendError));
        assert!(out.text.contains("run it manually"));

        let out = executor(None, None)
            .execute(&command_plan("run the tests", AutonomyTier::DocsTests, &[]))
            .await;
        assert_eq!(out.degradation, Some(Degradation::ExecutionBackendUnavailable));
        assert!(out.text.contains("no execution backend"));
    }

    #[tokio::test]
    async fn timeout_is_treated_as_failure() {
        let out = executor(Some(Arc::new(Slow)), None)
            .execute(&command_plan("run the tests", AutonomyTier::DocsTests, &[]))
            .await;
        assert_eq!(out.degradation, Some(Degradation::ExecutionBackendError));
        assert!(!out.dispatched);
    }

    #[tokio::test]
    async fn query_uses_search_backend() {
        let exec = Executor::new(None, Some(Arc::new(Docs)), None, "router", Duration::from_secs(1));
        let intent = Intent::new(
            "where is the parser?",
            IntentCategory::Query,
            0.8,
            "anyone",
            "webhook",
            false,
        );
        let out = exec
            .execute(&plan(intent, AutonomyTier::Advisory, true, Vec::new()))
            .await;
        assert!(out.text.contains("src/parser.rs: fn parse()"));
    }

    #[tokio::test]
    async fn advisory_and_demoted_intents_are_answered_locally() {
        let backend = Arc::new(Recording::default());
        let exec = executor(Some(backend.clone()), None);

        let chat = Intent::new("hello there", IntentCategory::Conversation, 0.6, "a", "sms", false);
        let out = exec
            .execute(&plan(chat, AutonomyTier::Advisory, true, Vec::new()))
            .await;
        assert!(!out.dispatched);
        assert_eq!(out.degradation, None);

        let mut demoted = Intent::new(
            "Run the deploy script now",
            IntentCategory::Command,
            0.9,
            "stranger",
            "webhook",
            false,
        );
        demoted.demote("unauthorized_principal");
        let out = exec
            .execute(&plan(demoted, AutonomyTier::Advisory, false, Vec::new()))
            .await;
        assert_eq!(out.text, DEMOTED_REPLY);

        let question = Intent::new("where is it?", IntentCategory::Query, 0.8, "a", "sms", false);
        let out = exec
            .execute(&plan(question, AutonomyTier::Advisory, true, Vec::new()))
            .await;
        assert!(!out.dispatched);

        assert!(backend.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn elevated_conversation_is_dispatched() {
        let backend = Arc::new(Recording::default());
        let exec = executor(Some(backend.clone()), None);
        let chat = Intent::new("hello there", IntentCategory::Conversation, 0.6, "owner", "sms", true);
        let out = exec
            .execute(&plan(chat, AutonomyTier::MetricsWrite, true, Vec::new()))
            .await;
        assert!(out.dispatched);
        assert_eq!(backend.tasks.lock().unwrap()[0].task_type, "conversation");
    }

    #[tokio::test]
    async fn failed_search_falls_back_to_execution_backend() {
        let backend = Arc::new(Recording::default());
        let exec = Executor::new(
            Some(backend.clone()),
            Some(Arc::new(BrokenSearch)),
            None,
            "router",
            Duration::from_secs(1),
        );
        let intent = Intent::new("where is the parser?", IntentCategory::Query, 0.8, "owner", "sms", true);
        let out = exec
            .execute(&plan(intent, AutonomyTier::MetricsWrite, true, Vec::new()))
            .await;
        assert!(out.dispatched);
        assert_eq!(out.text, "done: where is the parser?");

        let exec = Executor::new(None, Some(Arc::new(BrokenSearch)), None, "router", Duration::from_secs(1));
        let intent = Intent::new("where is the parser?", IntentCategory::Query, 0.8, "owner", "sms", true);
        let out = exec
            .execute(&plan(intent, AutonomyTier::MetricsWrite, true, Vec::new()))
            .await;
        assert_eq!(out.text, SEARCH_UNAVAILABLE);
        assert_eq!(out.degradation, Some(Degradation::ExecutionBackendUnavailable));
    }

    #[tokio::test]
    async fn conversation_without_backend_is_deterministic() {
        let intent = Intent::new("zzz", IntentCategory::Conversation, 0.5, "a", "sms", false);
        let p = plan(intent, AutonomyTier::Advisory, true, Vec::new());
        let first = executor(None, None).execute(&p).await;
        let second = executor(None, None).execute(&p).await;
        assert_eq!(first, second);
        assert!(!first.text.is_empty());
    }
}
