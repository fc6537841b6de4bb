// plan.rs — Category → ordered step plan.
//
// Steps are descriptive: they drive cost estimation and observability, not
// step-by-step execution. Plans are built per request and never persisted.

use serde::Serialize;

use warden_intent::{Intent, IntentCategory};
use warden_policy::AutonomyTier;

/// One abstract step of a plan, with a relative cost.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StepSpec {
    pub name: &'static str,
    pub cost: u32,
}

const fn step(name: &'static str, cost: u32) -> StepSpec {
    StepSpec { name, cost }
}

const QUERY_STEPS: &[StepSpec] = &[
    step("search_code", 2),
    step("search_docs", 2),
    step("compose_answer", 1),
];

const COMMAND_STEPS: &[StepSpec] = &[
    step("verify_permissions", 1),
    step("dispatch_task", 5),
    step("collect_output", 1),
];

const MONITOR_STEPS: &[StepSpec] = &[step("collect_status", 2), step("summarize", 1)];

const CONVERSATION_STEPS: &[StepSpec] = &[step("reply", 1)];

const SOCIAL_STEPS: &[StepSpec] = &[step("gather_context", 2), step("draft_reply", 2)];

const SCHEDULE_STEPS: &[StepSpec] = &[step("parse_time", 1), step("register_job", 2)];

const SYSTEM_STEPS: &[StepSpec] = &[
    step("verify_permissions", 1),
    step("dispatch_task", 5),
    step("check_health", 2),
];

/// Fixed steps for a category.
pub fn steps_for(category: IntentCategory) -> &'static [StepSpec] {
    match category {
        IntentCategory::Query => QUERY_STEPS,
        IntentCategory::Command => COMMAND_STEPS,
        IntentCategory::Monitor => MONITOR_STEPS,
        IntentCategory::Conversation => CONVERSATION_STEPS,
        IntentCategory::Social => SOCIAL_STEPS,
        IntentCategory::Schedule => SCHEDULE_STEPS,
        IntentCategory::System => SYSTEM_STEPS,
    }
}

/// What the executor will do for an intent at a given tier.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub intent: Intent,
    pub route: String,
    pub tier: AutonomyTier,
    pub preflight_passed: bool,
    /// Paths named in the message, re-verified before mutating dispatch.
    pub target_files: Vec<String>,
    pub steps: Vec<StepSpec>,
    pub estimated_cost: u32,
}

impl ExecutionPlan {
    pub fn category(&self) -> IntentCategory {
        self.intent.category()
    }
}

/// Build the plan for an intent. Steps come from a fixed per-category
/// list and only feed cost estimates and logs.
pub fn plan(
    intent: Intent,
    tier: AutonomyTier,
    preflight_passed: bool,
    target_files: Vec<String>,
) -> ExecutionPlan {
    let steps = steps_for(intent.category()).to_vec();
    let estimated_cost = steps.iter().map(|s| s.cost).sum();
    let route = intent
        .target_route()
        .unwrap_or(intent.category().route())
        .to_string();
    ExecutionPlan {
        intent,
        route,
        tier,
        preflight_passed,
        target_files,
        steps,
        estimated_cost,
    }
}
