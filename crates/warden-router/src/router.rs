// router.rs — The request pipeline.
//
//   rate limit ─▶ containment ─▶ deception ─▶ classify ─▶ preflight
//        ─▶ resolve tier ─▶ permission gate ─▶ skill gate (mutating only)
//        ─▶ plan ─▶ execute ─▶ validate & record ─▶ text
//
// Each stage may end the request early with a fixed, safe reply. Nothing in
// here returns an error to the caller; collaborator failures are converted
// to text where they happen and recorded as a `Degradation`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use warden_audit::{JsonlOutcomeStore, OutcomeStore};
use warden_events::{
    ContainmentAction, ContainmentRegistry, EventDispatcher, LocalSecurityMonitor, LogSink,
    SecurityEvent, SecurityEventKind, SecurityMonitor,
};
use warden_guard::{DeceptionDefense, DeceptionVerdict, RateLimiter, SecretScanner};
use warden_intent::{BinaryValidator, IntentClassifier, OllamaValidator, Principals};
use warden_policy::{
    extract_file_paths, resolve_tier, AutonomyTier, DenialDedupe, DenialKind, GateOutcome,
    ManifestPolicy, PermissionBackend, PermissionGate, TierInputs,
};
use warden_sandbox::{CliSkillScanner, SkillSafetyGate, SkillScanner};

use crate::backend::{ExecutionBackend, HttpExecutionBackend, SearchBackend};
use crate::config::RouterConfig;
use crate::degradation::Degradation;
use crate::error::RouterError;
use crate::executor::{denial_message, Executor};
use crate::plan::plan;
use crate::preflight::preflight;
use crate::validate::OutputValidator;

/// Reply to a sender or channel under a `block` containment.
pub const ACCESS_RESTRICTED: &str =
    "Access from this account is currently restricted. If you think this is a mistake, contact the operator.";

/// Reply when the per-request deadline elapses.
pub const TEMPORARILY_UNAVAILABLE: &str =
    "I'm temporarily unavailable and couldn't finish that request. Please try again in a few minutes.";

/// Reply when the skill safety gate refuses a mutating route.
pub const SKILL_SCAN_BLOCKED: &str =
    "Changes are paused right now while a safety check on my tools is failing. Nothing was executed, \
     but read-only questions still work.";

/// Collaborators for a [`Router`]. Anything left unset is treated as
/// unavailable, except the scanner (defaults to the configured CLI) and the
/// monitor (defaults to an in-process monitor with no sinks).
pub struct RouterBuilder {
    config: RouterConfig,
    execution: Option<Arc<dyn ExecutionBackend>>,
    search: Option<Arc<dyn SearchBackend>>,
    permission: Option<Arc<dyn PermissionBackend>>,
    validator: Option<Arc<dyn BinaryValidator>>,
    scanner: Option<Arc<dyn SkillScanner>>,
    outcome_store: Option<Arc<dyn OutcomeStore>>,
    monitor: Option<Arc<dyn SecurityMonitor>>,
}

impl RouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            execution: None,
            search: None,
            permission: None,
            validator: None,
            scanner: None,
            outcome_store: None,
            monitor: None,
        }
    }

    /// Backend that performs dispatched tasks. Without one, mutating
    /// requests get the advisory fallback.
    pub fn execution_backend(mut self, backend: Arc<dyn ExecutionBackend>) -> Self {
        self.execution = Some(backend);
        self
    }

    /// Read-only search used to answer queries.
    pub fn search_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(backend);
        self
    }

    /// Backend consulted for elevated tiers. Without one, every
    /// mutating tier fails closed.
    pub fn permission_backend(mut self, backend: Arc<dyn PermissionBackend>) -> Self {
        self.permission = Some(backend);
        self
    }

    /// External YES/NO classifier; switches the classifier to hybrid mode.
    pub fn classifier_validator(mut self, validator: Arc<dyn BinaryValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn skill_scanner(mut self, scanner: Arc<dyn SkillScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn outcome_store(mut self, store: Arc<dyn OutcomeStore>) -> Self {
        self.outcome_store = Some(store);
        self
    }

    pub fn security_monitor(mut self, monitor: Arc<dyn SecurityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Assemble the router. Fails only on invalid rate-limit settings or
    /// pattern compilation errors.
    pub fn build(self) -> Result<Router, RouterError> {
        let config = self.config;

        let principals = Principals::new(config.authorized_principals.iter().cloned());
        let settings = config.classifier_settings();
        let classifier = match self.validator {
            Some(validator) => IntentClassifier::hybrid(principals, settings, validator),
            None => IntentClassifier::keyword_only(principals, settings),
        };

        let scanner = self.scanner.unwrap_or_else(|| {
            Arc::new(CliSkillScanner::new(
                config.skill_scan.scanner.clone(),
                Duration::from_secs(config.skill_scan.timeout_secs),
            ))
        });

        let gate = PermissionGate::new(
            self.permission.clone(),
            config.agent_id.clone(),
            DenialDedupe::new(Duration::from_secs(config.dedupe_window_secs)),
        );

        let executor = Executor::new(
            self.execution,
            self.search,
            self.permission,
            config.agent_id.clone(),
            config.execution_timeout(),
        );

        let monitor = self
            .monitor
            .unwrap_or_else(|| Arc::new(LocalSecurityMonitor::default()));

        Ok(Router {
            limiter: RateLimiter::new(config.rate_limit_config())?,
            deception: DeceptionDefense::new(config.read_only_channels.iter())?,
            classifier,
            gate,
            skill_gate: SkillSafetyGate::new(scanner, config.skill_scan_policy()),
            executor,
            validator: OutputValidator::new(SecretScanner::new()?, self.outcome_store),
            monitor,
            request_timeout: config.request_timeout(),
        })
    }
}

/// The policy-gated intent router.
pub struct Router {
    limiter: RateLimiter,
    deception: DeceptionDefense,
    classifier: IntentClassifier,
    gate: PermissionGate,
    skill_gate: SkillSafetyGate,
    executor: Executor,
    validator: OutputValidator,
    monitor: Arc<dyn SecurityMonitor>,
    request_timeout: Duration,
}

impl Router {
    pub fn builder(config: RouterConfig) -> RouterBuilder {
        RouterBuilder::new(config)
    }

    /// Build a router with every collaborator the configuration names.
    pub fn from_config(config: RouterConfig) -> Result<Self, RouterError> {
        let mut builder = RouterBuilder::new(config.clone());

        if let Some(path) = &config.permission_policy {
            builder = builder.permission_backend(Arc::new(ManifestPolicy::from_file(path)?));
        } else {
            tracing::warn!("no permission policy configured; mutating tiers will fail closed");
        }

        if let Some(endpoint) = &config.execution.endpoint {
            builder = builder.execution_backend(Arc::new(HttpExecutionBackend::new(endpoint.clone())));
        }

        if config.classifier.enabled {
            builder = builder.classifier_validator(Arc::new(OllamaValidator::new(
                config.classifier.endpoint.clone(),
                config.classifier.model.clone(),
            )));
        }

        builder = builder.outcome_store(Arc::new(JsonlOutcomeStore::open(&config.outcome_log)?));

        let containment = match &config.containment_file {
            Some(path) => ContainmentRegistry::from_file(path)?,
            None => ContainmentRegistry::new(),
        };
        let dispatcher = EventDispatcher::new().with_sink(Box::new(LogSink::new(&config.security_log)));
        builder = builder.security_monitor(Arc::new(LocalSecurityMonitor::new(dispatcher, containment)));

        builder.build()
    }

    /// Default deadline for [`Router::process_with_deadline`].
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// [`Router::process`] under a deadline. On expiry the in-flight work is
    /// dropped and a fixed "temporarily unavailable" reply is returned.
    pub async fn process_with_deadline(
        &self,
        message: &str,
        sender: &str,
        channel: &str,
        session_key: &str,
        metadata: Map<String, Value>,
        deadline: Duration,
    ) -> String {
        let work = self.process(message, sender, channel, session_key, metadata);
        match tokio::time::timeout(deadline, work).await {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(
                    sender,
                    channel,
                    deadline_secs = deadline.as_secs_f64(),
                    degradation = %Degradation::RequestTimedOut,
                    "request deadline elapsed"
                );
                TEMPORARILY_UNAVAILABLE.to_string()
            }
        }
    }

    /// Handle one inbound message and return the reply text.
    pub async fn process(
        &self,
        message: &str,
        sender: &str,
        channel: &str,
        session_key: &str,
        metadata: Map<String, Value>,
    ) -> String {
        let mut trace = RequestTrace::default();
        let text = self
            .run(message, sender, channel, session_key, metadata, &mut trace)
            .await;
        tracing::info!(
            sender,
            channel,
            stage = trace.stage,
            category = trace.category.as_deref().unwrap_or(""),
            tier = trace.tier.map(AutonomyTier::as_str).unwrap_or(""),
            degradations = ?trace.degradations,
            "request handled"
        );
        text
    }

    async fn run(
        &self,
        message: &str,
        sender: &str,
        channel: &str,
        session_key: &str,
        metadata: Map<String, Value>,
        trace: &mut RequestTrace,
    ) -> String {
        // Admission control.
        let admission = self.limiter.check(sender, channel);
        if !admission.allowed {
            trace.end("rate_limit", Degradation::RateLimited);
            let reason = admission
                .reason
                .unwrap_or_else(|| "rate limit exceeded".to_string());
            let scope = admission.scope.map(|s| match s {
                warden_guard::LimitScope::Sender => "sender",
                warden_guard::LimitScope::Channel => "channel",
            });
            self.monitor.ingest_event(SecurityEvent::rate_limited(
                sender,
                channel,
                scope.unwrap_or("sender"),
                &reason,
            ));
            return format!("You're sending messages too quickly ({reason}). Please wait a moment and try again.");
        }

        // Containment. Runs ahead of deception: blocked senders never touch
        // the secret-request counter.
        let mut restriction = None;
        if let Some(containment) = self.monitor.check_containment(sender, channel) {
            self.monitor.ingest_event(SecurityEvent::new(
                sender,
                channel,
                SecurityEventKind::ContainmentEnforced {
                    action: containment.action.as_str().to_string(),
                    reason: containment.reason.clone(),
                },
            ));
            match containment.action {
                ContainmentAction::Block => {
                    trace.end("containment", Degradation::ContainmentActive);
                    return ACCESS_RESTRICTED.to_string();
                }
                ContainmentAction::Restrict => {
                    trace.degrade(Degradation::ContainmentActive);
                    restriction = Some(containment.reason);
                }
            }
        }

        // Deception defense. These replies skip output validation: a honeypot
        // reply carries its fake credential.
        let verdict = self.deception.inspect(message, sender, channel);
        if let Some(response) = verdict.response() {
            let response = response.to_string();
            trace.stage = "deception";
            self.monitor
                .ingest_event(SecurityEvent::new(sender, channel, deception_event(&verdict)));
            return response;
        }

        // Classification.
        let mut intent = self
            .classifier
            .classify(message, sender, channel)
            .await
            .with_session_key(session_key);
        if !metadata.is_empty() {
            intent.annotate("request", Value::Object(metadata));
        }
        if intent.metadata().contains_key("classification_degraded") {
            trace.degrade(Degradation::ClassificationDegraded);
        }
        let restricted = restriction.is_some();
        if let Some(reason) = restriction {
            intent.annotate("containment", reason);
        }

        // Preflight.
        let report = preflight(
            &mut intent,
            self.gate.backend_available(),
            self.executor.execution_available(),
        );
        for d in &report.degradations {
            trace.degrade(*d);
        }

        // Tier.
        let target_files = extract_file_paths(intent.raw_message());
        let mut tier = resolve_tier(&TierInputs {
            category: intent.category(),
            is_authorized_principal: intent.is_authorized_principal(),
            message: intent.raw_message(),
            target_files: &target_files,
            permission_backend_available: self.gate.backend_available(),
        });
        if restricted {
            tier = AutonomyTier::Advisory;
        }
        trace.category = Some(intent.category().as_str().to_string());
        trace.tier = Some(tier);
        intent.annotate("tier", tier.as_str());

        // Permission gate.
        if let GateOutcome::Denied {
            kind,
            reason,
            path,
            alert,
        } = self.gate.check_gate(&intent, tier)
        {
            trace.end(
                "permission_gate",
                match kind {
                    DenialKind::PermissionBackendUnavailable => {
                        Degradation::PermissionBackendUnavailable
                    }
                    DenialKind::SourcePermissionDenied | DenialKind::UnauthorizedPrincipal => {
                        Degradation::SourcePermissionDenied
                    }
                },
            );
            if alert {
                self.monitor.ingest_event(SecurityEvent::permission_denied(
                    sender,
                    channel,
                    tier.as_str(),
                    &reason,
                    path.as_deref(),
                ));
            }
            return denial_message(path.as_deref(), &reason);
        }

        // Skill safety gate.
        if intent.category().is_mutating() && tier.is_elevated() {
            let verdict = self.skill_gate.check(false).await;
            if !verdict.passed {
                trace.end(
                    "skill_gate",
                    if verdict.scanner_unavailable {
                        Degradation::ScannerUnavailable
                    } else {
                        Degradation::SkillScanBlocked
                    },
                );
                self.monitor.ingest_event(SecurityEvent::new(
                    sender,
                    channel,
                    SecurityEventKind::SkillScanBlocked {
                        reason: verdict.message,
                    },
                ));
                return SKILL_SCAN_BLOCKED.to_string();
            }
        }

        // Plan, execute, validate.
        let plan = plan(intent, tier, report.passed, target_files);
        tracing::debug!(
            route = %plan.route,
            steps = plan.steps.len(),
            estimated_cost = plan.estimated_cost,
            "execution plan"
        );

        let started = Instant::now();
        let output = self.executor.execute(&plan).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        if let Some(d) = output.degradation {
            trace.degrade(d);
        }

        let result = self
            .validator
            .validate_and_record(plan, output.text, duration_ms);
        if result.violations.iter().any(|v| v.starts_with("secret_leak")) {
            trace.degrade(Degradation::SecretLeakDetected);
        }
        trace.stage = "executed";
        result.response_text
    }
}

fn deception_event(verdict: &DeceptionVerdict) -> SecurityEventKind {
    match verdict {
        DeceptionVerdict::SecretDeflected { attempt, .. } => {
            SecurityEventKind::SecretRequest { attempt: *attempt }
        }
        DeceptionVerdict::HoneypotEmitted {
            attempt,
            provider,
            fingerprint,
            ..
        } => SecurityEventKind::HoneypotEmitted {
            attempt: *attempt,
            provider: provider.as_str().to_string(),
            fingerprint: fingerprint.clone(),
        },
        DeceptionVerdict::CodeMutationDeflected { .. } | DeceptionVerdict::Clean => {
            SecurityEventKind::CodeMutationDeflected
        }
    }
}

/// Per-request bookkeeping for the completion log line.
#[derive(Debug, Default)]
struct RequestTrace {
    stage: &'static str,
    category: Option<String>,
    tier: Option<AutonomyTier>,
    degradations: Vec<Degradation>,
}

impl RequestTrace {
    fn degrade(&mut self, degradation: Degradation) {
        if !self.degradations.contains(&degradation) {
            self.degradations.push(degradation);
        }
    }

    fn end(&mut self, stage: &'static str, degradation: Degradation) {
        self.stage = stage;
        self.degrade(degradation);
    }
}
