// config.rs — Router configuration from .warden/warden.toml plus WARDEN_* env.
//
// Load order: TOML file (if present) → environment overrides → relative
// paths resolved against the project root. Every field has a default, so an
// empty file and no environment is a working, fail-closed configuration:
// no permission backend, no execution backend, keyword-only classification.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use warden_guard::RateLimitConfig;
use warden_intent::ClassifierSettings;
use warden_sandbox::{Severity, SkillScanPolicy};

use crate::error::RouterError;

/// Top-level router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Identity the permission backend evaluates requests under.
    pub agent_id: String,
    /// Senders allowed to hold elevated autonomy.
    pub authorized_principals: Vec<String>,
    /// Chat-style channels where weak command signals read as conversation.
    pub direct_channels: Vec<String>,
    /// Channels on which code-mutation requests are deflected.
    pub read_only_channels: Vec<String>,
    pub classifier: ClassifierConfig,
    pub rate_limit: RateLimitSection,
    pub skill_scan: SkillScanSection,
    pub execution: ExecutionSection,
    /// YAML permission manifests. Absent ⇒ no permission backend.
    pub permission_policy: Option<PathBuf>,
    /// JSON list of operator containment entries.
    pub containment_file: Option<PathBuf>,
    pub outcome_log: PathBuf,
    pub security_log: PathBuf,
    pub dedupe_window_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            agent_id: "intent-router".to_string(),
            authorized_principals: Vec::new(),
            direct_channels: strings(&["whatsapp", "telegram", "discord", "sms"]),
            read_only_channels: strings(&["discord", "telegram", "whatsapp"]),
            classifier: ClassifierConfig::default(),
            rate_limit: RateLimitSection::default(),
            skill_scan: SkillScanSection::default(),
            execution: ExecutionSection::default(),
            permission_policy: None,
            containment_file: None,
            outcome_log: PathBuf::from(".warden/outcomes.jsonl"),
            security_log: PathBuf::from(".warden/security.jsonl"),
            dedupe_window_secs: 60,
            request_timeout_secs: 150,
        }
    }
}

/// `[classifier]`: the optional external validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Use the external binary validator (otherwise keyword-only).
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub per_call_timeout_ms: u64,
    pub budget_ms: u64,
    pub top_n: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "gemma2:2b".to_string(),
            per_call_timeout_ms: 80,
            budget_ms: 300,
            top_n: 3,
        }
    }
}

/// `[rate_limit]`: token bucket rate (tokens/sec) and capacity per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub sender_rate: f64,
    pub sender_capacity: f64,
    pub channel_rate: f64,
    pub channel_capacity: f64,
    pub idle_secs: u64,
    pub sweep_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            sender_rate: 0.2,
            sender_capacity: 5.0,
            channel_rate: 2.0,
            channel_capacity: 30.0,
            idle_secs: 600,
            sweep_secs: 300,
        }
    }
}

/// `[skill_scan]`: the external scanner and its gate policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillScanSection {
    pub skills_dir: PathBuf,
    /// Scanner binary name or path.
    pub scanner: String,
    pub required: bool,
    pub enforced: bool,
    pub threshold: Severity,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for SkillScanSection {
    fn default() -> Self {
        Self {
            skills_dir: PathBuf::from("skills"),
            scanner: "skill-scanner".to_string(),
            required: true,
            enforced: true,
            threshold: Severity::High,
            ttl_secs: 900,
            timeout_secs: 90,
        }
    }
}

/// `[execution]`: the HTTP execution backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// HTTP execution backend. Absent ⇒ backend unavailable.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 120,
        }
    }
}

impl RouterConfig {
    /// Default config location under a project root.
    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root.join(".warden").join("warden.toml")
    }

    /// Parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, RouterError> {
        let content = std::fs::read_to_string(path).map_err(|source| RouterError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `.warden/warden.toml` (or defaults if it doesn't exist), apply
    /// `WARDEN_*` overrides, and anchor relative paths at `project_root`.
    pub fn for_project(project_root: &Path) -> Result<Self, RouterError> {
        let path = Self::default_path(project_root);
        let mut config = if path.exists() {
            tracing::info!(path = %path.display(), "loading router config");
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_env()?;
        config.resolve_paths(project_root);
        Ok(config)
    }

    /// Apply `WARDEN_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), RouterError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), RouterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WARDEN_AGENT_ID") {
            self.agent_id = v.trim().to_string();
        }
        if let Some(v) = get("WARDEN_AUTHORIZED_PRINCIPALS") {
            self.authorized_principals = comma_list(&v);
        }
        if let Some(v) = get("WARDEN_DIRECT_CHANNELS") {
            self.direct_channels = comma_list(&v);
        }
        if let Some(v) = get("WARDEN_READ_ONLY_CHANNELS") {
            self.read_only_channels = comma_list(&v);
        }
        if let Some(v) = get("WARDEN_CLASSIFIER_ENABLED") {
            self.classifier.enabled = parse_bool("WARDEN_CLASSIFIER_ENABLED", &v)?;
        }
        if let Some(v) = get("WARDEN_CLASSIFIER_ENDPOINT") {
            self.classifier.endpoint = v.trim().to_string();
        }
        if let Some(v) = get("WARDEN_CLASSIFIER_MODEL") {
            self.classifier.model = v.trim().to_string();
        }
        if let Some(v) = get("WARDEN_RATE_SENDER_RATE") {
            self.rate_limit.sender_rate = parse_num("WARDEN_RATE_SENDER_RATE", &v)?;
        }
        if let Some(v) = get("WARDEN_RATE_SENDER_CAPACITY") {
            self.rate_limit.sender_capacity = parse_num("WARDEN_RATE_SENDER_CAPACITY", &v)?;
        }
        if let Some(v) = get("WARDEN_RATE_CHANNEL_RATE") {
            self.rate_limit.channel_rate = parse_num("WARDEN_RATE_CHANNEL_RATE", &v)?;
        }
        if let Some(v) = get("WARDEN_RATE_CHANNEL_CAPACITY") {
            self.rate_limit.channel_capacity = parse_num("WARDEN_RATE_CHANNEL_CAPACITY", &v)?;
        }
        if let Some(v) = get("WARDEN_SKILLS_DIR") {
            self.skill_scan.skills_dir = PathBuf::from(v.trim());
        }
        if let Some(v) = get("WARDEN_SCANNER_BIN") {
            self.skill_scan.scanner = v.trim().to_string();
        }
        if let Some(v) = get("WARDEN_SCANNER_REQUIRED") {
            self.skill_scan.required = parse_bool("WARDEN_SCANNER_REQUIRED", &v)?;
        }
        if let Some(v) = get("WARDEN_SCANNER_ENFORCED") {
            self.skill_scan.enforced = parse_bool("WARDEN_SCANNER_ENFORCED", &v)?;
        }
        if let Some(v) = get("WARDEN_SCANNER_THRESHOLD") {
            self.skill_scan.threshold = v.parse().map_err(|_| RouterError::InvalidEnv {
                key: "WARDEN_SCANNER_THRESHOLD".to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("WARDEN_SCAN_TTL_SECS") {
            self.skill_scan.ttl_secs = parse_num("WARDEN_SCAN_TTL_SECS", &v)?;
        }
        if let Some(v) = get("WARDEN_EXEC_TIMEOUT_SECS") {
            self.execution.timeout_secs = parse_num("WARDEN_EXEC_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("WARDEN_EXEC_ENDPOINT") {
            self.execution.endpoint = Some(v.trim().to_string());
        }
        if let Some(v) = get("WARDEN_PERMISSION_POLICY") {
            self.permission_policy = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("WARDEN_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_num("WARDEN_REQUEST_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    /// Anchor relative file paths at `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        anchor(&mut self.outcome_log);
        anchor(&mut self.security_log);
        anchor(&mut self.skill_scan.skills_dir);
        if let Some(p) = self.permission_policy.as_mut() {
            anchor(p);
        }
        if let Some(p) = self.containment_file.as_mut() {
            anchor(p);
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        let r = &self.rate_limit;
        RateLimitConfig {
            sender_rate: r.sender_rate,
            sender_capacity: r.sender_capacity,
            channel_rate: r.channel_rate,
            channel_capacity: r.channel_capacity,
            idle: Duration::from_secs(r.idle_secs),
            sweep_interval: Duration::from_secs(r.sweep_secs),
        }
    }

    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            direct_channels: self
                .direct_channels
                .iter()
                .map(|c| c.trim().to_ascii_lowercase())
                .collect(),
            top_n: self.classifier.top_n,
            per_call_timeout: Duration::from_millis(self.classifier.per_call_timeout_ms),
            budget: Duration::from_millis(self.classifier.budget_ms),
            ..ClassifierSettings::default()
        }
    }

    pub fn skill_scan_policy(&self) -> SkillScanPolicy {
        let s = &self.skill_scan;
        SkillScanPolicy {
            skills_dir: s.skills_dir.clone(),
            threshold: s.threshold,
            required: s.required,
            enforced: s.enforced,
            ttl: Duration::from_secs(s.ttl_secs),
        }
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, RouterError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RouterError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RouterError> {
    value.trim().parse().map_err(|_| RouterError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_fail_closed() {
        let config = RouterConfig::default();
        assert_eq!(config.agent_id, "intent-router");
        assert!(config.authorized_principals.is_empty());
        assert!(config.permission_policy.is_none());
        assert!(config.execution.endpoint.is_none());
        assert!(!config.classifier.enabled);
        assert!(config.skill_scan.required);
        assert!(config.skill_scan.enforced);
        assert_eq!(config.skill_scan.threshold, Severity::High);
        assert_eq!(config.dedupe_window_secs, 60);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: RouterConfig = toml::from_str(
            r#"
            authorized_principals = ["owner"]

            [rate_limit]
            sender_capacity = 2.0

            [skill_scan]
            threshold = "critical"
            "#,
        )
        .unwrap();
        assert_eq!(config.authorized_principals, vec!["owner"]);
        assert_eq!(config.rate_limit.sender_capacity, 2.0);
        assert_eq!(config.rate_limit.channel_capacity, 30.0);
        assert_eq!(config.skill_scan.threshold, Severity::Critical);
        assert_eq!(config.skill_scan.ttl_secs, 900);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = RouterConfig::default();
        config
            .apply_env_with(env(&[
                ("WARDEN_AUTHORIZED_PRINCIPALS", "owner, ops ,"),
                ("WARDEN_CLASSIFIER_ENABLED", "yes"),
                ("WARDEN_RATE_SENDER_RATE", "1.5"),
                ("WARDEN_SCANNER_REQUIRED", "false"),
                ("WARDEN_SCANNER_THRESHOLD", "medium"),
                ("WARDEN_EXEC_ENDPOINT", "http://127.0.0.1:9000/run"),
                ("WARDEN_AGENT_ID", ""),
            ]))
            .unwrap();
        assert_eq!(config.authorized_principals, vec!["owner", "ops"]);
        assert!(config.classifier.enabled);
        assert_eq!(config.rate_limit.sender_rate, 1.5);
        assert!(!config.skill_scan.required);
        assert_eq!(config.skill_scan.threshold, Severity::Medium);
        assert_eq!(
            config.execution.endpoint.as_deref(),
            Some("http://127.0.0.1:9000/run")
        );
        // Empty values are ignored.
        assert_eq!(config.agent_id, "intent-router");
    }

    #[test]
    fn invalid_env_is_reported() {
        let mut config = RouterConfig::default();
        let err = config
            .apply_env_with(env(&[("WARDEN_SCANNER_ENFORCED", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("WARDEN_SCANNER_ENFORCED"));
    }

    #[test]
    fn for_project_reads_file_and_anchors_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".warden")).unwrap();
        std::fs::write(
            RouterConfig::default_path(dir.path()),
            "agent_id = \"router-7\"\npermission_policy = \"policy.yaml\"\n",
        )
        .unwrap();

        let config = RouterConfig::for_project(dir.path()).unwrap();
        assert_eq!(config.agent_id, "router-7");
        assert_eq!(config.permission_policy, Some(dir.path().join("policy.yaml")));
        assert_eq!(config.outcome_log, dir.path().join(".warden/outcomes.jsonl"));
    }

    #[test]
    fn conversions() {
        let config = RouterConfig::default();
        let rate = config.rate_limit_config();
        assert_eq!(rate.sender_capacity, 5.0);
        assert_eq!(rate.idle, Duration::from_secs(600));

        let settings = config.classifier_settings();
        assert!(settings.direct_channels.contains("sms"));
        assert_eq!(settings.per_call_timeout, Duration::from_millis(80));

        let policy = config.skill_scan_policy();
        assert_eq!(policy.ttl, Duration::from_secs(900));
    }
}
