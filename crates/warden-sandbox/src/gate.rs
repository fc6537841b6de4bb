// gate.rs — The skill safety gate with a TTL cache.
//
// ensure_safe(force):
//   cache younger than ttl and !force → cached verdict
//   otherwise scan:
//     report with findings ≥ threshold (or any critical) → fail
//     scanner unavailable → fail if `required`, else pass with a warning
//   failed and !enforced → pass, logged as a warning
//
// The cache lock is held across the scan so concurrent callers wait for one
// scan instead of launching several.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::report::Severity;
use crate::scanner::SkillScanner;

/// How the skill safety gate treats scan results and a missing scanner.
#[derive(Debug, Clone)]
pub struct SkillScanPolicy {
    pub skills_dir: PathBuf,
    pub threshold: Severity,
    /// A missing or failing scanner fails the gate.
    pub required: bool,
    /// A failed gate blocks the route (otherwise it only warns).
    pub enforced: bool,
    pub ttl: Duration,
}

impl Default for SkillScanPolicy {
    fn default() -> Self {
        Self {
            skills_dir: PathBuf::from("skills"),
            threshold: Severity::High,
            required: true,
            enforced: true,
            ttl: Duration::from_secs(900),
        }
    }
}

/// Outcome of one gate check, cached or fresh.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GateVerdict {
    pub passed: bool,
    pub message: String,
    /// The scanner itself could not produce a report.
    pub scanner_unavailable: bool,
    /// True when answered from cache without scanning.
    pub cached: bool,
}

#[derive(Debug, Clone)]
struct SkillScanCache {
    checked_at: Instant,
    passed: bool,
    message: String,
    scanner_unavailable: bool,
}

/// Cached, policy-gated scanner check run before mutating routes.
pub struct SkillSafetyGate {
    scanner: Arc<dyn SkillScanner>,
    policy: SkillScanPolicy,
    cache: Mutex<Option<SkillScanCache>>,
}

impl SkillSafetyGate {
    pub fn new(scanner: Arc<dyn SkillScanner>, policy: SkillScanPolicy) -> Self {
        Self {
            scanner,
            policy,
            cache: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &SkillScanPolicy {
        &self.policy
    }

    /// True when mutating routes may run. Uses the cached verdict inside
    /// the TTL unless `force` is set.
    pub async fn ensure_safe(&self, force: bool) -> bool {
        self.check(force).await.passed
    }

    /// Like [`SkillSafetyGate::ensure_safe`] but returns the full verdict.
    pub async fn check(&self, force: bool) -> GateVerdict {
        let mut cache = self.cache.lock().await;

        if !force {
            if let Some(entry) = cache.as_ref() {
                if entry.checked_at.elapsed() <= self.policy.ttl {
                    return GateVerdict {
                        passed: entry.passed,
                        message: entry.message.clone(),
                        scanner_unavailable: entry.scanner_unavailable,
                        cached: true,
                    };
                }
            }
        }

        let outcome = self.scan_once().await;
        *cache = Some(SkillScanCache {
            checked_at: Instant::now(),
            passed: outcome.passed,
            message: outcome.message.clone(),
            scanner_unavailable: outcome.scanner_unavailable,
        });
        GateVerdict {
            passed: outcome.passed,
            message: outcome.message,
            scanner_unavailable: outcome.scanner_unavailable,
            cached: false,
        }
    }

    async fn scan_once(&self) -> ScanOutcome {
        let dir = &self.policy.skills_dir;
        let threshold = self.policy.threshold;

        let mut scanner_unavailable = false;
        let (scan_passed, message) = match self.scanner.scan(dir, threshold).await {
            Ok(report) => {
                let blocking = report.blocking_findings(threshold);
                if blocking > 0 {
                    (
                        false,
                        format!(
                            "{blocking} finding(s) at or above {threshold} ({})",
                            report.summary()
                        ),
                    )
                } else {
                    (true, format!("scan clean ({})", report.summary()))
                }
            }
            Err(e) if self.policy.required => {
                scanner_unavailable = true;
                (false, format!("scanner unavailable: {e}"))
            }
            Err(e) => {
                scanner_unavailable = true;
                tracing::warn!(scanner = self.scanner.name(), error = %e, "scanner unavailable, not required");
                (true, format!("scanner unavailable (not required): {e}"))
            }
        };

        if scan_passed {
            tracing::debug!(dir = %dir.display(), %message, "skill scan passed");
            return ScanOutcome {
                passed: true,
                message,
                scanner_unavailable,
            };
        }

        if !self.policy.enforced {
            tracing::warn!(dir = %dir.display(), %message, "skill scan failed; not enforced");
            return ScanOutcome {
                passed: true,
                message: format!("{message} (not enforced)"),
                scanner_unavailable,
            };
        }

        tracing::warn!(
            tag = "SKILL_SCAN_BLOCKED",
            dir = %dir.display(),
            %message,
            "skill scan blocked mutating routes"
        );
        ScanOutcome {
            passed: false,
            message,
            scanner_unavailable,
        }
    }
}

struct ScanOutcome {
    passed: bool,
    message: String,
    scanner_unavailable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::report::ScanReport;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Report(ScanReport),
        Missing,
    }

    struct Fake {
        script: Script,
        calls: AtomicUsize,
    }

    impl Fake {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SkillScanner for Fake {
        async fn scan(&self, _dir: &Path, _t: Severity) -> Result<ScanReport, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Report(r) => Ok(r.clone()),
                Script::Missing => Err(ScanError::NotFound {
                    binary: "skill-scanner".into(),
                }),
            }
        }
        fn name(&self) -> &str {
            "fake"
        }
    }

    fn policy() -> SkillScanPolicy {
        SkillScanPolicy::default()
    }

    #[tokio::test]
    async fn cache_hits_within_ttl_and_rescans_after() {
        let scanner = Fake::new(Script::Report(ScanReport::default()));
        let gate = SkillSafetyGate::new(
            scanner.clone(),
            SkillScanPolicy {
                ttl: Duration::from_millis(100),
                ..policy()
            },
        );

        assert!(gate.ensure_safe(false).await);
        assert!(gate.ensure_safe(false).await);
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(gate.ensure_safe(false).await);
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_bypasses_cache() {
        let scanner = Fake::new(Script::Report(ScanReport::default()));
        let gate = SkillSafetyGate::new(scanner.clone(), policy());
        gate.ensure_safe(false).await;
        let verdict = gate.check(true).await;
        assert!(!verdict.cached);
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn findings_at_threshold_block() {
        let report = ScanReport::from_counts([(Severity::High, 1)]);
        let gate = SkillSafetyGate::new(Fake::new(Script::Report(report)), policy());
        let verdict = gate.check(false).await;
        assert!(!verdict.passed);
        assert!(verdict.message.contains("high=1"));
    }

    #[tokio::test]
    async fn findings_below_threshold_pass() {
        let report = ScanReport::from_counts([(Severity::Medium, 4)]);
        let gate = SkillSafetyGate::new(Fake::new(Script::Report(report)), policy());
        assert!(gate.ensure_safe(false).await);
    }

    #[tokio::test]
    async fn critical_always_blocks() {
        let report = ScanReport::from_counts([(Severity::Critical, 1)]);
        let gate = SkillSafetyGate::new(
            Fake::new(Script::Report(report)),
            SkillScanPolicy {
                threshold: Severity::Critical,
                ..policy()
            },
        );
        assert!(!gate.ensure_safe(false).await);
    }

    #[tokio::test]
    async fn missing_scanner_follows_required_switch() {
        let required = SkillSafetyGate::new(Fake::new(Script::Missing), policy());
        let verdict = required.check(false).await;
        assert!(!verdict.passed);
        assert!(verdict.scanner_unavailable);

        let optional = SkillSafetyGate::new(
            Fake::new(Script::Missing),
            SkillScanPolicy {
                required: false,
                ..policy()
            },
        );
        assert!(optional.ensure_safe(false).await);
    }

    #[tokio::test]
    async fn unenforced_failure_only_warns() {
        let report = ScanReport::from_counts([(Severity::Critical, 2)]);
        let gate = SkillSafetyGate::new(
            Fake::new(Script::Report(report)),
            SkillScanPolicy {
                enforced: false,
                ..policy()
            },
        );
        let verdict = gate.check(false).await;
        assert!(verdict.passed);
        assert!(verdict.message.contains("not enforced"));
    }
}
