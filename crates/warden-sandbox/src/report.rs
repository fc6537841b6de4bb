// report.rs — Severity scale and structured scanner reports.
//
// Two report shapes are accepted:
//
//   {"findings": [{"severity": "high", ...}, ...]}
//   {"summary": {"critical": 0, "high": 2, "medium": 1, ...}}
//
// Unknown severities in a findings list are ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScanError;

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "informational" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" | "moderate" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Finding counts by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    counts: BTreeMap<Severity, usize>,
}

impl ScanReport {
    pub fn from_counts(counts: impl IntoIterator<Item = (Severity, usize)>) -> Self {
        let mut report = Self::default();
        for (severity, count) in counts {
            *report.counts.entry(severity).or_insert(0) += count;
        }
        report
    }

    /// Parse a scanner's JSON report.
    pub fn parse(json: &str) -> Result<Self, ScanError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ScanError::MalformedReport(e.to_string()))?;

        if let Some(findings) = value.get("findings").and_then(Value::as_array) {
            let severities = findings
                .iter()
                .filter_map(|f| f.get("severity").and_then(Value::as_str))
                .filter_map(|s| s.parse::<Severity>().ok());
            return Ok(Self::from_counts(severities.map(|s| (s, 1))));
        }

        if let Some(summary) = value.get("summary").and_then(Value::as_object) {
            let counts = summary.iter().filter_map(|(key, count)| {
                let severity = key.parse::<Severity>().ok()?;
                Some((severity, count.as_u64()? as usize))
            });
            return Ok(Self::from_counts(counts));
        }

        Err(ScanError::MalformedReport(
            "expected a 'findings' array or a 'summary' object".to_string(),
        ))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Findings at or above `threshold`. Critical always counts.
    pub fn blocking_findings(&self, threshold: Severity) -> usize {
        let threshold = threshold.min(Severity::Critical);
        Severity::ALL
            .iter()
            .filter(|&&s| s >= threshold)
            .map(|&s| self.count(s))
            .sum()
    }

    /// Compact "high=2 critical=1" summary for logs and messages.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .counts
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(s, n)| format!("{s}={n}"))
            .collect();
        if parts.is_empty() {
            "no findings".to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn parses_findings_list() {
        let report = ScanReport::parse(
            r#"{"findings":[{"severity":"high","rule":"x"},{"severity":"low"},{"severity":"weird"}]}"#,
        )
        .unwrap();
        assert_eq!(report.count(Severity::High), 1);
        assert_eq!(report.count(Severity::Low), 1);
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn parses_summary_counts() {
        let report =
            ScanReport::parse(r#"{"summary":{"critical":1,"medium":3,"files":12}}"#).unwrap();
        assert_eq!(report.count(Severity::Critical), 1);
        assert_eq!(report.count(Severity::Medium), 3);
        assert_eq!(report.summary(), "medium=3 critical=1");
    }

    #[test]
    fn threshold_counts_at_or_above() {
        let report = ScanReport::from_counts([(Severity::Medium, 2), (Severity::High, 1)]);
        assert_eq!(report.blocking_findings(Severity::High), 1);
        assert_eq!(report.blocking_findings(Severity::Medium), 3);
        assert_eq!(report.blocking_findings(Severity::Critical), 0);
    }

    #[test]
    fn rejects_unrecognized_shape() {
        assert!(matches!(
            ScanReport::parse(r#"{"ok":true}"#),
            Err(ScanError::MalformedReport(_))
        ));
        assert!(ScanReport::parse("not json").is_err());
    }
}
