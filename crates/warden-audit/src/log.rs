// log.rs — Append-only, hash-chained JSONL outcome log.
//
// One OutcomeRecord per line. Each record's `previous_hash` is the SHA-256
// of the preceding raw line, so any edit, insertion or deletion breaks the
// chain at a detectable line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::hasher;
use crate::record::OutcomeRecord;

/// Append-only JSONL file where each record carries the hash of the
/// line before it.
pub struct OutcomeLog {
    writer: BufWriter<File>,
    path: PathBuf,
    last_hash: Option<String>,
}

impl OutcomeLog {
    /// Open (or create) a log, recovering the chain head from existing content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::CreateDirFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Link the record to the chain head, write it, and flush.
    pub fn append(&mut self, record: &mut OutcomeRecord) -> Result<(), AuditError> {
        record.previous_hash = self.last_hash.clone();
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        self.last_hash = Some(hasher::hash_str(&json));
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<OutcomeRecord>, AuditError> {
        let mut records = Vec::new();
        for line in Self::lines(path.as_ref())? {
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// The last `n` records, oldest first.
    pub fn read_tail(path: impl AsRef<Path>, n: usize) -> Result<Vec<OutcomeRecord>, AuditError> {
        let mut records = Self::read_all(path)?;
        let skip = records.len().saturating_sub(n);
        Ok(records.split_off(skip))
    }

    /// Verify every link. Returns the number of records checked.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut count = 0;

        let file = Self::open_read(path.as_ref())?;
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: OutcomeRecord = serde_json::from_str(&line)?;
            if record.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: index + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: record.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            // Hash the raw line: re-serializing could reorder fields.
            previous_hash = Some(hasher::hash_str(&line));
            count += 1;
        }

        Ok(count)
    }

    fn open_read(path: &Path) -> Result<File, AuditError> {
        File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn lines(path: &Path) -> Result<Vec<String>, AuditError> {
        let file = Self::open_read(path)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        Ok(Self::lines(path)?
            .last()
            .map(|line| hasher::hash_str(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(skill: &str) -> OutcomeRecord {
        OutcomeRecord::new(skill, "query", "metrics_write").with_result(true, 1.0, 3)
    }

    #[test]
    fn append_and_read_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        {
            let mut log = OutcomeLog::open(&path).unwrap();
            log.append(&mut record("a")).unwrap();
            log.append(&mut record("b")).unwrap();
        }
        let records = OutcomeLog::read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].skill, "a");
        assert!(records[0].previous_hash.is_none());
        assert!(records[1].previous_hash.is_some());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".warden").join("outcomes.jsonl");
        let mut log = OutcomeLog::open(&path).unwrap();
        log.append(&mut record("a")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn reopen_continues_the_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        OutcomeLog::open(&path).unwrap().append(&mut record("a")).unwrap();
        OutcomeLog::open(&path).unwrap().append(&mut record("b")).unwrap();
        assert_eq!(OutcomeLog::verify_chain(&path).unwrap(), 2);
    }

    #[test]
    fn tampering_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        {
            let mut log = OutcomeLog::open(&path).unwrap();
            for skill in ["a", "b", "c"] {
                log.append(&mut record(skill)).unwrap();
            }
        }
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replacen("\"skill\":\"b\"", "\"skill\":\"x\"", 1)).unwrap();

        match OutcomeLog::verify_chain(&path) {
            Err(AuditError::IntegrityViolation { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected integrity violation, got {other:?}"),
        }
    }

    #[test]
    fn tail_returns_newest_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outcomes.jsonl");
        {
            let mut log = OutcomeLog::open(&path).unwrap();
            for skill in ["a", "b", "c", "d"] {
                log.append(&mut record(skill)).unwrap();
            }
        }
        let tail = OutcomeLog::read_tail(&path, 2).unwrap();
        let skills: Vec<_> = tail.iter().map(|r| r.skill.as_str()).collect();
        assert_eq!(skills, vec!["c", "d"]);
        assert_eq!(OutcomeLog::read_tail(&path, 10).unwrap().len(), 4);
    }
}
