//! Persistent operations log: one JSON object per line, appended. Best-effort.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OpsLevel {
    Info,
    Warn,
    Error,
}

#[derive(Serialize)]
struct OpsRecord<'a> {
    timestamp: String,
    level: OpsLevel,
    event: &'a str,
    message: &'a str,
}

#[derive(Clone, Debug)]
pub struct OpsLog {
    path: PathBuf,
}

impl OpsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OpsLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Failures are reported through tracing and otherwise ignored.
    pub async fn record(&self, level: OpsLevel, event: &str, message: &str) {
        if let Err(e) = self.append(level, event, message).await {
            tracing::warn!(path = %self.path.display(), error = %e, "could not write operations log");
        }
    }

    async fn append(&self, level: OpsLevel, event: &str, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let rec = OpsRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            event,
            message,
        };
        let mut line = serde_json::to_string(&rec)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = OpsLog::new(dir.path().join("nested/ops.log"));
        log.record(OpsLevel::Error, "migration", "boom").await;
        log.record(OpsLevel::Info, "startup", "ok").await;

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "error");
        assert_eq!(lines[0]["event"], "migration");
        assert_eq!(lines[1]["message"], "ok");
        assert!(lines[0]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn unwritable_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let log = OpsLog::new(blocker.join("ops.log"));
        log.record(OpsLevel::Warn, "x", "y").await;
    }
}
