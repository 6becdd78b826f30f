use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::{DomainError, Result};

/// One `/chat` call as written to the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub response_length: usize,
    pub response_time: f64,
    pub sources_used: usize,
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitoringReport {
    pub report_date: Option<DateTime<Utc>>,
    pub total_interactions: usize,
    /// Percent of successful interactions.
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub avg_sources_used: f64,
    pub avg_response_length: f64,
    pub error_count: usize,
}

/// Append-only JSONL log of chat interactions.
pub struct InteractionLog {
    path: PathBuf,
    reports_dir: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reports_dir: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let mut line =
            serde_json::to_string(record).map_err(|e| DomainError::internal(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::io(parent, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DomainError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| DomainError::io(&self.path, e))?;
        Ok(())
    }

    /// Summarizes the 24 hours before `now`. A missing log is an empty report.
    pub async fn report(&self, now: DateTime<Utc>) -> Result<MonitoringReport> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MonitoringReport {
                    report_date: Some(now),
                    ..MonitoringReport::default()
                })
            }
            Err(e) => return Err(DomainError::io(&self.path, e)),
        };

        let cutoff = now - Duration::hours(24);
        let records: Vec<InteractionRecord> = raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str::<InteractionRecord>(l) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable interaction record");
                    None
                }
            })
            .filter(|r| r.timestamp >= cutoff && r.timestamp <= now)
            .collect();

        Ok(summarize(&records, now))
    }

    /// Writes `daily_report_YYYYMMDD.json` into the reports directory.
    /// Returns `None` when no directory is configured.
    pub async fn save_report(&self, report: &MonitoringReport) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.reports_dir else {
            return Ok(None);
        };
        let date = report.report_date.unwrap_or_else(Utc::now);
        let path = dir.join(format!("daily_report_{}.json", date.format("%Y%m%d")));

        let body = serde_json::to_vec_pretty(report)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::io(dir, e))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| DomainError::io(&path, e))?;
        Ok(Some(path))
    }
}

fn summarize(records: &[InteractionRecord], now: DateTime<Utc>) -> MonitoringReport {
    let total = records.len();
    if total == 0 {
        return MonitoringReport {
            report_date: Some(now),
            ..MonitoringReport::default()
        };
    }

    let n = total as f64;
    let successes = records.iter().filter(|r| r.success).count();
    let mean = |f: fn(&InteractionRecord) -> f64| records.iter().map(f).sum::<f64>() / n;

    MonitoringReport {
        report_date: Some(now),
        total_interactions: total,
        success_rate: successes as f64 / n * 100.0,
        avg_response_time: mean(|r| r.response_time),
        avg_sources_used: mean(|r| r.sources_used as f64),
        avg_response_length: mean(|r| r.response_length as f64),
        error_count: total - successes,
    }
}
