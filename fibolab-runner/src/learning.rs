//! Learning-store hand-off.
//!
//! Qualifying runs are flattened into a [`LearningRecord`] and pushed to a
//! [`LearningSink`]. The store is write-only from our side; nothing here is
//! ever read back, and nothing here runs inside the bar loop.

use std::process::Command;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::runner::BacktestReport;

/// Sharpe that maps to a verdict score of 1.0.
pub const VERDICT_SHARPE_CEILING: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Runs must return strictly more than this.
    pub min_total_return: f64,
    /// Runs must reach at least this Sharpe.
    pub min_sharpe: f64,
    pub session_id: String,
    /// Program and leading arguments for [`CommandSink`]. The session id,
    /// strategy name, verdict, success flag, and record JSON are appended.
    pub command: Vec<String>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_total_return: 0.0,
            min_sharpe: 1.0,
            session_id: "backtesting".to_string(),
            command: Vec::new(),
        }
    }
}

impl LearningConfig {
    pub fn qualifies(&self, record: &LearningRecord) -> bool {
        record.total_return > self.min_total_return && record.sharpe_ratio >= self.min_sharpe
    }
}

/// Flat summary of one run, as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub strategy_name: String,
    pub params: serde_json::Value,
    /// BLAKE3 of the canonical params JSON, hex.
    pub fingerprint: String,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    /// `min(sharpe / 3, 1)`, floored at 0.
    pub verdict: f64,
}

impl LearningRecord {
    pub fn from_report(report: &BacktestReport) -> Self {
        let m = &report.metrics;
        Self {
            strategy_name: report.result.strategy_name.clone(),
            params: report.params.clone(),
            fingerprint: fingerprint(&report.result.strategy_name, &report.params),
            total_return: m.total_return,
            sharpe_ratio: m.sharpe_ratio,
            win_rate: m.win_rate,
            max_drawdown: m.max_drawdown,
            total_trades: m.total_trades,
            verdict: verdict_score(m.sharpe_ratio),
        }
    }
}

pub fn verdict_score(sharpe: f64) -> f64 {
    (sharpe / VERDICT_SHARPE_CEILING).clamp(0.0, 1.0)
}

/// Content hash of a strategy name and its parameters.
pub fn fingerprint(strategy_name: &str, params: &serde_json::Value) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(strategy_name.as_bytes());
    hasher.update(b"\0");
    hasher.update(params.to_string().as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to launch learning command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("learning command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("learning command is not configured")]
    NotConfigured,
}

/// Write-only destination for learning records.
pub trait LearningSink: Send + Sync {
    fn record(&self, record: &LearningRecord) -> Result<(), SinkError>;
}

/// Keeps records in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LearningRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LearningRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl LearningSink for MemorySink {
    fn record(&self, record: &LearningRecord) -> Result<(), SinkError> {
        match self.records.lock() {
            Ok(mut records) => records.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
        Ok(())
    }
}

/// Hands each record to an external program, one process per record.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
    session_id: String,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>, session_id: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            session_id: session_id.into(),
        }
    }

    /// `None` when `config.command` is empty.
    pub fn from_config(config: &LearningConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), config.session_id.clone()))
    }
}

impl LearningSink for CommandSink {
    fn record(&self, record: &LearningRecord) -> Result<(), SinkError> {
        if self.program.is_empty() {
            return Err(SinkError::NotConfigured);
        }
        let payload = serde_json::to_string(record)?;
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.session_id)
            .arg(&record.strategy_name)
            .arg(format!("{:.4}", record.verdict))
            .arg(if record.total_return > 0.0 { "true" } else { "false" })
            .arg(payload)
            .output()?;
        if !output.status.success() {
            return Err(SinkError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Submit `report` if it clears the gate. Returns the submitted record.
///
/// Sink failures are logged and swallowed: a failed hand-off never fails the
/// backtest.
pub fn submit_if_qualified(
    sink: &dyn LearningSink,
    report: &BacktestReport,
    config: &LearningConfig,
) -> Option<LearningRecord> {
    let record = LearningRecord::from_report(report);
    if !config.qualifies(&record) {
        return None;
    }
    match sink.record(&record) {
        Ok(()) => {
            info!(
                strategy = %record.strategy_name,
                verdict = record.verdict,
                "stored strategy in learning sink"
            );
            Some(record)
        }
        Err(e) => {
            warn!(strategy = %record.strategy_name, error = %e, "learning sink hand-off failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total_return: f64, sharpe: f64) -> LearningRecord {
        LearningRecord {
            strategy_name: "fib_retracement".into(),
            params: serde_json::json!({ "lookback": 20 }),
            fingerprint: fingerprint("fib_retracement", &serde_json::json!({ "lookback": 20 })),
            total_return,
            sharpe_ratio: sharpe,
            win_rate: 0.6,
            max_drawdown: -0.1,
            total_trades: 12,
            verdict: verdict_score(sharpe),
        }
    }

    #[test]
    fn verdict_caps_at_one() {
        assert_eq!(verdict_score(1.5), 0.5);
        assert_eq!(verdict_score(4.5), 1.0);
        assert_eq!(verdict_score(-1.0), 0.0);
    }

    #[test]
    fn gate_requires_both_conditions() {
        let config = LearningConfig::default();
        assert!(config.qualifies(&record(0.05, 1.0)));
        assert!(!config.qualifies(&record(0.0, 2.0)));
        assert!(!config.qualifies(&record(0.05, 0.99)));
    }

    #[test]
    fn fingerprint_tracks_params() {
        let a = fingerprint("s", &serde_json::json!({ "k": 1.618 }));
        let b = fingerprint("s", &serde_json::json!({ "k": 2.0 }));
        let c = fingerprint("t", &serde_json::json!({ "k": 1.618 }));
        assert_eq!(a, fingerprint("s", &serde_json::json!({ "k": 1.618 })));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn memory_sink_collects() {
        let sink = MemorySink::new();
        sink.record(&record(0.1, 2.0)).unwrap();
        sink.record(&record(0.2, 3.0)).unwrap();
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn command_sink_requires_program() {
        assert!(CommandSink::from_config(&LearningConfig::default()).is_none());
        let sink = CommandSink::new("", vec![], "s");
        assert!(matches!(sink.record(&record(0.1, 2.0)), Err(SinkError::NotConfigured)));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let sink = CommandSink::new("fibolab-no-such-learning-store", vec![], "s");
        assert!(matches!(sink.record(&record(0.1, 2.0)), Err(SinkError::Spawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn command_sink_reports_exit_status() {
        let ok = CommandSink::new("true", vec![], "s");
        assert!(ok.record(&record(0.1, 2.0)).is_ok());
        let failing = CommandSink::new("false", vec![], "s");
        assert!(matches!(
            failing.record(&record(0.1, 2.0)),
            Err(SinkError::Failed { .. })
        ));
    }
}
