//! Import run results
//!
//! Counters plus every diagnostic reported during the run, in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wxr_common::events::{Diagnostic, ImportCounters, Severity};

/// Import completion report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: Uuid,

    pub counters: ImportCounters,

    /// Non-fatal problems, in the order they were reported
    pub diagnostics: Vec<Diagnostic>,

    pub started_at: DateTime<Utc>,

    pub ended_at: Option<DateTime<Utc>>,
}

impl ImportReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            counters: ImportCounters::default(),
            diagnostics: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Count diagnostics by severity
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Diagnostics carrying the given code
    pub fn diagnostics_with_code(&self, code: &str) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.code == code).collect()
    }

    /// Elapsed wall-clock time in milliseconds (0 while the run is open)
    pub fn duration_ms(&self) -> u64 {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0)
    }
}
