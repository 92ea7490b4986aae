//! State of one import run
//!
//! [`ImportRun`] owns every piece of mutable state the components share
//! (remap registry, orphan sets, deferred menu items, URL remap table and the
//! report) and is passed to each of them by `&mut`.

use super::registry::{DeferredQueue, OrphanSet, RemapRegistry, UrlRemapTable};
use crate::models::{ExportPost, ImportReport};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{error, info, warn};
use uuid::Uuid;
use wxr_common::events::{Diagnostic, EventBus, ImportEvent, ImportPhase, Severity};

pub struct ImportRun {
    pub run_id: Uuid,
    pub phase: ImportPhase,
    pub registry: RemapRegistry,
    pub post_orphans: OrphanSet,
    pub menu_item_orphans: OrphanSet,
    pub missing_menu_items: DeferredQueue<ExportPost>,
    pub url_remap: UrlRemapTable,
    pub report: ImportReport,
    /// Raw author logins already reported as unresolved
    unresolved_logins: BTreeSet<String>,
    events: EventBus,
}

impl ImportRun {
    pub fn new(events: EventBus) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            run_id,
            phase: ImportPhase::Terms,
            registry: RemapRegistry::default(),
            post_orphans: OrphanSet::default(),
            menu_item_orphans: OrphanSet::default(),
            missing_menu_items: DeferredQueue::default(),
            url_remap: UrlRemapTable::default(),
            report: ImportReport::new(run_id),
            unresolved_logins: BTreeSet::new(),
            events,
        }
    }

    pub fn start(&self, source: &str) {
        info!(run_id = %self.run_id, source = %source, "Import run started");
        self.events.emit_lossy(ImportEvent::RunStarted {
            run_id: self.run_id,
            source: source.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Move to `new_phase`, announcing the transition
    pub fn transition_to(&mut self, new_phase: ImportPhase) {
        let old_phase = self.phase;
        self.phase = new_phase;

        if new_phase.is_terminal() {
            self.report.ended_at = Some(Utc::now());
        }

        info!(
            run_id = %self.run_id,
            old_phase = ?old_phase,
            new_phase = ?new_phase,
            "Import phase changed"
        );
        self.events.emit_lossy(ImportEvent::PhaseChanged {
            run_id: self.run_id,
            old_phase,
            new_phase,
            timestamp: Utc::now(),
        });
    }

    /// Record a non-fatal problem: logged, kept in the report, broadcast
    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Critical => error!(
                run_id = %self.run_id,
                code = %diagnostic.code,
                entity = %diagnostic.entity,
                "{}",
                diagnostic.message
            ),
            Severity::Warning | Severity::Skip => warn!(
                run_id = %self.run_id,
                code = %diagnostic.code,
                entity = %diagnostic.entity,
                "{}",
                diagnostic.message
            ),
        }

        self.events.emit_lossy(ImportEvent::Diagnostic {
            run_id: self.run_id,
            diagnostic: diagnostic.clone(),
        });
        self.report.diagnostics.push(diagnostic);
    }

    pub fn progress(&self, current: usize, total: usize) {
        self.events.emit_lossy(ImportEvent::Progress {
            run_id: self.run_id,
            phase: self.phase,
            current,
            total,
        });
    }

    /// `true` the first time a raw login is reported as unresolved
    pub fn first_unresolved_login(&mut self, raw_login: &str) -> bool {
        self.unresolved_logins.insert(raw_login.to_string())
    }

    /// Abort: announce the failure and hand back what was done so far
    pub fn fail(&mut self, error: &str) {
        self.diagnose(Diagnostic::critical("RUN_FAILED", "import", error));
        self.transition_to(ImportPhase::Failed);
        self.events.emit_lossy(ImportEvent::RunFailed {
            run_id: self.run_id,
            error: error.to_string(),
        });
    }

    /// Close the run and return its report
    pub fn finish(mut self) -> ImportReport {
        self.transition_to(ImportPhase::Completed);

        let report = self.report;
        info!(
            run_id = %report.run_id,
            posts_created = report.counters.posts_created,
            attachments = report.counters.attachments_imported,
            diagnostics = report.diagnostics.len(),
            duration_ms = report.duration_ms(),
            "Import run completed"
        );
        self.events.emit_lossy(ImportEvent::RunCompleted {
            run_id: report.run_id,
            counters: report.counters.clone(),
            diagnostics: report.diagnostics.len(),
            duration_ms: report.duration_ms(),
        });
        report
    }
}
