//! Import progress events
//!
//! The engine reports progress as a stream of [`ImportEvent`]s on an
//! [`EventBus`] (a `tokio::sync::broadcast` channel). Non-fatal problems are
//! carried as [`Diagnostic`]s: they are reported inline and the run continues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Something was degraded (e.g. author fallback), the entity was still imported
    Warning,
    /// The entity was skipped, the run continues
    Skip,
    /// The run cannot continue
    Critical,
}

/// A single human-readable diagnostic line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Machine-readable code (e.g. "TERM_CREATE_FAILED")
    pub code: String,
    /// Entity the diagnostic concerns (e.g. "post 42", "category news")
    pub entity: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            entity: entity.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn warning(
        code: impl Into<String>,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, code, entity, message)
    }

    pub fn skip(
        code: impl Into<String>,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Skip, code, entity, message)
    }

    pub fn critical(
        code: impl Into<String>,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Critical, code, entity, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.entity, self.message)
    }
}

/// Phases of one import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    /// Categories, tags and generic terms
    Terms,
    /// Binding export authors to local users
    Authors,
    /// Posts, attachments, comments, metadata, menu items
    Posts,
    /// Orphan repair and menu item retry
    Backfill,
    /// Relocated attachment URL substitution
    UrlRemap,
    /// Import finished
    Completed,
    /// Import aborted by a store failure outside any single entity
    Failed,
}

impl ImportPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportPhase::Completed | ImportPhase::Failed)
    }
}

/// Entity counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounters {
    pub terms_created: usize,
    pub terms_existing: usize,
    pub authors_mapped: usize,
    pub authors_created: usize,
    pub posts_created: usize,
    pub posts_existing: usize,
    pub posts_failed: usize,
    pub attachments_imported: usize,
    pub comments_inserted: usize,
    pub comments_existing: usize,
    pub meta_written: usize,
    pub menu_items_imported: usize,
    pub menu_items_deferred: usize,
    pub menu_items_dropped: usize,
    pub post_parents_repaired: usize,
    pub menu_parents_repaired: usize,
    pub url_replacements: u64,
}

/// Events emitted during an import run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    RunStarted {
        run_id: Uuid,
        source: String,
        timestamp: DateTime<Utc>,
    },
    PhaseChanged {
        run_id: Uuid,
        old_phase: ImportPhase,
        new_phase: ImportPhase,
        timestamp: DateTime<Utc>,
    },
    Progress {
        run_id: Uuid,
        phase: ImportPhase,
        current: usize,
        total: usize,
    },
    Diagnostic {
        run_id: Uuid,
        diagnostic: Diagnostic,
    },
    RunCompleted {
        run_id: Uuid,
        counters: ImportCounters,
        diagnostics: usize,
        duration_ms: u64,
    },
    RunFailed {
        run_id: Uuid,
        error: String,
    },
}

/// Broadcast bus for [`ImportEvent`]s
///
/// Events emitted while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    ///
    /// ```
    /// use wxr_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
