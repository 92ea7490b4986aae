//! Data models for the importer
//!
//! - `export`: the parsed export record set (foreign identifiers only)
//! - `import_report`: counters and diagnostics produced by a run

pub mod export;
pub mod import_report;

pub use export::{
    ExportAuthor, ExportComment, ExportPost, ExportRecordSet, ExportTerm, PostMeta, TermRef,
    ATTACHMENT, NAV_MENU_ITEM,
};
pub use import_report::ImportReport;

/// Identifier meaningful only within the export
pub type ForeignId = u64;

/// Identifier assigned by the target content store
pub type LocalId = i64;
