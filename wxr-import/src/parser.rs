//! Export readers
//!
//! Any reader producing an [`ExportRecordSet`] can drive the engine. The
//! bundled one reads the record set serialized as JSON.

use crate::models::ExportRecordSet;
use std::path::Path;
use tracing::info;
use wxr_common::{Error, Result};

pub trait ExportParser {
    /// Read a complete export; failure aborts the import before it starts
    fn parse(&self, path: &Path) -> Result<ExportRecordSet>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExportParser;

impl JsonExportParser {
    pub fn parse_str(&self, json: &str) -> Result<ExportRecordSet> {
        serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
    }
}

impl ExportParser for JsonExportParser {
    fn parse(&self, path: &Path) -> Result<ExportRecordSet> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;
        let set = self
            .parse_str(&contents)
            .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;

        info!(
            authors = set.authors.len(),
            terms = set.terms.len(),
            posts = set.posts.len(),
            "Parsed export {}",
            path.display()
        );

        Ok(set)
    }
}
