//! Import orchestration
//!
//! [`Importer::import`] runs the phases in order:
//! Terms → Authors → Posts → Backfill → UrlRemap.
//!
//! Per-entity problems become diagnostics and the run continues. Only a
//! failure of the store outside any single entity (switching count deferral
//! on or off) aborts the run.

pub mod attachments;
pub mod authors;
pub mod backfill;
pub mod comments;
pub mod menu_items;
pub mod meta_filter;
pub mod posts;
pub mod registry;
pub mod session;
pub mod terms;
pub mod url_remap;

pub use authors::AuthorDirectory;
pub use meta_filter::{DefaultMetaKeyFilter, MetaKeyFilter};
pub use session::ImportRun;

use crate::fetcher::RemoteFetcher;
use crate::models::{ExportRecordSet, ImportReport, LocalId};
use crate::store::ContentStore;
use tracing::error;
use wxr_common::config::ImportSettings;
use wxr_common::events::{EventBus, ImportPhase};
use wxr_common::Result;

/// Policy for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub fetch_attachments: bool,
    pub allow_create_users: bool,
    /// Bytes; 0 means unlimited
    pub max_attachment_size: u64,
    pub defer_counting: bool,
    /// Local user that receives anything without a resolvable author
    pub importing_user: LocalId,
}

impl ImportOptions {
    pub fn from_settings(settings: &ImportSettings, importing_user: LocalId) -> Self {
        Self {
            fetch_attachments: settings.fetch_attachments,
            allow_create_users: settings.allow_create_users,
            max_attachment_size: settings.max_attachment_size,
            defer_counting: settings.defer_counting,
            importing_user,
        }
    }
}

/// Caller's choice for one export author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDecision {
    /// Login as it appears in the export
    pub login: String,
    /// Existing local user to attribute the author's posts to
    pub map_to: Option<LocalId>,
}

impl AuthorDecision {
    pub fn new(login: impl Into<String>, map_to: Option<LocalId>) -> Self {
        Self {
            login: login.into(),
            map_to,
        }
    }
}

/// Collaborators shared by every component during a run
pub struct ImportContext<'a> {
    pub store: &'a dyn ContentStore,
    pub fetcher: &'a dyn RemoteFetcher,
    pub options: &'a ImportOptions,
    pub meta_filter: &'a dyn MetaKeyFilter,
    /// Base URL of the originating site
    pub base_url: &'a str,
}

pub struct Importer<'a> {
    store: &'a dyn ContentStore,
    fetcher: &'a dyn RemoteFetcher,
    options: ImportOptions,
    meta_filter: Box<dyn MetaKeyFilter + 'a>,
    events: EventBus,
}

impl<'a> Importer<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        fetcher: &'a dyn RemoteFetcher,
        options: ImportOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            options,
            meta_filter: Box::new(DefaultMetaKeyFilter),
            events: EventBus::default(),
        }
    }

    pub fn with_meta_filter(mut self, filter: impl MetaKeyFilter + 'a) -> Self {
        self.meta_filter = Box::new(filter);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import a parsed export
    ///
    /// `decisions` bind export authors to local users; logins used by posts
    /// but not listed are attributed to the importing user.
    pub async fn import(
        &self,
        export: &ExportRecordSet,
        decisions: &[AuthorDecision],
    ) -> Result<ImportReport> {
        let ctx = ImportContext {
            store: self.store,
            fetcher: self.fetcher,
            options: &self.options,
            meta_filter: self.meta_filter.as_ref(),
            base_url: &export.base_url,
        };

        let mut run = ImportRun::new(self.events.clone());
        run.start(&export.base_url);

        if self.options.defer_counting {
            if let Err(e) = self.store.set_deferred_counting(true).await {
                return Err(abort(&mut run, e));
            }
        }

        run.transition_to(ImportPhase::Terms);
        terms::import_terms(&ctx, &mut run, &export.terms).await;

        run.transition_to(ImportPhase::Authors);
        let directory = AuthorDirectory::from_export(export);
        authors::reconcile_authors(&ctx, &mut run, &directory, decisions, &export.posts).await;

        run.transition_to(ImportPhase::Posts);
        posts::import_posts(&ctx, &mut run, &export.posts).await;

        run.transition_to(ImportPhase::Backfill);
        backfill::run_backfill(&ctx, &mut run).await;

        run.transition_to(ImportPhase::UrlRemap);
        url_remap::apply_url_remap(&ctx, &mut run).await;

        if self.options.defer_counting {
            if let Err(e) = self.store.set_deferred_counting(false).await {
                return Err(abort(&mut run, e));
            }
        }

        Ok(run.finish())
    }
}

fn abort(run: &mut ImportRun, e: wxr_common::Error) -> wxr_common::Error {
    error!(run_id = %run.run_id, error = %e, "Import run aborted");
    run.fail(&e.to_string());
    e
}
