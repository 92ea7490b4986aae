//! Term resolver
//!
//! Categories first, then tags, then every other taxonomy. A term that
//! already exists by slug in its taxonomy is reused as-is; otherwise it is
//! created with its parent looked up by slug or name in the store.

use super::session::ImportRun;
use super::ImportContext;
use crate::models::{ExportTerm, LocalId};
use crate::store::NewTerm;
use tracing::debug;
use wxr_common::events::Diagnostic;

/// Older exports call tags `tag`
pub fn canonical_taxonomy(taxonomy: &str) -> &str {
    if taxonomy == "tag" {
        "post_tag"
    } else {
        taxonomy
    }
}

fn taxonomy_rank(taxonomy: &str) -> u8 {
    match canonical_taxonomy(taxonomy) {
        "category" => 0,
        "post_tag" => 1,
        _ => 2,
    }
}

pub async fn import_terms(ctx: &ImportContext<'_>, run: &mut ImportRun, terms: &[ExportTerm]) {
    let mut ordered: Vec<&ExportTerm> = terms.iter().collect();
    ordered.sort_by_key(|t| taxonomy_rank(&t.taxonomy));

    let total = ordered.len();
    for (index, term) in ordered.into_iter().enumerate() {
        run.progress(index + 1, total);
        import_term(ctx, run, term).await;
    }
}

async fn import_term(ctx: &ImportContext<'_>, run: &mut ImportRun, term: &ExportTerm) {
    let taxonomy = canonical_taxonomy(&term.taxonomy);
    let label = format!("{} {}", taxonomy, term.slug);

    if term.term_id != 0 && run.registry.terms.contains(&term.term_id) {
        return;
    }

    match ctx.store.find_term(&term.slug, taxonomy).await {
        Ok(Some(existing)) => {
            debug!(term = %label, local_id = existing, "Term already exists");
            record(run, term, existing);
            run.report.counters.terms_existing += 1;
            return;
        }
        Ok(None) => {}
        Err(e) => {
            run.diagnose(Diagnostic::skip(
                "TERM_LOOKUP_FAILED",
                label,
                format!("Failed to look up term: {}", e),
            ));
            return;
        }
    }

    let parent_id = match term.parent.as_deref().map(str::trim) {
        Some(parent) if !parent.is_empty() => find_parent(ctx, run, parent, taxonomy, &label).await,
        _ => None,
    };

    let new_term = NewTerm {
        taxonomy: taxonomy.to_string(),
        name: term.name.clone(),
        slug: term.slug.clone(),
        parent_id,
        description: term.description.clone(),
    };

    match ctx.store.create_term(&new_term).await {
        Ok(id) => {
            debug!(term = %label, local_id = id, "Term created");
            record(run, term, id);
            run.report.counters.terms_created += 1;
        }
        Err(e) => run.diagnose(Diagnostic::skip(
            "TERM_CREATE_FAILED",
            label,
            format!("Failed to import term: {}", e),
        )),
    }
}

/// Parent by slug, then by name, in the current store state
async fn find_parent(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    parent: &str,
    taxonomy: &str,
    label: &str,
) -> Option<LocalId> {
    let by_slug = ctx.store.find_term(parent, taxonomy).await;
    let found = match by_slug {
        Ok(Some(id)) => Ok(Some(id)),
        Ok(None) => ctx.store.find_term_by_name(parent, taxonomy).await,
        Err(e) => Err(e),
    };

    match found {
        Ok(parent_id) => parent_id,
        Err(e) => {
            run.diagnose(Diagnostic::warning(
                "TERM_PARENT_LOOKUP_FAILED",
                label,
                format!("Could not look up parent {}: {}", parent, e),
            ));
            None
        }
    }
}

fn record(run: &mut ImportRun, term: &ExportTerm, local: LocalId) {
    if term.term_id != 0 {
        run.registry.terms.put(term.term_id, local);
    }
}
