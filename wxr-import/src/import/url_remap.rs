//! URL remap engine
//!
//! Rewrites every recorded relocation in post content and in `enclosure`
//! metadata, longest original URL first.

use super::session::ImportRun;
use super::ImportContext;
use crate::store::ENCLOSURE_META_KEY;
use tracing::{debug, info};
use wxr_common::events::Diagnostic;

pub async fn apply_url_remap(ctx: &ImportContext<'_>, run: &mut ImportRun) {
    let pairs = std::mem::take(&mut run.url_remap).into_ordered();
    if pairs.is_empty() {
        return;
    }

    let total = pairs.len();
    for (index, (from, to)) in pairs.iter().enumerate() {
        run.progress(index + 1, total);

        let content = ctx.store.replace_in_post_content(from, to).await;
        let enclosures = ctx
            .store
            .replace_in_post_meta(ENCLOSURE_META_KEY, from, to)
            .await;

        match (content, enclosures) {
            (Ok(content), Ok(enclosures)) => {
                debug!(from = %from, to = %to, content, enclosures, "URL remapped");
                run.report.counters.url_replacements += content + enclosures;
            }
            (Err(e), _) | (_, Err(e)) => run.diagnose(Diagnostic::warning(
                "URL_REMAP_FAILED",
                from.clone(),
                format!("Failed to rewrite references to {}: {}", to, e),
            )),
        }
    }

    info!(
        urls = total,
        replacements = run.report.counters.url_replacements,
        "Attachment URLs remapped"
    );
}
