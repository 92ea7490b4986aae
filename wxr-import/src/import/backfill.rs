//! Backfill pass, run once after every record has been seen
//!
//! 1. Re-parent posts whose parent appeared later in the export.
//! 2. Retry deferred menu items; whatever is still unresolved is dropped.
//! 3. Re-parent menu items whose parent item appeared later.

use super::menu_items::{import_menu_item, Pass};
use super::session::ImportRun;
use super::ImportContext;
use tracing::debug;
use wxr_common::events::Diagnostic;

pub async fn run_backfill(ctx: &ImportContext<'_>, run: &mut ImportRun) {
    repair_post_parents(ctx, run).await;
    retry_menu_items(ctx, run).await;
    repair_menu_item_parents(ctx, run).await;
}

async fn repair_post_parents(ctx: &ImportContext<'_>, run: &mut ImportRun) {
    for (child, parent) in run.post_orphans.take() {
        let local_child = run.registry.posts.get(&child);
        let local_parent = run.registry.posts.get(&parent);

        let (Some(local_child), Some(local_parent)) = (local_child, local_parent) else {
            debug!(child, parent, "Post parent never imported; left without parent");
            continue;
        };

        match ctx.store.update_post_parent(local_child, local_parent).await {
            Ok(()) => run.report.counters.post_parents_repaired += 1,
            Err(e) => run.diagnose(Diagnostic::warning(
                "POST_PARENT_REPAIR_FAILED",
                format!("post {}", child),
                format!("Failed to set parent {}: {}", parent, e),
            )),
        }
    }
}

async fn retry_menu_items(ctx: &ImportContext<'_>, run: &mut ImportRun) {
    let deferred = run.missing_menu_items.take();
    if deferred.is_empty() {
        return;
    }

    debug!(count = deferred.len(), "Retrying deferred menu items");
    let total = deferred.len();
    for (index, item) in deferred.iter().enumerate() {
        run.progress(index + 1, total);
        import_menu_item(ctx, run, item, Pass::Retry).await;
    }
}

async fn repair_menu_item_parents(ctx: &ImportContext<'_>, run: &mut ImportRun) {
    for (child, parent) in run.menu_item_orphans.take() {
        let local_child = run.registry.menu_items.get(&child);
        let local_parent = run.registry.menu_items.get(&parent);

        let (Some(local_child), Some(local_parent)) = (local_child, local_parent) else {
            debug!(child, parent, "Menu item parent never imported");
            continue;
        };

        match ctx.store.set_menu_item_parent(local_child, local_parent).await {
            Ok(()) => run.report.counters.menu_parents_repaired += 1,
            Err(e) => run.diagnose(Diagnostic::warning(
                "MENU_PARENT_REPAIR_FAILED",
                format!("menu item {}", child),
                format!("Failed to set parent item {}: {}", parent, e),
            )),
        }
    }
}
