//! Post importer
//!
//! Walks the posts in export order. Menu items are handed to the menu item
//! importer, attachments to the attachment importer; everything else becomes
//! a post (or is matched to an existing one by title and date), followed by
//! its terms, comments and metadata.

use super::attachments::import_attachment;
use super::authors::sanitize_login;
use super::comments::import_comments;
use super::menu_items::{import_menu_item, Pass};
use super::meta_filter::filtered_key;
use super::session::ImportRun;
use super::terms::canonical_taxonomy;
use super::ImportContext;
use crate::models::{ExportPost, LocalId, TermRef, ATTACHMENT, NAV_MENU_ITEM};
use crate::store::{NewPost, NewTerm};
use std::collections::BTreeMap;
use tracing::debug;
use wxr_common::events::Diagnostic;

pub async fn import_posts(ctx: &ImportContext<'_>, run: &mut ImportRun, posts: &[ExportPost]) {
    let total = posts.len();
    for (index, post) in posts.iter().enumerate() {
        run.progress(index + 1, total);
        import_post(ctx, run, post).await;
    }
}

async fn import_post(ctx: &ImportContext<'_>, run: &mut ImportRun, post: &ExportPost) {
    let label = post.label();

    match ctx.store.post_type_exists(&post.post_type).await {
        Ok(true) => {}
        Ok(false) => {
            run.diagnose(Diagnostic::skip(
                "POST_TYPE_INVALID",
                label,
                format!("Invalid post type {}", post.post_type),
            ));
            return;
        }
        Err(e) => {
            run.diagnose(Diagnostic::skip(
                "POST_LOOKUP_FAILED",
                label,
                format!("Failed to check post type: {}", e),
            ));
            return;
        }
    }

    if post.post_id != 0 && run.registry.posts.contains(&post.post_id) {
        return;
    }

    if post.post_type == NAV_MENU_ITEM {
        import_menu_item(ctx, run, post, Pass::Primary).await;
        return;
    }

    let existing = match ctx
        .store
        .find_post_by_title_and_date(&post.post_title, &post.post_date)
        .await
    {
        Ok(existing) => existing,
        Err(e) => {
            run.diagnose(Diagnostic::skip(
                "POST_LOOKUP_FAILED",
                label,
                format!("Failed to check for existing post: {}", e),
            ));
            return;
        }
    };

    let post_existed = existing.is_some();
    let post_id = match existing {
        Some(id) => {
            debug!(post = %label, local_id = id, "Post already exists");
            run.report.counters.posts_existing += 1;
            id
        }
        None => match create_post(ctx, run, post).await {
            Some(id) => id,
            None => return,
        },
    };

    if post.post_id != 0 {
        run.registry.posts.put(post.post_id, post_id);
    }

    if !post.terms.is_empty() {
        assign_terms(ctx, run, post_id, &label, &post.terms).await;
    }

    if !post.comments.is_empty() {
        import_comments(ctx, run, post_id, post_existed, &post.comments).await;
    }

    for meta in &post.postmeta {
        let Some(key) = filtered_key(ctx.meta_filter, &meta.key) else {
            continue;
        };
        match ctx.store.set_post_meta(post_id, &key, &meta.value).await {
            Ok(()) => run.report.counters.meta_written += 1,
            Err(e) => run.diagnose(Diagnostic::warning(
                "META_WRITE_FAILED",
                label.clone(),
                format!("Failed to store metadata {}: {}", key, e),
            )),
        }
    }
}

/// Create a post that does not exist locally yet
async fn create_post(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    post: &ExportPost,
) -> Option<LocalId> {
    let label = post.label();

    let mut orphan_parent = None;
    let parent_id = match post.post_parent {
        0 => None,
        parent => match run.registry.posts.get(&parent) {
            Some(local) => Some(local),
            None => {
                orphan_parent = Some(parent);
                None
            }
        },
    };

    let author_id = resolve_author(ctx, run, post, &label);

    let draft = NewPost {
        import_id: (post.post_id != 0).then_some(post.post_id),
        author_id,
        post_date: post.post_date.clone(),
        post_date_gmt: post.post_date_gmt.clone(),
        content: post.post_content.clone(),
        excerpt: post.post_excerpt.clone(),
        title: post.post_title.clone(),
        status: post.status.clone(),
        name: post.post_name.clone(),
        comment_status: post.comment_status.clone(),
        ping_status: post.ping_status.clone(),
        guid: post.guid.clone(),
        parent_id,
        menu_order: post.menu_order,
        post_type: post.post_type.clone(),
        password: post.post_password.clone(),
        mime_type: None,
    };

    let created = if post.post_type == ATTACHMENT {
        import_attachment(ctx, run, draft, post.attachment_source())
            .await
            .map_err(|e| (e.code(), e.to_string()))
    } else {
        ctx.store
            .create_post(&draft)
            .await
            .map_err(|e| ("POST_CREATE_FAILED", e.to_string()))
    };

    let post_id = match created {
        Ok(id) => id,
        Err((code, message)) => {
            run.diagnose(Diagnostic::skip(
                code,
                label,
                format!("Failed to import post object: {}", message),
            ));
            run.report.counters.posts_failed += 1;
            return None;
        }
    };

    // Recorded only now that the child exists
    if let Some(parent) = orphan_parent {
        if post.post_id != 0 {
            run.post_orphans.insert(post.post_id, parent);
        }
    }

    if post.is_sticky {
        if let Err(e) = ctx.store.stick_post(post_id).await {
            run.diagnose(Diagnostic::warning(
                "POST_STICKY_FAILED",
                label.clone(),
                format!("Failed to mark post sticky: {}", e),
            ));
        }
    }

    if post.post_type != ATTACHMENT {
        run.report.counters.posts_created += 1;
    }
    debug!(post = %label, local_id = post_id, "Post created");

    Some(post_id)
}

/// Local author for a post; falls back to the importing user
fn resolve_author(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    post: &ExportPost,
    label: &str,
) -> LocalId {
    let login = sanitize_login(&post.post_author);
    if !login.is_empty() {
        if let Some(user_id) = run.registry.authors.get(login.as_str()) {
            return user_id;
        }
    }

    if run.first_unresolved_login(&post.post_author) {
        run.diagnose(Diagnostic::warning(
            "AUTHOR_UNRESOLVED",
            label,
            format!(
                "Author {:?} could not be resolved; attributed to the importing user",
                post.post_author
            ),
        ));
    }
    ctx.options.importing_user
}

/// Find or create each referenced term and attach them per taxonomy
async fn assign_terms(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    post_id: LocalId,
    label: &str,
    terms: &[TermRef],
) {
    let mut by_taxonomy: BTreeMap<String, Vec<LocalId>> = BTreeMap::new();

    for term in terms {
        let taxonomy = canonical_taxonomy(&term.domain);
        let term_label = format!("{} {}", taxonomy, term.slug);

        let term_id = match ctx.store.find_term(&term.slug, taxonomy).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let new_term = NewTerm {
                    taxonomy: taxonomy.to_string(),
                    name: if term.name.is_empty() {
                        term.slug.clone()
                    } else {
                        term.name.clone()
                    },
                    slug: term.slug.clone(),
                    ..Default::default()
                };
                match ctx.store.create_term(&new_term).await {
                    Ok(id) => {
                        run.report.counters.terms_created += 1;
                        id
                    }
                    Err(e) => {
                        run.diagnose(Diagnostic::skip(
                            "TERM_CREATE_FAILED",
                            term_label,
                            format!("Error importing term for {}: {}", label, e),
                        ));
                        continue;
                    }
                }
            }
            Err(e) => {
                run.diagnose(Diagnostic::skip(
                    "TERM_LOOKUP_FAILED",
                    term_label,
                    format!("Failed to look up term for {}: {}", label, e),
                ));
                continue;
            }
        };

        by_taxonomy
            .entry(taxonomy.to_string())
            .or_default()
            .push(term_id);
    }

    for (taxonomy, term_ids) in by_taxonomy {
        if let Err(e) = ctx.store.set_post_terms(post_id, &taxonomy, &term_ids).await {
            run.diagnose(Diagnostic::warning(
                "TERM_ASSIGN_FAILED",
                label,
                format!("Failed to assign {} terms: {}", taxonomy, e),
            ));
        }
    }
}
