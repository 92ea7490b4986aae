//! Comment reconstruction for one post
//!
//! Comments are keyed by foreign id (a repeated id replaces the earlier
//! record) and inserted in ascending id order so a reply can point at the
//! local id of a parent inserted before it.

use super::session::ImportRun;
use super::ImportContext;
use crate::models::{ExportComment, ForeignId, LocalId};
use crate::store::NewComment;
use std::collections::BTreeMap;
use wxr_common::events::Diagnostic;

pub async fn import_comments(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    post_id: LocalId,
    post_existed: bool,
    comments: &[ExportComment],
) {
    let by_id: BTreeMap<ForeignId, &ExportComment> =
        comments.iter().map(|c| (c.comment_id, c)).collect();

    let mut inserted: BTreeMap<ForeignId, LocalId> = BTreeMap::new();

    for (foreign_id, comment) in by_id {
        let label = format!("comment {} on post {}", foreign_id, post_id);

        // A fresh post cannot have any of these comments yet
        if post_existed {
            match ctx.store.comment_exists(&comment.author, &comment.date).await {
                Ok(true) => {
                    // Not recorded in `inserted`: replies only link within this batch
                    run.report.counters.comments_existing += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    run.diagnose(Diagnostic::skip(
                        "COMMENT_LOOKUP_FAILED",
                        label,
                        format!("Failed to check for existing comment: {}", e),
                    ));
                    continue;
                }
            }
        }

        let parent_id = match comment.parent {
            0 => None,
            parent => inserted.get(&parent).copied(),
        };

        let new_comment = NewComment {
            post_id,
            author: comment.author.clone(),
            author_email: comment.author_email.clone(),
            author_ip: comment.author_ip.clone(),
            author_url: comment.author_url.clone(),
            date: comment.date.clone(),
            date_gmt: comment.date_gmt.clone(),
            content: comment.content.clone(),
            approved: comment.approved.clone(),
            comment_type: if comment.comment_type.is_empty() {
                "comment".to_string()
            } else {
                comment.comment_type.clone()
            },
            parent_id,
        };

        match ctx.store.insert_comment(&new_comment).await {
            Ok(local_id) => {
                inserted.insert(foreign_id, local_id);
                run.report.counters.comments_inserted += 1;
            }
            Err(e) => run.diagnose(Diagnostic::skip(
                "COMMENT_INSERT_FAILED",
                label,
                format!("Failed to insert comment: {}", e),
            )),
        }
    }
}
