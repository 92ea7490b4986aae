//! Author reconciler
//!
//! Binds every author login of the export to a local user before any post is
//! created: an explicitly chosen user, an account created for the author, an
//! existing account with the same login, or the importing user.

use super::session::ImportRun;
use super::{AuthorDecision, ImportContext};
use crate::models::{ExportAuthor, ExportPost, ExportRecordSet, LocalId};
use crate::store::{generate_password, NewUser};
use tracing::{debug, info};
use wxr_common::events::Diagnostic;

const GENERATED_PASSWORD_LEN: usize = 12;

/// Normalize a login the way local account names are stored
///
/// Markup is stripped, anything outside `[A-Za-z0-9 _.@-]` is dropped and
/// whitespace is collapsed.
pub fn sanitize_login(raw: &str) -> String {
    let mut without_tags = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => without_tags.push(ch),
            _ => {}
        }
    }

    let kept: String = without_tags
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | '@' | '-'))
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Authors known to the export, keyed by sanitized login
#[derive(Debug, Clone, Default)]
pub struct AuthorDirectory {
    authors: Vec<ExportAuthor>,
    discovered: bool,
}

impl AuthorDirectory {
    /// Authors listed by the export, or collected from the posts when the
    /// export has no author list
    pub fn from_export(export: &ExportRecordSet) -> Self {
        if export.authors.is_empty() {
            return Self::from_posts(&export.posts);
        }

        let mut authors: Vec<ExportAuthor> = Vec::new();
        for author in &export.authors {
            let login = sanitize_login(&author.login);
            if login.is_empty() || authors.iter().any(|a| a.login == login) {
                continue;
            }
            authors.push(ExportAuthor {
                login,
                ..author.clone()
            });
        }

        Self {
            authors,
            discovered: false,
        }
    }

    fn from_posts(posts: &[ExportPost]) -> Self {
        let mut authors: Vec<ExportAuthor> = Vec::new();
        for post in posts {
            let login = sanitize_login(&post.post_author);
            if login.is_empty() || authors.iter().any(|a| a.login == login) {
                continue;
            }
            authors.push(ExportAuthor {
                display_name: post.post_author.trim().to_string(),
                login,
                ..Default::default()
            });
        }

        Self {
            authors,
            discovered: true,
        }
    }

    /// `true` when the authors were collected from posts (no account data)
    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub fn authors(&self) -> &[ExportAuthor] {
        &self.authors
    }

    pub fn get(&self, login: &str) -> Option<&ExportAuthor> {
        self.authors.iter().find(|a| a.login == login)
    }

    /// One decision per author with no explicit user chosen
    pub fn default_decisions(&self) -> Vec<AuthorDecision> {
        self.authors
            .iter()
            .map(|a| AuthorDecision {
                login: a.login.clone(),
                map_to: None,
            })
            .collect()
    }
}

pub async fn reconcile_authors(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    directory: &AuthorDirectory,
    decisions: &[AuthorDecision],
    posts: &[ExportPost],
) {
    let allow_create = ctx.options.allow_create_users && !directory.is_discovered();
    if ctx.options.allow_create_users && directory.is_discovered() {
        info!("Export has no author list; account creation disabled for this run");
    }

    let total = decisions.len();
    for (index, decision) in decisions.iter().enumerate() {
        run.progress(index + 1, total);

        let login = sanitize_login(&decision.login);
        if login.is_empty() || run.registry.authors.contains(login.as_str()) {
            continue;
        }

        let bound = match decision.map_to {
            Some(user_id) => bind_chosen_user(ctx, run, &login, user_id).await,
            None if allow_create => bind_or_create(ctx, run, directory, &login).await,
            None => None,
        };

        let user_id = bound.unwrap_or(ctx.options.importing_user);
        debug!(login = %login, user_id, "Author bound");
        run.registry.authors.put(login, user_id);
    }

    // Logins used by posts but absent from the decisions
    for post in posts {
        let login = sanitize_login(&post.post_author);
        if !login.is_empty() && !run.registry.authors.contains(login.as_str()) {
            debug!(login = %login, "Unlisted author bound to importing user");
            run.registry.authors.put(login, ctx.options.importing_user);
        }
    }
}

async fn bind_chosen_user(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    login: &str,
    user_id: LocalId,
) -> Option<LocalId> {
    match ctx.store.user_exists(user_id).await {
        Ok(true) => {
            run.report.counters.authors_mapped += 1;
            Some(user_id)
        }
        Ok(false) => {
            run.diagnose(Diagnostic::warning(
                "AUTHOR_USER_MISSING",
                format!("author {}", login),
                format!(
                    "Chosen user {} does not exist; posts attributed to the importing user",
                    user_id
                ),
            ));
            None
        }
        Err(e) => {
            run.diagnose(Diagnostic::warning(
                "AUTHOR_LOOKUP_FAILED",
                format!("author {}", login),
                format!("Failed to look up user {}: {}", user_id, e),
            ));
            None
        }
    }
}

async fn bind_or_create(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    directory: &AuthorDirectory,
    login: &str,
) -> Option<LocalId> {
    match ctx.store.find_user_by_login(login).await {
        Ok(Some(existing)) => {
            run.report.counters.authors_mapped += 1;
            return Some(existing);
        }
        Ok(None) => {}
        Err(e) => {
            run.diagnose(Diagnostic::warning(
                "AUTHOR_LOOKUP_FAILED",
                format!("author {}", login),
                format!("Failed to look up login: {}", e),
            ));
            return None;
        }
    }

    let profile = directory.get(login).cloned().unwrap_or_default();
    let user = NewUser {
        login: login.to_string(),
        password: generate_password(GENERATED_PASSWORD_LEN),
        email: profile.email,
        display_name: if profile.display_name.is_empty() {
            login.to_string()
        } else {
            profile.display_name
        },
        first_name: profile.first_name,
        last_name: profile.last_name,
    };

    match ctx.store.create_user(&user).await {
        Ok(id) => {
            info!(login = %login, user_id = id, "Created user for export author");
            run.report.counters.authors_created += 1;
            Some(id)
        }
        Err(e) => {
            run.diagnose(Diagnostic::warning(
                "AUTHOR_CREATE_FAILED",
                format!("author {}", login),
                format!(
                    "Failed to create new user: {}; posts attributed to the importing user",
                    e
                ),
            ));
            None
        }
    }
}
