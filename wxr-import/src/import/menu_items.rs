//! Menu item importer
//!
//! A menu item references its menu by slug, the object it links to by
//! foreign id, and its parent item by foreign id. Items whose object is not
//! mapped yet are deferred; the backfill pass retries them once.

use super::session::ImportRun;
use super::ImportContext;
use crate::models::{ExportPost, ForeignId, LocalId, PostMeta};
use crate::store::{menu_meta, NewMenuItem};
use tracing::debug;
use wxr_common::events::Diagnostic;

pub const NAV_MENU_TAXONOMY: &str = "nav_menu";

/// What a menu item links to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItemKind {
    Taxonomy,
    PostType,
    Custom,
    Other(String),
}

impl MenuItemKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "taxonomy" => MenuItemKind::Taxonomy,
            "post_type" => MenuItemKind::PostType,
            "custom" => MenuItemKind::Custom,
            other => MenuItemKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MenuItemKind::Taxonomy => "taxonomy",
            MenuItemKind::PostType => "post_type",
            MenuItemKind::Custom => "custom",
            MenuItemKind::Other(other) => other,
        }
    }
}

/// Menu item fields carried in metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemMeta {
    pub kind: MenuItemKind,
    pub object_id: ForeignId,
    pub object: String,
    pub url: String,
    pub classes: String,
    pub target: String,
    pub xfn: String,
    pub parent: ForeignId,
}

impl MenuItemMeta {
    /// Look up each known key (last value wins); missing keys default,
    /// unknown keys are ignored
    pub fn from_post_meta(meta: &[PostMeta]) -> Self {
        let lookup = |key: &str| -> String {
            meta.iter()
                .rev()
                .find(|m| m.key == key)
                .map(|m| m.value.clone())
                .unwrap_or_default()
        };
        let lookup_id = |key: &str| -> ForeignId { lookup(key).trim().parse().unwrap_or(0) };

        Self {
            kind: MenuItemKind::parse(&lookup(menu_meta::TYPE)),
            object_id: lookup_id(menu_meta::OBJECT_ID),
            object: lookup(menu_meta::OBJECT),
            url: lookup(menu_meta::URL),
            classes: lookup(menu_meta::CLASSES),
            target: lookup(menu_meta::TARGET),
            xfn: lookup(menu_meta::XFN),
            parent: lookup_id(menu_meta::PARENT),
        }
    }
}

/// Whether unresolved items may still be deferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Primary,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItemOutcome {
    Imported(LocalId),
    AlreadyImported(LocalId),
    SkippedNoMenu,
    SkippedInvalidMenu,
    Deferred,
    Dropped,
    Failed,
}

pub async fn import_menu_item(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    item: &ExportPost,
    pass: Pass,
) -> MenuItemOutcome {
    let label = format!("menu item {}", item.post_id);

    if item.post_id != 0 {
        if let Some(existing) = run.registry.menu_items.get(&item.post_id) {
            return MenuItemOutcome::AlreadyImported(existing);
        }
    }

    let menu_slug = match item.terms.iter().find(|t| t.domain == NAV_MENU_TAXONOMY) {
        Some(term) => term.slug.as_str(),
        None => {
            run.diagnose(Diagnostic::skip(
                "MENU_ITEM_NO_MENU",
                label,
                "Menu item skipped due to missing menu slug",
            ));
            return MenuItemOutcome::SkippedNoMenu;
        }
    };

    let menu_id = match ctx.store.find_term(menu_slug, NAV_MENU_TAXONOMY).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            run.diagnose(Diagnostic::skip(
                "MENU_ITEM_INVALID_MENU",
                label,
                format!("Menu item skipped due to invalid menu slug: {}", menu_slug),
            ));
            return MenuItemOutcome::SkippedInvalidMenu;
        }
        Err(e) => {
            run.diagnose(Diagnostic::skip(
                "MENU_ITEM_LOOKUP_FAILED",
                label,
                format!("Failed to look up menu {}: {}", menu_slug, e),
            ));
            return MenuItemOutcome::Failed;
        }
    };

    let meta = MenuItemMeta::from_post_meta(&item.postmeta);

    let object_id = match &meta.kind {
        MenuItemKind::Taxonomy => run.registry.terms.get(&meta.object_id).map(Some),
        MenuItemKind::PostType => run.registry.posts.get(&meta.object_id).map(Some),
        MenuItemKind::Custom => Some(None),
        MenuItemKind::Other(_) => None,
    };

    let object_id = match (object_id, pass) {
        (Some(object_id), _) => object_id,
        (None, Pass::Primary) => {
            debug!(item = %label, object_id = meta.object_id, "Menu item deferred");
            run.missing_menu_items.push(item.clone());
            run.report.counters.menu_items_deferred += 1;
            return MenuItemOutcome::Deferred;
        }
        (None, Pass::Retry) => {
            run.diagnose(Diagnostic::skip(
                "MENU_ITEM_DROPPED",
                label,
                format!(
                    "Menu item dropped: referenced {} {} was never imported",
                    meta.kind.as_str(),
                    meta.object_id
                ),
            ));
            run.report.counters.menu_items_dropped += 1;
            return MenuItemOutcome::Dropped;
        }
    };

    let mut orphan_parent = None;
    let parent_id = match meta.parent {
        0 => None,
        parent => match run.registry.menu_items.get(&parent) {
            Some(local) => Some(local),
            None => {
                orphan_parent = Some(parent);
                None
            }
        },
    };

    let new_item = NewMenuItem {
        item_type: meta.kind.as_str().to_string(),
        object_id,
        object: meta.object,
        parent_id,
        position: item.menu_order,
        title: item.post_title.clone(),
        url: meta.url,
        description: item.post_content.clone(),
        attr_title: item.post_excerpt.clone(),
        target: meta.target,
        classes: meta.classes,
        xfn: meta.xfn,
        status: item.status.clone(),
    };

    match ctx.store.create_menu_item(menu_id, &new_item).await {
        Ok(local_id) => {
            if item.post_id != 0 {
                run.registry.menu_items.put(item.post_id, local_id);
                if let Some(parent) = orphan_parent {
                    run.menu_item_orphans.insert(item.post_id, parent);
                }
            }
            run.report.counters.menu_items_imported += 1;
            MenuItemOutcome::Imported(local_id)
        }
        Err(e) => {
            run.diagnose(Diagnostic::skip(
                "MENU_ITEM_CREATE_FAILED",
                label,
                format!("Failed to create menu item: {}", e),
            ));
            MenuItemOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_lookup_and_default() {
        let meta = vec![
            PostMeta::new("_menu_item_type", "post_type"),
            PostMeta::new("_menu_item_object_id", "12"),
            PostMeta::new("_menu_item_object", "page"),
            PostMeta::new("_menu_item_menu_item_parent", "not a number"),
            PostMeta::new("_menu_item_object_id", "14"),
            PostMeta::new("_unrelated", "x"),
        ];
        let parsed = MenuItemMeta::from_post_meta(&meta);

        assert_eq!(parsed.kind, MenuItemKind::PostType);
        assert_eq!(parsed.object_id, 14);
        assert_eq!(parsed.object, "page");
        assert_eq!(parsed.parent, 0);
        assert_eq!(parsed.url, "");
    }

    #[test]
    fn test_kind_round_trips_unknown_values() {
        let kind = MenuItemKind::parse("post_type_archive");
        assert_eq!(kind, MenuItemKind::Other("post_type_archive".to_string()));
        assert_eq!(kind.as_str(), "post_type_archive");
        assert_eq!(MenuItemKind::parse("").as_str(), "");
    }
}
