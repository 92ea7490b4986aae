//! Metadata key filtering
//!
//! Every metadata key of an imported post passes through a [`MetaKeyFilter`]
//! before it is stored. The filter may keep, rename or suppress the key.

/// Keys that are regenerated locally or meaningless on another site
pub const SUPPRESSED_META_KEYS: &[&str] = &[
    "_wp_attached_file",
    "_wp_attachment_metadata",
    "_edit_lock",
    "_edit_last",
];

pub trait MetaKeyFilter: Send + Sync {
    /// Key to store the value under, or `None` to drop it
    fn filter(&self, key: &str) -> Option<String>;
}

/// Drops [`SUPPRESSED_META_KEYS`], keeps everything else unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMetaKeyFilter;

impl MetaKeyFilter for DefaultMetaKeyFilter {
    fn filter(&self, key: &str) -> Option<String> {
        if key.is_empty() || SUPPRESSED_META_KEYS.contains(&key) {
            None
        } else {
            Some(key.to_string())
        }
    }
}

impl<F> MetaKeyFilter for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn filter(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Apply `filter`, treating an empty result as suppression
pub fn filtered_key(filter: &dyn MetaKeyFilter, key: &str) -> Option<String> {
    filter.filter(key).filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let filter = DefaultMetaKeyFilter;
        assert_eq!(filter.filter("_edit_lock"), None);
        assert_eq!(filter.filter("_wp_attached_file"), None);
        assert_eq!(filter.filter("enclosure").as_deref(), Some("enclosure"));
    }

    #[test]
    fn test_closure_filter_can_rename_and_suppress() {
        let filter = |key: &str| match key {
            "legacy_views" => Some("views".to_string()),
            "drop_me" => Some(String::new()),
            other => Some(other.to_string()),
        };
        assert_eq!(filtered_key(&filter, "legacy_views").as_deref(), Some("views"));
        assert_eq!(filtered_key(&filter, "drop_me"), None);
        assert_eq!(filtered_key(&filter, "color").as_deref(), Some("color"));
    }
}
