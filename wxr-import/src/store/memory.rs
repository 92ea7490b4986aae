//! In-process content store
//!
//! Used for `--dry-run` previews and throughout the test suite. Behaves like
//! [`SqliteStore`](crate::db::SqliteStore) for every operation the engine
//! calls, including validation failures.

use super::{
    attachment_meta, menu_meta, normalize_new_term, validate_new_post, AttachmentMetadata,
    ContentStore, NewComment, NewMenuItem, NewPost, NewTerm, NewUser, UploadArea, UploadSlot,
    BUILTIN_POST_TYPES,
};
use crate::models::LocalId;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use wxr_common::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTerm {
    pub id: LocalId,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<LocalId>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPost {
    pub id: LocalId,
    pub post: NewPost,
    pub sticky: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredComment {
    pub id: LocalId,
    pub comment: NewComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub id: LocalId,
    pub login: String,
    pub email: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_term_id: LocalId,
    next_post_id: LocalId,
    next_comment_id: LocalId,
    next_user_id: LocalId,
    post_types: BTreeSet<String>,
    terms: Vec<StoredTerm>,
    posts: BTreeMap<LocalId, StoredPost>,
    comments: Vec<StoredComment>,
    meta: Vec<(LocalId, String, String)>,
    users: Vec<StoredUser>,
    relationships: BTreeMap<(LocalId, String), Vec<LocalId>>,
    deferred_counting: bool,
    recounts: u64,
}

impl MemoryInner {
    fn next_id(counter: &mut LocalId) -> LocalId {
        *counter += 1;
        *counter
    }

    fn set_meta(&mut self, post_id: LocalId, key: &str, value: &str) {
        match self
            .meta
            .iter_mut()
            .find(|(id, k, _)| *id == post_id && k == key)
        {
            Some(entry) => entry.2 = value.to_string(),
            None => self.meta.push((post_id, key.to_string(), value.to_string())),
        }
    }

    fn insert_post(&mut self, post: NewPost) -> LocalId {
        let id = Self::next_id(&mut self.next_post_id);
        self.posts.insert(
            id,
            StoredPost {
                id,
                post,
                sticky: false,
            },
        );
        id
    }

    fn post_mut(&mut self, post_id: LocalId) -> Result<&mut StoredPost> {
        self.posts
            .get_mut(&post_id)
            .ok_or_else(|| Error::NotFound(format!("post {}", post_id)))
    }
}

pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    uploads: UploadArea,
    thumbnails: bool,
}

impl MemoryStore {
    pub fn new(uploads: UploadArea) -> Self {
        let inner = MemoryInner {
            post_types: BUILTIN_POST_TYPES.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        Self {
            inner: Mutex::new(inner),
            uploads,
            thumbnails: false,
        }
    }

    /// Pretend to produce a `-150x150` thumbnail for every stored image
    pub fn with_thumbnails(mut self, thumbnails: bool) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn uploads(&self) -> &UploadArea {
        &self.uploads
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }

    pub fn add_post_type(&self, post_type: &str) -> Result<()> {
        self.lock()?.post_types.insert(post_type.to_string());
        Ok(())
    }

    pub fn terms(&self) -> Result<Vec<StoredTerm>> {
        Ok(self.lock()?.terms.clone())
    }

    pub fn posts(&self) -> Result<Vec<StoredPost>> {
        Ok(self.lock()?.posts.values().cloned().collect())
    }

    pub fn post(&self, post_id: LocalId) -> Result<Option<StoredPost>> {
        Ok(self.lock()?.posts.get(&post_id).cloned())
    }

    pub fn comments(&self) -> Result<Vec<StoredComment>> {
        Ok(self.lock()?.comments.clone())
    }

    pub fn comments_for(&self, post_id: LocalId) -> Result<Vec<StoredComment>> {
        Ok(self
            .lock()?
            .comments
            .iter()
            .filter(|c| c.comment.post_id == post_id)
            .cloned()
            .collect())
    }

    pub fn meta_value(&self, post_id: LocalId, key: &str) -> Result<Option<String>> {
        Ok(self
            .lock()?
            .meta
            .iter()
            .find(|(id, k, _)| *id == post_id && k == key)
            .map(|(_, _, v)| v.clone()))
    }

    pub fn users(&self) -> Result<Vec<StoredUser>> {
        Ok(self.lock()?.users.clone())
    }

    pub fn post_terms(&self, post_id: LocalId, taxonomy: &str) -> Result<Vec<LocalId>> {
        Ok(self
            .lock()?
            .relationships
            .get(&(post_id, taxonomy.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    /// Number of times counts were recomputed
    pub fn recount_runs(&self) -> Result<u64> {
        Ok(self.lock()?.recounts)
    }

    /// Local posts of a type with their ids, in creation order
    pub fn posts_of_type(&self, post_type: &str) -> Result<Vec<StoredPost>> {
        Ok(self
            .lock()?
            .posts
            .values()
            .filter(|p| p.post.post_type == post_type)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn post_type_exists(&self, post_type: &str) -> Result<bool> {
        Ok(self.lock()?.post_types.contains(post_type))
    }

    async fn find_term(&self, slug: &str, taxonomy: &str) -> Result<Option<LocalId>> {
        Ok(self
            .lock()?
            .terms
            .iter()
            .find(|t| t.slug == slug && t.taxonomy == taxonomy)
            .map(|t| t.id))
    }

    async fn find_term_by_name(&self, name: &str, taxonomy: &str) -> Result<Option<LocalId>> {
        Ok(self
            .lock()?
            .terms
            .iter()
            .find(|t| t.name == name && t.taxonomy == taxonomy)
            .map(|t| t.id))
    }

    async fn create_term(&self, term: &NewTerm) -> Result<LocalId> {
        let term = normalize_new_term(term)?;
        let mut inner = self.lock()?;
        if inner
            .terms
            .iter()
            .any(|t| t.slug == term.slug && t.taxonomy == term.taxonomy)
        {
            return Err(Error::InvalidInput(format!(
                "A term with the slug {} already exists in {}",
                term.slug, term.taxonomy
            )));
        }
        let id = MemoryInner::next_id(&mut inner.next_term_id);
        inner.terms.push(StoredTerm {
            id,
            taxonomy: term.taxonomy,
            name: term.name,
            slug: term.slug,
            parent_id: term.parent_id,
            description: term.description,
        });
        Ok(id)
    }

    async fn find_post_by_title_and_date(
        &self,
        title: &str,
        date: &str,
    ) -> Result<Option<LocalId>> {
        Ok(self
            .lock()?
            .posts
            .values()
            .find(|p| p.post.title == title && p.post.post_date == date)
            .map(|p| p.id))
    }

    async fn create_post(&self, post: &NewPost) -> Result<LocalId> {
        validate_new_post(post)?;
        let mut inner = self.lock()?;
        if !inner.post_types.contains(&post.post_type) {
            return Err(Error::InvalidInput(format!(
                "Invalid post type {}",
                post.post_type
            )));
        }
        Ok(inner.insert_post(post.clone()))
    }

    async fn update_post_parent(&self, post_id: LocalId, parent_id: LocalId) -> Result<()> {
        self.lock()?.post_mut(post_id)?.post.parent_id = Some(parent_id);
        Ok(())
    }

    async fn stick_post(&self, post_id: LocalId) -> Result<()> {
        self.lock()?.post_mut(post_id)?.sticky = true;
        Ok(())
    }

    async fn set_post_terms(
        &self,
        post_id: LocalId,
        taxonomy: &str,
        term_ids: &[LocalId],
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner.post_mut(post_id)?;
        let mut ids = term_ids.to_vec();
        ids.dedup();
        inner
            .relationships
            .insert((post_id, taxonomy.to_string()), ids);
        Ok(())
    }

    async fn comment_exists(&self, author: &str, date: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .comments
            .iter()
            .any(|c| c.comment.author == author && c.comment.date == date))
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<LocalId> {
        let mut inner = self.lock()?;
        inner.post_mut(comment.post_id)?;
        let id = MemoryInner::next_id(&mut inner.next_comment_id);
        inner.comments.push(StoredComment {
            id,
            comment: comment.clone(),
        });
        Ok(id)
    }

    async fn set_post_meta(&self, post_id: LocalId, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.post_mut(post_id)?;
        inner.set_meta(post_id, key, value);
        Ok(())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<LocalId>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.login == login)
            .map(|u| u.id))
    }

    async fn user_exists(&self, user_id: LocalId) -> Result<bool> {
        Ok(self.lock()?.users.iter().any(|u| u.id == user_id))
    }

    async fn create_user(&self, user: &NewUser) -> Result<LocalId> {
        if user.login.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Cannot create a user with an empty login name".to_string(),
            ));
        }
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.login == user.login) {
            return Err(Error::InvalidInput(format!(
                "Sorry, the username {} already exists",
                user.login
            )));
        }
        if !user.email.is_empty() && inner.users.iter().any(|u| u.email == user.email) {
            return Err(Error::InvalidInput(format!(
                "Sorry, the email address {} is already used",
                user.email
            )));
        }
        let id = MemoryInner::next_id(&mut inner.next_user_id);
        inner.users.push(StoredUser {
            id,
            login: user.login.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: super::hash_password(&user.password),
        });
        Ok(id)
    }

    async fn reserve_upload(&self, file_name: &str, post_date: &str) -> Result<UploadSlot> {
        self.uploads.reserve(file_name, post_date).await
    }

    async fn create_attachment(&self, post: &NewPost, file: &Path) -> Result<LocalId> {
        validate_new_post(post)?;
        let relative = self.uploads.relative_path(file);
        let mut inner = self.lock()?;
        let id = inner.insert_post(post.clone());
        inner.set_meta(id, attachment_meta::ATTACHED_FILE, &relative);
        Ok(id)
    }

    async fn generate_attachment_metadata(
        &self,
        attachment_id: LocalId,
        file: &Path,
    ) -> Result<AttachmentMetadata> {
        let file_size = tokio::fs::metadata(file).await?.len();
        let mut inner = self.lock()?;
        let mime_type = inner
            .post_mut(attachment_id)?
            .post
            .mime_type
            .clone()
            .unwrap_or_default();

        let thumbnail_url = if self.thumbnails && mime_type.starts_with("image/") {
            Some(thumbnail_variant_url(&self.uploads.url_for(file)))
        } else {
            None
        };

        let metadata = AttachmentMetadata {
            file: self.uploads.relative_path(file),
            file_size,
            mime_type,
            thumbnail_url,
        };
        let encoded =
            serde_json::to_string(&metadata).map_err(|e| Error::Internal(e.to_string()))?;
        inner.set_meta(attachment_id, attachment_meta::METADATA, &encoded);
        Ok(metadata)
    }

    async fn create_menu_item(&self, menu_id: LocalId, item: &NewMenuItem) -> Result<LocalId> {
        let mut inner = self.lock()?;
        if !inner
            .terms
            .iter()
            .any(|t| t.id == menu_id && t.taxonomy == "nav_menu")
        {
            return Err(Error::InvalidInput(format!("Invalid menu ID {}", menu_id)));
        }

        let id = inner.insert_post(NewPost {
            post_type: "nav_menu_item".to_string(),
            title: item.title.clone(),
            content: item.description.clone(),
            excerpt: item.attr_title.clone(),
            status: item.status.clone(),
            menu_order: item.position,
            ..Default::default()
        });

        let object_id = item.object_id.unwrap_or(id).to_string();
        let parent = item.parent_id.unwrap_or(0).to_string();
        for (key, value) in [
            (menu_meta::TYPE, item.item_type.as_str()),
            (menu_meta::PARENT, parent.as_str()),
            (menu_meta::OBJECT_ID, object_id.as_str()),
            (menu_meta::OBJECT, item.object.as_str()),
            (menu_meta::TARGET, item.target.as_str()),
            (menu_meta::CLASSES, item.classes.as_str()),
            (menu_meta::XFN, item.xfn.as_str()),
            (menu_meta::URL, item.url.as_str()),
        ] {
            inner.set_meta(id, key, value);
        }
        inner
            .relationships
            .insert((id, "nav_menu".to_string()), vec![menu_id]);
        Ok(id)
    }

    async fn set_menu_item_parent(&self, item_id: LocalId, parent_id: LocalId) -> Result<()> {
        let mut inner = self.lock()?;
        inner.post_mut(item_id)?;
        inner.set_meta(item_id, menu_meta::PARENT, &parent_id.to_string());
        Ok(())
    }

    async fn replace_in_post_content(&self, from: &str, to: &str) -> Result<u64> {
        if from.is_empty() {
            return Ok(0);
        }
        let mut inner = self.lock()?;
        let mut changed = 0;
        for stored in inner.posts.values_mut() {
            if stored.post.content.contains(from) {
                stored.post.content = stored.post.content.replace(from, to);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn replace_in_post_meta(&self, meta_key: &str, from: &str, to: &str) -> Result<u64> {
        if from.is_empty() {
            return Ok(0);
        }
        let mut inner = self.lock()?;
        let mut changed = 0;
        for (_, key, value) in inner.meta.iter_mut() {
            if key == meta_key && value.contains(from) {
                *value = value.replace(from, to);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_deferred_counting(&self, defer: bool) -> Result<()> {
        let mut inner = self.lock()?;
        let was_deferred = inner.deferred_counting;
        inner.deferred_counting = defer;
        if was_deferred && !defer {
            inner.recounts += 1;
        }
        Ok(())
    }
}

/// `<dir>/<stem>-150x150.<ext>` for a stored image URL
fn thumbnail_variant_url(url: &str) -> String {
    let (dir, name) = url.rsplit_once('/').unwrap_or(("", url));
    let variant = match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-150x150.{}", stem, ext),
        None => format!("{}-150x150", name),
    };
    if dir.is_empty() {
        variant
    } else {
        format!("{}/{}", dir, variant)
    }
}
