//! Attachment importer
//!
//! Fetches the binary behind an attachment record into the upload area,
//! validates it, registers the attachment and records which remote URLs now
//! live at the new local URL.

use super::session::ImportRun;
use super::ImportContext;
use crate::error::AttachmentError;
use crate::fetcher::FetchResponse;
use crate::models::{LocalId, ATTACHMENT};
use crate::store::uploads::file_name_from_url;
use crate::store::{NewPost, UploadSlot};
use std::path::Path;
use tracing::{debug, info, warn};
use wxr_common::events::Diagnostic;

/// Prefix a root-relative URL (`/…`) with the export's base URL
pub fn absolutize_url(url: &str, base_url: &str) -> String {
    let url = url.trim();
    if url.len() > 1 && url.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), url)
    } else {
        url.to_string()
    }
}

/// Where the original site's thumbnail of `url` most likely lived
///
/// `<dir>/<name>.<ext>` becomes `<dir>/<name>.thumbnail.<ext>`. Heuristic:
/// only matches sites that used that naming scheme.
pub fn guess_original_thumbnail_url(url: &str) -> Option<String> {
    let (dir, file) = url.rsplit_once('/')?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!("{}/{}.thumbnail.{}", dir, stem, ext))
}

/// Fetch, validate and register one attachment
///
/// `draft` carries the post fields of the attachment record; its `guid` is
/// replaced by the local URL. On any failure the fetched file is removed.
pub async fn import_attachment(
    ctx: &ImportContext<'_>,
    run: &mut ImportRun,
    draft: NewPost,
    remote_url: &str,
) -> Result<LocalId, AttachmentError> {
    if !ctx.options.fetch_attachments || remote_url.trim().is_empty() {
        return Err(AttachmentError::FetchingDisabled);
    }

    let url = absolutize_url(remote_url, ctx.base_url);
    let (slot, response) = fetch_remote_file(ctx, &url, &draft.post_date).await?;

    let mime_type = match infer::get_from_path(&slot.path) {
        Ok(Some(kind)) => kind.mime_type().to_string(),
        Ok(None) => {
            remove_partial(&slot.path).await;
            return Err(AttachmentError::InvalidFileType);
        }
        Err(e) => {
            remove_partial(&slot.path).await;
            return Err(AttachmentError::Io(e));
        }
    };

    let original_guid = draft.guid.clone();
    let post = NewPost {
        guid: slot.url.clone(),
        post_type: ATTACHMENT.to_string(),
        mime_type: Some(mime_type.clone()),
        ..draft
    };

    let attachment_id = match ctx.store.create_attachment(&post, &slot.path).await {
        Ok(id) => id,
        Err(e) => {
            remove_partial(&slot.path).await;
            return Err(AttachmentError::Store(e));
        }
    };

    let thumbnail_url = match ctx
        .store
        .generate_attachment_metadata(attachment_id, &slot.path)
        .await
    {
        Ok(metadata) => metadata.thumbnail_url,
        Err(e) => {
            // The attachment itself is stored; only derived data is missing
            run.diagnose(Diagnostic::warning(
                "ATTACHMENT_METADATA_FAILED",
                format!("attachment {}", slot.url),
                format!("Failed to generate attachment metadata: {}", e),
            ));
            None
        }
    };

    run.url_remap.insert(url.clone(), slot.url.clone());
    run.url_remap.insert(original_guid, slot.url.clone());
    if let Some(final_url) = response.final_url.as_deref() {
        if final_url != url {
            run.url_remap.insert(final_url, slot.url.clone());
        }
    }
    if mime_type.starts_with("image/") {
        if let (Some(thumbnail), Some(original)) =
            (thumbnail_url, guess_original_thumbnail_url(&url))
        {
            run.url_remap.insert(original, thumbnail);
        }
    }

    info!(
        attachment_id,
        url = %url,
        local_url = %slot.url,
        mime_type = %mime_type,
        "Attachment imported"
    );
    run.report.counters.attachments_imported += 1;

    Ok(attachment_id)
}

/// Download `url` into a fresh upload slot and validate what arrived
pub async fn fetch_remote_file(
    ctx: &ImportContext<'_>,
    url: &str,
    post_date: &str,
) -> Result<(UploadSlot, FetchResponse), AttachmentError> {
    let file_name = file_name_from_url(url);
    let slot = ctx
        .store
        .reserve_upload(&file_name, post_date)
        .await
        .map_err(|e| AttachmentError::UploadDir(e.to_string()))?;

    match download_and_validate(ctx, url, &slot.path).await {
        Ok(response) => Ok((slot, response)),
        Err(e) => {
            remove_partial(&slot.path).await;
            Err(e)
        }
    }
}

async fn download_and_validate(
    ctx: &ImportContext<'_>,
    url: &str,
    dest: &Path,
) -> Result<FetchResponse, AttachmentError> {
    let response = ctx.fetcher.fetch_to_file(url, dest).await?;

    if response.status != 200 {
        let reason = reqwest::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("")
            .to_string();
        return Err(AttachmentError::HttpStatus {
            status: response.status,
            reason,
        });
    }

    let size = tokio::fs::metadata(dest).await?.len();

    if let Some(expected) = response.content_length {
        if expected != size {
            return Err(AttachmentError::SizeMismatch {
                expected,
                actual: size,
            });
        }
    }

    if size == 0 {
        return Err(AttachmentError::ZeroSize);
    }

    let limit = ctx.options.max_attachment_size;
    if limit > 0 && size > limit {
        return Err(AttachmentError::TooLarge { limit });
    }

    debug!(url = %url, size, "Remote file fetched");
    Ok(response)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove rejected upload");
        }
    }
}
