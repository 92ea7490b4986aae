//! Attachment import: fetching, validation, cleanup and URL remapping

mod helpers;

use helpers::{
    attachment, author, export, jpeg_bytes, png_bytes, post, FakeResponse, TestSite, UPLOADS_URL,
};
use wxr_common::events::Severity;
use wxr_import::models::ImportReport;

const PHOTO_URL: &str = "http://old.example/files/photo.jpg";

fn single_failure(report: &ImportReport, code: &str) {
    let matching = report.diagnostics_with_code(code);
    assert_eq!(matching.len(), 1, "diagnostics: {:?}", report.diagnostics);
    assert_eq!(matching[0].severity, Severity::Skip);
    assert_eq!(report.counters.attachments_imported, 0);
    assert_eq!(report.counters.posts_failed, 1);
}

#[tokio::test]
async fn test_attachment_fetched_and_registered() {
    let site = TestSite::new().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));

    let set = export(
        vec![author("alice")],
        vec![],
        vec![attachment(5, "Photo", PHOTO_URL)],
    );
    let report = site.import(&set).await;

    assert_eq!(report.counters.attachments_imported, 1);
    assert_eq!(report.counters.posts_created, 0);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let stored = site.post_titled("Photo");
    let local_url = format!("{}/2024/01/photo.jpg", UPLOADS_URL);
    assert_eq!(stored.post.guid, local_url);
    assert_eq!(stored.post.post_type, "attachment");
    assert_eq!(stored.post.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(
        site.store
            .meta_value(stored.id, "_wp_attached_file")
            .unwrap()
            .as_deref(),
        Some("2024/01/photo.jpg")
    );

    let files = site.uploaded_files();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::metadata(&files[0]).unwrap().len(), 64);
}

#[tokio::test]
async fn test_size_mismatch_rejects_and_removes_file() {
    let site = TestSite::new().await;
    site.fetcher.respond(
        PHOTO_URL,
        FakeResponse::ok(jpeg_bytes(80)).declaring_length(Some(100)),
    );

    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import(&set).await;

    single_failure(&report, "ATTACHMENT_SIZE_MISMATCH");
    assert!(report.diagnostics[0].message.contains("incorrect size"));
    assert!(site.uploaded_files().is_empty());
    assert!(site.store.posts_of_type("attachment").unwrap().is_empty());
}

#[tokio::test]
async fn test_error_status_rejected() {
    let site = TestSite::new().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::status(404));

    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import(&set).await;

    single_failure(&report, "ATTACHMENT_HTTP_STATUS");
    assert!(report.diagnostics[0].message.contains("404 Not Found"));
    assert!(site.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_unreachable_host_rejected() {
    let site = TestSite::new().await;

    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import(&set).await;

    single_failure(&report, "ATTACHMENT_NO_RESPONSE");
    assert!(site.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_zero_size_rejected() {
    let site = TestSite::new().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::ok(Vec::new()));

    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import(&set).await;

    single_failure(&report, "ATTACHMENT_ZERO_SIZE");
    assert!(site.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_oversized_file_rejected() {
    let site = TestSite::new().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));

    let mut options = site.options();
    options.max_attachment_size = 32;
    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import_with(&set, options).await;

    single_failure(&report, "ATTACHMENT_TOO_LARGE");
    assert!(report.diagnostics[0].message.contains("32 bytes"));
    assert!(site.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_unrecognized_content_rejected() {
    let site = TestSite::new().await;
    site.fetcher.respond(
        PHOTO_URL,
        FakeResponse::ok(b"just some words, nothing binary about them".to_vec()),
    );

    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import(&set).await;

    single_failure(&report, "ATTACHMENT_INVALID_TYPE");
    assert!(site.uploaded_files().is_empty());
}

#[tokio::test]
async fn test_fetching_disabled_skips_without_request() {
    let site = TestSite::new().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));

    let mut options = site.options();
    options.fetch_attachments = false;
    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = site.import_with(&set, options).await;

    single_failure(&report, "ATTACHMENT_FETCH_DISABLED");
    assert!(site.fetcher.requests().is_empty());
}

#[tokio::test]
async fn test_root_relative_url_uses_export_base() {
    let site = TestSite::new().await;
    site.fetcher
        .respond("http://old.example/files/logo.png", FakeResponse::ok(png_bytes(32)));

    let set = export(
        vec![author("alice")],
        vec![],
        vec![attachment(6, "Logo", "/files/logo.png")],
    );
    let report = site.import(&set).await;

    assert_eq!(report.counters.attachments_imported, 1);
    assert_eq!(site.fetcher.requests(), vec!["http://old.example/files/logo.png"]);
    assert_eq!(
        site.post_titled("Logo").post.mime_type.as_deref(),
        Some("image/png")
    );
}

#[tokio::test]
async fn test_redirected_and_original_urls_rewritten() {
    let site = TestSite::new().await;
    site.fetcher.respond(
        PHOTO_URL,
        FakeResponse::ok(jpeg_bytes(64)).redirected_to("http://cdn.old.example/photo.jpg"),
    );

    let mut article = post(1, "Gallery");
    article.post_content = concat!(
        "<img src=\"http://old.example/files/photo.jpg\">",
        "<img src=\"http://cdn.old.example/photo.jpg\">",
    )
    .to_string();
    let set = export(
        vec![author("alice")],
        vec![],
        vec![article, attachment(5, "Photo", PHOTO_URL)],
    );
    let report = site.import(&set).await;

    let local_url = format!("{}/2024/01/photo.jpg", UPLOADS_URL);
    assert_eq!(
        site.post_titled("Gallery").post.content,
        format!("<img src=\"{0}\"><img src=\"{0}\">", local_url)
    );
    assert!(report.counters.url_replacements >= 2);
}

#[tokio::test]
async fn test_thumbnail_reference_rewritten_when_store_makes_one() {
    let site = TestSite::with_thumbnails().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));

    let mut article = post(1, "Preview");
    article.post_content = "<img src=\"http://old.example/files/photo.thumbnail.jpg\">".to_string();
    let set = export(
        vec![author("alice")],
        vec![],
        vec![attachment(5, "Photo", PHOTO_URL), article],
    );
    site.import(&set).await;

    assert_eq!(
        site.post_titled("Preview").post.content,
        format!("<img src=\"{}/2024/01/photo-150x150.jpg\">", UPLOADS_URL)
    );
}

#[tokio::test]
async fn test_reimport_does_not_fetch_again() {
    let site = TestSite::new().await;
    site.fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));
    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);

    site.import(&set).await;
    let second = site.import(&set).await;

    assert_eq!(site.fetcher.requests().len(), 1);
    assert_eq!(second.counters.posts_existing, 1);
    assert_eq!(site.uploaded_files().len(), 1);
}
