//! Full import runs against the SQLite store

mod helpers;

use helpers::{
    attachment, author, comment, export, jpeg_bytes, menu_item, page, post, term, FakeFetcher,
    FakeResponse, UPLOADS_URL,
};
use tempfile::TempDir;
use wxr_import::db::{self, init_database_pool, SqliteStore};
use wxr_import::import::AuthorDirectory;
use wxr_import::models::{ExportRecordSet, ImportReport, LocalId, TermRef};
use wxr_import::store::{ContentStore, NewUser, UploadArea};
use wxr_import::{ImportOptions, Importer};

const PHOTO_URL: &str = "http://old.example/files/photo.jpg";
const POST_DATE: &str = "2024-01-15 10:00:00";

fn sample_export() -> ExportRecordSet {
    let mut article = post(1, "Hello");
    article.post_content = format!("<img src=\"{}\">", PHOTO_URL);
    article.terms = vec![TermRef {
        domain: "category".to_string(),
        slug: "news".to_string(),
        name: "News".to_string(),
    }];
    article.comments = vec![comment(2, 1, "bea"), comment(1, 0, "ann")];
    article.is_sticky = true;

    export(
        vec![author("alice")],
        vec![
            term(1, "category", "news", None),
            term(2, "nav_menu", "main", None),
        ],
        vec![
            page(3, "Child", 4),
            page(4, "Parent", 0),
            article,
            attachment(5, "Photo", PHOTO_URL),
            menu_item(6, "main", "post_type", 4, 0),
        ],
    )
}

async fn open_store(dir: &TempDir) -> SqliteStore {
    let pool = init_database_pool(&dir.path().join("content.db")).await.unwrap();
    SqliteStore::new(pool, UploadArea::new(dir.path().join("uploads"), UPLOADS_URL))
}

async fn ensure_admin(store: &SqliteStore) -> LocalId {
    if let Some(id) = store.find_user_by_login("admin").await.unwrap() {
        return id;
    }
    store
        .create_user(&NewUser {
            login: "admin".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

async fn run(store: &SqliteStore, fetcher: &FakeFetcher, set: &ExportRecordSet) -> ImportReport {
    let admin = ensure_admin(store).await;
    let options = ImportOptions {
        fetch_attachments: true,
        allow_create_users: true,
        max_attachment_size: 0,
        defer_counting: true,
        importing_user: admin,
    };
    let decisions = AuthorDirectory::from_export(set).default_decisions();
    Importer::new(store, fetcher, options)
        .import(set, &decisions)
        .await
        .unwrap()
}

async fn post_id(store: &SqliteStore, title: &str) -> LocalId {
    store
        .find_post_by_title_and_date(title, POST_DATE)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("post {:?} not stored", title))
}

#[tokio::test]
async fn test_full_import_into_sqlite() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let fetcher = FakeFetcher::new();
    fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));

    let report = run(&store, &fetcher, &sample_export()).await;

    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.counters.posts_created, 3);
    assert_eq!(report.counters.attachments_imported, 1);
    assert_eq!(report.counters.comments_inserted, 2);
    assert_eq!(report.counters.menu_items_imported, 1);
    assert_eq!(report.counters.post_parents_repaired, 1);
    assert_eq!(report.counters.authors_created, 1);

    let pool = store.pool();
    let parent = post_id(&store, "Parent").await;
    let child = db::posts::load_post(pool, post_id(&store, "Child").await)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(child.parent_id, Some(parent));

    let hello_id = post_id(&store, "Hello").await;
    let hello = db::posts::load_post(pool, hello_id).await.unwrap().unwrap();
    let local_photo = format!("{}/2024/01/photo.jpg", UPLOADS_URL);
    assert_eq!(hello.content, format!("<img src=\"{}\">", local_photo));
    assert!(hello.sticky);
    assert_eq!(hello.comment_count, 2);
    let alice = store.find_user_by_login("alice").await.unwrap().unwrap();
    assert_eq!(hello.author_id, alice);

    let comments = db::comments::load_comments_for_post(pool, hello_id).await.unwrap();
    let ann = comments.iter().find(|c| c.author == "ann").unwrap();
    let bea = comments.iter().find(|c| c.author == "bea").unwrap();
    assert_eq!(bea.parent_id, Some(ann.id));

    let news = store.find_term("news", "category").await.unwrap().unwrap();
    assert_eq!(
        db::terms::load_post_terms(pool, hello_id, "category").await.unwrap(),
        vec![news]
    );
    assert_eq!(db::terms::load_term(pool, news).await.unwrap().unwrap().count, 1);

    let photo_id = post_id(&store, "Photo").await;
    let photo = db::posts::load_post(pool, photo_id).await.unwrap().unwrap();
    assert_eq!(photo.guid, local_photo);
    assert_eq!(
        db::meta::get_meta(pool, photo_id, "_wp_attached_file").await.unwrap().as_deref(),
        Some("2024/01/photo.jpg")
    );
    assert!(dir.path().join("uploads/2024/01/photo.jpg").exists());

    assert_eq!(db::posts::count_posts(pool, "nav_menu_item").await.unwrap(), 1);
}

#[tokio::test]
async fn test_reimport_after_reopen_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let fetcher = FakeFetcher::new();
    fetcher.respond(PHOTO_URL, FakeResponse::ok(jpeg_bytes(64)));
    let set = sample_export();

    {
        let store = open_store(&dir).await;
        run(&store, &fetcher, &set).await;
        store.pool().close().await;
    }

    let store = open_store(&dir).await;
    let report = run(&store, &fetcher, &set).await;

    assert_eq!(report.counters.posts_created, 0);
    assert_eq!(report.counters.posts_existing, 4);
    assert_eq!(report.counters.terms_created, 0);
    assert_eq!(report.counters.comments_inserted, 0);
    assert_eq!(report.counters.comments_existing, 2);
    assert_eq!(report.counters.authors_created, 0);
    assert_eq!(fetcher.requests().len(), 1);

    let pool = store.pool();
    assert_eq!(db::posts::count_posts(pool, "page").await.unwrap(), 2);
    assert_eq!(db::posts::count_posts(pool, "post").await.unwrap(), 1);
    assert_eq!(db::posts::count_posts(pool, "attachment").await.unwrap(), 1);
    let hello = db::posts::load_post(pool, post_id(&store, "Hello").await)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hello.comment_count, 2);
}

#[tokio::test]
async fn test_failed_attachment_leaves_no_row_or_file() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let fetcher = FakeFetcher::new();
    fetcher.respond(
        PHOTO_URL,
        FakeResponse::ok(jpeg_bytes(80)).declaring_length(Some(100)),
    );

    let set = export(vec![author("alice")], vec![], vec![attachment(5, "Photo", PHOTO_URL)]);
    let report = run(&store, &fetcher, &set).await;

    assert_eq!(report.diagnostics_with_code("ATTACHMENT_SIZE_MISMATCH").len(), 1);
    assert_eq!(db::posts::count_posts(store.pool(), "attachment").await.unwrap(), 0);
    assert!(!dir.path().join("uploads/2024/01/photo.jpg").exists());
}
