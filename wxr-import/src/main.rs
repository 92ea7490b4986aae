//! wxr-import - site export importer
//!
//! Reads an export record set, binds its authors to local users and rebuilds
//! its content graph in the configured content store.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use wxr_common::config::load_toml_config;
use wxr_common::events::{EventBus, ImportEvent};
use wxr_import::config::{resolve_config, CliOverrides};
use wxr_import::db::{init_database_pool, SqliteStore};
use wxr_import::fetcher::HttpFetcher;
use wxr_import::import::authors::sanitize_login;
use wxr_import::import::AuthorDirectory;
use wxr_import::models::{ExportRecordSet, ImportReport, LocalId};
use wxr_import::parser::{ExportParser, JsonExportParser};
use wxr_import::store::{generate_password, ContentStore, MemoryStore, NewUser, UploadArea};
use wxr_import::{AuthorDecision, ImportOptions, Importer};

/// Command-line arguments for wxr-import
#[derive(Parser, Debug)]
#[command(name = "wxr-import")]
#[command(about = "Import a site export into a content store")]
#[command(version)]
struct Args {
    /// Export file (JSON record set)
    file: PathBuf,

    /// Config file (default: <config_dir>/wxr-import/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite content database
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory receiving fetched attachment files
    #[arg(long)]
    uploads_dir: Option<PathBuf>,

    /// Public URL prefix of the uploads directory
    #[arg(long)]
    uploads_url: Option<String>,

    /// Download and import attachment files
    #[arg(long)]
    fetch_attachments: bool,

    /// Never create local accounts for export authors
    #[arg(long)]
    no_create_users: bool,

    /// Maximum attachment size in bytes (0 = unlimited)
    #[arg(long)]
    max_attachment_size: Option<u64>,

    /// Timeout for a single attachment request, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Attribute an export author's posts to an existing user: LOGIN=USER_ID
    #[arg(long = "map-author", value_parser = parse_author_mapping)]
    map_author: Vec<(String, LocalId)>,

    /// Login of the importing user (created if missing)
    #[arg(long, default_value = "admin")]
    as_user: String,

    /// Import into an in-memory store and report what would happen
    #[arg(long)]
    dry_run: bool,
}

fn parse_author_mapping(value: &str) -> std::result::Result<(String, LocalId), String> {
    let (login, user_id) = value
        .split_once('=')
        .ok_or_else(|| format!("expected LOGIN=USER_ID, got {:?}", value))?;
    let user_id = user_id
        .trim()
        .parse::<LocalId>()
        .map_err(|e| format!("invalid user id {:?}: {}", user_id, e))?;
    Ok((login.trim().to_string(), user_id))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .init();

    info!(
        "Starting wxr-import v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = CliOverrides {
        database: args.database.clone(),
        uploads_dir: args.uploads_dir.clone(),
        uploads_url: args.uploads_url.clone(),
        fetch_attachments: args.fetch_attachments.then_some(true),
        allow_create_users: args.no_create_users.then_some(false),
        max_attachment_size: args.max_attachment_size,
        request_timeout_secs: args.timeout,
    };
    let mut config = resolve_config(&cli, &toml_config);

    let export = JsonExportParser
        .parse(&args.file)
        .with_context(|| format!("Failed to read export {}", args.file.display()))?;

    let fetcher = HttpFetcher::new(
        &config.import.user_agent,
        Duration::from_secs(config.import.request_timeout_secs),
    )?;
    let uploads = UploadArea::new(&config.uploads_dir, config.uploads_url.clone());

    let report = if args.dry_run {
        if config.import.fetch_attachments {
            warn!("Dry run: attachment fetching disabled");
            config.import.fetch_attachments = false;
        }
        let store = MemoryStore::new(uploads);
        run_import(&store, &fetcher, &config.import, &args, &export).await?
    } else {
        let pool = init_database_pool(&config.database_path)
            .await
            .context("Failed to open content database")?;
        let store = SqliteStore::new(pool, uploads);
        run_import(&store, &fetcher, &config.import, &args, &export).await?
    };

    print_summary(&report, args.dry_run);
    Ok(())
}

async fn run_import(
    store: &dyn ContentStore,
    fetcher: &HttpFetcher,
    settings: &wxr_common::config::ImportSettings,
    args: &Args,
    export: &ExportRecordSet,
) -> Result<ImportReport> {
    let importing_user = ensure_importing_user(store, &args.as_user).await?;
    let options = ImportOptions::from_settings(settings, importing_user);

    let mapping: BTreeMap<String, LocalId> = args
        .map_author
        .iter()
        .map(|(login, user_id)| (sanitize_login(login), *user_id))
        .collect();
    let decisions: Vec<AuthorDecision> = AuthorDirectory::from_export(export)
        .default_decisions()
        .into_iter()
        .map(|decision| AuthorDecision {
            map_to: mapping.get(&decision.login).copied(),
            ..decision
        })
        .collect();

    let events = EventBus::default();
    let printer = tokio::spawn(log_progress(events.subscribe()));

    let importer = Importer::new(store, fetcher, options).with_event_bus(events);
    let result = importer.import(export, &decisions).await;

    // Closing every sender ends the progress task
    drop(importer);
    let _ = printer.await;

    result.map_err(|e| anyhow!("Import failed: {}", e))
}

/// Local id of the importing user, creating the account if needed
async fn ensure_importing_user(store: &dyn ContentStore, login: &str) -> Result<LocalId> {
    if let Some(id) = store.find_user_by_login(login).await? {
        return Ok(id);
    }

    let id = store
        .create_user(&NewUser {
            login: login.to_string(),
            password: generate_password(16),
            display_name: login.to_string(),
            ..Default::default()
        })
        .await
        .with_context(|| format!("Failed to create importing user {}", login))?;
    info!(login = %login, user_id = id, "Created importing user");
    Ok(id)
}

async fn log_progress(mut rx: tokio::sync::broadcast::Receiver<ImportEvent>) {
    loop {
        match rx.recv().await {
            Ok(ImportEvent::Progress {
                phase,
                current,
                total,
                ..
            }) if current == total || current % 100 == 0 => {
                info!("{:?}: {}/{}", phase, current, total);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Progress display skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(report: &ImportReport, dry_run: bool) {
    let c = &report.counters;
    println!();
    println!(
        "Import {} in {} ms{}",
        report.run_id,
        report.duration_ms(),
        if dry_run { " (dry run)" } else { "" }
    );
    println!("  terms:       {} created, {} existing", c.terms_created, c.terms_existing);
    println!("  authors:     {} mapped, {} created", c.authors_mapped, c.authors_created);
    println!(
        "  posts:       {} created, {} existing, {} failed",
        c.posts_created, c.posts_existing, c.posts_failed
    );
    println!("  attachments: {} imported", c.attachments_imported);
    println!(
        "  comments:    {} inserted, {} existing",
        c.comments_inserted, c.comments_existing
    );
    println!(
        "  menu items:  {} imported, {} deferred, {} dropped",
        c.menu_items_imported, c.menu_items_deferred, c.menu_items_dropped
    );
    println!(
        "  backfill:    {} post parents, {} menu parents",
        c.post_parents_repaired, c.menu_parents_repaired
    );
    println!("  urls:        {} replacements", c.url_replacements);

    if !report.diagnostics.is_empty() {
        println!();
        println!("{} diagnostics:", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("  {}", diagnostic);
        }
    }
}
