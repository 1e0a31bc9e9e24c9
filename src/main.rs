use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;

use haber::app::{App, AppEvent};
use haber::cache::PersistentCache;
use haber::config::Config;
use haber::events::handle_app_event;
use haber::i18n::LocaleResolver;
use haber::nav::SidebarState;
use haber::storage::{Database, DatabaseError};

/// Get the config directory path (~/.config/haber/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("haber"))
}

#[derive(Parser, Debug)]
#[command(name = "haber", about = "Multi-language news portal core")]
struct Args {
    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Use this directory instead of ~/.config/haber
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Language to boot in (defaults to `default_language` from config)
    #[arg(long, short)]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Boot at PATH and print the resolved view state and canonical path
    Resolve { path: String },

    /// Print the navigation tree fully expanded
    Tree,

    /// Boot at PATH and print a summary with the document head
    Boot {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Import or export language packs
    #[command(subcommand)]
    Locale(LocaleCommand),
}

#[derive(Subcommand, Debug)]
enum LocaleCommand {
    /// Write the merged table for LANG as JSON
    Export { lang: String, file: PathBuf },
    /// Merge a JSON pack into the stored overlay for LANG
    Import { lang: String, file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = match &args.config_dir {
        Some(dir) => dir.clone(),
        None => get_config_dir()?,
    };
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // User-only access; the database holds sessions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let mut config = Config::load(&config_dir.join("config.toml"))?;
    if let Some(language) = &args.language {
        if !config.languages.contains(language) {
            anyhow::bail!(
                "Language '{}' is not configured (available: {})",
                language,
                config.languages.join(", ")
            );
        }
        config.default_language = language.clone();
    }

    let db_path = config_dir.join("haber.db");
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        eprintln!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: Another instance of haber is already running.");
            eprintln!("Only one instance can access the database at a time.");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to open database"),
    };

    let mut locale = LocaleResolver::new(&config.default_language)?;
    locale.load_overlays(&db, &config.languages).await;
    let cache = PersistentCache::load(&db, &config.cache_prefix, &config.default_language).await;

    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(32);
    let mut app = App::new(config, db.clone(), cache, locale, event_tx)?;

    match args.command {
        Command::Resolve { path } => {
            app.boot(&path).await;
            println!("{}", serde_json::to_string_pretty(&app.state)?);
            println!("{}", app.history.current());
        }
        Command::Tree => {
            app.boot("/").await;
            let mut sidebar = SidebarState::new();
            sidebar.expand_all(&app.nav);
            for item in sidebar.items(&app.nav, None) {
                println!(
                    "{}{} [{}] ({:?})",
                    "  ".repeat(item.depth),
                    item.label,
                    item.selector,
                    item.nav_type
                );
            }
        }
        Command::Boot { path } => {
            app.boot(&path).await;
            while let Ok(event) = event_rx.try_recv() {
                handle_app_event(&mut app, event).await;
            }
            println!("{}: {}", app.t("app.name"), app.history.current());
            println!("language: {}", app.language);
            println!("ready: {}", app.ready);
            println!("view: {:?}", app.state.view);
            println!("news: {}", app.news.len());
            for card in app.feed_cards() {
                println!("  [{:?}] {} ({} likes)", card.card_type, card.title, card.likes_count);
            }
            println!("stories: {}", app.stories.len());
            println!("navigation nodes: {}", app.nav.len());
            if let Some(meta) = &app.meta {
                print!("{}", meta.to_html());
            }
        }
        Command::Locale(LocaleCommand::Export { lang, file }) => {
            app.export_language_pack(&lang, &file)?;
            eprintln!("Exported '{}' to {}", lang, file.display());
        }
        Command::Locale(LocaleCommand::Import { lang, file }) => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let count = app.import_language_pack(&lang, &json).await?;
            eprintln!("Imported '{}': {} keys in overlay", lang, count);
        }
    }

    db.close().await;
    Ok(())
}
