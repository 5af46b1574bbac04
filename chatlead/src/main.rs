use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatlead::config::Config;
use chatlead::db::{Database, DatabaseBackend, LibSqlBackend};
use chatlead::models::{ScoreDelta, ScoreOrigin};
use chatlead::processing::MediaStore;
use chatlead::scoring::ScoringEngine;
use chatlead::services::{ChatImporter, ContactReconciler, ImportRequest, ScoreService};

#[derive(Parser)]
#[command(name = "chatlead")]
#[command(about = "Import exported WhatsApp chats into a scored lead pipeline")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import one exported chat archive (.zip)
    Import {
        archive: PathBuf,
        #[arg(long)]
        team: i64,
        #[arg(long)]
        user: Option<i64>,
        /// Name the archive was exported under, when the file was renamed
        #[arg(long)]
        name: Option<String>,
    },
    /// Reconcile an address-book CSV export against existing contacts
    SyncContacts {
        csv: PathBuf,
        #[arg(long)]
        team: i64,
        #[arg(long)]
        dry_run: bool,
    },
    /// Record a manual score adjustment for a chat
    AdjustScore {
        chat_id: i64,
        #[arg(long, allow_hyphen_values = true)]
        delta: i64,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "human")]
        origin: ScoreOrigin,
    },
    /// Print a chat's score events and check them against the cached score
    ScoreLog { chat_id: i64 },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chatlead=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db_backend = LibSqlBackend::new(raw_db);
    db_backend
        .seed_pipeline_states(&config.pipeline.states)
        .await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(db_backend);

    let output = match args.command {
        Command::Import {
            archive,
            team,
            user,
            name,
        } => {
            let importer = ChatImporter::new(
                db.clone(),
                MediaStore::new(config.storage.media_root.clone()),
                Arc::new(ScoringEngine::default()),
                ScoreService::load(&*db).await?,
                config.import.clone(),
            );
            let request = ImportRequest {
                archive_path: archive,
                original_name: name,
                team_id: team,
                user_id: user,
            };
            serde_json::to_string_pretty(&importer.import_archive(request).await?)?
        }
        Command::SyncContacts { csv, team, dry_run } => {
            let bytes = tokio::fs::read(&csv).await?;
            let reconciler = ContactReconciler::new(db.clone());
            serde_json::to_string_pretty(&reconciler.reconcile(team, &bytes, dry_run).await?)?
        }
        Command::AdjustScore {
            chat_id,
            delta,
            reason,
            origin,
        } => {
            let service = ScoreService::load(&*db).await?;
            let tx = db.begin().await?;
            let delta = ScoreDelta {
                origin,
                delta,
                reason,
            };
            match service.adjust(&*tx, chat_id, delta).await {
                Ok(chat) => {
                    tx.commit().await?;
                    serde_json::to_string_pretty(&chat)?
                }
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e.into());
                }
            }
        }
        Command::ScoreLog { chat_id } => {
            let audit = ScoreService::verify_log(&*db, chat_id).await?;
            if !audit.consistent {
                tracing::warn!(
                    chat_id,
                    cached = audit.cached_score,
                    event_sum = audit.event_sum,
                    "Cached score differs from the event log"
                );
            }
            serde_json::to_string_pretty(&audit)?
        }
    };

    db.sync().await?;
    println!("{output}");
    Ok(())
}
