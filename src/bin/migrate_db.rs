// One-shot schema maintenance: bring a pre-existing database up to the
// current table shapes via shadow-table rebuilds. Must never run while the
// bot holds the same database open. Exit code 0 on success (including the
// already-migrated no-op case), 1 if any table's sequence failed.

use clap::Parser;
use steward::core::config::DEFAULT_DATABASE_PATH;
use steward::core::migration::{ColumnSpec, MigrationEngine, MigrationStep};
use steward::infra::storage::SqliteSchemaStore;
use tracing::error;

/// Evolve the Steward database schema in place.
#[derive(Parser)]
#[command(name = "migrate-db")]
struct Args {
    /// Path to the SQLite database (defaults to DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,
}

/// The desired shape of every persisted table. Steps are built fresh per
/// invocation; the engine skips any table that is already current.
fn migration_steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep {
            table: "redeemable_roles".to_string(),
            columns: vec![
                ColumnSpec::new("role_id", "INTEGER NOT NULL"),
                ColumnSpec::new("name", "TEXT NOT NULL"),
                ColumnSpec::new("cost", "INTEGER NOT NULL DEFAULT 0"),
                // Rewards predate multi-guild support; park old rows under
                // the sentinel guild until an operator reassigns them.
                ColumnSpec::new("guild_id", "INTEGER NOT NULL DEFAULT 0").with_backfill("0"),
            ],
            unique_on: Some(vec!["guild_id".to_string(), "role_id".to_string()]),
        },
        MigrationStep {
            table: "member_activity".to_string(),
            columns: vec![
                ColumnSpec::new("guild_id", "INTEGER NOT NULL"),
                ColumnSpec::new("user_id", "INTEGER NOT NULL"),
                ColumnSpec::new("messages", "INTEGER NOT NULL DEFAULT 0"),
                ColumnSpec::new("voice_minutes", "INTEGER NOT NULL DEFAULT 0").with_backfill("0"),
            ],
            unique_on: Some(vec!["guild_id".to_string(), "user_id".to_string()]),
        },
    ]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    if let Err(err) = run(Args::parse()).await {
        error!(error = %err, "migrate-db failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let database_path = args
        .database
        .or_else(|| std::env::var("DATABASE_PATH").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());

    let store = SqliteSchemaStore::connect(&database_path).await?;
    let engine = MigrationEngine::new(store);

    let outcomes = engine.apply_all(&migration_steps()).await;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} table migrations failed", outcomes.len());
    }
    Ok(())
}
