// One-shot deploy script: declare the command catalog to Discord, globally
// or in specific guilds. Exit code 0 on success, 1 on any fatal error.

use clap::Parser;
use std::sync::Arc;
use steward::core::config::BotConfig;
use steward::core::sync::{DeploymentTarget, SyncService};
use steward::discord::commands::build_registry;
use steward::discord::gateway::GatewayProbe;
use steward::infra::discord::DiscordRegistrationApi;
use steward::infra::rewards::InMemoryRewardStore;
use tracing::error;

/// Register the slash-command catalog with Discord.
#[derive(Parser)]
#[command(name = "deploy-commands")]
struct Args {
    /// Register the catalog for every server
    #[arg(long)]
    global: bool,

    /// Register the catalog in one guild; repeat for several
    #[arg(long = "guild", value_name = "ID")]
    guilds: Vec<u64>,

    /// Report what is currently registered without changing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    if let Err(err) = run(Args::parse()).await {
        error!(error = %err, "deploy-commands failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;
    let target = DeploymentTarget::from_flags(args.global, &args.guilds)?;

    // Only descriptor metadata is needed here; no executor ever runs, so an
    // in-memory store stands in for the database.
    let registry = build_registry(
        Arc::new(GatewayProbe::new()),
        Arc::new(InMemoryRewardStore::new()),
    );
    let service = SyncService::new(DiscordRegistrationApi::from_token(
        &config.token,
        config.application_id,
    ));

    let report = if args.dry_run {
        service.preview(&target).await
    } else {
        service.sync(registry.commands(), &target).await
    };

    if !report.is_success() {
        anyhow::bail!("{} scope(s) failed to register", report.failed_scopes().len());
    }
    Ok(())
}
