// One-shot cleanup script: remove every registered command from a target.
// A global clear wipes the catalog on every server, so it demands --yes.
// Exit code 0 on success, 1 on any fatal error or refused confirmation.

use clap::Parser;
use steward::core::config::BotConfig;
use steward::core::sync::{DeploymentTarget, SyncService};
use steward::infra::discord::DiscordRegistrationApi;
use tracing::error;

/// Clear registered slash commands from Discord.
#[derive(Parser)]
#[command(name = "clear-commands")]
struct Args {
    /// Clear the global command set
    #[arg(long)]
    global: bool,

    /// Clear one guild's commands; repeat for several
    #[arg(long = "guild", value_name = "ID")]
    guilds: Vec<u64>,

    /// Report what is currently registered without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Confirm a global clear
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    if let Err(err) = run(Args::parse()).await {
        error!(error = %err, "clear-commands failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;
    let target = DeploymentTarget::from_flags(args.global, &args.guilds)?;

    let service = SyncService::new(DiscordRegistrationApi::from_token(
        &config.token,
        config.application_id,
    ));

    let report = service.clear(&target, args.dry_run, args.yes).await?;
    if !report.is_success() {
        anyhow::bail!("{} scope(s) failed to clear", report.failed_scopes().len());
    }
    Ok(())
}
