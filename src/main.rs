// This is the entry point of the Steward bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, Discord HTTP)
// - `discord/` = Discord-specific adapters (gateway, command modules)
//
// This file's job is to:
// 1. Load the immutable configuration
// 2. Initialize stores and services (dependency injection)
// 3. Build the descriptor catalog and declare it to Discord
// 4. Subscribe event descriptors and start the gateway client

use serenity::prelude::GatewayIntents;
use std::sync::Arc;
use std::time::Duration;
use steward::core::config::BotConfig;
use steward::core::events::EventBus;
use steward::core::health::HealthService;
use steward::core::rewards::RewardStore;
use steward::core::sync::SyncService;
use steward::discord::commands::build_registry;
use steward::discord::gateway::{GatewayHandler, GatewayProbe};
use steward::infra::discord::DiscordRegistrationApi;
use steward::infra::events::EventDispatcher;
use steward::infra::http::health_server;
use steward::infra::rewards::SqliteRewardStore;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Never keep running in an undefined state: log the fault and exit
    // non-zero.
    if let Err(err) = run().await {
        error!(error = %err, "Fatal error; shutting down");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let rewards: Arc<SqliteRewardStore> =
        Arc::new(SqliteRewardStore::new(&config.database_path).await?);
    let probe = Arc::new(GatewayProbe::new());

    // Build the descriptor catalog once; it is read-only from here on.
    let registry = Arc::new(build_registry(
        Arc::clone(&probe),
        Arc::clone(&rewards) as Arc<dyn RewardStore>,
    ));

    // Declare the command catalog before the gateway comes up. A scope that
    // fails to register is logged and the process keeps going with whatever
    // the remote side accepted.
    let sync_service = SyncService::new(DiscordRegistrationApi::from_token(
        &config.token,
        config.application_id,
    ));
    let target = config.deployment_target();
    let report = sync_service.sync(registry.commands(), &target).await;
    if report.is_success() {
        info!(commands = registry.commands().len(), "Command catalog registered");
    } else {
        let failed: Vec<String> = report
            .failed_scopes()
            .iter()
            .map(|scope| scope.to_string())
            .collect();
        warn!(?failed, "Some scopes failed to register; continuing");
    }

    // Subscribe the event catalog onto the dispatcher.
    let dispatcher = Arc::new(EventDispatcher::new());
    for descriptor in registry.events() {
        dispatcher.subscribe(descriptor.clone());
    }

    // Health endpoint.
    let health = Arc::new(HealthService::new(Arc::clone(&probe)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = TcpListener::bind(("0.0.0.0", config.health_port)).await?;
    let health_task = tokio::spawn(health_server::serve(listener, health, shutdown_rx));

    // ========================================================================
    // DISCORD CLIENT SETUP
    // ========================================================================

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | GatewayIntents::GUILD_MEMBERS;

    let handler = GatewayHandler::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        Arc::clone(&probe),
    );
    let mut client = serenity::Client::builder(&config.token, intents)
        .event_handler(handler)
        .await?;

    // Sample shard heartbeat latency for the health probe.
    {
        let probe = Arc::clone(&probe);
        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let runners = shard_manager.runners.lock().await;
                if let Some(latency) = runners.values().find_map(|runner| runner.latency) {
                    probe.set_ping_ms(latency.as_millis() as u64);
                }
            }
        });
    }

    // Ordered shutdown on a termination signal: stop accepting health
    // queries, bring the shards down, then close the store handle.
    {
        let shard_manager = client.shard_manager.clone();
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Termination signal received; shutting down");
                let _ = shutdown_tx.send(true);
                shard_manager.shutdown_all().await;
            }
        });
    }

    client.start().await?;

    let _ = shutdown_tx.send(true);
    let _ = health_task.await;
    rewards.pool().close().await;
    info!("Shutdown complete");
    Ok(())
}
