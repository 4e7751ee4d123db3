// Gateway adapter - the only place that touches serenity's event surface.
// Interactions are translated into `CommandInvocation`s for catalog
// executors; everything else is reduced to `BusEvent`s and published onto
// the dispatcher.

use crate::core::events::BusEvent;
use crate::core::health::{ConnectivityProbe, GatewayStatus};
use crate::core::registry::{CommandInvocation, CommandReply, DescriptorRegistry, OptionValue};
use crate::infra::events::EventDispatcher;
use serenity::async_trait;
use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::client::{Context, EventHandler};
use serenity::gateway::{ConnectionStage, ShardStageUpdateEvent};
use serenity::model::application::{CommandDataOptionValue, CommandInteraction, Interaction};
use serenity::model::channel::Message;
use serenity::model::event::ResumedEvent;
use serenity::model::gateway::Ready;
use serenity::model::guild::Guild;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Gateway connectivity state shared with the health service. Written from
/// gateway events and a latency sampler, read lock-free per health query.
#[derive(Default)]
pub struct GatewayProbe {
    connected: AtomicBool,
    /// Milliseconds; 0 means not sampled yet.
    ping_ms: AtomicU64,
    guilds: AtomicU64,
    users: AtomicU64,
}

impl GatewayProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn set_ping_ms(&self, ping_ms: u64) {
        self.ping_ms.store(ping_ms, Ordering::Relaxed);
    }

    pub fn set_counts(&self, guilds: u64, users: u64) {
        self.guilds.store(guilds, Ordering::Relaxed);
        self.users.store(users, Ordering::Relaxed);
    }
}

impl ConnectivityProbe for GatewayProbe {
    fn gateway_status(&self) -> GatewayStatus {
        GatewayStatus {
            connected: self.connected.load(Ordering::Relaxed),
            ping: match self.ping_ms.load(Ordering::Relaxed) {
                0 => None,
                ms => Some(ms),
            },
            guilds: self.guilds.load(Ordering::Relaxed),
            users: self.users.load(Ordering::Relaxed),
        }
    }
}

pub struct GatewayHandler {
    registry: Arc<DescriptorRegistry>,
    dispatcher: Arc<EventDispatcher>,
    probe: Arc<GatewayProbe>,
}

impl GatewayHandler {
    pub fn new(
        registry: Arc<DescriptorRegistry>,
        dispatcher: Arc<EventDispatcher>,
        probe: Arc<GatewayProbe>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            probe,
        }
    }

    fn refresh_counts(&self, ctx: &Context) {
        let guild_ids = ctx.cache.guilds();
        let users: u64 = guild_ids
            .iter()
            .filter_map(|id| ctx.cache.guild(*id).map(|g| g.member_count))
            .sum();
        self.probe.set_counts(guild_ids.len() as u64, users);
    }

    async fn dispatch_command(&self, ctx: &Context, interaction: &CommandInteraction) {
        let name = interaction.data.name.as_str();
        let Some(descriptor) = self.registry.find_command(name) else {
            warn!(command = name, "Received interaction for unknown command");
            return;
        };

        let invocation = to_invocation(interaction);
        let reply = match descriptor.action.execute(&invocation).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(command = name, error = %err, "Command execution failed");
                CommandReply::ephemeral("Something went wrong running that command.")
            }
        };

        let message = CreateInteractionResponseMessage::new()
            .content(reply.content)
            .ephemeral(reply.ephemeral);
        if let Err(err) = interaction
            .create_response(&ctx.http, CreateInteractionResponse::Message(message))
            .await
        {
            error!(command = name, error = %err, "Failed to send command response");
        }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.probe.set_connected(true);
        self.probe.set_counts(ready.guilds.len() as u64, 0);
        info!(bot = %ready.user.name, guilds = ready.guilds.len(), "Gateway session ready");

        self.dispatcher
            .publish(&BusEvent::Ready {
                bot_name: ready.user.name.clone(),
                guild_count: ready.guilds.len(),
            })
            .await;
    }

    async fn resume(&self, _ctx: Context, _resumed: ResumedEvent) {
        self.probe.set_connected(true);
    }

    async fn shard_stage_update(&self, _ctx: Context, update: ShardStageUpdateEvent) {
        self.probe
            .set_connected(update.new == ConnectionStage::Connected);
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        self.refresh_counts(&ctx);
        self.dispatcher
            .publish(&BusEvent::GuildCreate {
                guild_id: guild.id.get(),
                member_count: guild.member_count,
            })
            .await;
    }

    async fn message(&self, _ctx: Context, message: Message) {
        self.dispatcher
            .publish(&BusEvent::MessageCreate {
                guild_id: message.guild_id.map(|id| id.get()),
                channel_id: message.channel_id.get(),
                author_id: message.author.id.get(),
                author_is_bot: message.author.bot,
                content: message.content.clone(),
            })
            .await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            self.dispatch_command(&ctx, &command).await;
        }
    }
}

fn to_invocation(interaction: &CommandInteraction) -> CommandInvocation {
    let options = interaction
        .data
        .options
        .iter()
        .filter_map(|option| {
            let value = match &option.value {
                CommandDataOptionValue::String(v) => OptionValue::String(v.clone()),
                CommandDataOptionValue::Integer(v) => OptionValue::Integer(*v),
                CommandDataOptionValue::Boolean(v) => OptionValue::Boolean(*v),
                CommandDataOptionValue::User(id) => OptionValue::User(id.get()),
                CommandDataOptionValue::Role(id) => OptionValue::Role(id.get()),
                CommandDataOptionValue::Channel(id) => OptionValue::Channel(id.get()),
                _ => return None,
            };
            Some((option.name.clone(), value))
        })
        .collect();

    CommandInvocation {
        command: interaction.data.name.clone(),
        guild_id: interaction.guild_id.map(|id| id.get()),
        channel_id: interaction.channel_id.get(),
        user_id: interaction.user.id.get(),
        options,
    }
}
