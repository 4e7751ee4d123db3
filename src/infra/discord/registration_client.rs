// Serenity-backed implementation of the RegistrationApi port. Global scopes
// go through the application-command endpoints, guild scopes through the
// per-guild ones; both are bulk "set exactly these" calls.

use crate::core::registry::{CommandDescriptor, CommandOptionSpec, OptionKind};
use crate::core::sync::{CommandScope, RegisteredCommand, RegistrationApi, SyncError};
use async_trait::async_trait;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::Http;
use serenity::model::application::{Command, CommandOptionType};
use serenity::model::id::{ApplicationId, GuildId};
use std::sync::Arc;

pub struct DiscordRegistrationApi {
    http: Arc<Http>,
}

impl DiscordRegistrationApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// Standalone client for the one-shot maintenance binaries, which run
    /// without a gateway connection. The command endpoints need the
    /// application id set up front.
    pub fn from_token(token: &str, application_id: u64) -> Self {
        let http = Http::new(token);
        http.set_application_id(ApplicationId::new(application_id));
        Self {
            http: Arc::new(http),
        }
    }
}

#[async_trait]
impl RegistrationApi for DiscordRegistrationApi {
    async fn replace_all(
        &self,
        scope: &CommandScope,
        commands: &[CommandDescriptor],
    ) -> Result<Vec<RegisteredCommand>, SyncError> {
        let payload: Vec<CreateCommand> = commands.iter().map(to_create_command).collect();
        let applied = match scope {
            CommandScope::Global => Command::set_global_commands(&self.http, payload).await,
            CommandScope::Guild(id) => GuildId::new(*id).set_commands(&self.http, payload).await,
        }
        .map_err(|err| SyncError::Api(err.to_string()))?;

        Ok(applied.into_iter().map(to_registered).collect())
    }

    async fn fetch_all(&self, scope: &CommandScope) -> Result<Vec<RegisteredCommand>, SyncError> {
        let current = match scope {
            CommandScope::Global => Command::get_global_commands(&self.http).await,
            CommandScope::Guild(id) => GuildId::new(*id).get_commands(&self.http).await,
        }
        .map_err(|err| SyncError::Api(err.to_string()))?;

        Ok(current.into_iter().map(to_registered).collect())
    }
}

fn to_registered(command: Command) -> RegisteredCommand {
    RegisteredCommand {
        id: command.id.get(),
        name: command.name,
    }
}

fn to_create_command(descriptor: &CommandDescriptor) -> CreateCommand {
    let mut command =
        CreateCommand::new(&descriptor.name).description(&descriptor.description);
    for option in &descriptor.options {
        command = command.add_option(to_create_option(option));
    }
    command
}

fn to_create_option(spec: &CommandOptionSpec) -> CreateCommandOption {
    CreateCommandOption::new(option_type(spec.kind), &spec.name, &spec.description)
        .required(spec.required)
}

fn option_type(kind: OptionKind) -> CommandOptionType {
    match kind {
        OptionKind::String => CommandOptionType::String,
        OptionKind::Integer => CommandOptionType::Integer,
        OptionKind::Boolean => CommandOptionType::Boolean,
        OptionKind::User => CommandOptionType::User,
        OptionKind::Role => CommandOptionType::Role,
        OptionKind::Channel => CommandOptionType::Channel,
    }
}
