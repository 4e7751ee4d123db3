// Descriptor registry - builds the validated catalog of command and event
// capability modules. No Discord-specific code lives here; the gateway
// adapter translates interactions into `CommandInvocation`s and the infra
// layer translates descriptors into registration payloads.

use crate::core::events::EventAction;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Parameter types a command can declare. Mirrors the option types the
/// registration API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Role,
    Channel,
}

/// One declared parameter of a command.
#[derive(Debug, Clone)]
pub struct CommandOptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
}

/// A concrete option value supplied by the platform at invocation time.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    User(u64),
    Role(u64),
    Channel(u64),
}

/// Everything an executor gets to see about one command invocation.
/// Plain IDs and values only, so executors stay platform-agnostic.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub command: String,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub user_id: u64,
    pub options: Vec<(String, OptionValue)>,
}

impl CommandInvocation {
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// What an executor wants sent back to the invoker.
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub content: String,
    pub ephemeral: bool,
}

impl CommandReply {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("store error: {0}")]
    Store(String),

    #[error("missing required option: {0}")]
    MissingOption(String),
}

/// The executable capability behind a command descriptor.
#[async_trait]
pub trait CommandAction: Send + Sync {
    async fn execute(&self, invocation: &CommandInvocation)
        -> Result<CommandReply, ExecutionError>;
}

/// A validated, in-memory record of one slash command. Identity = `name`.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub options: Vec<CommandOptionSpec>,
    pub action: Arc<dyn CommandAction>,
}

/// A validated, in-memory record of one gateway event subscription.
/// Identity = `name`; a given event name gets at most one active
/// subscription per process.
#[derive(Clone)]
pub struct EventDescriptor {
    pub name: String,
    /// Fire at most one time instead of on every occurrence.
    pub once: bool,
    pub action: Arc<dyn EventAction>,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Platform limits on command names and descriptions.
const MAX_COMMAND_NAME_LEN: usize = 32;
const MAX_COMMAND_DESCRIPTION_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("module has no usable name")]
    MissingName,

    #[error("name '{0}' is not 1-32 lowercase alphanumeric/-/_ characters")]
    InvalidName(String),

    #[error("command '{0}' has no description")]
    MissingDescription(String),

    #[error("command '{0}' description exceeds 100 characters")]
    DescriptionTooLong(String),
}

fn valid_command_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COMMAND_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Check one command candidate against the platform's shape constraints.
/// The executable capability is guaranteed by construction, so validation
/// is about the identity and description fields.
pub fn validate_command(descriptor: &CommandDescriptor) -> Result<(), RegistryError> {
    if descriptor.name.is_empty() {
        return Err(RegistryError::MissingName);
    }
    if !valid_command_name(&descriptor.name) {
        return Err(RegistryError::InvalidName(descriptor.name.clone()));
    }
    if descriptor.description.is_empty() {
        return Err(RegistryError::MissingDescription(descriptor.name.clone()));
    }
    if descriptor.description.len() > MAX_COMMAND_DESCRIPTION_LEN {
        return Err(RegistryError::DescriptionTooLong(descriptor.name.clone()));
    }
    Ok(())
}

pub fn validate_event(descriptor: &EventDescriptor) -> Result<(), RegistryError> {
    if descriptor.name.is_empty() {
        return Err(RegistryError::MissingName);
    }
    Ok(())
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Explicit init-time registration builder. Capability modules are handed in
/// one by one; `build` validates each candidate and resolves name collisions.
/// A malformed module degrades the catalog, it never aborts startup.
#[derive(Default)]
pub struct RegistryBuilder {
    commands: Vec<CommandDescriptor>,
    events: Vec<EventDescriptor>,
}

impl RegistryBuilder {
    pub fn command(mut self, descriptor: CommandDescriptor) -> Self {
        self.commands.push(descriptor);
        self
    }

    pub fn event(mut self, descriptor: EventDescriptor) -> Self {
        self.events.push(descriptor);
        self
    }

    /// Validate every candidate and assemble the final catalogs.
    ///
    /// Collision policy: **last registration wins**. The survivor keeps the
    /// discarded entry's catalog position; order only matters for log
    /// readability.
    pub fn build(self) -> DescriptorRegistry {
        let mut commands: Vec<CommandDescriptor> = Vec::new();
        for candidate in self.commands {
            match validate_command(&candidate) {
                Err(reason) => {
                    warn!(module = %candidate.name, %reason, "Skipping malformed command module");
                }
                Ok(()) => {
                    if let Some(pos) = commands.iter().position(|c| c.name == candidate.name) {
                        warn!(
                            command = %candidate.name,
                            discarded = %commands[pos].description,
                            kept = %candidate.description,
                            "Duplicate command name; last registration wins"
                        );
                        commands[pos] = candidate;
                    } else {
                        info!(command = %candidate.name, "Loaded command module");
                        commands.push(candidate);
                    }
                }
            }
        }

        let mut events: Vec<EventDescriptor> = Vec::new();
        for candidate in self.events {
            match validate_event(&candidate) {
                Err(reason) => {
                    warn!(module = %candidate.name, %reason, "Skipping malformed event module");
                }
                Ok(()) => {
                    if let Some(pos) = events.iter().position(|e| e.name == candidate.name) {
                        warn!(
                            event = %candidate.name,
                            "Duplicate event subscription; last registration wins"
                        );
                        events[pos] = candidate;
                    } else {
                        info!(event = %candidate.name, once = candidate.once, "Loaded event module");
                        events.push(candidate);
                    }
                }
            }
        }

        DescriptorRegistry { commands, events }
    }
}

/// The deduplicated, insertion-ordered catalogs. Built once at startup and
/// read-only afterwards; a fresh discovery pass replaces the whole registry.
pub struct DescriptorRegistry {
    commands: Vec<CommandDescriptor>,
    events: Vec<EventDescriptor>,
}

impl DescriptorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn commands(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    pub fn find_command(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.name == name)
    }
}

// ============================================================================
// TESTS
// ============================================================================
