// Immutable process configuration, read from the environment exactly once
// at entry and passed explicitly to whatever needs it.

use crate::core::sync::DeploymentTarget;
use std::env;
use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "data/steward.db";
const DEFAULT_HEALTH_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub application_id: u64,
    /// Guilds the live process registers its commands in. Empty means the
    /// catalog is registered globally.
    pub guild_ids: Vec<u64>,
    pub database_path: String,
    pub health_port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {0} has invalid value '{1}'")]
    Invalid(&'static str, String),
}

impl BotConfig {
    /// Token and client id gate everything: a missing one is fatal before
    /// any network or database call happens.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = require("DISCORD_TOKEN")?;
        let application_raw = require("DISCORD_CLIENT_ID")?;
        let application_id = application_raw
            .parse()
            .map_err(|_| ConfigError::Invalid("DISCORD_CLIENT_ID", application_raw))?;

        let guild_ids = parse_guild_ids(env::var("GUILD_IDS").ok().as_deref())?;
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());
        let health_port = match env::var("HEALTH_PORT") {
            Err(_) => DEFAULT_HEALTH_PORT,
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("HEALTH_PORT", raw))?,
        };

        Ok(Self {
            token,
            application_id,
            guild_ids,
            database_path,
            health_port,
        })
    }

    /// Where the live process registers its catalog at startup.
    pub fn deployment_target(&self) -> DeploymentTarget {
        if self.guild_ids.is_empty() {
            DeploymentTarget::Global
        } else {
            DeploymentTarget::Guilds(self.guild_ids.clone())
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parse the comma-separated GUILD_IDS list. Absent or blank means "no
/// guild pinning" (global registration), not an error; a malformed id is.
pub fn parse_guild_ids(raw: Option<&str>) -> Result<Vec<u64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(vec![]);
    };

    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse()
            .map_err(|_| ConfigError::Invalid("GUILD_IDS", part.to_string()))?;
        ids.push(id);
    }
    Ok(ids)
}
