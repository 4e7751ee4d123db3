// Role rewards and member activity - the persisted feature behind the
// sample command/event modules. The interesting schema-evolution cases in
// the migration engine run against these tables.

use async_trait::async_trait;
use thiserror::Error;

/// A role members can redeem in a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleReward {
    pub guild_id: u64,
    pub role_id: u64,
    pub name: String,
    pub cost: i64,
}

#[derive(Debug, Error)]
pub enum RewardsError {
    #[error("store error: {0}")]
    Store(String),
}

/// Persistence port for rewards and per-member activity counters.
#[async_trait]
pub trait RewardStore: Send + Sync {
    async fn list_rewards(&self, guild_id: u64) -> Result<Vec<RoleReward>, RewardsError>;

    async fn upsert_reward(&self, reward: RoleReward) -> Result<(), RewardsError>;

    /// Bump the message counter for one member. Called from the
    /// message_create event handler.
    async fn record_message(&self, guild_id: u64, user_id: u64) -> Result<(), RewardsError>;

    async fn message_count(&self, guild_id: u64, user_id: u64) -> Result<u64, RewardsError>;
}
