// In-memory implementation of RewardStore. Used by the one-shot
// deploy/clear binaries, which need descriptor metadata but never execute
// anything, and by tests.

use crate::core::rewards::{RewardStore, RewardsError, RoleReward};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemoryRewardStore {
    rewards: DashMap<(u64, u64), RoleReward>,
    activity: DashMap<(u64, u64), u64>,
}

impl InMemoryRewardStore {
    pub fn new() -> Self {
        Self {
            rewards: DashMap::new(),
            activity: DashMap::new(),
        }
    }
}

impl Default for InMemoryRewardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RewardStore for InMemoryRewardStore {
    async fn list_rewards(&self, guild_id: u64) -> Result<Vec<RoleReward>, RewardsError> {
        let mut rewards: Vec<RoleReward> = self
            .rewards
            .iter()
            .filter(|entry| entry.key().0 == guild_id)
            .map(|entry| entry.value().clone())
            .collect();
        rewards.sort_by_key(|r| (r.cost, r.role_id));
        Ok(rewards)
    }

    async fn upsert_reward(&self, reward: RoleReward) -> Result<(), RewardsError> {
        self.rewards
            .insert((reward.guild_id, reward.role_id), reward);
        Ok(())
    }

    async fn record_message(&self, guild_id: u64, user_id: u64) -> Result<(), RewardsError> {
        *self.activity.entry((guild_id, user_id)).or_insert(0) += 1;
        Ok(())
    }

    async fn message_count(&self, guild_id: u64, user_id: u64) -> Result<u64, RewardsError> {
        Ok(self
            .activity
            .get(&(guild_id, user_id))
            .map(|count| *count)
            .unwrap_or(0))
    }
}
