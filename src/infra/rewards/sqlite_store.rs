// SQLite implementation of the RewardStore trait.

use crate::core::rewards::{RewardStore, RewardsError, RoleReward};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

pub struct SqliteRewardStore {
    pool: SqlitePool,
}

impl SqliteRewardStore {
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        if !database_path.contains(":memory:") && !Path::new(database_path).exists() {
            if let Some(parent) = Path::new(database_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(database_path)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite://{}", database_path))
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Baseline schema for fresh installs. Pre-existing databases are
    /// brought up to this shape by the migrate-db binary, not here.
    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS redeemable_roles (
                guild_id INTEGER NOT NULL DEFAULT 0,
                role_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                cost INTEGER NOT NULL DEFAULT 0,
                UNIQUE (guild_id, role_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS member_activity (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                messages INTEGER NOT NULL DEFAULT 0,
                voice_minutes INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RewardStore for SqliteRewardStore {
    async fn list_rewards(&self, guild_id: u64) -> Result<Vec<RoleReward>, RewardsError> {
        let rows = sqlx::query(
            r#"
            SELECT guild_id, role_id, name, cost
            FROM redeemable_roles
            WHERE guild_id = ?
            ORDER BY cost ASC, role_id ASC
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RewardsError::Store(e.to_string()))?;

        let rewards = rows
            .iter()
            .map(|row| RoleReward {
                guild_id: row.get::<i64, _>("guild_id") as u64,
                role_id: row.get::<i64, _>("role_id") as u64,
                name: row.get("name"),
                cost: row.get("cost"),
            })
            .collect();

        Ok(rewards)
    }

    async fn upsert_reward(&self, reward: RoleReward) -> Result<(), RewardsError> {
        sqlx::query(
            r#"
            INSERT INTO redeemable_roles (guild_id, role_id, name, cost)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id, role_id) DO UPDATE SET
                name = excluded.name,
                cost = excluded.cost
            "#,
        )
        .bind(reward.guild_id as i64)
        .bind(reward.role_id as i64)
        .bind(reward.name)
        .bind(reward.cost)
        .execute(&self.pool)
        .await
        .map_err(|e| RewardsError::Store(e.to_string()))?;

        Ok(())
    }

    async fn record_message(&self, guild_id: u64, user_id: u64) -> Result<(), RewardsError> {
        sqlx::query(
            r#"
            INSERT INTO member_activity (guild_id, user_id, messages)
            VALUES (?, ?, 1)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
                messages = messages + 1
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RewardsError::Store(e.to_string()))?;

        Ok(())
    }

    async fn message_count(&self, guild_id: u64, user_id: u64) -> Result<u64, RewardsError> {
        let row = sqlx::query(
            "SELECT messages FROM member_activity WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RewardsError::Store(e.to_string()))?;

        Ok(row.map(|r| r.get::<i64, _>(0) as u64).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteRewardStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rewards.db");
        let store = SqliteRewardStore::new(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn rewards_are_scoped_per_guild() {
        let (_dir, store) = temp_store().await;

        store
            .upsert_reward(RoleReward {
                guild_id: 1,
                role_id: 10,
                name: "Regular".to_string(),
                cost: 100,
            })
            .await
            .unwrap();
        store
            .upsert_reward(RoleReward {
                guild_id: 1,
                role_id: 11,
                name: "Veteran".to_string(),
                cost: 500,
            })
            .await
            .unwrap();
        store
            .upsert_reward(RoleReward {
                guild_id: 2,
                role_id: 12,
                name: "Other".to_string(),
                cost: 50,
            })
            .await
            .unwrap();

        let rewards = store.list_rewards(1).await.unwrap();
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].name, "Regular");
        assert_eq!(rewards[1].name, "Veteran");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_reward() {
        let (_dir, store) = temp_store().await;

        let reward = RoleReward {
            guild_id: 1,
            role_id: 10,
            name: "Old".to_string(),
            cost: 100,
        };
        store.upsert_reward(reward.clone()).await.unwrap();
        store
            .upsert_reward(RoleReward {
                name: "New".to_string(),
                cost: 200,
                ..reward
            })
            .await
            .unwrap();

        let rewards = store.list_rewards(1).await.unwrap();
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].name, "New");
        assert_eq!(rewards[0].cost, 200);
    }

    #[tokio::test]
    async fn message_counter_accumulates() {
        let (_dir, store) = temp_store().await;

        assert_eq!(store.message_count(1, 5).await.unwrap(), 0);
        store.record_message(1, 5).await.unwrap();
        store.record_message(1, 5).await.unwrap();
        store.record_message(1, 5).await.unwrap();

        assert_eq!(store.message_count(1, 5).await.unwrap(), 3);
    }
}
