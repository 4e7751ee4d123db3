// SQLite implementation of the SchemaStore port. SQLite DDL is
// transactional, so the whole create-shadow/copy/swap sequence commits or
// rolls back as one unit.

use crate::core::migration::{MigrationError, RebuildPlan, SchemaStore};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

pub struct SqliteSchemaStore {
    pool: SqlitePool,
}

impl SqliteSchemaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_path: &str) -> anyhow::Result<Self> {
        if !database_path.contains(":memory:") && !Path::new(database_path).exists() {
            if let Some(parent) = Path::new(database_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(database_path)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite://{}", database_path))
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SchemaStore for SqliteSchemaStore {
    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, MigrationError> {
        // pragma_table_info yields no rows for an absent table; a real
        // table always has at least one column.
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrationError::Store(e.to_string()))?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.iter().map(|row| row.get("name")).collect()))
    }

    async fn rebuild_table(&self, plan: &RebuildPlan) -> Result<(), MigrationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::Store(e.to_string()))?;

        sqlx::query(&plan.create_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Store(e.to_string()))?;

        if let Some(copy_sql) = &plan.copy_sql {
            sqlx::query(copy_sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| MigrationError::Store(e.to_string()))?;
        }

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", plan.table))
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Store(e.to_string()))?;

        sqlx::query(&format!(
            "ALTER TABLE {} RENAME TO {}",
            plan.shadow, plan.table
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| MigrationError::Store(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| MigrationError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::migration::{ColumnSpec, MigrationEngine, MigrationOutcome, MigrationStep};

    async fn temp_store() -> (tempfile::TempDir, SqliteSchemaStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steward.db");
        let store = SqliteSchemaStore::connect(path.to_str().unwrap())
            .await
            .unwrap();
        (dir, store)
    }

    fn roles_step() -> MigrationStep {
        MigrationStep {
            table: "redeemable_roles".to_string(),
            columns: vec![
                ColumnSpec::new("role_id", "INTEGER NOT NULL"),
                ColumnSpec::new("name", "TEXT NOT NULL"),
                ColumnSpec::new("cost", "INTEGER NOT NULL DEFAULT 0"),
                ColumnSpec::new("guild_id", "INTEGER NOT NULL DEFAULT 0").with_backfill("0"),
            ],
            unique_on: Some(vec!["guild_id".to_string(), "role_id".to_string()]),
        }
    }

    #[tokio::test]
    async fn existing_rows_survive_with_backfilled_column() {
        let (_dir, store) = temp_store().await;

        // Old-shape table, three pre-existing rows.
        sqlx::query("CREATE TABLE redeemable_roles (role_id INTEGER NOT NULL, name TEXT NOT NULL, cost INTEGER NOT NULL DEFAULT 0)")
            .execute(store.pool())
            .await
            .unwrap();
        for (role_id, name, cost) in [(10, "Regular", 100), (11, "Veteran", 500), (12, "Elder", 900)] {
            sqlx::query("INSERT INTO redeemable_roles (role_id, name, cost) VALUES (?, ?, ?)")
                .bind(role_id)
                .bind(name)
                .bind(cost)
                .execute(store.pool())
                .await
                .unwrap();
        }

        let engine = MigrationEngine::new(store);
        let outcome = engine.apply(&roles_step()).await.unwrap();
        assert_eq!(
            outcome,
            MigrationOutcome::Rebuilt {
                added: vec!["guild_id".to_string()]
            }
        );

        let rows = sqlx::query("SELECT role_id, guild_id FROM redeemable_roles ORDER BY role_id")
            .fetch_all(engine.store().pool())
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.get::<i64, _>("guild_id"), 0);
        }

        // Repeat run is a no-op.
        let second = engine.apply(&roles_step()).await.unwrap();
        assert_eq!(second, MigrationOutcome::AlreadyCurrent);
    }

    #[tokio::test]
    async fn composite_uniqueness_holds_after_rebuild() {
        let (_dir, store) = temp_store().await;
        sqlx::query("CREATE TABLE redeemable_roles (role_id INTEGER NOT NULL, name TEXT NOT NULL, cost INTEGER NOT NULL DEFAULT 0)")
            .execute(store.pool())
            .await
            .unwrap();

        let engine = MigrationEngine::new(store);
        engine.apply(&roles_step()).await.unwrap();

        sqlx::query("INSERT INTO redeemable_roles (role_id, name, cost, guild_id) VALUES (10, 'A', 1, 1)")
            .execute(engine.store().pool())
            .await
            .unwrap();
        let duplicate =
            sqlx::query("INSERT INTO redeemable_roles (role_id, name, cost, guild_id) VALUES (10, 'B', 2, 1)")
                .execute(engine.store().pool())
                .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn fresh_install_creates_the_table() {
        let (_dir, store) = temp_store().await;
        let engine = MigrationEngine::new(store);

        let outcome = engine.apply(&roles_step()).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Created);

        let columns = engine
            .store()
            .table_columns("redeemable_roles")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(columns, vec!["role_id", "name", "cost", "guild_id"]);
    }

    #[tokio::test]
    async fn absent_table_reports_no_columns() {
        let (_dir, store) = temp_store().await;
        assert_eq!(store.table_columns("nothing_here").await.unwrap(), None);
    }
}
