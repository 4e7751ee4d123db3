// Migration engine - brings a persisted table's column set to a desired
// shape without losing existing rows. SQLite has no atomic "add column with
// computed backfill", so the engine rebuilds through a shadow table:
// inspect -> skip if current -> create shadow -> backfill copy -> swap.
// The store executes the rebuild inside one transaction, so a failure
// mid-sequence rolls back instead of stranding a half-renamed table.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// One column of the desired schema. `definition` is the SQL column type and
/// constraints; `backfill` is the expression applied to pre-existing rows
/// when this column is newly introduced. A new column without a backfill is
/// left to its declared default.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub definition: String,
    pub backfill: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            backfill: None,
        }
    }

    pub fn with_backfill(mut self, expression: impl Into<String>) -> Self {
        self.backfill = Some(expression.into());
        self
    }
}

/// The full desired shape of one table. Steps are constructed fresh per
/// maintenance invocation and never persisted.
#[derive(Debug, Clone)]
pub struct MigrationStep {
    pub table: String,
    /// Ordered, complete column set the table should end up with.
    pub columns: Vec<ColumnSpec>,
    /// Composite uniqueness that must hold going forward.
    pub unique_on: Option<Vec<String>>,
}

/// Concrete statements for one shadow-table rebuild. `copy_sql` is absent on
/// a fresh install (no source table, nothing to backfill).
#[derive(Debug, Clone)]
pub struct RebuildPlan {
    pub table: String,
    pub shadow: String,
    pub columns: Vec<String>,
    pub create_sql: String,
    pub copy_sql: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Desired columns already present; repeat runs are a no-op.
    AlreadyCurrent,
    /// Table did not exist; created with the full desired schema.
    Created,
    /// Existing table rebuilt; lists the newly introduced columns.
    Rebuilt { added: Vec<String> },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("store error: {0}")]
    Store(String),
}

/// Outcome of one table's independent step sequence.
pub struct TableOutcome {
    pub table: String,
    pub result: Result<MigrationOutcome, MigrationError>,
}

// ============================================================================
// SCHEMA STORE (PORT)
// ============================================================================

#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Current column names of `table`, or `None` if the table is absent.
    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, MigrationError>;

    /// Execute create-shadow, backfill copy and swap as one atomic unit.
    async fn rebuild_table(&self, plan: &RebuildPlan) -> Result<(), MigrationError>;
}

// ============================================================================
// PLAN CONSTRUCTION
// ============================================================================

/// Turn a step plus the table's current columns into concrete rebuild SQL.
/// Pure; the interesting cases (fresh install, partial overlap, backfill
/// expressions) are unit-testable without a database.
pub fn build_rebuild_plan(step: &MigrationStep, current: Option<&[String]>) -> RebuildPlan {
    let shadow = format!("{}_migration_new", step.table);

    let mut definitions: Vec<String> = step
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.definition))
        .collect();
    if let Some(unique) = &step.unique_on {
        definitions.push(format!("UNIQUE ({})", unique.join(", ")));
    }
    let create_sql = format!("CREATE TABLE {} ({})", shadow, definitions.join(", "));

    let copy_sql = current.map(|current_cols| {
        let mut insert_cols = Vec::new();
        let mut select_exprs = Vec::new();
        for column in &step.columns {
            if current_cols.iter().any(|c| c == &column.name) {
                insert_cols.push(column.name.clone());
                select_exprs.push(column.name.clone());
            } else if let Some(backfill) = &column.backfill {
                insert_cols.push(column.name.clone());
                select_exprs.push(backfill.clone());
            }
        }
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            shadow,
            insert_cols.join(", "),
            select_exprs.join(", "),
            step.table
        )
    });

    RebuildPlan {
        table: step.table.clone(),
        shadow,
        columns: step.columns.iter().map(|c| c.name.clone()).collect(),
        create_sql,
        copy_sql,
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct MigrationEngine<S: SchemaStore> {
    store: S,
}

impl<S: SchemaStore> MigrationEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one table's step sequence to its terminal state.
    pub async fn apply(&self, step: &MigrationStep) -> Result<MigrationOutcome, MigrationError> {
        let current = self.store.table_columns(&step.table).await?;

        if let Some(current_cols) = &current {
            let up_to_date = step
                .columns
                .iter()
                .all(|c| current_cols.iter().any(|cur| cur == &c.name));
            if up_to_date {
                info!(table = %step.table, "Schema already current; nothing to do");
                return Ok(MigrationOutcome::AlreadyCurrent);
            }
        }

        let plan = build_rebuild_plan(step, current.as_deref());
        self.store.rebuild_table(&plan).await?;

        match current {
            None => {
                info!(table = %step.table, "Created table with desired schema");
                Ok(MigrationOutcome::Created)
            }
            Some(current_cols) => {
                let added: Vec<String> = step
                    .columns
                    .iter()
                    .filter(|c| !current_cols.iter().any(|cur| cur == &c.name))
                    .map(|c| c.name.clone())
                    .collect();
                info!(table = %step.table, added = ?added, "Rebuilt table with new columns");
                Ok(MigrationOutcome::Rebuilt { added })
            }
        }
    }

    /// Run every step; each table's sequence is independent of the others'
    /// success or failure. The caller decides the process exit code from
    /// the collected outcomes.
    pub async fn apply_all(&self, steps: &[MigrationStep]) -> Vec<TableOutcome> {
        let mut outcomes = Vec::new();
        for step in steps {
            let result = self.apply(step).await;
            if let Err(err) = &result {
                error!(table = %step.table, error = %err, "Migration step failed");
            }
            outcomes.push(TableOutcome {
                table: step.table.clone(),
                result,
            });
        }
        outcomes
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    #[test]
    fn plan_creates_shadow_with_full_schema_and_uniqueness() {
        let current = vec![
            "role_id".to_string(),
            "name".to_string(),
            "cost".to_string(),
        ];
        let plan = build_rebuild_plan(&roles_step(), Some(&current));

        assert_eq!(plan.shadow, "redeemable_roles_migration_new");
        assert_eq!(
            plan.create_sql,
            "CREATE TABLE redeemable_roles_migration_new (role_id INTEGER NOT NULL, \
             name TEXT NOT NULL, cost INTEGER NOT NULL DEFAULT 0, \
             guild_id INTEGER NOT NULL DEFAULT 0, UNIQUE (guild_id, role_id))"
        );
        assert_eq!(
            plan.copy_sql.as_deref(),
            Some(
                "INSERT INTO redeemable_roles_migration_new (role_id, name, cost, guild_id) \
                 SELECT role_id, name, cost, 0 FROM redeemable_roles"
            )
        );
    }

    #[test]
    fn fresh_install_plan_has_no_copy() {
        let plan = build_rebuild_plan(&roles_step(), None);
        assert!(plan.copy_sql.is_none());
    }

    #[test]
    fn new_column_without_backfill_is_left_to_its_default() {
        let step = MigrationStep {
            table: "member_activity".to_string(),
            columns: vec![
                ColumnSpec::new("user_id", "INTEGER NOT NULL"),
                ColumnSpec::new("voice_minutes", "INTEGER NOT NULL DEFAULT 0"),
            ],
            unique_on: None,
        };
        let current = vec!["user_id".to_string()];

        let plan = build_rebuild_plan(&step, Some(&current));
        assert_eq!(
            plan.copy_sql.as_deref(),
            Some("INSERT INTO member_activity_migration_new (user_id) SELECT user_id FROM member_activity")
        );
    }

    /// Schema store whose state reflects applied rebuilds, so idempotence
    /// is observable across repeat runs.
    #[derive(Default)]
    struct MockSchemaStore {
        tables: DashMap<String, Vec<String>>,
        rebuilds: AtomicUsize,
        failing_table: Option<String>,
    }

    #[async_trait]
    impl SchemaStore for MockSchemaStore {
        async fn table_columns(
            &self,
            table: &str,
        ) -> Result<Option<Vec<String>>, MigrationError> {
            Ok(self.tables.get(table).map(|cols| cols.clone()))
        }

        async fn rebuild_table(&self, plan: &RebuildPlan) -> Result<(), MigrationError> {
            if self.failing_table.as_deref() == Some(plan.table.as_str()) {
                return Err(MigrationError::Store("disk full".to_string()));
            }
            self.rebuilds.fetch_add(1, Ordering::SeqCst);
            self.tables.insert(plan.table.clone(), plan.columns.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn repeat_run_performs_zero_rebuilds() {
        let store = MockSchemaStore::default();
        store.tables.insert(
            "redeemable_roles".to_string(),
            vec![
                "role_id".to_string(),
                "name".to_string(),
                "cost".to_string(),
            ],
        );
        let engine = MigrationEngine::new(store);
        let step = roles_step();

        let first = engine.apply(&step).await.unwrap();
        assert_eq!(
            first,
            MigrationOutcome::Rebuilt {
                added: vec!["guild_id".to_string()]
            }
        );
        assert_eq!(engine.store.rebuilds.load(Ordering::SeqCst), 1);

        let second = engine.apply(&step).await.unwrap();
        assert_eq!(second, MigrationOutcome::AlreadyCurrent);
        assert_eq!(engine.store.rebuilds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn absent_table_is_created_not_an_error() {
        let engine = MigrationEngine::new(MockSchemaStore::default());

        let outcome = engine.apply(&roles_step()).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Created);
    }

    #[tokio::test]
    async fn one_failing_table_does_not_stop_the_rest() {
        let store = MockSchemaStore {
            failing_table: Some("redeemable_roles".to_string()),
            ..Default::default()
        };
        let engine = MigrationEngine::new(store);

        let other_step = MigrationStep {
            table: "member_activity".to_string(),
            columns: vec![ColumnSpec::new("user_id", "INTEGER NOT NULL")],
            unique_on: None,
        };
        let outcomes = engine.apply_all(&[roles_step(), other_step]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        assert_eq!(
            outcomes[1].result.as_ref().unwrap(),
            &MigrationOutcome::Created
        );
    }
}
