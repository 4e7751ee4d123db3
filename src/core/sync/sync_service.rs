// Sync engine - declares the command catalog to the external registration
// API under a chosen deployment target. Registration is a declarative full
// replace: after a successful sync the remote scope contains exactly the
// local catalog, whatever was there before.

use crate::core::registry::CommandDescriptor;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// One concrete registration audience. A `DeploymentTarget` expands into one
/// scope per bulk-replace call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandScope {
    Global,
    Guild(u64),
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandScope::Global => write!(f, "global"),
            CommandScope::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// Where a registration batch is aimed: everywhere, or a non-empty set of
/// guilds. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentTarget {
    Global,
    Guilds(Vec<u64>),
}

impl DeploymentTarget {
    /// Resolve CLI-style flags into a target. Neither flag is a fatal
    /// configuration error: there is no sensible default audience.
    pub fn from_flags(global: bool, guild_ids: &[u64]) -> Result<Self, SyncError> {
        match (global, guild_ids.is_empty()) {
            (true, true) => Ok(DeploymentTarget::Global),
            (true, false) => Err(SyncError::ConflictingTarget),
            (false, false) => Ok(DeploymentTarget::Guilds(guild_ids.to_vec())),
            (false, true) => Err(SyncError::MissingTarget),
        }
    }

    pub fn scopes(&self) -> Vec<CommandScope> {
        match self {
            DeploymentTarget::Global => vec![CommandScope::Global],
            DeploymentTarget::Guilds(ids) => {
                ids.iter().copied().map(CommandScope::Guild).collect()
            }
        }
    }
}

/// A command as the remote side reports it after registration.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no deployment target: pass --global or at least one --guild")]
    MissingTarget,

    #[error("--global and --guild are mutually exclusive")]
    ConflictingTarget,

    #[error("refusing to clear global commands without explicit confirmation")]
    UnconfirmedClear,

    #[error("registration API error: {0}")]
    Api(String),

    #[error("{scope}: applied {applied} of {expected} commands")]
    IncompleteReplace {
        scope: String,
        expected: usize,
        applied: usize,
    },
}

// ============================================================================
// REGISTRATION API (PORT)
// ============================================================================

/// The external registration surface. `replace_all` is the bulk "set exactly
/// these" endpoint; `fetch_all` reads the current remote state without
/// mutating anything.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    async fn replace_all(
        &self,
        scope: &CommandScope,
        commands: &[CommandDescriptor],
    ) -> Result<Vec<RegisteredCommand>, SyncError>;

    async fn fetch_all(&self, scope: &CommandScope) -> Result<Vec<RegisteredCommand>, SyncError>;
}

// ============================================================================
// REPORTS
// ============================================================================

/// Result of one scope's call: how many commands the scope now reports, or
/// why the call failed. Failures are isolated per scope.
pub struct ScopeOutcome {
    pub scope: CommandScope,
    pub result: Result<usize, SyncError>,
}

/// Per-scope success/failure report for one sync/clear/preview run. Not a
/// transaction: some scopes may have succeeded while others failed.
pub struct SyncReport {
    outcomes: Vec<ScopeOutcome>,
}

impl SyncReport {
    pub fn outcomes(&self) -> &[ScopeOutcome] {
        &self.outcomes
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failed_scopes(&self) -> Vec<&CommandScope> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| &o.scope)
            .collect()
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Pushes a command catalog to the registration API. The engine does not
/// retry; a network or rate-limit error surfaces immediately as that scope's
/// failure and the remaining scopes are still attempted.
pub struct SyncService<A: RegistrationApi> {
    api: A,
}

impl<A: RegistrationApi> SyncService<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Declare `catalog` as the complete command set for every scope of
    /// `target`. One bulk replace per scope, each recorded independently.
    pub async fn sync(&self, catalog: &[CommandDescriptor], target: &DeploymentTarget) -> SyncReport {
        let mut outcomes = Vec::new();
        for scope in target.scopes() {
            let result = self.replace_scope(&scope, catalog).await;
            match &result {
                Ok(count) => info!(%scope, count, "Registered command catalog"),
                Err(err) => error!(%scope, error = %err, "Command registration failed"),
            }
            outcomes.push(ScopeOutcome { scope, result });
        }
        SyncReport { outcomes }
    }

    /// Remove every command from the target by replacing with the empty
    /// catalog. A global clear wipes the command set on every server at
    /// once, so it is refused unless explicitly confirmed. `dry_run` only
    /// reports what is currently registered.
    pub async fn clear(
        &self,
        target: &DeploymentTarget,
        dry_run: bool,
        confirmed: bool,
    ) -> Result<SyncReport, SyncError> {
        if dry_run {
            return Ok(self.preview(target).await);
        }
        if *target == DeploymentTarget::Global && !confirmed {
            return Err(SyncError::UnconfirmedClear);
        }
        Ok(self.sync(&[], target).await)
    }

    /// Fetch and report the current remote catalog for every scope of
    /// `target`. Issues zero mutating calls.
    pub async fn preview(&self, target: &DeploymentTarget) -> SyncReport {
        let mut outcomes = Vec::new();
        for scope in target.scopes() {
            let result = match self.api.fetch_all(&scope).await {
                Ok(current) => {
                    let names: Vec<&str> = current.iter().map(|c| c.name.as_str()).collect();
                    info!(%scope, count = current.len(), commands = ?names, "Current remote catalog");
                    Ok(current.len())
                }
                Err(err) => {
                    error!(%scope, error = %err, "Failed to fetch remote catalog");
                    Err(err)
                }
            };
            outcomes.push(ScopeOutcome { scope, result });
        }
        SyncReport { outcomes }
    }

    async fn replace_scope(
        &self,
        scope: &CommandScope,
        catalog: &[CommandDescriptor],
    ) -> Result<usize, SyncError> {
        let applied = self.api.replace_all(scope, catalog).await?;
        if applied.len() != catalog.len() {
            return Err(SyncError::IncompleteReplace {
                scope: scope.to_string(),
                expected: catalog.len(),
                applied: applied.len(),
            });
        }
        Ok(applied.len())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{CommandAction, CommandInvocation, CommandReply, ExecutionError};
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NoopAction;

    #[async_trait]
    impl CommandAction for NoopAction {
        async fn execute(
            &self,
            _invocation: &CommandInvocation,
        ) -> Result<CommandReply, ExecutionError> {
            Ok(CommandReply::plain("ok"))
        }
    }

    fn command(name: &str) -> CommandDescriptor {
        CommandDescriptor {
            name: name.to_string(),
            description: format!("{name} command"),
            options: vec![],
            action: Arc::new(NoopAction),
        }
    }

    /// In-memory registration API for testing. Tracks remote state per
    /// scope and counts mutating calls so dry-run purity is checkable.
    #[derive(Default)]
    struct MockApi {
        remote: DashMap<String, Vec<String>>,
        mutating_calls: AtomicUsize,
        failing_scopes: Vec<CommandScope>,
        drop_one_applied: bool,
    }

    impl MockApi {
        fn remote_names(&self, scope: &CommandScope) -> Vec<String> {
            self.remote
                .get(&scope.to_string())
                .map(|names| names.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl RegistrationApi for MockApi {
        async fn replace_all(
            &self,
            scope: &CommandScope,
            commands: &[CommandDescriptor],
        ) -> Result<Vec<RegisteredCommand>, SyncError> {
            self.mutating_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_scopes.contains(scope) {
                return Err(SyncError::Api("simulated outage".to_string()));
            }

            let names: Vec<String> = commands.iter().map(|c| c.name.clone()).collect();
            self.remote.insert(scope.to_string(), names.clone());

            let mut applied: Vec<RegisteredCommand> = names
                .into_iter()
                .enumerate()
                .map(|(i, name)| RegisteredCommand { id: i as u64, name })
                .collect();
            if self.drop_one_applied {
                applied.pop();
            }
            Ok(applied)
        }

        async fn fetch_all(
            &self,
            scope: &CommandScope,
        ) -> Result<Vec<RegisteredCommand>, SyncError> {
            Ok(self
                .remote_names(scope)
                .into_iter()
                .enumerate()
                .map(|(i, name)| RegisteredCommand { id: i as u64, name })
                .collect())
        }
    }

    #[tokio::test]
    async fn sync_is_a_declarative_replace() {
        let service = SyncService::new(MockApi::default());
        let scope = CommandScope::Guild(1);
        let target = DeploymentTarget::Guilds(vec![1]);

        let report = service.sync(&[command("a"), command("b")], &target).await;
        assert!(report.is_success());
        assert_eq!(report.outcomes()[0].result.as_ref().unwrap(), &2);
        assert_eq!(service.api.remote_names(&scope), vec!["a", "b"]);

        // Shrinking the catalog removes the old command remotely.
        let report = service.sync(&[command("a")], &target).await;
        assert!(report.is_success());
        assert_eq!(report.outcomes()[0].result.as_ref().unwrap(), &1);
        assert_eq!(service.api.remote_names(&scope), vec!["a"]);
    }

    #[tokio::test]
    async fn one_failing_guild_does_not_stop_the_rest() {
        let api = MockApi {
            failing_scopes: vec![CommandScope::Guild(2)],
            ..Default::default()
        };
        let service = SyncService::new(api);
        let target = DeploymentTarget::Guilds(vec![1, 2, 3]);

        let report = service.sync(&[command("a")], &target).await;

        assert!(!report.is_success());
        assert_eq!(report.outcomes().len(), 3);
        assert!(report.outcomes()[0].result.is_ok());
        assert!(report.outcomes()[1].result.is_err());
        assert!(report.outcomes()[2].result.is_ok());
        assert_eq!(report.failed_scopes(), vec![&CommandScope::Guild(2)]);
        assert_eq!(service.api.remote_names(&CommandScope::Guild(3)), vec!["a"]);
    }

    #[tokio::test]
    async fn short_applied_list_is_reported_as_failure() {
        let api = MockApi {
            drop_one_applied: true,
            ..Default::default()
        };
        let service = SyncService::new(api);

        let report = service
            .sync(&[command("a"), command("b")], &DeploymentTarget::Global)
            .await;

        assert!(matches!(
            report.outcomes()[0].result,
            Err(SyncError::IncompleteReplace {
                expected: 2,
                applied: 1,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn global_clear_requires_confirmation() {
        let service = SyncService::new(MockApi::default());

        let refused = service.clear(&DeploymentTarget::Global, false, false).await;
        assert!(matches!(refused, Err(SyncError::UnconfirmedClear)));
        assert_eq!(service.api.mutating_calls.load(Ordering::SeqCst), 0);

        let report = service
            .clear(&DeploymentTarget::Global, false, true)
            .await
            .unwrap();
        assert!(report.is_success());
        assert!(service.api.remote_names(&CommandScope::Global).is_empty());
    }

    #[tokio::test]
    async fn guild_clear_needs_no_confirmation() {
        let service = SyncService::new(MockApi::default());
        let target = DeploymentTarget::Guilds(vec![7]);
        service.sync(&[command("a")], &target).await;

        let report = service.clear(&target, false, false).await.unwrap();
        assert!(report.is_success());
        assert!(service.api.remote_names(&CommandScope::Guild(7)).is_empty());
    }

    #[tokio::test]
    async fn dry_run_issues_zero_mutating_calls() {
        let service = SyncService::new(MockApi::default());
        service
            .sync(&[command("a"), command("b")], &DeploymentTarget::Global)
            .await;
        let calls_before = service.api.mutating_calls.load(Ordering::SeqCst);

        let report = service
            .clear(&DeploymentTarget::Global, true, false)
            .await
            .unwrap();

        assert_eq!(service.api.mutating_calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(report.outcomes()[0].result.as_ref().unwrap(), &2);
        assert_eq!(
            service.api.remote_names(&CommandScope::Global),
            vec!["a", "b"]
        );
    }

    #[test]
    fn target_flags_resolve_or_fail_loudly() {
        assert_eq!(
            DeploymentTarget::from_flags(true, &[]).unwrap(),
            DeploymentTarget::Global
        );
        assert_eq!(
            DeploymentTarget::from_flags(false, &[1, 2]).unwrap(),
            DeploymentTarget::Guilds(vec![1, 2])
        );
        assert!(matches!(
            DeploymentTarget::from_flags(false, &[]),
            Err(SyncError::MissingTarget)
        ));
        assert!(matches!(
            DeploymentTarget::from_flags(true, &[1]),
            Err(SyncError::ConflictingTarget)
        ));
    }
}
