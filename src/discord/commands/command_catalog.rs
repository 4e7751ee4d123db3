// Command modules. Each feature gets its own file; `build_registry` below
// is the single explicit list of every capability module the bot ships.

pub mod ping;
pub mod roles;

use crate::core::registry::DescriptorRegistry;
use crate::core::rewards::RewardStore;
use crate::discord::events;
use crate::discord::gateway::GatewayProbe;
use std::sync::Arc;

/// Assemble the full descriptor catalog. Shared by the live process and the
/// deploy-commands binary so both always register the same set.
pub fn build_registry(
    probe: Arc<GatewayProbe>,
    rewards: Arc<dyn RewardStore>,
) -> DescriptorRegistry {
    DescriptorRegistry::builder()
        .command(ping::descriptor(probe))
        .command(roles::descriptor(Arc::clone(&rewards)))
        .event(events::ready::descriptor())
        .event(events::activity::descriptor(rewards))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::rewards::InMemoryRewardStore;

    #[test]
    fn shipped_catalog_is_valid_and_deduplicated() {
        let registry = build_registry(
            Arc::new(GatewayProbe::new()),
            Arc::new(InMemoryRewardStore::new()),
        );

        let names: Vec<&str> = registry.commands().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ping", "roles"]);

        let events: Vec<&str> = registry.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(events, vec!["ready", "message_create"]);
    }
}
