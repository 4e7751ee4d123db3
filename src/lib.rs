// Library entry so the one-shot maintenance binaries (deploy-commands,
// clear-commands, migrate-db) and tests reference the same modules as the
// bot binary.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, Discord HTTP)
// - `discord/` = Discord-specific adapters (gateway, command modules)

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "discord/discord_layer.rs"]
pub mod discord;
#[path = "infra/infra_layer.rs"]
pub mod infra;
