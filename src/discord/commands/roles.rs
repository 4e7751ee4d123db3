// /roles - list the redeemable role rewards configured in this guild.

use crate::core::registry::{
    CommandAction, CommandDescriptor, CommandInvocation, CommandReply, ExecutionError,
};
use crate::core::rewards::RewardStore;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

struct RolesAction {
    store: Arc<dyn RewardStore>,
}

#[async_trait]
impl CommandAction for RolesAction {
    async fn execute(
        &self,
        invocation: &CommandInvocation,
    ) -> Result<CommandReply, ExecutionError> {
        let Some(guild_id) = invocation.guild_id else {
            return Ok(CommandReply::ephemeral("This command only works in a server."));
        };

        let rewards = self
            .store
            .list_rewards(guild_id)
            .await
            .map_err(|e| ExecutionError::Store(e.to_string()))?;

        if rewards.is_empty() {
            return Ok(CommandReply::plain(
                "No redeemable roles are set up here yet.",
            ));
        }

        let mut content = String::from("**Redeemable roles**\n");
        for reward in &rewards {
            let _ = writeln!(content, "{} ({} coins)", reward.name, reward.cost);
        }
        Ok(CommandReply::plain(content))
    }
}

pub fn descriptor(store: Arc<dyn RewardStore>) -> CommandDescriptor {
    CommandDescriptor {
        name: "roles".to_string(),
        description: "List the redeemable role rewards in this server".to_string(),
        options: vec![],
        action: Arc::new(RolesAction { store }),
    }
}
