// ready - fires once per process when the first gateway session is up.

use crate::core::events::{BusEvent, EventAction};
use crate::core::registry::{EventDescriptor, ExecutionError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

struct ReadyAction;

#[async_trait]
impl EventAction for ReadyAction {
    async fn handle(&self, event: &BusEvent) -> Result<(), ExecutionError> {
        if let BusEvent::Ready {
            bot_name,
            guild_count,
        } = event
        {
            info!(bot = %bot_name, guilds = guild_count, "Steward is up and serving");
        }
        Ok(())
    }
}

pub fn descriptor() -> EventDescriptor {
    EventDescriptor {
        name: "ready".to_string(),
        once: true,
        action: Arc::new(ReadyAction),
    }
}
