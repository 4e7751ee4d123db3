// message_create - records per-member activity counters. Bot authors and
// direct messages are ignored.

use crate::core::events::{BusEvent, EventAction};
use crate::core::registry::{EventDescriptor, ExecutionError};
use crate::core::rewards::RewardStore;
use async_trait::async_trait;
use std::sync::Arc;

struct ActivityAction {
    store: Arc<dyn RewardStore>,
}

#[async_trait]
impl EventAction for ActivityAction {
    async fn handle(&self, event: &BusEvent) -> Result<(), ExecutionError> {
        let BusEvent::MessageCreate {
            guild_id: Some(guild_id),
            author_id,
            author_is_bot,
            ..
        } = event
        else {
            return Ok(());
        };

        if *author_is_bot {
            return Ok(());
        }

        self.store
            .record_message(*guild_id, *author_id)
            .await
            .map_err(|e| ExecutionError::Store(e.to_string()))
    }
}

pub fn descriptor(store: Arc<dyn RewardStore>) -> EventDescriptor {
    EventDescriptor {
        name: "message_create".to_string(),
        once: false,
        action: Arc::new(ActivityAction { store }),
    }
}
