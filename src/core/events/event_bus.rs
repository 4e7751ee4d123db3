// Event bus contract. The core defines WHAT an event subscription looks
// like; the infra layer owns the dispatcher that actually fans events out,
// and the gateway adapter publishes into it.

use crate::core::registry::{EventDescriptor, ExecutionError};
use async_trait::async_trait;

/// A gateway occurrence, reduced to plain values so handlers stay
/// platform-agnostic.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Ready {
        bot_name: String,
        guild_count: usize,
    },
    MessageCreate {
        guild_id: Option<u64>,
        channel_id: u64,
        author_id: u64,
        author_is_bot: bool,
        content: String,
    },
    GuildCreate {
        guild_id: u64,
        member_count: u64,
    },
}

impl BusEvent {
    /// The platform event identifier this occurrence matches against
    /// subscribed `EventDescriptor` names.
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::Ready { .. } => "ready",
            BusEvent::MessageCreate { .. } => "message_create",
            BusEvent::GuildCreate { .. } => "guild_create",
        }
    }
}

/// The executable capability behind an event descriptor.
#[async_trait]
pub trait EventAction: Send + Sync {
    async fn handle(&self, event: &BusEvent) -> Result<(), ExecutionError>;
}

/// Opaque token returned by `subscribe`, used for symmetric teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Subscription surface of the event dispatcher. `once` descriptors fire at
/// most one time; a second subscription under the same event name supersedes
/// the first (one active subscription per event name per process).
pub trait EventBus: Send + Sync {
    fn subscribe(&self, descriptor: EventDescriptor) -> SubscriptionHandle;
    fn unsubscribe(&self, handle: SubscriptionHandle) -> bool;
}
