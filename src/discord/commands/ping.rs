// /ping - liveness check with the current gateway heartbeat.

use crate::core::health::ConnectivityProbe;
use crate::core::registry::{
    CommandAction, CommandDescriptor, CommandInvocation, CommandReply, ExecutionError,
};
use crate::discord::gateway::GatewayProbe;
use async_trait::async_trait;
use std::sync::Arc;

struct PingAction {
    probe: Arc<GatewayProbe>,
}

#[async_trait]
impl CommandAction for PingAction {
    async fn execute(
        &self,
        _invocation: &CommandInvocation,
    ) -> Result<CommandReply, ExecutionError> {
        let reply = match self.probe.gateway_status().ping {
            Some(ms) => format!("Pong! Gateway heartbeat: {ms}ms"),
            None => "Pong!".to_string(),
        };
        Ok(CommandReply::plain(reply))
    }
}

pub fn descriptor(probe: Arc<GatewayProbe>) -> CommandDescriptor {
    CommandDescriptor {
        name: "ping".to_string(),
        description: "Check the bot is alive and see gateway latency".to_string(),
        options: vec![],
        action: Arc::new(PingAction { probe }),
    }
}
