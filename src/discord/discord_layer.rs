// Discord layer - gateway adapter, command modules and event handler modules.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "events/event_catalog.rs"]
pub mod events;

pub mod gateway;
