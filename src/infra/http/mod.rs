// Passive HTTP status reporting.

pub mod health_server;
