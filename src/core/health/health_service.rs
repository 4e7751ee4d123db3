// Health monitor - a point-in-time, read-only projection of process and
// gateway state. Recomputed per query, never persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// The gateway side of the snapshot, as reported by the connectivity probe.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub connected: bool,
    /// Shard heartbeat latency in milliseconds, when known.
    pub ping: Option<u64>,
    pub guilds: u64,
    pub users: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the service was constructed.
    pub uptime: u64,
    /// Resident memory in bytes; 0 where the platform offers no cheap read.
    pub memory: u64,
    pub discord: GatewayStatus,
}

/// Read-only view of gateway connectivity. The gateway adapter keeps one
/// updated from events; tests stub it.
pub trait ConnectivityProbe: Send + Sync {
    fn gateway_status(&self) -> GatewayStatus;
}

// The live probe is shared with the gateway adapter behind an Arc.
impl<P: ConnectivityProbe + ?Sized> ConnectivityProbe for std::sync::Arc<P> {
    fn gateway_status(&self) -> GatewayStatus {
        (**self).gateway_status()
    }
}

pub struct HealthService<P: ConnectivityProbe> {
    probe: P,
    started: Instant,
}

impl<P: ConnectivityProbe> HealthService<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            started: Instant::now(),
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let discord = self.probe.gateway_status();
        HealthSnapshot {
            status: if discord.connected { "ok" } else { "degraded" },
            timestamp: Utc::now(),
            uptime: self.started.elapsed().as_secs(),
            memory: process_memory_bytes(),
            discord,
        }
    }
}

/// Resident set size from /proc; no extra crate carries its weight for one
/// number on one platform.
fn process_memory_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(statm) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(resident_pages) = statm
                .split_whitespace()
                .nth(1)
                .and_then(|v| v.parse::<u64>().ok())
            {
                return resident_pages * 4096;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProbe {
        connected: bool,
    }

    impl ConnectivityProbe for StubProbe {
        fn gateway_status(&self) -> GatewayStatus {
            GatewayStatus {
                connected: self.connected,
                ping: Some(42),
                guilds: 3,
                users: 120,
            }
        }
    }

    #[test]
    fn snapshot_reflects_probe_state() {
        let service = HealthService::new(StubProbe { connected: true });
        let snapshot = service.snapshot();

        assert_eq!(snapshot.status, "ok");
        assert!(snapshot.discord.connected);
        assert_eq!(snapshot.discord.ping, Some(42));
        assert_eq!(snapshot.discord.guilds, 3);
    }

    #[test]
    fn disconnected_gateway_degrades_status() {
        let service = HealthService::new(StubProbe { connected: false });
        assert_eq!(service.snapshot().status, "degraded");
    }

    #[test]
    fn snapshot_serializes_with_expected_shape() {
        let service = HealthService::new(StubProbe { connected: true });
        let json = serde_json::to_value(service.snapshot()).unwrap();

        assert!(json.get("status").is_some());
        assert!(json.get("timestamp").is_some());
        assert!(json.get("uptime").is_some());
        assert!(json.get("memory").is_some());
        assert_eq!(json["discord"]["guilds"], 3);
        assert_eq!(json["discord"]["users"], 120);
    }
}
