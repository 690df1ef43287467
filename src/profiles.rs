//! Built-in measurement profiles and the simulated server catalog.
//!
//! A profile bundles a use-case label, a connection-type tag and default
//! duration/interval settings. Target throughput is selected through an
//! explicit per-category table rather than by matching on profile ids.

use crate::model::{CycleInterval, RunMode};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionType {
    Optics,
    Dsl,
    Wifi,
    FiveG,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileCategory {
    Gaming,
    Streaming,
    Office,
    General,
    Diagnostic,
}

impl ProfileCategory {
    /// Download target for the synthesizer, in Mb/s.
    pub fn download_target_mbps(self) -> f64 {
        match self {
            ProfileCategory::Streaming => 150.0,
            ProfileCategory::Gaming => 60.0,
            ProfileCategory::General => 48.0,
            ProfileCategory::Office | ProfileCategory::Diagnostic => 55.0,
        }
    }

    /// Upload target for the synthesizer, in Mb/s.
    pub fn upload_target_mbps(self) -> f64 {
        match self {
            ProfileCategory::Office => 40.0,
            ProfileCategory::Streaming => 50.0,
            _ => 32.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Profile {
    pub id: &'static str,
    pub mode: RunMode,
    pub name: &'static str,
    pub category: ProfileCategory,
    pub connection: ConnectionType,
    pub description: &'static str,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub interval: CycleInterval,
}

pub const PROFILES: &[Profile] = &[
    Profile {
        id: "quick-gamer",
        mode: RunMode::Quick,
        name: "Online gaming",
        category: ProfileCategory::Gaming,
        connection: ConnectionType::Optics,
        description: "Prioritizes low latency and stable jitter; lag check.",
        duration: Duration::from_secs(30),
        interval: CycleInterval::Continuous,
    },
    Profile {
        id: "quick-streaming",
        mode: RunMode::Quick,
        name: "Streaming 4K/8K",
        category: ProfileCategory::Streaming,
        connection: ConnectionType::FiveG,
        description: "Prioritizes raw download capacity for high resolutions.",
        duration: Duration::from_secs(30),
        interval: CycleInterval::Continuous,
    },
    Profile {
        id: "quick-office",
        mode: RunMode::Quick,
        name: "Home office / calls",
        category: ProfileCategory::Office,
        connection: ConnectionType::Dsl,
        description: "Prioritizes stable upload for video conferencing.",
        duration: Duration::from_secs(30),
        interval: CycleInterval::Continuous,
    },
    Profile {
        id: "quick-general",
        mode: RunMode::Quick,
        name: "Everyday browsing",
        category: ProfileCategory::General,
        connection: ConnectionType::Wifi,
        description: "Balanced test for common household use.",
        duration: Duration::from_secs(30),
        interval: CycleInterval::Continuous,
    },
    Profile {
        id: "monitor-stability",
        mode: RunMode::Monitoring,
        name: "Stability analysis (4h)",
        category: ProfileCategory::Diagnostic,
        connection: ConnectionType::Dsl,
        description: "Long-term monitoring to catch dropouts and drift.",
        duration: Duration::from_secs(4 * 60 * 60),
        interval: CycleInterval::Every(Duration::from_secs(15 * 60)),
    },
    Profile {
        id: "monitor-infra",
        mode: RunMode::Monitoring,
        name: "Infrastructure test (8h)",
        category: ProfileCategory::Diagnostic,
        connection: ConnectionType::Optics,
        description: "Deep test of the physical layer across working hours.",
        duration: Duration::from_secs(8 * 60 * 60),
        interval: CycleInterval::Every(Duration::from_secs(30 * 60)),
    },
    Profile {
        id: "monitor-cellular",
        mode: RunMode::Monitoring,
        name: "5G / LTE monitoring",
        category: ProfileCategory::Diagnostic,
        connection: ConnectionType::FiveG,
        description: "Tracks interference and load over time (peak vs. idle).",
        duration: Duration::from_secs(60 * 60),
        interval: CycleInterval::Every(Duration::from_secs(5 * 60)),
    },
    Profile {
        id: "monitor-manual",
        mode: RunMode::Monitoring,
        name: "Service / manual",
        category: ProfileCategory::Diagnostic,
        connection: ConnectionType::Manual,
        description: "Custom parameters set by a technician.",
        duration: Duration::from_secs(60 * 60),
        interval: CycleInterval::Every(Duration::from_secs(10 * 60)),
    },
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServerOption {
    pub id: &'static str,
    pub name: &'static str,
    pub location: &'static str,
    pub distance_km: u32,
}

pub const SERVERS: &[ServerOption] = &[
    ServerOption {
        id: "auto",
        name: "AUTO (multi-server)",
        location: "Global / local best",
        distance_km: 0,
    },
    ServerOption {
        id: "isp-backbone",
        name: "ISP backbone",
        location: "Prague",
        distance_km: 5,
    },
    ServerOption {
        id: "isp-aggregation",
        name: "Regional aggregation",
        location: "Brno",
        distance_km: 205,
    },
    ServerOption {
        id: "ix-peering",
        name: "IX peering point",
        location: "Prague",
        distance_km: 12,
    },
    ServerOption {
        id: "glb-google",
        name: "Google Public DNS",
        location: "Global anycast",
        distance_km: 0,
    },
    ServerOption {
        id: "glb-cloudflare",
        name: "Cloudflare",
        location: "Global CDN",
        distance_km: 0,
    },
    ServerOption {
        id: "de-aws",
        name: "AWS Frankfurt",
        location: "Frankfurt, DE",
        distance_km: 510,
    },
    ServerOption {
        id: "sk-telekom",
        name: "Slovak Telekom",
        location: "Bratislava, SK",
        distance_km: 320,
    },
];

pub fn find(id: &str) -> Option<&'static Profile> {
    PROFILES.iter().find(|p| p.id == id)
}

pub fn find_server(id: &str) -> Option<&'static ServerOption> {
    SERVERS.iter().find(|s| s.id == id)
}

pub fn for_mode(mode: RunMode) -> impl Iterator<Item = &'static Profile> {
    PROFILES.iter().filter(move |p| p.mode == mode)
}

/// Default profile a mode switch reseeds configuration from.
pub fn default_for(mode: RunMode) -> &'static Profile {
    let id = match mode {
        RunMode::Quick => "quick-general",
        RunMode::Monitoring => "monitor-stability",
    };
    find(id).unwrap_or(&PROFILES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_targets_per_category() {
        assert_eq!(ProfileCategory::Streaming.download_target_mbps(), 150.0);
        assert_eq!(ProfileCategory::Gaming.download_target_mbps(), 60.0);
        assert_eq!(ProfileCategory::General.download_target_mbps(), 48.0);
        assert_eq!(ProfileCategory::Office.download_target_mbps(), 55.0);
        assert_eq!(ProfileCategory::Diagnostic.download_target_mbps(), 55.0);
    }

    #[test]
    fn upload_targets_per_category() {
        assert_eq!(ProfileCategory::Office.upload_target_mbps(), 40.0);
        assert_eq!(ProfileCategory::Streaming.upload_target_mbps(), 50.0);
        assert_eq!(ProfileCategory::Gaming.upload_target_mbps(), 32.0);
        assert_eq!(ProfileCategory::Diagnostic.upload_target_mbps(), 32.0);
    }

    #[test]
    fn defaults_match_their_mode() {
        assert_eq!(default_for(RunMode::Quick).id, "quick-general");
        assert_eq!(default_for(RunMode::Monitoring).id, "monitor-stability");
        assert!(for_mode(RunMode::Quick).all(|p| p.mode == RunMode::Quick));
        assert_eq!(for_mode(RunMode::Monitoring).count(), 4);
    }

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<&str> = PROFILES.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), PROFILES.len());
    }
}
