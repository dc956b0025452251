//! Data models for the IPTV checker

use serde::{Deserialize, Serialize};

/// Group assigned to entries whose tag line carries no `group-title`
pub const NO_GROUP: &str = "No Group";

/// One playlist entry, in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub logo: String,
    pub url: String,
}

/// Liveness verdict for a probed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StreamStatus {
    Alive,
    #[default]
    Dead,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Alive => "Alive",
            StreamStatus::Dead => "Dead",
        }
    }
}

/// Normalized result of probing one stream.
///
/// When `status` is `Dead` only `error` carries meaning; the media fields are
/// left empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamInfo {
    pub status: StreamStatus,
    pub error: String,
    pub codec: String,
    pub resolution: String,
    pub framerate: String,
    pub framerate_num: f64,
    pub bitrate: String,
}

impl StreamInfo {
    pub fn dead(error: impl Into<String>) -> Self {
        Self {
            status: StreamStatus::Dead,
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == StreamStatus::Alive
    }
}

/// A playlist entry merged with its probe result and quality flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedChannel {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub logo: String,
    pub url: String,
    pub status: StreamStatus,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub codec: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub framerate: String,
    #[serde(default)]
    pub bitrate: String,
    #[serde(default)]
    pub low_framerate: bool,
    #[serde(default)]
    pub mislabeled: bool,
    #[serde(default)]
    pub checked_at: String,
}

impl CheckedChannel {
    pub fn new(
        entry: ChannelEntry,
        info: StreamInfo,
        low_framerate: bool,
        mislabeled: bool,
        checked_at: String,
    ) -> Self {
        Self {
            name: entry.name,
            group: entry.group,
            logo: entry.logo,
            url: entry.url,
            status: info.status,
            error: info.error,
            codec: info.codec,
            resolution: info.resolution,
            framerate: info.framerate,
            bitrate: info.bitrate,
            low_framerate,
            mislabeled,
            checked_at,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.status == StreamStatus::Dead
    }
}

/// Aggregate counts for one check run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResultSummary {
    pub total: usize,
    pub alive: usize,
    pub dead: usize,
    pub low_framerate: usize,
    pub mislabeled: usize,
    #[serde(default)]
    pub checked_at: String,
}

impl ResultSummary {
    /// All-zero summary reported when a run could not complete
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The single persisted artifact of the most recent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResultDocument {
    #[serde(default)]
    pub channels: Vec<CheckedChannel>,
    #[serde(default)]
    pub summary: ResultSummary,
}

/// Groups discovered by the last playlist load (persisted separately)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GroupIndex {
    pub groups: Vec<String>,
    pub channels_count: usize,
}

/// Current local time as an ISO-8601 timestamp with microseconds
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
