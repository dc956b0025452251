//! IPTV Checker
//!
//! Parses an M3U playlist, probes every stream with ffprobe and reports dead
//! links and channels whose name claims a better resolution than they deliver.

pub mod checker;
pub mod config;
pub mod error;
pub mod groups;
pub mod m3u_parser;
pub mod models;
pub mod plugin;
pub mod prober;
pub mod quality;
pub mod report;
pub mod store;

#[cfg(test)]
mod checker_tests;

pub use checker::Checker;
pub use config::{CheckerConfig, Settings, SettingsMap};
pub use error::{CheckerError, ErrorKind};
pub use models::{ChannelEntry, CheckedChannel, ResultDocument, ResultSummary, StreamInfo, StreamStatus};
pub use plugin::{Action, ActionResponse, ActionStatus, Plugin};
pub use prober::{FfprobeProber, ProbeError, StreamProber};
