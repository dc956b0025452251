//! Operation surface exposed to the host
//!
//! Each operation takes the host's settings map and returns an
//! [`ActionResponse`]. Operations are self-contained: anything that needs the
//! playlist fetches and parses it again, so no channel list is carried between
//! calls. Every failure is turned into an error response rather than returned.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::checker::Checker;
use crate::config::{CheckerConfig, Settings, SettingsMap};
use crate::error::{CheckerError, ErrorKind, Result};
use crate::groups::{self, Preview};
use crate::m3u_parser::{download_and_parse, HttpFetcher, PlaylistFetcher};
use crate::models::{GroupIndex, ResultSummary};
use crate::prober::{FfprobeProber, StreamProber};
use crate::report;
use crate::store::{self, ResultStore};

/// Named operations the host can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadPlaylist,
    PreviewCheck,
    CheckStreams,
    ViewTable,
    GetResults,
    ExportResults,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::LoadPlaylist,
        Action::PreviewCheck,
        Action::CheckStreams,
        Action::ViewTable,
        Action::GetResults,
        Action::ExportResults,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Action::LoadPlaylist => "load_playlist",
            Action::PreviewCheck => "preview_check",
            Action::CheckStreams => "check_streams",
            Action::ViewTable => "view_table",
            Action::GetResults => "get_results",
            Action::ExportResults => "export_results",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    /// Prefix put in front of network and internal error messages
    fn error_context(&self, kind: ErrorKind) -> &'static str {
        match (self, kind) {
            (Action::LoadPlaylist, _) => "Failed to load playlist",
            (Action::PreviewCheck, ErrorKind::Network) => "Error loading playlist for preview",
            (Action::PreviewCheck, _) => "Error generating preview",
            (Action::CheckStreams, ErrorKind::Network) => "Network error loading M3U playlist",
            (Action::CheckStreams, _) => "Error during stream check",
            (Action::ViewTable, _) => "Error creating table",
            (Action::GetResults, _) => "Error reading results",
            (Action::ExportResults, _) => "Error exporting results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

/// Structured reply to the host: status, message and optional extra fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub status: ActionStatus,
    pub message: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!("Dropping response field '{}': {}", key, e);
            Value::Null
        });
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }

    fn from_error(action: Action, err: &CheckerError) -> Self {
        match err.kind() {
            ErrorKind::Configuration | ErrorKind::Persistence => Self::error(err.to_string()),
            kind => Self::error(format!("{}: {}", action.error_context(kind), err)),
        }
    }
}

pub struct Plugin {
    config: CheckerConfig,
    fetcher: Box<dyn PlaylistFetcher>,
    prober: Box<dyn StreamProber>,
}

impl Plugin {
    pub const NAME: &'static str = "IPTV Checker";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// Plugin wired to HTTP fetching and the ffprobe CLI
    pub fn new(config: CheckerConfig) -> Self {
        let fetcher = HttpFetcher::new(&config.user_agent, Duration::from_secs(config.fetch_timeout_secs));
        let prober = FfprobeProber::from_config(&config);
        Self::with_components(config, Box::new(fetcher), Box::new(prober))
    }

    pub fn with_components(
        config: CheckerConfig,
        fetcher: Box<dyn PlaylistFetcher>,
        prober: Box<dyn StreamProber>,
    ) -> Self {
        tracing::info!("{} v{} initialized", Self::NAME, Self::VERSION);
        Self { config, fetcher, prober }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    fn result_store(&self) -> ResultStore {
        ResultStore::new(self.config.results_file())
    }

    /// Dispatch an operation by name
    pub fn run(&self, action: &str, settings: &SettingsMap) -> ActionResponse {
        tracing::info!("IPTV Checker run called with action: {}", action);

        match Action::from_id(action) {
            Some(action) => self.dispatch(action, settings),
            None => {
                let available: Vec<&str> = Action::ALL.iter().map(|a| a.id()).collect();
                ActionResponse::error(format!("Unknown action: {}", action))
                    .with("available_actions", available)
            }
        }
    }

    pub fn dispatch(&self, action: Action, settings: &SettingsMap) -> ActionResponse {
        let result = match action {
            Action::LoadPlaylist => self.load_playlist(settings),
            Action::PreviewCheck => self.preview_check(settings),
            Action::CheckStreams => self.check_streams(settings),
            Action::ViewTable => self.view_table(settings),
            Action::GetResults => self.get_results(settings),
            Action::ExportResults => self.export_results(settings),
        };

        result.unwrap_or_else(|e| {
            tracing::error!("{} failed: {}", action.id(), e);
            ActionResponse::from_error(action, &e)
        })
    }

    /// Fetch the playlist, then record and report its groups
    pub fn load_playlist(&self, settings: &SettingsMap) -> Result<ActionResponse> {
        let settings = Settings::from_map(settings)?;
        let channels = download_and_parse(self.fetcher.as_ref(), &settings.m3u_url)?;
        let groups = groups::available_groups(&channels);

        let index = GroupIndex {
            groups: groups.clone(),
            channels_count: channels.len(),
        };
        if let Err(e) = store::save_group_index(&self.config.groups_file(), &index) {
            tracing::warn!("Could not save groups to file: {}", e);
        }

        let message = format!(
            "Loaded {} channels from {} groups.\n\nAvailable groups:\n{}\n\n\
             Copy the groups you want to check into the 'Groups to Check' setting (comma-separated), \
             or leave empty to check all groups.",
            channels.len(),
            groups.len(),
            groups.join(", ")
        );

        Ok(ActionResponse::success(message)
            .with("channels", channels.len())
            .with("groups", groups.len()))
    }

    /// Describe what a check would cover without probing anything
    ///
    /// When the playlist cannot be fetched, the groups recorded by the last
    /// `load_playlist` are listed alongside the error.
    pub fn preview_check(&self, settings: &SettingsMap) -> Result<ActionResponse> {
        let settings = Settings::from_map(settings)?;
        let channels = match download_and_parse(self.fetcher.as_ref(), &settings.m3u_url) {
            Ok(channels) => channels,
            Err(e) => {
                let Some(index) = store::load_group_index(&self.config.groups_file()) else {
                    return Err(e);
                };
                tracing::error!("preview_check failed: {}", e);
                let mut response = ActionResponse::from_error(Action::PreviewCheck, &e);
                response.message = format!(
                    "{}\n\nGroups from the last loaded playlist ({} channels): {}",
                    response.message,
                    index.channels_count,
                    index.groups.join(", ")
                );
                return Ok(response.with("known_groups", &index.groups));
            }
        };
        let selected = groups::parse_selected_groups(&settings.selected_groups);
        let preview = groups::preview(&channels, &selected, settings.timeout_secs);

        Ok(ActionResponse::success(render_preview(&preview))
            .with("channels", preview.total_to_check)
            .with("missing_groups", &preview.missing_groups)
            .with("estimated_minutes", preview.estimated_minutes))
    }

    /// Probe the selected channels and persist the results
    pub fn check_streams(&self, settings: &SettingsMap) -> Result<ActionResponse> {
        let settings = Settings::from_map(settings)?;
        let all_channels = download_and_parse(self.fetcher.as_ref(), &settings.m3u_url)?;
        let selected = groups::parse_selected_groups(&settings.selected_groups);
        let channels = groups::filter_by_groups(&all_channels, &selected);

        let group_info = if selected.is_empty() {
            format!("all {} groups", groups::available_groups(&all_channels).len())
        } else {
            let available = groups::available_groups(&all_channels);
            if channels.is_empty() {
                return Err(CheckerError::NoMatchingGroups { selected, available });
            }
            let missing: Vec<&str> = selected
                .iter()
                .filter(|g| !available.contains(*g))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                tracing::warn!("Groups not found: {}", missing.join(", "));
            }
            format!("{} selected groups ({})", selected.len(), selected.join(", "))
        };

        let count = channels.len();
        tracing::info!("Will check {} channels in {}", count, group_info);

        let checker = Checker::new(self.prober.as_ref(), self.result_store());
        let summary = match checker.run_check(channels, settings.timeout_secs) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Error during stream checking: {}", e);
                return Ok(ActionResponse::error(format!("Error during stream check: {}", e))
                    .with("results", ResultSummary::empty()));
            }
        };

        let message = format!(
            "Completed checking {} channels in {}.\n\nResults:\n\
             • Alive: {}\n• Dead: {}\n• Low framerate (<30fps): {}\n• Mislabeled resolution: {}\n\n\
             Use 'View Last Results' for detailed breakdown or 'Export Results to CSV' to download the data.",
            count, group_info, summary.alive, summary.dead, summary.low_framerate, summary.mislabeled
        );

        Ok(ActionResponse::success(message).with("results", summary))
    }

    pub fn view_table(&self, _settings: &SettingsMap) -> Result<ActionResponse> {
        let doc = self.result_store().load()?;
        if doc.channels.is_empty() {
            return Ok(ActionResponse::error("No channel data found in results."));
        }
        Ok(ActionResponse::success(report::render_table(&doc)))
    }

    pub fn get_results(&self, _settings: &SettingsMap) -> Result<ActionResponse> {
        let doc = self.result_store().load()?;
        Ok(ActionResponse::success(report::render_summary(&doc)).with("results", &doc.summary))
    }

    pub fn export_results(&self, _settings: &SettingsMap) -> Result<ActionResponse> {
        let doc = match self.result_store().load() {
            Err(CheckerError::NoResults) => {
                return Ok(ActionResponse::error("No results to export. Run 'Check Streams' first."));
            }
            other => other?,
        };

        let path = report::export_csv(&doc, &self.config.exports_dir())?;
        tracing::info!("Exported {} channels to {}", doc.channels.len(), path.display());

        Ok(ActionResponse::success(format!("Results exported to {}", path.display()))
            .with("file_path", path.to_string_lossy())
            .with("total_channels", doc.channels.len()))
    }
}

fn render_preview(preview: &Preview) -> String {
    let mut parts = vec!["Preview for 'Check Streams' action:".to_string()];

    let per_group = |parts: &mut Vec<String>| {
        parts.push("• Channels per group:".to_string());
        for (group, count) in &preview.group_counts {
            parts.push(format!("  - {}: {} channels", group, count));
        }
    };

    if preview.all_groups {
        parts.push(format!("• Will check: {} channels (all channels)", preview.total_to_check));
        parts.push(format!("• From groups: all {} groups", preview.available_groups.len()));
        per_group(&mut parts);
    } else {
        if preview.total_to_check > 0 {
            parts.push(format!("• Will check: {} channels", preview.total_to_check));
            parts.push(format!(
                "• From groups: {} ({} groups)",
                preview.matched_groups.join(", "),
                preview.matched_groups.len()
            ));
            per_group(&mut parts);
        } else {
            parts.push("• Will check: 0 channels (no matches found)".to_string());
        }

        if !preview.missing_groups.is_empty() {
            parts.push(format!("• Groups not found: {}", preview.missing_groups.join(", ")));
            parts.push(format!("• Available groups: {}", preview.available_groups.join(", ")));
        }
    }

    parts.push(format!("• Estimated time: {:.1} minutes", preview.estimated_minutes));
    parts.push(format!("• Timeout per stream: {} seconds", preview.timeout_secs));
    parts.join("\n")
}
