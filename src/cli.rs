use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use iptv_checker::{Action, SettingsMap};

#[derive(Parser)]
#[command(name = "iptv-checker")]
#[command(about = "Check IPTV stream status and analyze stream quality")]
#[command(version)]
pub struct Cli {
    /// Directory holding results, the group index and CSV exports
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// ffprobe binary name or path
    #[arg(long, global = true)]
    pub ffprobe: Option<String>,

    /// Print the full response as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the playlist and list its groups
    Load(PlaylistArgs),
    /// Show what a check would cover without probing
    Preview(PlaylistArgs),
    /// Probe every selected stream and store the results
    Check(PlaylistArgs),
    /// Show the last results as a table
    Table,
    /// Show a summary of the last results
    Results,
    /// Export the last results to CSV
    Export,
}

#[derive(Args)]
pub struct PlaylistArgs {
    /// M3U/M3U8 playlist URL (http or https)
    #[arg(long, env = "IPTV_CHECKER_M3U_URL")]
    pub m3u_url: String,

    /// Per-stream timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Comma-separated groups to check; empty checks all groups
    #[arg(long, default_value = "")]
    pub groups: String,
}

impl PlaylistArgs {
    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert("m3u_url".to_string(), json!(self.m3u_url));
        map.insert("timeout".to_string(), json!(self.timeout));
        map.insert("selected_groups".to_string(), json!(self.groups));
        map
    }
}

impl Commands {
    /// The operation to run and the settings map to hand it
    pub fn to_action(&self) -> (Action, SettingsMap) {
        match self {
            Commands::Load(args) => (Action::LoadPlaylist, args.settings()),
            Commands::Preview(args) => (Action::PreviewCheck, args.settings()),
            Commands::Check(args) => (Action::CheckStreams, args.settings()),
            Commands::Table => (Action::ViewTable, SettingsMap::new()),
            Commands::Results => (Action::GetResults, SettingsMap::new()),
            Commands::Export => (Action::ExportResults, SettingsMap::new()),
        }
    }
}
