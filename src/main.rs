//! IPTV Checker - command line front end
//! Finds dead streams and mislabeled resolutions in an IPTV playlist

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

use clap::Parser;
use cli::Cli;
use iptv_checker::{CheckerConfig, Plugin};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick a level from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "iptv_checker=debug".to_string()
        } else {
            "iptv_checker=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .init();

    let mut config = CheckerConfig::load();
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(ffprobe) = cli.ffprobe.clone() {
        config.ffprobe_path = ffprobe;
    }

    let plugin = Plugin::new(config);
    let (action, settings) = cli.command.to_action();
    let response = plugin.dispatch(action, &settings);

    if cli.json {
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode response: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", response.message);
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
