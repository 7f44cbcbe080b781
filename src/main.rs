//! chat-tts-rs: reads incoming chat messages aloud.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_tts::api::{self, ApiState};
use chat_tts::config::Config;
use chat_tts::host;
use chat_tts::plugin::Plugin;
use chat_tts::prefs::YamlPreferenceStore;

#[derive(Parser, Debug)]
#[command(name = "chat-tts-rs", about = "Speak incoming chat messages")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read JSON events from stdin instead of serving HTTP
    #[arg(long)]
    stdin: bool,

    /// Switch to this speech profile at startup
    #[arg(short, long)]
    profile: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries host replies in --stdin mode
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("chat-tts-rs starting");

    let config = Config::load(args.config.as_deref());
    info!("Config loaded: {:?}", config);

    let store = YamlPreferenceStore::new(config.preferences.resolved_path());
    let mut plugin = Plugin::load(Box::new(store), config.sink.mode);
    if let Some(profile) = &args.profile {
        plugin.select_profile(profile);
    }

    if args.stdin {
        let result = host::run_stdio(&mut plugin).await;
        plugin.unload();
        result?;
        return Ok(());
    }

    if !config.api.enabled {
        info!("Host API disabled and --stdin not given, nothing to do");
        plugin.unload();
        return Ok(());
    }

    let state = ApiState::new(plugin);
    let result = api::serve_api(state.clone(), config.api.port).await;

    state
        .plugin
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .unload();

    result?;
    Ok(())
}
