use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trapflow_api::config::Settings;
use trapflow_api::notifier::AlertmanagerClient;
use trapflow_api::{AppState, create_app, load_mib_registry};
use trapflow_core::MibStore;
use trapflow_core::rules::load_rule_dir;

#[derive(Parser)]
#[command(
    name = "trapflow",
    version,
    about = "Correlates SNMP trap events against rule sets and forwards alerts to Alertmanager"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the SNMP trap handler
    Serve(Settings),
    /// Pre-process JSON MIB files into a single cache file
    MibPreprocess {
        /// Path to the MIBs directory.
        #[arg(long, env = "TRAPFLOW_MIBS_DIR")]
        mibs_dir: String,
        /// Path the cache file is written to.
        #[arg(long, env = "TRAPFLOW_CACHE_FILE")]
        cache_file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(settings) => serve(settings).await,
        Command::MibPreprocess { mibs_dir, cache_file } => preprocess(&mibs_dir, &cache_file),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trapflow=debug,info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    init_tracing(settings.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Trapflow SNMP handler");

    let groups = load_rule_dir(Path::new(&settings.config_dir))?;
    info!(groups = groups.len(), dir = %settings.config_dir, "Loaded rule groups");

    let registry = load_mib_registry(&settings)?;
    info!(entries = registry.len(), "Loaded MIB registry");

    let user_agent = format!("trapflow/{}", env!("CARGO_PKG_VERSION"));
    let notifier = Arc::new(AlertmanagerClient::new(&settings, &user_agent)?);
    let state = Arc::new(AppState::new(&settings, groups, registry, notifier)?);

    let app = create_app(state, Duration::from_secs(settings.am_timeout));
    let listener = tokio::net::TcpListener::bind(&settings.listen_address).await?;
    info!(address = %settings.listen_address, "HTTP handler listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn preprocess(mibs_dir: &str, cache_file: &str) -> anyhow::Result<()> {
    init_tracing(false);
    info!(mibs_dir, cache_file, "Pre-processing MIBs");

    let mut store = MibStore::new();
    store.load_json_dir(Path::new(mibs_dir))?;
    store.write_cache_file(Path::new(cache_file))?;

    info!(entries = store.entries.len(), "Wrote MIB cache");
    Ok(())
}
