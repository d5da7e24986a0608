//! Runtime configuration for the Trapflow handler.
//!
//! Every knob is a CLI flag with an environment fallback, mirroring how the
//! service is deployed: flags in systemd units, env vars in containers.

use clap::Args;

/// Settings for the `serve` subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Address the HTTP handler listens on.
    #[arg(long, env = "TRAPFLOW_LISTEN_ADDRESS", default_value = "127.0.0.1:8080")]
    pub listen_address: String,

    /// Base URL of the downstream Alertmanager.
    #[arg(long, env = "TRAPFLOW_AM_URL", default_value = "http://localhost:9093")]
    pub am_url: String,

    /// Request timeout in seconds, applied to inbound handling and to
    /// Alertmanager calls.
    #[arg(long, env = "TRAPFLOW_AM_TIMEOUT", default_value_t = 10)]
    pub am_timeout: u64,

    /// Directory of YAML rule files, loaded once at startup.
    #[arg(long, env = "TRAPFLOW_CONFIG_DIR")]
    pub config_dir: String,

    /// Directory of JSON MIB files. Ignored when a cache file is given.
    #[arg(long, env = "TRAPFLOW_MIBS_DIR", default_value = "")]
    pub mibs_dir: String,

    /// Pre-built MIB cache file, or "none" to load from the MIBs directory.
    #[arg(long, env = "TRAPFLOW_CACHE_FILE", default_value = "none")]
    pub cache_file: String,

    /// Pace deliveries to Alertmanager instead of posting in one shot.
    #[arg(
        long,
        env = "TRAPFLOW_THROTTLE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub throttle: bool,

    /// Estimated milliseconds one Alertmanager post takes.
    #[arg(long, env = "TRAPFLOW_POST_TIME", default_value_t = 300)]
    pub post_time: u64,

    /// Milliseconds to sleep between throttled posts.
    #[arg(long, env = "TRAPFLOW_SLEEP_TIME", default_value_t = 100)]
    pub sleep_time: u64,

    /// Total milliseconds a throttled batch may spend sending.
    #[arg(long, env = "TRAPFLOW_SEND_TIME", default_value_t = 30000)]
    pub send_time: u64,

    /// Forward a synthetic alert for traps no rule recognized.
    #[arg(long, env = "TRAPFLOW_FORWARD_UNKNOWN", default_value_t = false)]
    pub forward_unknown: bool,

    /// Log unknown traps at info instead of debug.
    #[arg(long, env = "TRAPFLOW_LOG_UNKNOWN", default_value_t = false)]
    pub log_unknown: bool,

    /// Log generated alerts instead of posting them to Alertmanager.
    #[arg(long, env = "TRAPFLOW_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "TRAPFLOW_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}
