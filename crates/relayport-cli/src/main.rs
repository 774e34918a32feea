mod cli;
mod session;

use relayport_common::ConfigError;
use relayport_config::RelayportConfig;
use tracing_subscriber::EnvFilter;

fn load_config(path: Option<&str>) -> Result<RelayportConfig, ConfigError> {
    match path {
        Some(path) => relayport_config::load_config_from(std::path::Path::new(path)),
        None => relayport_config::load_config(),
    }
}

#[tokio::main]
async fn main() {
    let args = cli::parse();

    // Config is read first so its [logging] level can seed the filter.
    let loaded = load_config(args.config.as_deref());
    let config_level = loaded
        .as_ref()
        .map(|config| config.logging.level.as_filter())
        .unwrap_or("info");

    let log_directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| format!("relayport={config_level}"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| "relayport=info".parse().unwrap()),
            ),
        )
        .init();

    tracing::info!("relayport v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => config,
        Err(e) if args.config.is_some() => {
            tracing::error!("Config load failed: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            RelayportConfig::default()
        }
    };
    tracing::debug!("Config: {}", relayport_config::config_to_json(&config));

    let plan = session::SessionPlan::resolve(&args, &config);
    if let Err(e) = session::run(plan).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}
