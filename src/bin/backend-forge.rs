use std::sync::Arc;

use anyhow::Result;
use backend_forge::helpers::time::{Clock, SystemClock};
use backend_forge::providers::http::UpstreamClient;
use backend_forge::providers::ProviderServices;
use backend_forge::server;
use backend_forge::utils::config_loader;
use backend_forge::utils::constants::DEFAULT_CONFIG_PATH;
use backend_forge::utils::logging;
use backend_forge::utils::logging::LogLevel;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 2. Build outbound client and provider adapters
    // -------------------------------

    let client = UpstreamClient::new(&service_config.settings.http)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = Arc::new(ProviderServices::from_config(&service_config, client, clock));

    // -------------------------------
    // 3. Serve
    // -------------------------------

    info!(config = %args.config, "service starting...");
    server::server::start(&service_config.settings, services).await
}
