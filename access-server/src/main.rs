//! access-server: phone OTP sign-in and route access checks
//!
//! Usage:
//!   access-server [config.toml]
//!   access-server token <user-id> [config.toml]   mint a session token for local testing

use access_server::{AccessServer, Config};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("token") {
        let user_id: Uuid = args
            .get(1)
            .ok_or_else(|| anyhow::anyhow!("usage: access-server token <user-id> [config.toml]"))?
            .parse()?;
        let config = Config::load(args.get(2).map(Path::new))?;
        println!("{}", config.gate.jwt().create_token(user_id)?);
        return Ok(());
    }

    // Load configuration
    let config_path = args.first().map(Path::new);
    let config = Config::load(config_path)?;

    init_logging(&config);
    info!("Starting access-server v{}", env!("CARGO_PKG_VERSION"));

    match config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No config file specified, using defaults and environment"),
    }

    if config.gate.uses_development_secret() {
        warn!("Using the development JWT secret; set ACCESS__GATE__JWT_SECRET in production");
    }

    #[cfg(feature = "insecure-code-echo")]
    warn!("OTP codes are echoed in send responses (insecure-code-echo)");

    let server = AccessServer::new(config).await?;
    server.run().await?;

    Ok(())
}
