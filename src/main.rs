//! Register backend - Main entry point

use register_backend::config::Config;
use register_backend::server;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BANNER: &str = r#"
╔══════════════════════════════════════════════════════════════╗
║                      Register Backend                        ║
║          OIDC-authenticated point-of-sale HTTP API           ║
╚══════════════════════════════════════════════════════════════╝
"#;

const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

fn setup_logging(config: &Config) {
    // RUST_LOG wins, then LOG_LEVEL, then the command-line flags.
    let mut invalid_level = None;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match std::env::var(LOG_LEVEL_ENV) {
        Ok(level) => match level.trim().parse::<tracing::Level>() {
            Ok(level) => EnvFilter::new(level.to_string()),
            Err(_) => {
                invalid_level = Some(level);
                EnvFilter::new(tracing::Level::INFO.to_string())
            }
        },
        Err(_) => EnvFilter::new(config.log_level().to_string()),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(level) = invalid_level {
        warn!(read_level = %level, "Invalid level supplied in LOG_LEVEL; defaulting to info");
    }
}

#[tokio::main]
async fn main() {
    let config = Config::parse_args();

    setup_logging(&config);

    if !config.no_banner && !config.silent {
        eprintln!("{}", BANNER);
        info!("Configuration file: {}", config.config_path.display());
        info!("Error catalog: {}", config.errors_path.display());
        info!("Listen address: {}", config.listen);
        eprintln!();
    }

    if let Err(e) = server::run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server stopped");
}
