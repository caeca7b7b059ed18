use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recall::cli::{self, Cli};
use recall::config::Config;
use recall::{tui, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    // Command-line overrides
    if let Some(api_url) = &cli.api_url {
        config.server.api_url = api_url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    let interactive = cli.command.is_none();
    init_logging(&config, interactive)?;

    tracing::debug!(api_url = %config.server.api_url, "Starting recall v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::new(config)?;

    if interactive {
        tui::run(&ctx).await
    } else {
        cli::run_command(&cli, &ctx).await
    }
}

/// Initialize logging. Subcommands log to stderr; the interactive dashboard
/// owns the terminal, so its logs go to a file instead.
fn init_logging(config: &Config, interactive: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if interactive {
        let path = Config::log_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
