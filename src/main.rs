//! Crowdin Sync
//!
//! Entry point for the sync endpoint and the codec helpers used to inspect what
//! Crowdin receives for a document.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crowdin_sync::cli::{Args, Commands};
use crowdin_sync::codec::HtmlCodec;
use crowdin_sync::config::Config;
use crowdin_sync::document::Document;
use crowdin_sync::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env()?;

    match args.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            info!(
                "Starting Crowdin Sync for project {} ({:?} store)",
                config.vendor.project_id,
                config.store.kind
            );
            let state = Arc::new(AppState::from_config(&config)?);
            server::serve(&config, state).await?;
        }

        Commands::Encode { input, output } => {
            let content = std::fs::read_to_string(&input)?;
            let document: Document = serde_json::from_str(&content)?;
            let markup = HtmlCodec::from_config(&config.codec).encode(&document)?;
            write_output(output.as_ref(), &markup)?;
        }

        Commands::Decode { input, output } => {
            let markup = std::fs::read_to_string(&input)?;
            let document = HtmlCodec::from_config(&config.codec).decode(&markup)?;
            write_output(output.as_ref(), &serde_json::to_string_pretty(&document)?)?;
        }

        Commands::InitConfig { output } => {
            if output.exists() {
                anyhow::bail!("Refusing to overwrite {}", output.display());
            }
            Config::default().save_to_file(&output)?;
            info!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".crowdin-sync").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "crowdin-sync.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so encode/decode can print to stdout
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("crowdin-sync.log").display()
    );

    Ok(())
}
