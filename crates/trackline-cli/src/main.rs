use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;

use commands::replay::ReplayOptions;
use commands::BatchArgs;
use config::{load_config, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "trackline", version, about = "Replay and filter geotagged event timelines")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.trackline",
        help = "Working directory (holds trackline.yaml and logs/)"
    )]
    root: PathBuf,

    #[arg(long, help = "Config file (defaults to <root>/trackline.yaml)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate the config file")]
    Validate,
    #[command(about = "Print the filtered, time-ordered events of a batch")]
    Inspect {
        #[command(flatten)]
        batch: BatchArgs,
        #[arg(long, help = "Print the snapshot as JSON")]
        json: bool,
    },
    #[command(about = "Play a batch back and print every snapshot")]
    Replay {
        #[command(flatten)]
        batch: BatchArgs,
        #[arg(long, help = "Playback speed multiplier")]
        speed: Option<f64>,
        #[arg(long, help = "Stop after this many ticks")]
        max_ticks: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if cli.root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.root = PathBuf::from(home).join(cli.root.strip_prefix("~").unwrap_or(&cli.root));
        }
    }

    let log_dir = cli.root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "trackline.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(CONFIG_FILE));
    let config = load_config(&config_path)?;

    match command {
        Commands::Validate => {
            println!(
                "Config valid. tick {}ms, speeds {:?} (default {}x), search debounce {}ms, backend {}.",
                config.engine.tick_interval_ms,
                config.engine.speed_options,
                config.engine.default_speed,
                config.engine.search_debounce_ms,
                config.provider.base_url
            );
        }
        Commands::Inspect { batch, json } => {
            commands::inspect::run(&config, &batch, json).await?;
        }
        Commands::Replay {
            batch,
            speed,
            max_ticks,
        } => {
            commands::replay::run(&config, &batch, ReplayOptions { speed, max_ticks }).await?;
        }
    }

    Ok(())
}
