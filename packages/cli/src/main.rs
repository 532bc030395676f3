mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{demo, init, shuffle, DemoArgs, InitArgs, ShuffleArgs};
use config::Config;
use std::path::PathBuf;
use tracing::debug;

/// Trellis CLI - drive the reconciler from the command line
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to trellis.config.json in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default trellis.config.json
    Init(InitArgs),

    /// Render demo scenarios and print the committed HTML
    Demo(DemoArgs),

    /// Benchmark keyed list shuffles
    Shuffle(ShuffleArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd, cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();
    debug!(config = ?config, "loaded config");

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Demo(args) => demo(args, &config).await,
        Command::Shuffle(args) => shuffle(args, &config),
    }
}
