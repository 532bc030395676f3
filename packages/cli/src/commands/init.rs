use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Operations applied per animation frame
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Disable the background commit loop
    #[arg(long)]
    pub no_background: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Trellis config...".bright_blue().bold());

    let mut config = Config::default();
    if let Some(chunk_size) = args.chunk_size {
        config.root.scheduler.chunk_size = chunk_size.max(1);
    }
    config.root.background = !args.no_background;

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Config written!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: trellis demo");
    println!("  2. Run: trellis shuffle --items 500");

    Ok(())
}
