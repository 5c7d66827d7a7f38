use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use basalt::{config, uci};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the engine configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default_filter),
    );

    let config = config::load(&args.config)?;
    log::info!(
        "basalt starting: hash {} MB, max depth {}",
        config.search.tt_mb,
        config.search.max_depth
    );

    uci::run(config);
    Ok(())
}
