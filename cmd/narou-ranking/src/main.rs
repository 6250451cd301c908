//! narou-ranking/cmd/narou-ranking/src/main.rs
//!
//! Command-line consumer of the ranking pipeline. Settings are loaded
//! first, then logging, then the adapters and services are wired up and the
//! chosen command prints its result as JSON on stdout.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

mod app;
mod commands;
mod logging;

use app::App;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "narou-ranking", version, about = "Filtered rankings from the novel API", propagate_version = true)]
pub struct Cli {
    /// Settings file. Defaults to `narou-ranking.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = configs::Settings::load(cli.config.as_deref()).context("loading settings")?;
    logging::init(&settings.log, cli.verbose)?;

    let app = App::new(settings)?;
    let output = match cli.command {
        Command::Ranking(args) => commands::ranking::run(&app, args).await?,
        Command::Native(args) => commands::native::run(&app, args).await?,
        Command::History(args) => commands::history::run(&app, args).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
