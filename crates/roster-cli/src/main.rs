mod cli;
mod commands;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use roster_assist::Assistant;
use roster_core::UserStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut stdout = io::stdout();
    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Settings {
            provider,
            model,
            api_key,
        } => commands::settings(provider, model, api_key, stdout)?,
        Commands::Chat => {
            let (store, assistant) = open(&cli.data)?;
            commands::chat(&store, &assistant, io::stdin().lock(), stdout).await?;
        }
        Commands::Run { text } => {
            let (store, assistant) = open(&cli.data)?;
            let reply = commands::run(&store, &assistant, &text.join(" ")).await;
            writeln!(stdout, "{}", reply)?;
        }
        Commands::List { search, csv } => {
            let (store, _) = open(&cli.data)?;
            commands::list(&store, search.as_deref(), csv.as_deref(), stdout)?;
        }
        Commands::Ask { text } => {
            let (_, assistant) = open(&cli.data)?;
            writeln!(stdout, "{}", commands::ask(&assistant, &text.join(" ")).await)?;
        }
    }
    Ok(())
}

fn open(data: &Path) -> Result<(UserStore, Assistant)> {
    let store =
        UserStore::open(data).with_context(|| format!("open user file {}", data.display()))?;
    let assistant = Assistant::new(roster_core::load_settings());
    log::debug!(
        "data file {}, AI {}",
        data.display(),
        if assistant.ai_enabled() { "on" } else { "off" }
    );
    Ok((store, assistant))
}
