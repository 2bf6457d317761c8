// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `atlas`: replay anchor logs through the engine and manage its config.
#![forbid(unsafe_code)]

mod cli;
mod events;
mod replay;

use std::io::Write;

use anyhow::{bail, Context, Result};
use atlas_app_core::{ConfigService, EngineConfig, ENGINE_CONFIG_KEY};
use atlas_config_fs::FsConfigStore;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConfigCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = match &cli.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("opening config directory")?;
    let service = ConfigService::new(store);

    // A broken config must not stop `config init --force` from repairing it.
    let loaded = EngineConfig::load(&service);
    init_tracing(loaded.as_ref().map_or("info", |c| c.log_filter.as_str()));

    match cli.command {
        Commands::Replay(args) => {
            let config = loaded.context("loading engine config")?;
            let summary = replay::run(&args, config).await?;
            let mut out = std::io::stdout().lock();
            if args.json {
                serde_json::to_writer_pretty(&mut out, &summary)?;
                writeln!(out)?;
            } else {
                replay::write_text(&mut out, &summary)?;
            }
        }
        Commands::Config(ConfigCommand::Show) => {
            let config = loaded.context("loading engine config")?;
            let mut out = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &config)?;
            writeln!(out)?;
        }
        Commands::Config(ConfigCommand::Init { force }) => {
            let path = service.store().path_for(ENGINE_CONFIG_KEY);
            if !force && service.exists(ENGINE_CONFIG_KEY)? {
                bail!("{} already exists (pass --force to overwrite)", path.display());
            }
            EngineConfig::default().save(&service)?;
            writeln!(std::io::stdout(), "wrote {}", path.display())?;
        }
    }
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured filter. Logs go to stderr so stdout
/// stays machine-readable.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
