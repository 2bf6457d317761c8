// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line surface.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "atlas", version, about = "Atlas anchor/scene engine tools")]
pub struct Cli {
    /// Directory holding engine config (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a JSON-lines anchor log through the update loop and summarise the result
    Replay(ReplayArgs),
    /// Inspect or create the engine config
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the `.jsonl` log
    pub events: PathBuf,
    /// Directory of `<name>.json` templates used by `place` records
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,
    /// Override the anchor feed capacity from config
    #[arg(long)]
    pub capacity: Option<usize>,
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective engine config
    Show,
    /// Write the default engine config
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
