pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chanarchive")]
#[command(about = "Archive a channel's posts and comment threads as Markdown", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/chanarchive/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk the channel history and write one document per post
    Archive(ArchiveArgs),
    /// List the dialogs visible to the session
    Dialogs,
    /// Show how much of the channel has been archived
    Status {
        /// Channel name (overrides the config file)
        #[arg(long)]
        channel: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ArchiveArgs {
    /// Channel name (overrides the config file)
    #[arg(long)]
    pub channel: Option<String>,

    /// Start after this post id
    #[arg(long, conflicts_with = "resume")]
    pub from: Option<i64>,

    /// Maximum number of history entries to walk
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Continue after the last archived post
    #[arg(long)]
    pub resume: bool,
}
