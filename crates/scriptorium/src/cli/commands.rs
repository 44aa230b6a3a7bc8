//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use scriptorium::{ProposalChoice, SummaryMode};
use std::path::PathBuf;

/// Scriptorium - long-form story generation with bounded-context language models
#[derive(Parser, Debug)]
#[command(name = "scriptorium")]
#[command(about = "Long-form story generation with bounded-context language models", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file applied over the bundled and user defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a story
    Write(WriteArgs),

    /// Propose story ideas
    Ideas(IdeasArgs),

    /// List supported languages
    Languages,
}

/// Options of `scriptorium write`.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Story title
    #[arg(long)]
    pub title: String,

    /// Basic idea of the plot
    #[arg(long)]
    pub premise: String,

    /// Place, time and atmosphere
    #[arg(long)]
    pub setting: String,

    /// Requested length in words, before buffering
    #[arg(long, default_value_t = 5000)]
    pub words: u32,

    /// Output language (code or name)
    #[arg(long)]
    pub language: Option<String>,

    /// Custom language pack file
    #[arg(long)]
    pub language_pack: Option<PathBuf>,

    /// Extra style or character notes
    #[arg(long)]
    pub instructions: Option<String>,

    /// Write in a single call, never in segments
    #[arg(long)]
    pub no_segments: bool,

    /// Largest planned segment, in words
    #[arg(long)]
    pub max_words_per_segment: Option<u32>,

    /// How summaries between segments are produced
    #[arg(long)]
    pub summary: Option<SummaryMode>,

    /// Save the story and outline instead of only printing
    #[arg(long)]
    pub save: bool,

    /// Directory for saved files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Model override
    #[arg(long)]
    pub model: Option<String>,
}

/// Options of `scriptorium ideas`.
#[derive(Args, Debug, Clone)]
pub struct IdeasArgs {
    /// Number of ideas
    #[arg(long, default_value_t = 3)]
    pub count: usize,

    /// Output language (code or name)
    #[arg(long)]
    pub language: Option<String>,

    /// Custom language pack file
    #[arg(long)]
    pub language_pack: Option<PathBuf>,

    /// Genre or theme; random genres when omitted
    #[arg(long)]
    pub genre: Option<String>,

    /// Save each proposal, and the written story, to a file
    #[arg(long)]
    pub save: bool,

    /// Directory for saved files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Model override
    #[arg(long)]
    pub model: Option<String>,

    /// Write one of the proposals: its number, or `random`
    #[arg(long, value_name = "N|random")]
    pub write: Option<ProposalChoice>,
}
