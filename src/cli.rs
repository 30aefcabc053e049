//! Command-line surface for inspecting the stored corpus.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "hindsight",
    about = "Searchable store of problem-solving experiences",
    version
)]
pub struct Cli {
    /// Directory holding config.toml and the experience corpus
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the storage directory and write a default config.toml
    Init,

    /// Search stored experiences by hybrid semantic + keyword relevance
    Search {
        query: String,

        /// Max results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip the embedding call and rank by keywords alone
        #[arg(long)]
        keyword_only: bool,
    },

    /// List the most recently stored experiences
    Recent {
        #[arg(short, long)]
        limit: Option<usize>,
    },
}
