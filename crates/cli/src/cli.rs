//! Command-line definitions for `charter`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "charter", about = "Search and read the constitution, online or offline", version)]
pub struct Cli {
    /// Read the document from this JSON file instead of the origin
    #[arg(long, global = true)]
    pub document: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank the document against a query
    Search {
        query: String,

        /// Maximum number of hits to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the preamble, an article or an amendment
    Show {
        /// Anchor id: preamble, article-N or amendment-N
        target: String,
    },

    /// Type-ahead search: one query per stdin line, debounced
    Watch,

    /// Inspect and drive the offline cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Install the current generation and activate it
    Install,

    /// Ask the active worker for its status
    Status,

    /// Delete every cache generation
    Clear,

    /// Fetch a resource through the offline worker
    Fetch {
        /// Origin-relative path or absolute URL on the site origin
        path: String,

        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,
    },

    /// List stored entries per generation
    List,
}
