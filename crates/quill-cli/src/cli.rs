use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Offline-first notes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title
        title: String,
        /// Note body
        description: String,
    },
    /// List notes, newest first
    List {
        /// Page to show
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Notes per page
        #[arg(long, default_value = "20")]
        page_size: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search notes by title or body
    Search {
        /// Search query
        query: String,
        /// Page to show
        #[arg(short, long)]
        page: Option<u32>,
        /// Notes per page
        #[arg(long)]
        page_size: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note
    Edit {
        /// Note id
        id: i64,
        /// New title
        title: String,
        /// New body
        description: String,
    },
    /// Delete an existing note
    Delete {
        /// Note id
        id: i64,
    },
    /// Push pending changes and pull the latest notes
    Sync,
}
