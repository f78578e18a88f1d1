//! Quill CLI - offline-first notes from the terminal
//!
//! Works against a remote note service when reachable and degrades to the
//! local cache when it is not; queued changes replay on `quill sync`.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "quill=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = DEFAULT_LOG_DIRECTIVE
        .parse()
        .map_err(|error: tracing_subscriber::filter::ParseError| {
            CliError::LogFilter(error.to_string())
        })?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let cli = Cli::parse();
    let db_path = commands::resolve_db_path(cli.db_path)?;
    let app = commands::open(&db_path).await?;

    match cli.command {
        Commands::Add { title, description } => {
            commands::run_add(&app, &title, &description).await?;
        }
        Commands::List {
            page,
            page_size,
            json,
        } => commands::run_list(&app, page, page_size, json).await?,
        Commands::Search {
            query,
            page,
            page_size,
            json,
        } => commands::run_search(&app, &query, page, page_size, json).await?,
        Commands::Edit {
            id,
            title,
            description,
        } => commands::run_edit(&app, id, &title, &description).await?,
        Commands::Delete { id } => commands::run_delete(&app, id).await?,
        Commands::Sync => commands::run_sync(&app).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_LOG_DIRECTIVE;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn default_log_directive_parses() {
        assert!(DEFAULT_LOG_DIRECTIVE.parse::<Directive>().is_ok());
    }
}
