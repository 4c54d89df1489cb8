//! CLI commands.

mod delete;
mod list;
mod report;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use regsweep_cancel::Abort;

use crate::config::{Config, DEFAULT_CONCURRENCY};
use crate::engine::Engine;
use crate::ledger::GithubLedger;
use crate::output::OutputFormat;
use crate::registry::GhcrRegistry;

/// regsweep - reconcile container package versions against the registry
/// manifest graph.
#[derive(Debug, Parser)]
#[command(name = "regsweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Maximum concurrent manifest fetches.
    #[arg(long, global = true, env = "REGSWEEP_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Package ledger API base URL.
    #[arg(long, global = true, env = "REGSWEEP_API_URL")]
    api_url: Option<String>,

    /// Container registry base URL.
    #[arg(long, global = true, env = "REGSWEEP_REGISTRY_URL")]
    registry_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List package versions grouped by tag.
    List(list::ListArgs),

    /// Print reconciliation counts without deleting anything.
    Report(report::ReportArgs),

    /// Delete package versions by tag, optionally sweeping orphans.
    Delete(delete::DeleteArgs),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self, abort: Abort) -> Result<()> {
        let format = match self.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        };
        let config = Config::resolve(self.api_url, self.registry_url, self.concurrency);

        let ctx = CommandContext {
            config,
            format,
            abort,
        };

        match self.command {
            Commands::List(cmd) => cmd.run(ctx).await,
            Commands::Report(cmd) => cmd.run(ctx).await,
            Commands::Delete(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("regsweep {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
    pub abort: Abort,
}

impl CommandContext {
    /// Build the reconciliation engine over the production clients.
    pub fn engine(&self) -> Result<Engine> {
        let ledger = Arc::new(GithubLedger::new(&self.config)?);
        let registry = Arc::new(GhcrRegistry::new(&self.config)?);
        Ok(Engine::new(
            ledger,
            registry,
            self.abort.clone(),
            self.config.concurrency,
        ))
    }
}
