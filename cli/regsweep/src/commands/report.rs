//! Report command.

use anyhow::Result;
use clap::Args;

use regsweep_reconcile::plan;

use crate::error::CliError;
use crate::output;
use crate::repo::Repository;

use super::CommandContext;

/// Print reconciliation counts without deleting anything.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Repository as account/package.
    repository: String,

    /// Tags to evaluate as a deletion filter (nothing is deleted).
    tags: Vec<String>,
}

impl ReportArgs {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let repo: Repository = self.repository.parse().map_err(CliError::Repo)?;
        let engine = ctx.engine()?;

        let outcome = engine
            .reconcile(&repo, &self.tags)
            .await
            .map_err(CliError::Aborted)?;
        let counts = match plan::report(&outcome.graph, &outcome.records, &self.tags) {
            Ok(counts) => counts,
            Err(err) => {
                ctx.abort.abort(err.to_string());
                return Err(CliError::Inconsistency(err).into());
            }
        };
        output::print_report(&counts, ctx.format);
        Ok(())
    }
}
