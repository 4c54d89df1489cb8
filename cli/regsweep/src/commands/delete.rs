//! Delete command.
//!
//! Deletion is irreversible: the self-consistency report is printed before
//! the first deletion call so the operator can abort if the counts look
//! wrong.

use anyhow::Result;
use clap::Args;

use regsweep_reconcile::plan;

use crate::error::CliError;
use crate::output;
use crate::repo::Repository;

use super::CommandContext;

/// Delete package versions by tag, optionally sweeping orphans.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Repository as account/package.
    repository: String,

    /// Tags selecting the image versions to delete.
    #[arg(required_unless_present = "orphans")]
    tags: Vec<String>,

    /// Also delete orphan digests (referenced by no index).
    #[arg(long)]
    orphans: bool,
}

impl DeleteArgs {
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

        let deletions = match plan::deletion_plan(&outcome.graph, self.orphans) {
            Ok(deletions) => deletions,
            Err(err) => {
                ctx.abort.abort(err.to_string());
                return Err(CliError::Inconsistency(err).into());
            }
        };
        if deletions.is_empty() {
            output::print_info("Nothing to delete.");
            return Ok(());
        }
        output::print_plan(&deletions, ctx.format);

        let failed = engine
            .delete(&repo, &deletions)
            .await
            .map_err(CliError::Aborted)?;
        if failed > 0 {
            return Err(CliError::DeletionsFailed {
                failed,
                attempted: deletions.len(),
            }
            .into());
        }
        output::print_success(&format!("Deleted {} package versions.", deletions.len()));
        Ok(())
    }
}
