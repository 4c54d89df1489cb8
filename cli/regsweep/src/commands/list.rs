//! List command.

use anyhow::Result;
use clap::Args;

use regsweep_reconcile::plan;

use crate::error::CliError;
use crate::output;
use crate::repo::Repository;

use super::CommandContext;

/// List package versions grouped by tag.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Repository as account/package.
    repository: String,

    /// Restrict output to tag groups containing any of these tags.
    tags: Vec<String>,
}

impl ListArgs {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let repo: Repository = self.repository.parse().map_err(CliError::Repo)?;
        let engine = ctx.engine()?;

        // Listing never targets anything for deletion.
        let outcome = engine
            .reconcile(&repo, &[])
            .await
            .map_err(CliError::Aborted)?;
        let buckets = plan::listing(&outcome.graph, &outcome.records, &self.tags);
        output::print_listing(&buckets, ctx.format);
        Ok(())
    }
}
