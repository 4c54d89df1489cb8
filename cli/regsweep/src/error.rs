//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

use regsweep_cancel::Aborted;
use regsweep_reconcile::ReconcileError;

use crate::repo::RepoError;

/// CLI-level errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Inconsistency(#[from] ReconcileError),

    #[error(transparent)]
    Aborted(#[from] Aborted),

    #[error("{failed} of {attempted} deletions failed")]
    DeletionsFailed { failed: usize, attempted: usize },
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Provide hints for the common failure modes.
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::Repo(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Pass the repository as account/package, e.g. \
                     pdcastro/oh_so_smart."
                        .yellow()
                );
            }
            CliError::Aborted(aborted)
                if aborted.reason().contains("401") || aborted.reason().contains("403") =>
            {
                eprintln!(
                    "\n{}",
                    "Hint: Set GITHUB_TOKEN (or GH_TOKEN) to a token with the \
                     packages scopes."
                        .yellow()
                );
            }
            CliError::Aborted(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: The run was aborted at the first fatal error; the \
                     failing call is logged above."
                        .yellow()
                );
            }
            CliError::Inconsistency(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: The ledger and the registry disagree. Nothing was \
                     deleted; inspect the package before retrying."
                        .yellow()
                );
            }
            CliError::DeletionsFailed { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Failed deletions are logged above. Re-running the \
                     delete retries the remainder."
                        .yellow()
                );
            }
        }
    }
}
