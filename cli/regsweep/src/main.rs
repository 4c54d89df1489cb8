//! regsweep - reconcile container package versions against the registry
//! manifest graph.

use clap::Parser;
use regsweep_cancel::Abort;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use regsweep_cli::commands::Cli;
use regsweep_cli::error;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine-parseable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let abort = Abort::new();

    // Ctrl-C funnels through the same abort path as any fatal error.
    tokio::spawn({
        let abort = abort.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                abort.abort("interrupted");
            }
        }
    });

    let result = cli.run(abort.clone()).await;
    if let Err(e) = &result {
        error::print_error(e);
    }
    if result.is_err() || abort.is_aborted() {
        std::process::exit(1);
    }
}
