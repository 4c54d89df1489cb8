//! Reconciliation engine.
//!
//! Enumerates ledger records page by page, folds each into the digest
//! graph, and schedules a manifest fetch for every tagged index it
//! encounters. Enumeration pipelines with in-flight fetches; once both
//! settle, the graph is checked and handed to the planners.
//!
//! Graph mutation happens from concurrently-resolving fetch tasks, so the
//! graph sits behind a mutex for the duration of the run.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use regsweep_cancel::{Abort, Aborted};
use regsweep_reconcile::{Deletion, IndexObservation, PackageRecord, ReconciliationGraph};

use crate::ledger::{Ledger, PER_PAGE};
use crate::registry::{Registry, RegistryError};
use crate::repo::Repository;
use crate::scheduler::FetchPool;

/// Outcome of one reconciliation run: the completed graph plus the records
/// retained for listing output.
pub struct Reconciliation {
    pub graph: ReconciliationGraph,
    pub records: Vec<PackageRecord>,
}

/// Drives the ledger enumeration and the scheduled index fetches.
pub struct Engine {
    ledger: Arc<dyn Ledger>,
    registry: Arc<dyn Registry>,
    abort: Abort,
    concurrency: usize,
}

impl Engine {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        registry: Arc<dyn Registry>,
        abort: Abort,
        concurrency: usize,
    ) -> Self {
        Self {
            ledger,
            registry,
            abort,
            concurrency,
        }
    }

    /// Build the digest reference graph for `repo`.
    ///
    /// `delete_tags` marks matching tag groups (and everything their
    /// indexes reference) as deletion targets while the graph is built.
    /// Any fatal condition funnels through the abort signal, so every
    /// concurrent consumer observes the same terminal reason.
    pub async fn reconcile(
        &self,
        repo: &Repository,
        delete_tags: &[String],
    ) -> Result<Reconciliation, Aborted> {
        info!(repo = %repo, "starting reconciliation");

        let graph = Arc::new(Mutex::new(ReconciliationGraph::new()));
        let mut pool = FetchPool::new(self.concurrency, self.abort.clone());
        let mut records: Vec<PackageRecord> = Vec::new();

        let mut page: u32 = 1;
        'enumerate: loop {
            if self.abort.is_aborted() {
                break;
            }
            let batch = match self.ledger.list_page(repo, page).await {
                Ok(batch) => batch,
                Err(err) => {
                    self.abort
                        .abort(format!("ledger enumeration failed on page {page}: {err}"));
                    break;
                }
            };
            let last_page = batch.len() < PER_PAGE;
            debug!(page, count = batch.len(), "consumed ledger page");

            for record in batch {
                // Observe the abort at item boundaries, never mid-item.
                if self.abort.is_aborted() {
                    break 'enumerate;
                }
                let observation = {
                    let mut graph = graph.lock().expect("graph mutex poisoned");
                    graph.observe_record(&record, delete_tags)
                };
                records.push(record);

                if let Some(observation) = observation {
                    debug!(
                        digest = %observation.digest,
                        tag = %observation.head_tag,
                        deletion_target = observation.deletion_target,
                        "scheduling index fetch"
                    );
                    let registry = Arc::clone(&self.registry);
                    let graph = Arc::clone(&graph);
                    let abort = self.abort.clone();
                    let repo = repo.clone();
                    pool.submit(async move {
                        fetch_index(registry, graph, abort, repo, observation).await;
                    });
                }
            }

            if last_page {
                break;
            }
            page += 1;
        }

        pool.join().await;
        self.abort.checkpoint()?;

        let graph = Arc::into_inner(graph)
            .expect("all fetch tasks joined")
            .into_inner()
            .expect("graph mutex poisoned");

        // Dangling references are a registry state error, not a bug in this
        // tool's bookkeeping: report loudly, keep going.
        for digest in graph.dangling() {
            warn!(digest, "digest referenced by an index but absent from the ledger");
        }

        if let Err(err) = graph.check_consistency() {
            self.abort.abort(err.to_string());
            return Err(self.abort.reason().expect("abort reason just stored"));
        }

        info!(
            digests = graph.len(),
            records = records.len(),
            "reconciliation complete"
        );
        Ok(Reconciliation { graph, records })
    }

    /// Execute a deletion plan against the ledger.
    ///
    /// Deletions are independent API calls: one failure does not block the
    /// rest, but the caller must fail the run if any deletion failed.
    /// Returns the number of failed deletions.
    pub async fn delete(
        &self,
        repo: &Repository,
        deletions: &[Deletion],
    ) -> Result<usize, Aborted> {
        let mut failed = 0;
        for deletion in deletions {
            self.abort.checkpoint()?;
            match self.ledger.delete_version(repo, deletion.id).await {
                Ok(()) => info!(
                    id = deletion.id,
                    digest = %deletion.digest,
                    "deleted package version"
                ),
                Err(err) => {
                    failed += 1;
                    warn!(
                        id = deletion.id,
                        digest = %deletion.digest,
                        error = %err,
                        "failed to delete package version"
                    );
                }
            }
        }
        Ok(failed)
    }
}

/// Resolve one scheduled index fetch into the graph.
async fn fetch_index(
    registry: Arc<dyn Registry>,
    graph: Arc<Mutex<ReconciliationGraph>>,
    abort: Abort,
    repo: Repository,
    observation: IndexObservation,
) {
    match registry.manifest_digests(&repo, &observation.head_tag).await {
        // An empty manifest list means the registry view cannot be
        // trusted; partial deletion would be unsafe.
        Ok(digests) if digests.is_empty() => {
            abort.abort(format!(
                "manifest index for tag '{}' came back empty",
                observation.head_tag
            ));
        }
        Ok(digests) => {
            let crossed = {
                let mut graph = graph.lock().expect("graph mutex poisoned");
                graph.apply_manifest(&observation.digest, digests)
            };
            for cross in crossed {
                warn!(
                    digest = %cross.digest,
                    previous_index = %cross.previous_index,
                    new_index = %cross.new_index,
                    "digest claimed by two indexes, keeping the later claim"
                );
            }
        }
        Err(RegistryError::NotFound { reference }) => {
            abort.abort(format!("no manifest index found for tag '{reference}'"));
        }
        Err(err) => {
            abort.abort(format!(
                "manifest fetch for tag '{}' failed: {err}",
                observation.head_tag
            ));
        }
    }
}
