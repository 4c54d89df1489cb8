//! Reconciliation error types.

use thiserror::Error;

/// Inconsistencies detected while classifying digests or planning deletions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// A digest is flagged orphan while still carrying tag or index metadata.
    /// Deletion decisions downstream cannot be trusted.
    #[error("digest {digest} is flagged orphan but carries tags or an index reference")]
    OrphanConflict { digest: String },

    /// Digests are marked for deletion although no deletion tags were
    /// requested. Structurally impossible unless the bookkeeping is broken.
    #[error("no deletion tags were requested but {count} digests are marked for deletion")]
    FilterMismatch { count: usize },
}
