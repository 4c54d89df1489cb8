//! Reconciliation primitives for the package ledger and the manifest graph.
//!
//! This library holds the pure core of regsweep: tag equivalence groups,
//! the digest reference graph built during a run, and the planners that walk
//! the completed graph to produce listings, reports and deletion plans.
//! Key concepts:
//!
//! - **Ledger**: one record per stored blob, keyed by a numeric version id
//!   and a content digest, optionally carrying human tags.
//! - **Index**: a manifest list referencing constituent manifests by digest;
//!   a ledger record with tags *is* an index.
//! - **Orphan**: a digest present in the ledger, referenced by no index and
//!   not itself an index.
//!
//! # Invariants
//!
//! - Every digest node is in exactly one of: belongs to an index, is an
//!   index itself, is an orphan.
//! - A node flagged orphan never carries tags or an index reference;
//!   a violation means downstream deletion decisions cannot be trusted.
//! - The graph is append-only during a run and read-only once every
//!   scheduled fetch has settled.

mod error;
pub mod graph;
pub mod plan;
pub mod tags;

pub use error::ReconcileError;
pub use graph::{CrossReference, DigestInfo, IndexObservation, PackageRecord, ReconciliationGraph};
pub use plan::{Deletion, DeletionReason, ListingBucket, ReportCounts};
pub use tags::{GroupId, TagGroups, UNKNOWN_TAG};
