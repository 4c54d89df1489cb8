//! Digest reference graph.
//!
//! One [`DigestInfo`] node per digest observed during a run, created on
//! first reference (an enumerated ledger record or a digest discovered
//! inside an index) and mutated in place as later discoveries prove
//! non-orphan status. Nodes default to orphan until evidence arrives.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ReconcileError;
use crate::tags::{GroupId, TagGroups};

/// One ledger entry for a stored blob.
///
/// Transient: folded into [`DigestInfo`] during enumeration and retained
/// only for listing output.
#[derive(Debug, Clone, Serialize)]
pub struct PackageRecord {
    /// Ledger-assigned version id.
    pub id: u64,
    /// Content digest, unique per repository.
    pub digest: String,
    /// Human tags; non-empty iff the record is itself an index.
    pub tags: Vec<String>,
    /// When the version was stored.
    pub created_at: DateTime<Utc>,
}

/// Reconciliation state for one digest.
#[derive(Debug, Clone, Serialize)]
pub struct DigestInfo {
    /// Ledger version id; None until the record is enumerated. A node that
    /// still lacks an id after all fetches settle is a dangling reference.
    pub id: Option<u64>,
    /// No index references this digest and it is not itself an index.
    pub is_orphan: bool,
    /// Selected for deletion by the caller's tag filter.
    pub is_deletion_target: bool,
    /// Digest of the index referencing this digest; an index references
    /// itself.
    pub index_digest: Option<String>,
    /// Non-empty only if this digest is an index.
    pub tags: Vec<String>,
}

impl DigestInfo {
    fn new() -> Self {
        Self {
            id: None,
            is_orphan: true,
            is_deletion_target: false,
            index_digest: None,
            tags: Vec::new(),
        }
    }
}

/// A tagged index observed during enumeration, ready to have its manifest
/// list fetched.
#[derive(Debug, Clone)]
pub struct IndexObservation {
    /// The index's own digest.
    pub digest: String,
    /// The tag equivalence group the index's tags were merged into.
    pub group: GroupId,
    /// Canonical reference for fetching the index's manifest list.
    pub head_tag: String,
    /// Whether the group intersects the requested deletion tags.
    pub deletion_target: bool,
}

/// A digest claimed by two different indexes.
///
/// The registry should never produce this; the later writer wins and the
/// conflict is surfaced in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossReference {
    pub digest: String,
    pub previous_index: String,
    pub new_index: String,
}

/// The full run's digest → [`DigestInfo`] map plus the tag group table.
///
/// Append-only during a run; read-only after all scheduled fetches settle.
#[derive(Debug)]
pub struct ReconciliationGraph {
    nodes: HashMap<String, DigestInfo>,
    pub groups: TagGroups,
    cross_references: Vec<CrossReference>,
}

impl ReconciliationGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            groups: TagGroups::new(),
            cross_references: Vec::new(),
        }
    }

    /// Look up a node.
    pub fn node(&self, digest: &str) -> Option<&DigestInfo> {
        self.nodes.get(digest)
    }

    /// Fetch a node, inserting a default orphan node on first reference.
    pub fn node_mut(&mut self, digest: &str) -> &mut DigestInfo {
        self.nodes
            .entry(digest.to_string())
            .or_insert_with(DigestInfo::new)
    }

    /// Fold an enumerated ledger record into the graph.
    ///
    /// A tagged record is itself an index: its tags are merged into an
    /// equivalence group synchronously, before any fetch is scheduled, so
    /// the group's head tag is final by the time the caller schedules the
    /// manifest fetch. Returns the observation to fetch, or None for a
    /// plain blob.
    pub fn observe_record(
        &mut self,
        record: &PackageRecord,
        delete_tags: &[String],
    ) -> Option<IndexObservation> {
        let node = self.node_mut(&record.digest);
        node.id = Some(record.id);
        if record.tags.is_empty() {
            // Plain blob: stays orphan until an index claims it.
            return None;
        }

        let group = self.groups.merge(&record.tags);
        let deletion_target =
            !delete_tags.is_empty() && self.groups.intersects(group, delete_tags);
        let head_tag = self.groups.head_tag(group).to_string();

        let node = self.node_mut(&record.digest);
        node.tags = record.tags.clone();
        node.index_digest = Some(record.digest.clone());
        node.is_orphan = false;
        node.is_deletion_target = deletion_target;

        Some(IndexObservation {
            digest: record.digest.clone(),
            group,
            head_tag,
            deletion_target,
        })
    }

    /// Apply a fetched manifest list to the graph.
    ///
    /// The index's own digest is appended to the constituent list exactly
    /// once, then every digest is created-or-updated: non-orphan, referenced
    /// by this index, deletion targeting propagated from the index. A digest
    /// already claimed by a different index is recorded as a cross-reference
    /// and overwritten, last writer wins.
    ///
    /// Returns the cross-references detected by this application.
    pub fn apply_manifest(
        &mut self,
        index_digest: &str,
        mut constituents: Vec<String>,
    ) -> Vec<CrossReference> {
        constituents.push(index_digest.to_string());

        let deletion_target = self
            .nodes
            .get(index_digest)
            .map(|node| node.is_deletion_target)
            .unwrap_or(false);

        let mut crossed = Vec::new();
        for digest in constituents {
            let node = self.node_mut(&digest);
            if let Some(previous) = node.index_digest.as_deref() {
                if previous != index_digest {
                    crossed.push(CrossReference {
                        digest: digest.clone(),
                        previous_index: previous.to_string(),
                        new_index: index_digest.to_string(),
                    });
                }
            }
            node.is_orphan = false;
            node.index_digest = Some(index_digest.to_string());
            node.is_deletion_target = deletion_target;
        }

        self.cross_references.extend(crossed.iter().cloned());
        crossed
    }

    /// All cross-references recorded during the run.
    pub fn cross_references(&self) -> &[CrossReference] {
        &self.cross_references
    }

    /// Digests named inside some index's manifest list but absent from the
    /// ledger. A registry state error, reported but never fatal.
    pub fn dangling(&self) -> Vec<&str> {
        let mut dangling: Vec<&str> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.id.is_none())
            .map(|(digest, _)| digest.as_str())
            .collect();
        dangling.sort_unstable();
        dangling
    }

    /// Verify that no node is flagged orphan while carrying tag or index
    /// metadata. Such a node means the bookkeeping itself is broken and
    /// deletion decisions cannot be trusted.
    pub fn check_consistency(&self) -> Result<(), ReconcileError> {
        for (digest, node) in &self.nodes {
            if node.is_orphan && (node.index_digest.is_some() || !node.tags.is_empty()) {
                return Err(ReconcileError::OrphanConflict {
                    digest: digest.clone(),
                });
            }
        }
        Ok(())
    }

    /// Iterate all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &DigestInfo)> {
        self.nodes.iter().map(|(digest, node)| (digest.as_str(), node))
    }

    /// Number of distinct digests observed.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for ReconciliationGraph {
    fn default() -> Self {
        Self::new()
    }
}
