//! Report and deletion planning over a completed graph.
//!
//! Everything here is a pure walk of the read-only [`ReconciliationGraph`]:
//! listing buckets per tag group, aggregate counts, and the concrete list
//! of ledger versions to delete. List and report walks never mutate the
//! registry; the deletion plan is handed to the caller to execute.

use serde::Serialize;

use crate::error::ReconcileError;
use crate::graph::{PackageRecord, ReconciliationGraph};
use crate::tags::{GroupId, UNKNOWN_TAG};

/// Records grouped under one tag equivalence class.
#[derive(Debug, Serialize)]
pub struct ListingBucket {
    /// Member tags of the group; `["Unknown"]` for the orphan bucket.
    pub tags: Vec<String>,
    /// Ledger records whose digest belongs to the group's indexes.
    pub records: Vec<PackageRecord>,
}

/// Aggregate counts over a completed reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    /// Ledger records enumerated.
    pub ledger_records: usize,
    /// Distinct digests present in the ledger.
    pub distinct_digests: usize,
    /// Tags across all records, non-distinct.
    pub total_tags: usize,
    /// Digests flagged orphan.
    pub orphans: usize,
    /// Digests matching the deletion filter.
    pub deletion_targets: usize,
    /// Digests referenced by an index but absent from the ledger.
    pub dangling: usize,
    /// Digests claimed by more than one index.
    pub cross_references: usize,
}

/// Why a ledger version is being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionReason {
    /// Part of an index whose tag group matched the deletion filter.
    Tagged,
    /// Orphan swept up by an explicit orphan-deletion request.
    Orphan,
}

/// One ledger version to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub id: u64,
    pub digest: String,
    pub reason: DeletionReason,
}

/// Group records under their tag groups for listing output.
///
/// With a filter, only groups intersecting the filter are returned; without
/// one, every group appears. The reserved Unknown bucket holding true
/// tagless orphans is always appended last.
pub fn listing(
    graph: &ReconciliationGraph,
    records: &[PackageRecord],
    filter: &[String],
) -> Vec<ListingBucket> {
    let selected: Vec<GroupId> = graph
        .groups
        .iter()
        .filter(|&id| !graph.groups.same_group(id, graph.groups.unknown()))
        .filter(|&id| filter.is_empty() || graph.groups.intersects(id, filter))
        .collect();

    let mut buckets: Vec<ListingBucket> = selected
        .iter()
        .map(|&id| ListingBucket {
            tags: graph.groups.members(id).to_vec(),
            records: Vec::new(),
        })
        .collect();
    let mut orphan_bucket: Vec<PackageRecord> = Vec::new();

    for record in records {
        let Some(node) = graph.node(&record.digest) else {
            continue;
        };
        if node.is_orphan {
            orphan_bucket.push(record.clone());
            continue;
        }
        let group = node
            .index_digest
            .as_deref()
            .and_then(|index| graph.node(index))
            .and_then(|index| index.tags.first())
            .and_then(|tag| graph.groups.group_of(tag));
        let Some(group) = group else { continue };
        if let Some(position) = selected
            .iter()
            .position(|&id| graph.groups.same_group(id, group))
        {
            buckets[position].records.push(record.clone());
        }
    }

    for bucket in &mut buckets {
        bucket.records.sort_by_key(|record| record.id);
    }
    orphan_bucket.sort_by_key(|record| record.id);
    buckets.push(ListingBucket {
        tags: vec![UNKNOWN_TAG.to_string()],
        records: orphan_bucket,
    });
    buckets
}

/// Compute aggregate counts without mutating anything.
///
/// An empty filter combined with a non-zero deletion-target count means the
/// bookkeeping contradicted itself; the caller must abort rather than trust
/// the plan.
pub fn report(
    graph: &ReconciliationGraph,
    records: &[PackageRecord],
    filter: &[String],
) -> Result<ReportCounts, ReconcileError> {
    let mut distinct_digests = 0;
    let mut orphans = 0;
    let mut deletion_targets = 0;
    let mut dangling = 0;
    for (_, node) in graph.nodes() {
        if node.id.is_some() {
            distinct_digests += 1;
        } else {
            dangling += 1;
        }
        if node.is_orphan {
            orphans += 1;
        }
        if node.is_deletion_target {
            deletion_targets += 1;
        }
    }

    if filter.is_empty() && deletion_targets > 0 {
        return Err(ReconcileError::FilterMismatch {
            count: deletion_targets,
        });
    }

    Ok(ReportCounts {
        ledger_records: records.len(),
        distinct_digests,
        total_tags: records.iter().map(|record| record.tags.len()).sum(),
        orphans,
        deletion_targets,
        dangling,
        cross_references: graph.cross_references().len(),
    })
}

/// Plan the ledger versions to delete.
///
/// A version is selected when its digest matched the deletion filter, or
/// when it is an orphan and orphan deletion was requested. An orphan that
/// still carries tags or an index reference is refused: the two signals
/// contradict each other and guessing which to trust risks deleting a live
/// image. Dangling digests carry no ledger id and are never selected.
pub fn deletion_plan(
    graph: &ReconciliationGraph,
    delete_orphans: bool,
) -> Result<Vec<Deletion>, ReconcileError> {
    let mut deletions = Vec::new();
    for (digest, node) in graph.nodes() {
        let Some(id) = node.id else { continue };
        let sweep_orphan = delete_orphans && node.is_orphan;
        if !node.is_deletion_target && !sweep_orphan {
            continue;
        }
        if node.is_orphan && (node.index_digest.is_some() || !node.tags.is_empty()) {
            return Err(ReconcileError::OrphanConflict {
                digest: digest.to_string(),
            });
        }
        deletions.push(Deletion {
            id,
            digest: digest.to_string(),
            reason: if node.is_deletion_target {
                DeletionReason::Tagged
            } else {
                DeletionReason::Orphan
            },
        });
    }
    deletions.sort_by_key(|deletion| deletion.id);
    Ok(deletions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, digest: &str, tags: &[&str]) -> PackageRecord {
        PackageRecord {
            id,
            digest: digest.to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            created_at: "2025-06-01T12:00:00Z".parse().unwrap(),
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// One tagged index (v1, latest) listing d1+d2, plus a tagless orphan.
    fn sample() -> (ReconciliationGraph, Vec<PackageRecord>) {
        let records = vec![
            record(1, "sha256:d0", &["v1", "latest"]),
            record(2, "sha256:d1", &[]),
            record(3, "sha256:d2", &[]),
            record(9, "sha256:d9", &[]),
        ];
        let mut graph = ReconciliationGraph::new();
        for rec in &records {
            graph.observe_record(rec, &strings(&["v1"]));
        }
        graph.apply_manifest("sha256:d0", strings(&["sha256:d1", "sha256:d2"]));
        (graph, records)
    }

    #[test]
    fn test_listing_groups_records_under_tag_group() {
        let (graph, records) = sample();
        let buckets = listing(&graph, &records, &[]);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].tags, &["v1", "latest"]);
        let ids: Vec<u64> = buckets[0].records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(buckets[1].tags, &[UNKNOWN_TAG]);
        let orphan_ids: Vec<u64> = buckets[1].records.iter().map(|r| r.id).collect();
        assert_eq!(orphan_ids, vec![9]);
    }

    #[test]
    fn test_listing_with_filter_drops_other_groups() {
        let (graph, records) = sample();
        let buckets = listing(&graph, &records, &strings(&["latest"]));
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].tags, &["v1", "latest"]);
        // The orphan bucket is always appended.
        assert_eq!(buckets[1].tags, &[UNKNOWN_TAG]);

        let none = listing(&graph, &records, &strings(&["nope"]));
        assert_eq!(none.len(), 1);
        assert_eq!(none[0].tags, &[UNKNOWN_TAG]);
    }

    #[test]
    fn test_report_counts() {
        let (graph, records) = sample();
        let counts = report(&graph, &records, &strings(&["v1"])).unwrap();
        assert_eq!(
            counts,
            ReportCounts {
                ledger_records: 4,
                distinct_digests: 4,
                total_tags: 2,
                orphans: 1,
                deletion_targets: 3,
                dangling: 0,
                cross_references: 0,
            }
        );
    }

    #[test]
    fn test_report_on_empty_ledger() {
        let graph = ReconciliationGraph::new();
        let counts = report(&graph, &[], &[]).unwrap();
        assert_eq!(counts.ledger_records, 0);
        assert_eq!(counts.distinct_digests, 0);
        assert_eq!(counts.orphans, 0);
        // Group table still holds only the reserved Unknown group.
        assert_eq!(graph.groups.len(), 1);
    }

    #[test]
    fn test_report_rejects_targets_without_filter() {
        let (graph, records) = sample();
        // Targets were marked during reconciliation but the report claims
        // no filter: the bookkeeping contradicts itself.
        let err = report(&graph, &records, &[]).unwrap_err();
        assert_eq!(err, ReconcileError::FilterMismatch { count: 3 });
    }

    #[test]
    fn test_deletion_plan_scope() {
        let (graph, _) = sample();

        // Filter {v1}: index + both constituents, never the orphan.
        let plan = deletion_plan(&graph, false).unwrap();
        let ids: Vec<u64> = plan.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(plan.iter().all(|d| d.reason == DeletionReason::Tagged));

        // With orphan sweeping the tagless record joins the plan.
        let plan = deletion_plan(&graph, true).unwrap();
        let ids: Vec<u64> = plan.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 9]);
        assert_eq!(plan[3].reason, DeletionReason::Orphan);
    }

    #[test]
    fn test_deletion_plan_skips_dangling() {
        let mut graph = ReconciliationGraph::new();
        graph.observe_record(&record(1, "sha256:d0", &["v1"]), &strings(&["v1"]));
        // "ghost" comes back from the fetch but is absent from the ledger.
        graph.apply_manifest("sha256:d0", strings(&["sha256:ghost"]));

        let plan = deletion_plan(&graph, false).unwrap();
        let digests: Vec<&str> = plan.iter().map(|d| d.digest.as_str()).collect();
        assert_eq!(digests, vec!["sha256:d0"]);
    }

    #[test]
    fn test_deletion_plan_refuses_conflicted_orphan() {
        let mut graph = ReconciliationGraph::new();
        let node = graph.node_mut("sha256:bad");
        node.id = Some(5);
        node.tags = strings(&["v1"]);
        // is_orphan left true while tags are set: refuse to guess.

        let err = deletion_plan(&graph, true).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::OrphanConflict {
                digest: "sha256:bad".to_string()
            }
        );
    }
}
