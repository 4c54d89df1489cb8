//! Tag equivalence groups.
//!
//! Tags that appear together in one ledger record all point at the same
//! manifest index and therefore form one equivalence class. Groups are kept
//! in a union-find table (parent pointers with path compression) plus a
//! reverse tag → node map, so merge semantics stay explicit: merging two
//! existing groups combines membership, it never duplicates.
//!
//! The reserved [`UNKNOWN_TAG`] group is seeded at construction, collects
//! true tagless orphans in listings, and is never merged with any other
//! group.

use std::collections::HashMap;

/// Reserved group for digests that belong to no tagged index.
pub const UNKNOWN_TAG: &str = "Unknown";

/// Opaque handle to a tag group.
///
/// Handles stay valid across later merges; operations resolve them to the
/// current root first. Compare two handles with [`TagGroups::same_group`]
/// rather than `==`, since an old handle may point below the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// Union-find table of tag equivalence groups.
#[derive(Debug)]
pub struct TagGroups {
    /// Parent pointer per node; roots point at themselves.
    parent: Vec<usize>,
    /// Member tags in insertion order; meaningful at roots only.
    members: Vec<Vec<String>>,
    /// Tag → node index.
    index: HashMap<String, usize>,
}

impl TagGroups {
    /// Create a table seeded with the reserved Unknown group.
    pub fn new() -> Self {
        let mut groups = Self {
            parent: Vec::new(),
            members: Vec::new(),
            index: HashMap::new(),
        };
        groups.insert_node(UNKNOWN_TAG.to_string());
        groups
    }

    /// The reserved Unknown group.
    pub fn unknown(&self) -> GroupId {
        GroupId(0)
    }

    /// Union all given tags into one group and return it.
    ///
    /// Unknown tags are inserted as fresh singletons first; tags already in
    /// different groups cause those groups to be merged. The reserved
    /// Unknown group is skipped: a literal "Unknown" in the argument stays
    /// in the reserved group and drags nothing into it. An argument with no
    /// mergeable tags yields the reserved group.
    pub fn merge(&mut self, tags: &[String]) -> GroupId {
        let mut root: Option<usize> = None;
        for tag in tags {
            if tag == UNKNOWN_TAG {
                continue;
            }
            let node = match self.index.get(tag) {
                Some(&node) => node,
                None => self.insert_node(tag.clone()),
            };
            let node_root = self.find_compress(node);
            root = Some(match root {
                None => node_root,
                Some(root) => self.union(root, node_root),
            });
        }
        GroupId(root.unwrap_or(0))
    }

    /// Look up the group a tag belongs to.
    pub fn group_of(&self, tag: &str) -> Option<GroupId> {
        let node = *self.index.get(tag)?;
        Some(GroupId(self.find(node)))
    }

    /// Whether two handles denote the same group.
    pub fn same_group(&self, a: GroupId, b: GroupId) -> bool {
        self.find(a.0) == self.find(b.0)
    }

    /// Member tags of a group, in insertion order.
    pub fn members(&self, id: GroupId) -> &[String] {
        &self.members[self.find(id.0)]
    }

    /// The group's canonical reference tag: its first member.
    pub fn head_tag(&self, id: GroupId) -> &str {
        &self.members(id)[0]
    }

    /// Whether any of the given tags is a member of the group.
    pub fn intersects(&self, id: GroupId, tags: &[String]) -> bool {
        let root = self.find(id.0);
        tags.iter()
            .any(|tag| self.index.get(tag).is_some_and(|&n| self.find(n) == root))
    }

    /// All groups (the reserved Unknown group included), in creation order.
    pub fn iter(&self) -> impl Iterator<Item = GroupId> + '_ {
        (0..self.parent.len())
            .filter(|&n| self.parent[n] == n)
            .map(GroupId)
    }

    /// Number of groups, the reserved Unknown group included.
    pub fn len(&self) -> usize {
        (0..self.parent.len()).filter(|&n| self.parent[n] == n).count()
    }

    /// Never empty: the Unknown group always exists.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn insert_node(&mut self, tag: String) -> usize {
        let node = self.parent.len();
        self.parent.push(node);
        self.members.push(vec![tag.clone()]);
        self.index.insert(tag, node);
        node
    }

    /// Root of a node, without mutating the table.
    fn find(&self, mut node: usize) -> usize {
        while self.parent[node] != node {
            node = self.parent[node];
        }
        node
    }

    /// Root of a node, compressing the path walked.
    fn find_compress(&mut self, node: usize) -> usize {
        let root = self.find(node);
        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Merge the group rooted at `b` into the group rooted at `a`.
    fn union(&mut self, a: usize, b: usize) -> usize {
        if a == b {
            return a;
        }
        self.parent[b] = a;
        let absorbed = std::mem::take(&mut self.members[b]);
        self.members[a].extend(absorbed);
        a
    }
}

impl Default for TagGroups {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cotags_share_one_group() {
        let mut groups = TagGroups::new();
        let id = groups.merge(&tags(&["v1", "latest"]));

        // Lookup by either member yields the same group with both as members.
        let by_v1 = groups.group_of("v1").unwrap();
        let by_latest = groups.group_of("latest").unwrap();
        assert!(groups.same_group(by_v1, by_latest));
        assert!(groups.same_group(id, by_v1));
        assert_eq!(groups.members(id), &["v1", "latest"]);
    }

    #[test]
    fn test_singleton_group() {
        let mut groups = TagGroups::new();
        let id = groups.merge(&tags(&["solo"]));
        assert_eq!(groups.members(id), &["solo"]);
        assert_eq!(groups.head_tag(id), "solo");
    }

    #[test]
    fn test_cross_group_merge_combines_membership() {
        let mut groups = TagGroups::new();
        let a = groups.merge(&tags(&["v1", "latest"]));
        let b = groups.merge(&tags(&["v2", "edge"]));
        assert!(!groups.same_group(a, b));

        // A record naming tags from both groups merges them, no duplicates.
        let merged = groups.merge(&tags(&["latest", "edge"]));
        assert!(groups.same_group(merged, a));
        assert!(groups.same_group(merged, b));
        assert_eq!(groups.members(merged), &["v1", "latest", "v2", "edge"]);
    }

    #[test]
    fn test_stale_handles_survive_merges() {
        let mut groups = TagGroups::new();
        let a = groups.merge(&tags(&["v1"]));
        let b = groups.merge(&tags(&["v2"]));
        groups.merge(&tags(&["v1", "v2"]));

        // Handles issued before the merge still resolve to the merged group.
        assert!(groups.same_group(a, b));
        assert_eq!(groups.head_tag(b), "v1");
    }

    #[test]
    fn test_unknown_group_is_reserved() {
        let mut groups = TagGroups::new();
        assert_eq!(groups.members(groups.unknown()), &[UNKNOWN_TAG]);

        // A literal "Unknown" tag never drags other tags into the
        // reserved group.
        let id = groups.merge(&tags(&[UNKNOWN_TAG, "v1"]));
        assert!(!groups.same_group(id, groups.unknown()));
        assert_eq!(groups.members(id), &["v1"]);

        // Merging nothing mergeable yields the reserved group untouched.
        let empty = groups.merge(&[]);
        assert!(groups.same_group(empty, groups.unknown()));
        assert_eq!(groups.members(groups.unknown()), &[UNKNOWN_TAG]);
    }

    #[test]
    fn test_intersects() {
        let mut groups = TagGroups::new();
        let id = groups.merge(&tags(&["v1", "latest"]));
        assert!(groups.intersects(id, &tags(&["latest"])));
        assert!(groups.intersects(id, &tags(&["other", "v1"])));
        assert!(!groups.intersects(id, &tags(&["v2"])));
        assert!(!groups.intersects(id, &[]));
    }

    #[test]
    fn test_iter_lists_groups_in_creation_order() {
        let mut groups = TagGroups::new();
        groups.merge(&tags(&["v1", "latest"]));
        groups.merge(&tags(&["v2"]));

        let heads: Vec<&str> = groups.iter().map(|id| groups.head_tag(id)).collect();
        assert_eq!(heads, vec![UNKNOWN_TAG, "v1", "v2"]);
        assert_eq!(groups.len(), 3);
    }
}
