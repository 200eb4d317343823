//! Needs/Wants partition of a bucket tree.

use serde::Serialize;

use crate::models::{Bucket, BucketGroup, BucketNode};

/// One entry of a Needs or Wants section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub bucket: Bucket,
    pub group: BucketGroup,
    /// Only descendants sharing this entry's group.
    pub children: Vec<BucketNode>,
    /// Name of the original parent when this bucket was re-homed because
    /// its group differs from the parent's.
    pub orphan_of: Option<String>,
}

impl GroupEntry {
    pub fn is_orphan(&self) -> bool {
        self.orphan_of.is_some()
    }

    /// Label with the cross-group marker, e.g. `Gym *`.
    pub fn display_name(&self) -> String {
        if self.is_orphan() {
            format!("{} *", self.bucket.name)
        } else {
            self.bucket.name.clone()
        }
    }

    pub fn size(&self) -> usize {
        1 + self.children.iter().map(BucketNode::size).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupPartition {
    pub needs: Vec<GroupEntry>,
    pub wants: Vec<GroupEntry>,
}

impl GroupPartition {
    pub fn len(&self) -> usize {
        self.needs
            .iter()
            .chain(self.wants.iter())
            .map(GroupEntry::size)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.needs.is_empty() && self.wants.is_empty()
    }

    fn push(&mut self, entry: GroupEntry) {
        match entry.group {
            BucketGroup::NonDiscretionary => self.needs.push(entry),
            BucketGroup::Discretionary => self.wants.push(entry),
            BucketGroup::Income => {}
        }
    }
}

/// Split a built tree into Needs (`Non-Discretionary`) and Wants
/// (`Discretionary`).
///
/// A top-level bucket keeps only the children of its own group. A child whose
/// group differs is emitted as its own entry in its group's section, tagged
/// with the parent's name. This applies at every depth, so each non-Income
/// bucket lands in exactly one section. Income buckets are left out.
pub fn partition(forest: &[BucketNode]) -> GroupPartition {
    let mut result = GroupPartition::default();
    for entry in entries(forest) {
        result.push(entry);
    }
    result
}

/// Income entries, split the same way as [`partition`]: Income roots keep
/// only Income descendants, and Income buckets nested under other groups
/// appear here as orphans.
pub fn income_entries(forest: &[BucketNode]) -> Vec<GroupEntry> {
    entries(forest)
        .into_iter()
        .filter(|entry| entry.group == BucketGroup::Income)
        .collect()
}

/// Every root followed by the orphans split off beneath it, in tree order.
fn entries(forest: &[BucketNode]) -> Vec<GroupEntry> {
    let mut result = Vec::new();
    for root in forest {
        let mut orphans = Vec::new();
        let children = split_children(root, &mut orphans);
        result.push(GroupEntry {
            bucket: root.bucket.clone(),
            group: root.group,
            children,
            orphan_of: None,
        });
        result.extend(orphans);
    }
    result
}

/// Returns the same-group children of `node`, moving divergent ones (with
/// their own pruned subtrees) into `orphans`.
fn split_children(node: &BucketNode, orphans: &mut Vec<GroupEntry>) -> Vec<BucketNode> {
    let mut kept = Vec::new();
    for child in &node.children {
        if child.group == node.group {
            let grandchildren = split_children(child, orphans);
            kept.push(BucketNode {
                bucket: child.bucket.clone(),
                group: child.group,
                children: grandchildren,
            });
        } else {
            let mut nested = Vec::new();
            let children = split_children(child, &mut nested);
            orphans.push(GroupEntry {
                bucket: child.bucket.clone(),
                group: child.group,
                children,
                orphan_of: Some(node.bucket.name.clone()),
            });
            orphans.extend(nested);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bucket_tree::build_tree;

    fn bucket(id: i64, name: &str, parent_id: Option<i64>, group: Option<BucketGroup>) -> Bucket {
        Bucket {
            id,
            name: name.into(),
            group,
            parent_id,
            icon: None,
            rollover: false,
            is_shared: false,
            limit_a: 0.0,
            limit_b: 0.0,
            tags: Vec::new(),
        }
    }

    fn names(entries: &[GroupEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.bucket.name.as_str()).collect()
    }

    #[test]
    fn test_orphan_promoted_to_its_own_group() {
        let tree = build_tree(&[
            bucket(1, "Housing", None, Some(BucketGroup::NonDiscretionary)),
            bucket(2, "Rent", Some(1), Some(BucketGroup::NonDiscretionary)),
            bucket(3, "Decor", Some(1), Some(BucketGroup::Discretionary)),
        ]);
        let parts = partition(&tree);

        assert_eq!(names(&parts.needs), vec!["Housing"]);
        let housing = &parts.needs[0];
        assert_eq!(housing.children.len(), 1);
        assert_eq!(housing.children[0].bucket.name, "Rent");

        assert_eq!(names(&parts.wants), vec!["Decor"]);
        let decor = &parts.wants[0];
        assert_eq!(decor.orphan_of.as_deref(), Some("Housing"));
        assert!(decor.children.is_empty());
        assert_eq!(decor.display_name(), "Decor *");
    }

    #[test]
    fn test_child_without_group_stays_with_parent() {
        let tree = build_tree(&[
            bucket(1, "Housing", None, Some(BucketGroup::NonDiscretionary)),
            bucket(2, "Utilities", Some(1), None),
        ]);
        let parts = partition(&tree);
        assert_eq!(parts.needs[0].children.len(), 1);
        assert!(parts.wants.is_empty());
    }

    #[test]
    fn test_ungrouped_root_is_a_want() {
        let tree = build_tree(&[bucket(1, "Misc", None, None)]);
        let parts = partition(&tree);
        assert_eq!(names(&parts.wants), vec!["Misc"]);
    }

    #[test]
    fn test_income_excluded() {
        let tree = build_tree(&[
            bucket(1, "Salary", None, Some(BucketGroup::Income)),
            bucket(2, "Bonus", Some(1), None),
            bucket(3, "Side gig costs", Some(1), Some(BucketGroup::Discretionary)),
            bucket(4, "Food", None, Some(BucketGroup::NonDiscretionary)),
            bucket(5, "Refunds", Some(4), Some(BucketGroup::Income)),
        ]);
        let parts = partition(&tree);
        assert_eq!(names(&parts.needs), vec!["Food"]);
        assert!(parts.needs[0].children.is_empty());
        assert_eq!(names(&parts.wants), vec!["Side gig costs"]);
    }

    #[test]
    fn test_income_entries_follow_group_split() {
        let tree = build_tree(&[
            bucket(1, "Salary", None, Some(BucketGroup::Income)),
            bucket(2, "Bonus", Some(1), None),
            bucket(3, "Side gig costs", Some(1), Some(BucketGroup::Discretionary)),
            bucket(4, "Food", None, Some(BucketGroup::NonDiscretionary)),
            bucket(5, "Refunds", Some(4), Some(BucketGroup::Income)),
        ]);
        let income = income_entries(&tree);
        assert_eq!(names(&income), vec!["Salary", "Refunds"]);

        let salary = &income[0];
        assert_eq!(salary.children.len(), 1);
        assert_eq!(salary.children[0].bucket.name, "Bonus");
        assert!(!salary.is_orphan());

        let refunds = &income[1];
        assert_eq!(refunds.orphan_of.as_deref(), Some("Food"));
        assert_eq!(refunds.display_name(), "Refunds *");

        let parts = partition(&tree);
        assert_eq!(parts.len() + income.iter().map(GroupEntry::size).sum::<usize>(), 5);
    }

    #[test]
    fn test_every_non_income_bucket_lands_once() {
        let groups = [
            None,
            Some(BucketGroup::NonDiscretionary),
            Some(BucketGroup::Discretionary),
        ];
        let input: Vec<Bucket> = (0..30i64)
            .map(|i| {
                let parent = if i < 4 { None } else { Some(i / 3) };
                bucket(i, &format!("b{}", i), parent, groups[(i % 3) as usize])
            })
            .collect();
        let tree = build_tree(&input);
        let parts = partition(&tree);
        assert_eq!(parts.len(), input.len());

        let mut seen: Vec<i64> = Vec::new();
        fn collect(nodes: &[BucketNode], out: &mut Vec<i64>) {
            for n in nodes {
                out.push(n.bucket.id);
                collect(&n.children, out);
            }
        }
        for entry in parts.needs.iter().chain(parts.wants.iter()) {
            seen.push(entry.bucket.id);
            collect(&entry.children, &mut seen);
        }
        seen.sort();
        let expected: Vec<i64> = (0..30).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_deep_orphan_keeps_parent_reference() {
        let tree = build_tree(&[
            bucket(1, "Food", None, Some(BucketGroup::NonDiscretionary)),
            bucket(2, "Groceries", Some(1), None),
            bucket(3, "Treats", Some(2), Some(BucketGroup::Discretionary)),
        ]);
        let parts = partition(&tree);
        assert_eq!(parts.needs[0].size(), 2);
        assert_eq!(parts.wants[0].orphan_of.as_deref(), Some("Groceries"));
    }
}
