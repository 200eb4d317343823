//! Flat bucket lists to owned trees.
//!
//! Group defaulting happens here and nowhere else: a bucket without a group
//! inherits its parent's effective group, and a root without a group is
//! `Discretionary`.

use std::collections::{HashMap, HashSet};

use crate::models::{Bucket, BucketGroup, BucketNode, BucketOption, BucketRecord};

/// Build a forest from buckets carrying optional parent references.
///
/// Roots are buckets without a parent or whose parent is not in `buckets`.
/// Roots and siblings keep input order. The result is total: every input
/// bucket appears exactly once, even for cyclic parent chains, whose
/// unreachable members are promoted to roots in input order.
pub fn build_tree(buckets: &[Bucket]) -> Vec<BucketNode> {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(buckets.len());
    for (i, bucket) in buckets.iter().enumerate() {
        index.entry(bucket.id).or_insert(i);
    }

    let mut children_of: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (i, bucket) in buckets.iter().enumerate() {
        match bucket.parent_id {
            Some(parent_id) if index.contains_key(&parent_id) => {
                children_of.entry(parent_id).or_default().push(i);
            }
            _ => roots.push(i),
        }
    }

    let builder = TreeBuilder {
        buckets,
        children_of: &children_of,
    };
    let mut visited = vec![false; buckets.len()];
    let mut forest: Vec<BucketNode> = roots
        .into_iter()
        .map(|i| builder.build(i, None, &mut visited))
        .collect();

    for i in 0..buckets.len() {
        if !visited[i] {
            tracing::warn!(bucket_id = buckets[i].id, "bucket parent chain is cyclic");
            forest.push(builder.build(i, None, &mut visited));
        }
    }

    forest
}

struct TreeBuilder<'a> {
    buckets: &'a [Bucket],
    children_of: &'a HashMap<i64, Vec<usize>>,
}

impl TreeBuilder<'_> {
    fn build(&self, i: usize, parent_group: Option<BucketGroup>, visited: &mut [bool]) -> BucketNode {
        visited[i] = true;
        let bucket = &self.buckets[i];
        let group = bucket.group.or(parent_group).unwrap_or_default();

        let mut children = Vec::new();
        if let Some(child_indices) = self.children_of.get(&bucket.id) {
            for &child in child_indices {
                if !visited[child] {
                    children.push(self.build(child, Some(group), visited));
                }
            }
        }

        BucketNode {
            bucket: bucket.clone(),
            group,
            children,
        }
    }
}

/// Flatten the tree-shaped payload into plain buckets. Nesting wins over a
/// missing `parent_id`.
pub fn flatten_records(records: Vec<BucketRecord>) -> Vec<Bucket> {
    let mut out = Vec::new();
    for record in records {
        flatten_record(record, None, &mut out);
    }
    out
}

fn flatten_record(record: BucketRecord, parent_id: Option<i64>, out: &mut Vec<Bucket>) {
    let BucketRecord {
        mut bucket,
        children,
    } = record;
    if bucket.parent_id.is_none() {
        bucket.parent_id = parent_id;
    }
    let id = bucket.id;
    out.push(bucket);
    for child in children {
        flatten_record(child, Some(id), out);
    }
}

/// Depth-first options for hierarchical `<select>` elements.
pub fn flatten_for_select(forest: &[BucketNode]) -> Vec<BucketOption> {
    let mut out = Vec::new();
    for node in forest {
        push_options(node, 0, "", &mut out);
    }
    out
}

fn push_options(node: &BucketNode, depth: usize, prefix: &str, out: &mut Vec<BucketOption>) {
    let path = if prefix.is_empty() {
        node.bucket.name.clone()
    } else {
        format!("{} > {}", prefix, node.bucket.name)
    };
    out.push(BucketOption {
        id: node.bucket.id,
        name: node.bucket.name.clone(),
        path: path.clone(),
        depth,
        group: node.group,
    });
    for child in &node.children {
        push_options(child, depth + 1, &path, out);
    }
}

/// Total number of nodes at every depth.
pub fn count(forest: &[BucketNode]) -> usize {
    forest.iter().map(BucketNode::size).sum()
}

/// Walk the ancestor chain of `proposed_parent`; meeting `bucket_id` means
/// the new parent would close a cycle. Existing cycles in the data stop the
/// walk instead of looping.
pub fn creates_cycle(buckets: &[Bucket], bucket_id: i64, proposed_parent: Option<i64>) -> bool {
    let parents: HashMap<i64, Option<i64>> = buckets.iter().map(|b| (b.id, b.parent_id)).collect();
    let mut seen = HashSet::new();
    let mut current = proposed_parent;
    while let Some(id) = current {
        if id == bucket_id {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        current = parents.get(&id).copied().flatten();
    }
    false
}

pub fn find(forest: &[BucketNode], id: i64) -> Option<&BucketNode> {
    forest.iter().find_map(|node| {
        if node.bucket.id == id {
            Some(node)
        } else {
            find(&node.children, id)
        }
    })
}
