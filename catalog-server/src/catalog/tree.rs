//! Category tree resolution
//!
//! Pure functions over a flat set of category rows. The parent chain is
//! user data and may be corrupted (orphaned parents, even cycles), so
//! every traversal carries a visited set and never trusts the rows to
//! form a proper forest.

use shared::models::{Category, CategoryNode};
use std::collections::{HashMap, HashSet, VecDeque};

/// Build a nested tree from flat category rows.
///
/// Children are grouped under their parent in row order. A row whose
/// parent is null, or references an id absent from the row set, becomes
/// a root (orphans are tolerated, not an error). Rows trapped in a
/// parent cycle are unreachable from any root and are dropped rather
/// than looped over.
pub fn build_tree(rows: &[Category]) -> Vec<CategoryNode> {
    let ids: HashSet<i64> = rows.iter().map(|c| c.id).collect();

    let mut children_of: HashMap<i64, Vec<&Category>> = HashMap::new();
    let mut roots: Vec<&Category> = Vec::new();
    for row in rows {
        match row.parent_id {
            Some(parent) if ids.contains(&parent) => {
                children_of.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    let mut visited: HashSet<i64> = roots.iter().map(|c| c.id).collect();
    roots
        .into_iter()
        .map(|root| attach_children(root, &children_of, &mut visited))
        .collect()
}

fn attach_children(
    row: &Category,
    children_of: &HashMap<i64, Vec<&Category>>,
    visited: &mut HashSet<i64>,
) -> CategoryNode {
    let mut children = Vec::new();
    if let Some(kids) = children_of.get(&row.id) {
        for kid in kids {
            if visited.insert(kid.id) {
                children.push(attach_children(kid, children_of, visited));
            }
        }
    }

    CategoryNode {
        category: row.clone(),
        product_count: None,
        children,
    }
}

/// Collect `root_id` plus every category reachable by child links.
///
/// Breadth-first with a visited set, so a corrupted parent chain cannot
/// loop forever. Returns the empty set when `root_id` is not in the row
/// set — callers treat that as "match nothing".
pub fn descendant_ids(rows: &[Category], root_id: i64) -> HashSet<i64> {
    let mut result = HashSet::new();
    if !rows.iter().any(|c| c.id == root_id) {
        return result;
    }

    let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in rows {
        if let Some(parent) = row.parent_id {
            children_of.entry(parent).or_default().push(row.id);
        }
    }

    let mut queue = VecDeque::from([root_id]);
    result.insert(root_id);
    while let Some(current) = queue.pop_front() {
        if let Some(kids) = children_of.get(&current) {
            for &kid in kids {
                if result.insert(kid) {
                    queue.push_back(kid);
                }
            }
        }
    }
    result
}
