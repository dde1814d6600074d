//! Tree builder: flat parent-referencing records in, ordered forest out.
//!
//! Nodes live in one arena and relations are indices into it. Output order
//! follows input order; callers that want chronological siblings hand the
//! records over sorted by creation time.

use std::collections::HashMap;

use serde::Serialize;

use crate::calculation::TreeRecord;
use crate::ids::CalculationId;

/// A record together with its nested children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub calculation: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

#[derive(Debug)]
pub struct Forest<T> {
    nodes: Vec<T>,
    index: HashMap<CalculationId, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    reachable: Vec<bool>,
}

/// Assemble a forest in two passes: index every record by id, then attach
/// each record to its parent.
///
/// A record whose parent is not in the input is an orphan and is left out of
/// the forest, together with anything that descends from it. Repeated ids
/// keep their first occurrence.
pub fn build_forest<T, I>(records: I) -> Forest<T>
where
    T: TreeRecord,
    I: IntoIterator<Item = T>,
{
    assemble(records, |record| record.parent_id().is_none())
}

/// Assemble the single tree headed by `root_id`, treating that record as the
/// root even if it names a parent. Used when the true root is unreachable and
/// an ancestor stands in for it.
pub fn build_tree<T, I>(root_id: CalculationId, records: I) -> Option<TreeNode<T>>
where
    T: TreeRecord,
    I: IntoIterator<Item = T>,
{
    assemble(records, |record| record.id() == root_id)
        .into_trees()
        .into_iter()
        .next()
}

fn assemble<T, I, R>(records: I, is_root: R) -> Forest<T>
where
    T: TreeRecord,
    I: IntoIterator<Item = T>,
    R: Fn(&T) -> bool,
{
    let mut nodes = Vec::new();
    let mut index = HashMap::new();
    for record in records {
        let id = record.id();
        if index.contains_key(&id) {
            continue;
        }
        index.insert(id, nodes.len());
        nodes.push(record);
    }

    let mut children = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        if is_root(node) {
            roots.push(idx);
            continue;
        }
        if let Some(parent_id) = node.parent_id()
            && let Some(&parent) = index.get(&parent_id)
            && parent != idx
        {
            children[parent].push(idx);
        }
    }

    // Anything not reachable from a root is an orphan or sits under one.
    let mut reachable = vec![false; nodes.len()];
    let mut stack: Vec<usize> = roots.clone();
    while let Some(idx) = stack.pop() {
        if reachable[idx] {
            continue;
        }
        reachable[idx] = true;
        stack.extend(children[idx].iter().copied());
    }

    Forest { nodes, index, children, roots, reachable }
}

impl<T: TreeRecord> Forest<T> {
    /// Records placed in the forest.
    pub fn len(&self) -> usize {
        self.reachable.iter().filter(|r| **r).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn roots(&self) -> impl Iterator<Item = &T> + '_ {
        self.roots.iter().map(|&idx| &self.nodes[idx])
    }

    pub fn get(&self, id: CalculationId) -> Option<&T> {
        self.index
            .get(&id)
            .filter(|&&idx| self.reachable[idx])
            .map(|&idx| &self.nodes[idx])
    }

    pub fn children_of(&self, id: CalculationId) -> Vec<&T> {
        match self.index.get(&id) {
            Some(&idx) if self.reachable[idx] => {
                self.children[idx].iter().map(|&c| &self.nodes[c]).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Ids of records left out of the forest, in input order.
    pub fn orphans(&self) -> Vec<CalculationId> {
        self.nodes
            .iter()
            .zip(&self.reachable)
            .filter(|(_, reached)| !**reached)
            .map(|(node, _)| node.id())
            .collect()
    }

    /// Consume the arena into nested trees, one per root.
    pub fn into_trees(self) -> Vec<TreeNode<T>> {
        // Pre-order puts every parent before its descendants, so walking it
        // backwards builds children before the node that owns them.
        let mut preorder = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            preorder.push(idx);
            stack.extend(self.children[idx].iter().rev().copied());
        }

        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(Some).collect();
        let mut built: Vec<Option<TreeNode<T>>> = Vec::with_capacity(slots.len());
        built.resize_with(slots.len(), || None);

        for &idx in preorder.iter().rev() {
            let Some(calculation) = slots[idx].take() else {
                continue;
            };
            let children = self.children[idx]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[idx] = Some(TreeNode { calculation, children });
        }

        self.roots
            .iter()
            .filter_map(|&idx| built[idx].take())
            .collect()
    }
}

/// Flatten trees back into records, parents before children.
pub fn flatten_preorder<T: Clone>(trees: &[TreeNode<T>]) -> Vec<T> {
    let mut out = Vec::new();
    let mut stack: Vec<&TreeNode<T>> = trees.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.calculation.clone());
        stack.extend(node.children.iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Rec {
        id: CalculationId,
        parent: Option<CalculationId>,
    }

    impl TreeRecord for Rec {
        fn id(&self) -> CalculationId {
            self.id
        }

        fn parent_id(&self) -> Option<CalculationId> {
            self.parent
        }
    }

    fn rec(id: i64, parent: Option<i64>) -> Rec {
        Rec {
            id: CalculationId::new(id),
            parent: parent.map(CalculationId::new),
        }
    }

    fn ids<T: TreeRecord>(nodes: &[TreeNode<T>]) -> Vec<i64> {
        nodes.iter().map(|n| n.calculation.id().get()).collect()
    }

    fn edges(trees: &[TreeNode<Rec>]) -> Vec<(i64, Option<i64>)> {
        let mut out: Vec<_> = flatten_preorder(trees)
            .into_iter()
            .map(|r| (r.id.get(), r.parent.map(|p| p.get())))
            .collect();
        out.sort();
        out
    }

    #[test]
    fn single_root_has_no_children() {
        let trees = build_forest(vec![rec(1, None)]).into_trees();
        assert_eq!(trees.len(), 1);
        assert!(trees[0].children.is_empty());
    }

    #[test]
    fn empty_input_gives_empty_forest() {
        let forest = build_forest(Vec::<Rec>::new());
        assert!(forest.is_empty());
        assert!(forest.into_trees().is_empty());
    }

    #[test]
    fn orphan_is_excluded() {
        let forest = build_forest(vec![rec(1, None), rec(2, Some(5))]);
        assert_eq!(forest.orphans(), vec![CalculationId::new(2)]);
        assert!(forest.get(CalculationId::new(2)).is_none());

        let trees = forest.into_trees();
        assert_eq!(ids(&trees), vec![1]);
        assert!(trees[0].children.is_empty());
    }

    #[test]
    fn descendants_of_orphans_are_excluded_too() {
        let forest = build_forest(vec![rec(3, Some(2)), rec(2, Some(99)), rec(1, None)]);
        assert_eq!(forest.len(), 1);
        assert_eq!(
            forest.orphans(),
            vec![CalculationId::new(3), CalculationId::new(2)]
        );
    }

    #[test]
    fn parent_cycles_and_self_parents_are_excluded() {
        let forest = build_forest(vec![
            rec(1, None),
            rec(2, Some(3)),
            rec(3, Some(2)),
            rec(4, Some(4)),
        ]);
        assert_eq!(forest.root_count(), 1);
        assert_eq!(forest.orphans().len(), 3);
        assert_eq!(forest.into_trees()[0].node_count(), 1);
    }

    #[test]
    fn roots_and_siblings_keep_input_order() {
        let trees = build_forest(vec![
            rec(7, None),
            rec(3, None),
            rec(9, Some(3)),
            rec(4, Some(3)),
            rec(5, Some(7)),
        ])
        .into_trees();
        assert_eq!(ids(&trees), vec![7, 3]);
        assert_eq!(ids(&trees[0].children), vec![5]);
        assert_eq!(ids(&trees[1].children), vec![9, 4]);
    }

    #[test]
    fn roots_iterate_in_input_order_without_orphans() {
        let forest = build_forest(vec![rec(4, None), rec(5, Some(99)), rec(2, None), rec(6, Some(4))]);
        let roots: Vec<_> = forest.roots().map(|r| r.id.get()).collect();
        assert_eq!(roots, vec![4, 2]);
    }

    #[test]
    fn children_listed_before_parent_still_attach() {
        let trees = build_forest(vec![rec(3, Some(2)), rec(2, Some(1)), rec(1, None)]).into_trees();
        assert_eq!(ids(&trees), vec![1]);
        assert_eq!(ids(&trees[0].children), vec![2]);
        assert_eq!(ids(&trees[0].children[0].children), vec![3]);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let forest = build_forest(vec![rec(1, None), rec(2, Some(1)), rec(2, None)]);
        assert_eq!(forest.root_count(), 1);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.children_of(CalculationId::new(1)).len(), 1);
    }

    #[test]
    fn rebuilding_a_flattened_forest_is_isomorphic() {
        let original = build_forest(vec![
            rec(1, None),
            rec(2, Some(1)),
            rec(3, Some(1)),
            rec(4, Some(2)),
            rec(5, None),
            rec(6, Some(5)),
            rec(7, Some(4)),
        ])
        .into_trees();

        let mut flat = flatten_preorder(&original);
        assert_eq!(flat.len(), 7);

        let rebuilt = build_forest(flat.clone()).into_trees();
        assert_eq!(rebuilt, original);

        flat.reverse();
        flat.rotate_left(3);
        let shuffled = build_forest(flat).into_trees();
        assert_eq!(edges(&shuffled), edges(&original));
        assert_eq!(shuffled.iter().map(TreeNode::node_count).sum::<usize>(), 7);
    }

    #[test]
    fn anchored_tree_accepts_a_root_with_a_missing_parent() {
        let records = vec![rec(3, Some(2)), rec(4, Some(3)), rec(5, Some(3))];
        assert!(build_forest(records.clone()).into_trees().is_empty());

        let tree = build_tree(CalculationId::new(3), records).unwrap();
        assert_eq!(tree.calculation.id.get(), 3);
        assert_eq!(ids(&tree.children), vec![4, 5]);
    }

    #[test]
    fn anchored_tree_of_a_healthy_subtree_matches_the_forest() {
        let records = vec![rec(1, None), rec(2, Some(1)), rec(3, Some(2))];
        let forest = build_forest(records.clone()).into_trees();
        assert_eq!(build_tree(CalculationId::new(1), records), forest.into_iter().next());
        assert!(build_tree(CalculationId::new(9), vec![rec(1, None)]).is_none());
    }

    #[test]
    fn long_chain_assembles() {
        let mut records = vec![rec(0, None)];
        records.extend((1..2_000).map(|i| rec(i, Some(i - 1))));
        let trees = build_forest(records).into_trees();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].node_count(), 2_000);
        assert_eq!(flatten_preorder(&trees).len(), 2_000);
    }
}
