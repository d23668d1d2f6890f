//! The CF-tree used by BIRCH.
//!
//! A height-balanced tree of [`ClusteringFeature`]s. Vectors descend from the
//! root to the nearest leaf-level node, where they are either absorbed by the
//! nearest leaf (if the absorption criterion stays within the threshold) or
//! become a new leaf. Overflowing nodes are split in two with a quadratic
//! farthest-pair split, which may propagate up to the root and grow the tree
//! by one level.
//!
//! # Differences from the original BIRCH paper
//!
//! - Leaves keep the identifiers of every absorbed point, so memory is O(N)
//!   in the number of inserted points. Page-size based memory budgeting is
//!   therefore not implemented.
//! - Leaf-level and directory nodes share one capacity.
//! - Merging refinement (merge-resplit) is not implemented.
//!
//! # Rebuilds
//!
//! [`CFTree::rebuild`] raises the threshold to an estimate derived from the
//! current leaves and re-inserts every leaf into a fresh tree, producing fewer,
//! coarser leaves. The threshold never decreases.
//!
//! # Panics
//!
//! Inserting or looking up a vector whose dimensionality differs from the
//! first inserted vector panics: the caller broke the tree's contract.

mod iter;
mod node;
mod split;

use std::fmt;

use tracing::{debug, trace};

use crate::absorption::AbsorptionCriterion;
use crate::distance::BirchDistance;
use crate::error::{ClusterError, ClusterResult};
use crate::feature::ClusteringFeature;

pub use iter::{IntoLeaves, Leaves};
pub use node::{Children, LeafEntry, TreeNode};

use node::{nearest, Incoming, InsertContext, PointEntry};

/// CF-tree for single-pass micro-clustering.
///
/// # Example
///
/// ```
/// use cftree_core::{CFTree, AbsorptionKind, DistanceKind};
///
/// let mut tree = CFTree::new(
///     DistanceKind::VarianceIncrease.strategy(),
///     AbsorptionKind::Diameter.criterion(),
///     0.5,
///     4,
/// ).unwrap();
///
/// tree.insert("a", &[0.0, 0.0]);
/// tree.insert("b", &[0.1, 0.0]);
/// tree.insert("c", &[9.0, 9.0]);
///
/// assert_eq!(tree.len(), 3);
/// assert_eq!(tree.leaf_count(), 2);
/// assert_eq!(tree.find_leaf(&[0.05, 0.0]).unwrap().ids(), &["a", "b"]);
/// ```
#[derive(Debug)]
pub struct CFTree<I> {
    distance: Box<dyn BirchDistance>,
    absorption: Box<dyn AbsorptionCriterion>,
    thresholdsq: f64,
    capacity: usize,
    root: Option<TreeNode<I>>,
    leaves: usize,
}

impl<I> CFTree<I> {
    /// Create an empty tree.
    ///
    /// # Arguments
    ///
    /// * `distance` - Strategy used to pick the child to descend into and to split nodes
    /// * `absorption` - Criterion deciding whether a leaf absorbs a vector
    /// * `threshold` - Initial absorption threshold (compared after squaring)
    /// * `capacity` - Branching factor: maximum children per node
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::InvalidParameter` if:
    /// - capacity < 2
    /// - threshold < 0.0 or threshold is NaN/Infinity
    pub fn new(
        distance: Box<dyn BirchDistance>,
        absorption: Box<dyn AbsorptionCriterion>,
        threshold: f64,
        capacity: usize,
    ) -> ClusterResult<Self> {
        if capacity < 2 {
            return Err(ClusterError::invalid_parameter(format!(
                "capacity must be >= 2, got {}. Splitting a node needs room for two children.",
                capacity
            )));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ClusterError::invalid_parameter(format!(
                "threshold must be >= 0.0 and finite, got {}",
                threshold
            )));
        }

        Ok(Self {
            distance,
            absorption,
            thresholdsq: threshold * threshold,
            capacity,
            root: None,
            leaves: 0,
        })
    }

    /// Insert an identified vector.
    ///
    /// The first vector fixes the tree's dimensionality.
    ///
    /// # Panics
    ///
    /// Panics if `point` does not have the tree's dimensionality.
    pub fn insert(&mut self, id: I, point: &[f64]) {
        if let Some(root) = &self.root {
            assert_dimensionality(root.cf.dimensionality(), point.len());
        }
        let root = match self.root.take() {
            None => {
                self.leaves = 1;
                TreeNode::with_leaf(LeafEntry::from_point(id, point), self.capacity)
            }
            Some(root) => self.insert_entry(root, PointEntry { id, point }),
        };
        self.root = Some(root);
    }

    /// Insert into a non-empty tree, growing a new root if the old one splits.
    fn insert_entry<E: Incoming<I>>(&mut self, mut root: TreeNode<I>, entry: E) -> TreeNode<I> {
        let mut ctx = InsertContext {
            distance: self.distance.as_ref(),
            absorption: self.absorption.as_ref(),
            thresholdsq: self.thresholdsq,
            capacity: self.capacity,
            leaves: &mut self.leaves,
        };
        match root.insert(entry, &mut ctx) {
            None => root,
            Some(sibling) => {
                trace!(
                    root_n = root.cf.n,
                    sibling_n = sibling.cf.n,
                    "CF-tree root split, growing by one level"
                );
                TreeNode::with_pair(root, sibling, self.capacity)
            }
        }
    }

    /// Condense the tree by raising the threshold and re-inserting every leaf.
    ///
    /// The new squared threshold is `max(old, (Σ t / leaves)²)`, where `t`
    /// is, for every leaf, the square root of the absorption criterion
    /// against its nearest sibling leaf. Point count and identifiers are
    /// preserved; the leaf count can only shrink.
    pub fn rebuild(&mut self) {
        let Some(old_root) = self.root.take() else {
            return;
        };
        let leaves_before = self.leaves;
        let thresholdsq_before = self.thresholdsq;

        let estimate = old_root
            .estimate_threshold(self.distance.as_ref(), self.absorption.as_ref())
            / leaves_before.max(1) as f64;
        self.thresholdsq = self.thresholdsq.max(estimate * estimate);

        // The old tree stays alive inside the iterator until its last leaf
        // has been moved into the new tree.
        let mut old_leaves = IntoLeaves::new(Some(old_root));
        let Some(first) = old_leaves.next() else {
            self.leaves = 0;
            return;
        };
        self.leaves = 1;
        let mut root = TreeNode::with_leaf(first, self.capacity);
        for leaf in old_leaves {
            root = self.insert_entry(root, leaf);
        }
        self.root = Some(root);

        debug!(
            leaves_before,
            leaves_after = self.leaves,
            thresholdsq_before,
            thresholdsq_after = self.thresholdsq,
            "Rebuilt CF-tree"
        );
    }

    /// Find the leaf a vector would be routed to, without modifying the tree.
    ///
    /// Returns `None` if the tree is empty. Unlike insertion, the absorption
    /// threshold is not consulted: the nearest leaf is always returned.
    ///
    /// # Panics
    ///
    /// Panics if `point` does not have the tree's dimensionality.
    pub fn find_leaf(&self, point: &[f64]) -> Option<&LeafEntry<I>> {
        let mut node = self.root.as_ref()?;
        assert_dimensionality(node.cf.dimensionality(), point.len());
        let distance = self.distance.as_ref();
        loop {
            match &node.children {
                Children::Leaves(leaves) => {
                    let best = nearest(leaves.as_slice(), |leaf| {
                        distance.squared_distance_to_point(point, &leaf.cf)
                    });
                    return Some(&leaves[best]);
                }
                Children::Nodes(nodes) => {
                    let best = nearest(nodes.as_slice(), |child| {
                        distance.squared_distance_to_point(point, &child.cf)
                    });
                    node = &nodes[best];
                }
            }
        }
    }

    /// Iterate over all leaf entries, depth-first.
    pub fn leaves(&self) -> Leaves<'_, I> {
        Leaves::new(self.root.as_ref())
    }

    /// Consume the tree, yielding owned leaf entries depth-first.
    pub fn into_leaves(self) -> IntoLeaves<I> {
        IntoLeaves::new(self.root)
    }

    /// Root node, `None` before the first insertion.
    #[inline]
    pub fn root(&self) -> Option<&TreeNode<I>> {
        self.root.as_ref()
    }

    /// Total number of inserted points.
    #[inline]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.cf.n)
    }

    /// True before the first insertion.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of leaf entries, maintained incrementally.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Number of node levels from the root down to the leaf-level nodes.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self.root.as_ref();
        while let Some(current) = node {
            height += 1;
            node = match &current.children {
                Children::Nodes(nodes) => nodes.first(),
                Children::Leaves(_) => None,
            };
        }
        height
    }

    /// Dimensionality fixed by the first insertion.
    pub fn dimensionality(&self) -> Option<usize> {
        self.root.as_ref().map(|root| root.cf.dimensionality())
    }

    /// Branching factor.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current squared absorption threshold.
    #[inline]
    pub fn thresholdsq(&self) -> f64 {
        self.thresholdsq
    }

    /// Current absorption threshold.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.thresholdsq.sqrt()
    }

    /// Distance strategy used for descent and splits.
    pub fn distance(&self) -> &dyn BirchDistance {
        self.distance.as_ref()
    }

    /// Absorption criterion used at the leaves.
    pub fn absorption(&self) -> &dyn AbsorptionCriterion {
        self.absorption.as_ref()
    }
}

fn assert_dimensionality(expected: usize, actual: usize) {
    assert_eq!(
        expected, actual,
        "vector dimensionality {} does not match CF-tree dimensionality {}",
        actual, expected
    );
}

/// One line per node and leaf, indented by depth: `n c_0 c_1 ...`.
impl<I> fmt::Display for CFTree<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn line(
            f: &mut fmt::Formatter<'_>,
            cf: &ClusteringFeature,
            depth: usize,
        ) -> fmt::Result {
            write!(f, "{:indent$}{}", "", cf.n, indent = depth)?;
            for i in 0..cf.dimensionality() {
                write!(f, " {}", cf.centroid_at(i))?;
            }
            writeln!(f)
        }

        fn node<I>(f: &mut fmt::Formatter<'_>, n: &TreeNode<I>, depth: usize) -> fmt::Result {
            line(f, &n.cf, depth)?;
            match &n.children {
                Children::Leaves(leaves) => {
                    for leaf in leaves {
                        line(f, &leaf.cf, depth + 1)?;
                    }
                }
                Children::Nodes(nodes) => {
                    for child in nodes {
                        node(f, child, depth + 1)?;
                    }
                }
            }
            Ok(())
        }

        match &self.root {
            Some(root) => node(f, root, 0),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absorption::{AbsorptionKind, DiameterCriterion};
    use crate::distance::{CentroidEuclidean, DistanceKind};

    fn tree(threshold: f64, capacity: usize) -> CFTree<usize> {
        CFTree::new(
            Box::new(CentroidEuclidean),
            Box::new(DiameterCriterion),
            threshold,
            capacity,
        )
        .expect("valid tree")
    }

    /// Walk the tree checking every structural invariant.
    fn check_node(node: &TreeNode<usize>, capacity: usize) -> usize {
        assert!(!node.children.is_empty(), "empty node");
        assert!(node.children.len() <= capacity, "overfull node");
        let mut sum = ClusteringFeature::new(node.cf.dimensionality());
        let mut leaves = 0;
        match &node.children {
            Children::Leaves(entries) => {
                for leaf in entries {
                    assert_eq!(leaf.n(), leaf.ids().len());
                    sum.merge(&leaf.cf);
                    leaves += 1;
                }
            }
            Children::Nodes(nodes) => {
                for child in nodes {
                    leaves += check_node(child, capacity);
                    sum.merge(&child.cf);
                }
            }
        }
        assert_eq!(sum.n, node.cf.n, "node n is not the sum of its children");
        for (a, b) in sum.ls.iter().zip(&node.cf.ls) {
            assert!((a - b).abs() < 1e-6, "node LS drifted");
        }
        assert!((sum.ss - node.cf.ss).abs() < 1e-6 * sum.ss.max(1.0), "node SS drifted");
        leaves
    }

    fn check(tree: &CFTree<usize>) {
        match tree.root() {
            Some(root) => {
                assert_eq!(check_node(root, tree.capacity()), tree.leaf_count());
            }
            None => assert_eq!(tree.leaf_count(), 0),
        }
        assert_eq!(tree.leaves().count(), tree.leaf_count());
    }

    #[test]
    fn test_new_validates_parameters() {
        let err = CFTree::<u32>::new(
            DistanceKind::default().strategy(),
            AbsorptionKind::default().criterion(),
            1.0,
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("capacity"));

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let result = CFTree::<u32>::new(
                DistanceKind::default().strategy(),
                AbsorptionKind::default().criterion(),
                bad,
                4,
            );
            assert!(matches!(result, Err(ClusterError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_empty_tree() {
        let t = tree(1.0, 4);
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.height(), 0);
        assert_eq!(t.dimensionality(), None);
        assert!(t.find_leaf(&[0.0]).is_none());
        assert_eq!(t.leaves().count(), 0);
        assert_eq!(t.to_string(), "");
    }

    #[test]
    fn test_first_insert_creates_degree_one_root() {
        let mut t = tree(0.0, 4);
        t.insert(0, &[1.0, 2.0]);

        let root = t.root().expect("root");
        assert!(root.is_leaf_level());
        assert_eq!(root.children().len(), 1);
        assert_eq!(t.height(), 1);
        assert_eq!(t.dimensionality(), Some(2));
        check(&t);
    }

    #[test]
    fn test_absorb_within_threshold() {
        let mut t = tree(1.0, 4);
        t.insert(0, &[0.0, 0.0]);
        t.insert(1, &[0.5, 0.0]); // diameter 0.5 <= 1
        t.insert(2, &[3.0, 0.0]); // would grow the diameter past 1

        assert_eq!(t.leaf_count(), 2);
        assert_eq!(t.len(), 3);
        let leaf = t.find_leaf(&[0.2, 0.0]).expect("leaf");
        assert_eq!(leaf.ids(), &[0, 1]);
        check(&t);
    }

    #[test]
    fn test_leaf_level_split_grows_root() {
        let mut t = tree(0.0, 3);
        for i in 0..4 {
            t.insert(i, &[i as f64 * 10.0, 0.0]);
        }

        let root = t.root().expect("root");
        assert!(!root.is_leaf_level());
        assert_eq!(root.children().len(), 2);
        assert_eq!(t.height(), 2);
        assert_eq!(t.leaf_count(), 4);
        check(&t);
    }

    #[test]
    fn test_deep_tree_keeps_invariants() {
        let mut t = tree(0.0, 2);
        for i in 0..64 {
            let x = (i * 37 % 64) as f64;
            t.insert(i, &[x, (i % 7) as f64]);
        }

        assert_eq!(t.leaf_count(), 64);
        assert!(t.height() >= 6, "binary tree over 64 leaves, got {}", t.height());
        check(&t);
    }

    #[test]
    fn test_leaves_are_visited_depth_first_last_child_first() {
        let mut t = tree(0.0, 4);
        for i in 0..3 {
            t.insert(i, &[i as f64 * 100.0]);
        }

        let order: Vec<usize> = t.leaves().map(|leaf| leaf.ids()[0]).collect();
        assert_eq!(order, vec![2, 1, 0]);

        let owned: Vec<usize> = t.into_leaves().map(|leaf| leaf.ids()[0]).collect();
        assert_eq!(owned, vec![2, 1, 0]);
    }

    #[test]
    fn test_rebuild_coarsens_and_conserves() {
        let mut t = tree(0.0, 4);
        for i in 0..40 {
            // Pairs of nearby points: (k, 0) and (k + 0.1, 0).
            let base = (i / 2) as f64 * 5.0;
            let offset = if i % 2 == 0 { 0.0 } else { 0.1 };
            t.insert(i, &[base + offset, 0.0]);
        }
        assert_eq!(t.leaf_count(), 40);
        let before = t.thresholdsq();

        t.rebuild();

        assert!(t.thresholdsq() >= before);
        assert!(t.leaf_count() <= 40);
        assert_eq!(t.len(), 40);
        let mut ids: Vec<usize> = t.leaves().flat_map(|l| l.ids().to_vec()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
        check(&t);
    }

    #[test]
    fn test_rebuild_on_empty_tree_is_noop() {
        let mut t = tree(0.5, 4);
        t.rebuild();
        assert!(t.is_empty());
        assert_eq!(t.thresholdsq(), 0.25);
    }

    #[test]
    fn test_rebuild_single_leaf_keeps_threshold() {
        let mut t = tree(0.5, 4);
        t.insert(0, &[1.0]);
        t.rebuild();
        assert_eq!(t.thresholdsq(), 0.25);
        assert_eq!(t.leaf_count(), 1);
        check(&t);
    }

    #[test]
    fn test_rebuild_threshold_estimate_exact() {
        // Leaves 0, 1, 3 share one node. Nearest siblings by centroid
        // distance: 0 -> 1, 1 -> 0, 3 -> 1. Diameters of those pairs are
        // 1, 1 and 2, so the estimate is ((1 + 1 + 2) / 3)².
        let mut t = tree(0.0, 4);
        for (id, x) in [0.0, 1.0, 3.0].into_iter().enumerate() {
            t.insert(id, &[x]);
        }
        assert_eq!(t.leaf_count(), 3);

        t.rebuild();

        let expected = (4.0f64 / 3.0).powi(2);
        assert!(
            (t.thresholdsq() - expected).abs() < 1e-12,
            "thresholdsq = {}, expected {}",
            t.thresholdsq(),
            expected
        );
        assert_eq!(t.leaf_count(), 2);
        check(&t);
    }

    #[test]
    fn test_rebuild_first_dfs_leaf_seeds_new_root() {
        let mut t = tree(0.0, 4);
        for (id, x) in [0.0, 1.0, 3.0].into_iter().enumerate() {
            t.insert(id, &[x]);
        }
        let first_dfs = t.leaves().next().expect("leaf").ids().to_vec();
        assert_eq!(first_dfs, vec![2]);

        t.rebuild();

        // 3 seeds the root, 1 becomes a second leaf (diameter² 4 exceeds
        // 16/9) and 0 is absorbed by the leaf holding 1.
        let root = t.root().expect("root");
        match root.children() {
            Children::Leaves(leaves) => {
                assert_eq!(leaves.len(), 2);
                assert_eq!(leaves[0].ids(), first_dfs.as_slice());
                assert_eq!(leaves[1].ids(), &[1, 0]);
            }
            Children::Nodes(_) => panic!("expected a leaf-level root"),
        }
    }

    #[test]
    #[should_panic(expected = "does not match CF-tree dimensionality")]
    fn test_insert_dimension_mismatch_panics() {
        let mut t = tree(1.0, 4);
        t.insert(0, &[1.0, 2.0, 3.0]);
        t.insert(1, &[1.0, 2.0]);
    }

    #[test]
    fn test_display_prints_one_line_per_entry() {
        let mut t = tree(0.0, 4);
        t.insert(0, &[1.0, 2.0]);
        t.insert(1, &[3.0, 4.0]);

        let dump = t.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines, vec!["2 2 3", " 1 1 2", " 1 3 4"]);
    }
}
