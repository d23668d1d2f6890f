//! Tree building blocks: leaf entries, inner nodes, and what can be inserted.

use crate::absorption::AbsorptionCriterion;
use crate::distance::BirchDistance;
use crate::feature::ClusteringFeature;

use super::split::split_entries;

/// Anything stored in a node's child list.
pub(crate) trait Summarized {
    fn cf(&self) -> &ClusteringFeature;
}

// =============================================================================
// LeafEntry
// =============================================================================

/// A micro-cluster: a CF plus the identifiers of every point it absorbed.
///
/// Invariant: `cf().n == ids().len()`.
///
/// # Example
///
/// ```
/// use cftree_core::{CFTree, DistanceKind, AbsorptionKind};
///
/// let mut tree = CFTree::new(
///     DistanceKind::VarianceIncrease.strategy(),
///     AbsorptionKind::Diameter.criterion(),
///     1.0,
///     8,
/// ).unwrap();
/// tree.insert(7u32, &[1.0, 2.0]);
///
/// let leaf = tree.leaves().next().unwrap();
/// assert_eq!(leaf.ids(), &[7]);
/// assert_eq!(leaf.centroid(), vec![1.0, 2.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LeafEntry<I> {
    pub(crate) cf: ClusteringFeature,
    pub(crate) ids: Vec<I>,
}

impl<I> LeafEntry<I> {
    pub(crate) fn from_point(id: I, point: &[f64]) -> Self {
        Self {
            cf: ClusteringFeature::from_point(point),
            ids: vec![id],
        }
    }

    pub(crate) fn add_point(&mut self, id: I, point: &[f64]) {
        self.cf.add_point(point);
        self.ids.push(id);
    }

    /// Merge another leaf into this one; counts and id lists are summed together.
    pub(crate) fn absorb(&mut self, other: LeafEntry<I>) {
        self.cf.merge(&other.cf);
        self.ids.extend(other.ids);
    }

    /// Clustering feature of this leaf.
    #[inline]
    pub fn cf(&self) -> &ClusteringFeature {
        &self.cf
    }

    /// Identifiers of the absorbed points, in absorption order.
    #[inline]
    pub fn ids(&self) -> &[I] {
        &self.ids
    }

    /// Consume the leaf, returning its identifiers.
    pub fn into_ids(self) -> Vec<I> {
        self.ids
    }

    /// Number of absorbed points.
    #[inline]
    pub fn n(&self) -> usize {
        self.cf.n
    }

    /// Mean of the absorbed points.
    pub fn centroid(&self) -> Vec<f64> {
        self.cf.centroid()
    }

    /// RMS distance of the absorbed points from the centroid.
    pub fn radius(&self) -> f64 {
        self.cf.radius()
    }

    /// RMS pairwise distance between the absorbed points.
    pub fn diameter(&self) -> f64 {
        self.cf.diameter()
    }
}

impl<I> Summarized for LeafEntry<I> {
    fn cf(&self) -> &ClusteringFeature {
        &self.cf
    }
}

// =============================================================================
// TreeNode
// =============================================================================

/// Children of a [`TreeNode`]: either all leaf entries or all inner nodes.
///
/// Both lists hold at most `capacity` elements and never contain holes.
#[derive(Debug, Clone, PartialEq)]
pub enum Children<I> {
    /// Leaf-level node.
    Leaves(Vec<LeafEntry<I>>),
    /// Directory node.
    Nodes(Vec<TreeNode<I>>),
}

impl<I> Children<I> {
    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        match self {
            Children::Leaves(leaves) => leaves.len(),
            Children::Nodes(nodes) => nodes.len(),
        }
    }

    /// True if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Node of the CF-tree. Its CF is always the merge of its children's CFs.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<I> {
    pub(crate) cf: ClusteringFeature,
    pub(crate) children: Children<I>,
}

impl<I> TreeNode<I> {
    /// A leaf-level node holding a single leaf.
    pub(crate) fn with_leaf(leaf: LeafEntry<I>, capacity: usize) -> Self {
        let cf = leaf.cf.clone();
        let mut leaves = Vec::with_capacity(capacity);
        leaves.push(leaf);
        Self {
            cf,
            children: Children::Leaves(leaves),
        }
    }

    /// A directory node over two siblings (used when the root splits).
    pub(crate) fn with_pair(first: TreeNode<I>, second: TreeNode<I>, capacity: usize) -> Self {
        let mut cf = first.cf.clone();
        cf.merge(&second.cf);
        let mut nodes = Vec::with_capacity(capacity);
        nodes.push(first);
        nodes.push(second);
        Self {
            cf,
            children: Children::Nodes(nodes),
        }
    }

    /// Aggregated clustering feature of the whole subtree.
    #[inline]
    pub fn cf(&self) -> &ClusteringFeature {
        &self.cf
    }

    /// Child entries.
    #[inline]
    pub fn children(&self) -> &Children<I> {
        &self.children
    }

    /// True if the children are leaf entries.
    #[inline]
    pub fn is_leaf_level(&self) -> bool {
        matches!(self.children, Children::Leaves(_))
    }

    /// Insert `entry` below this node.
    ///
    /// Returns the new sibling if this node had to be split.
    pub(crate) fn insert<E: Incoming<I>>(
        &mut self,
        entry: E,
        ctx: &mut InsertContext<'_>,
    ) -> Option<TreeNode<I>> {
        // Every path that does not split keeps this. A split recomputes the
        // statistics of both halves from scratch.
        entry.add_to_statistics(&mut self.cf);

        match &mut self.children {
            Children::Leaves(leaves) => {
                let best = nearest(leaves.as_slice(), |leaf| {
                    entry.squared_distance(ctx.distance, &leaf.cf)
                });
                let leaf = &mut leaves[best];
                if entry.squared_criterion(ctx.absorption, &leaf.cf) <= ctx.thresholdsq {
                    entry.absorb_into(leaf);
                    return None;
                }

                *ctx.leaves += 1;
                let leaf = entry.into_leaf();
                if leaves.len() < ctx.capacity {
                    leaves.push(leaf);
                    return None;
                }

                let split = split_entries(std::mem::take(leaves), leaf, ctx.distance);
                *leaves = split.kept;
                self.cf = split.kept_cf;
                Some(TreeNode {
                    cf: split.moved_cf,
                    children: Children::Leaves(split.moved),
                })
            }
            Children::Nodes(nodes) => {
                let best = nearest(nodes.as_slice(), |node| {
                    entry.squared_distance(ctx.distance, &node.cf)
                });
                let sibling = nodes[best].insert(entry, ctx)?;
                if nodes.len() < ctx.capacity {
                    nodes.push(sibling);
                    return None;
                }

                let split = split_entries(std::mem::take(nodes), sibling, ctx.distance);
                *nodes = split.kept;
                self.cf = split.kept_cf;
                Some(TreeNode {
                    cf: split.moved_cf,
                    children: Children::Nodes(split.moved),
                })
            }
        }
    }

    /// Sum over leaf-level nodes of each leaf's criterion against its nearest sibling.
    pub(crate) fn estimate_threshold(
        &self,
        distance: &dyn BirchDistance,
        absorption: &dyn AbsorptionCriterion,
    ) -> f64 {
        match &self.children {
            Children::Leaves(leaves) => {
                let k = leaves.len();
                if k < 2 {
                    return 0.0;
                }
                let mut best = vec![f64::INFINITY; k];
                let mut best_idx = vec![0usize; k];
                let mut total = 0.0;
                for i in 0..k {
                    let (mut bi, mut bii) = (best[i], best_idx[i]);
                    for j in (i + 1)..k {
                        let dist = distance.squared_distance(&leaves[i].cf, &leaves[j].cf);
                        if dist < bi {
                            bi = dist;
                            bii = j;
                        }
                        if dist < best[j] {
                            best[j] = dist;
                            best_idx[j] = i;
                        }
                    }
                    let t = absorption.squared_criterion(&leaves[i].cf, &leaves[bii].cf);
                    total += if t > 0.0 { t.sqrt() } else { 0.0 };
                }
                total
            }
            Children::Nodes(nodes) => nodes
                .iter()
                .map(|node| node.estimate_threshold(distance, absorption))
                .sum(),
        }
    }
}

impl<I> Summarized for TreeNode<I> {
    fn cf(&self) -> &ClusteringFeature {
        &self.cf
    }
}

/// Index of the entry with the smallest distance; the first one wins ties.
///
/// # Panics
///
/// Panics if `entries` is empty: every node holds at least one child.
pub(crate) fn nearest<T>(entries: &[T], mut distance: impl FnMut(&T) -> f64) -> usize {
    assert!(!entries.is_empty(), "Unexpected empty node in CF-tree");
    let mut best = 0;
    let mut best_dist = distance(&entries[0]);
    for (i, entry) in entries.iter().enumerate().skip(1) {
        let d = distance(entry);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

// =============================================================================
// Insertion plumbing
// =============================================================================

/// Tree-wide settings threaded through a recursive insertion.
pub(crate) struct InsertContext<'a> {
    pub distance: &'a dyn BirchDistance,
    pub absorption: &'a dyn AbsorptionCriterion,
    pub thresholdsq: f64,
    pub capacity: usize,
    pub leaves: &'a mut usize,
}

/// Something that descends the tree and ends up absorbed by, or next to, a leaf.
///
/// Points are inserted during normal operation; whole leaves are re-inserted
/// during a rebuild.
pub(crate) trait Incoming<I> {
    fn squared_distance(&self, distance: &dyn BirchDistance, cf: &ClusteringFeature) -> f64;
    fn squared_criterion(
        &self,
        absorption: &dyn AbsorptionCriterion,
        leaf: &ClusteringFeature,
    ) -> f64;
    fn add_to_statistics(&self, cf: &mut ClusteringFeature);
    fn absorb_into(self, leaf: &mut LeafEntry<I>);
    fn into_leaf(self) -> LeafEntry<I>;
}

/// A single identified vector.
pub(crate) struct PointEntry<'v, I> {
    pub id: I,
    pub point: &'v [f64],
}

impl<I> Incoming<I> for PointEntry<'_, I> {
    fn squared_distance(&self, distance: &dyn BirchDistance, cf: &ClusteringFeature) -> f64 {
        distance.squared_distance_to_point(self.point, cf)
    }

    fn squared_criterion(
        &self,
        absorption: &dyn AbsorptionCriterion,
        leaf: &ClusteringFeature,
    ) -> f64 {
        absorption.squared_criterion_point(leaf, self.point)
    }

    fn add_to_statistics(&self, cf: &mut ClusteringFeature) {
        cf.add_point(self.point);
    }

    fn absorb_into(self, leaf: &mut LeafEntry<I>) {
        leaf.add_point(self.id, self.point);
    }

    fn into_leaf(self) -> LeafEntry<I> {
        LeafEntry::from_point(self.id, self.point)
    }
}

impl<I> Incoming<I> for LeafEntry<I> {
    fn squared_distance(&self, distance: &dyn BirchDistance, cf: &ClusteringFeature) -> f64 {
        distance.squared_distance(&self.cf, cf)
    }

    fn squared_criterion(
        &self,
        absorption: &dyn AbsorptionCriterion,
        leaf: &ClusteringFeature,
    ) -> f64 {
        absorption.squared_criterion(leaf, &self.cf)
    }

    fn add_to_statistics(&self, cf: &mut ClusteringFeature) {
        cf.merge(&self.cf);
    }

    fn absorb_into(self, leaf: &mut LeafEntry<I>) {
        leaf.absorb(self);
    }

    fn into_leaf(self) -> LeafEntry<I> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_first_seen_wins_ties() {
        let values = [3.0, 1.0, 1.0, 2.0];
        assert_eq!(nearest(&values, |v| *v), 1);
    }

    #[test]
    #[should_panic(expected = "Unexpected empty node")]
    fn test_nearest_panics_on_empty_node() {
        let values: [f64; 0] = [];
        nearest(&values, |v| *v);
    }

    #[test]
    fn test_leaf_absorb_keeps_count_and_ids_in_step() {
        let mut a = LeafEntry::from_point(1u32, &[0.0, 0.0]);
        a.add_point(2, &[1.0, 1.0]);
        let b = LeafEntry::from_point(3u32, &[2.0, 2.0]);

        a.absorb(b);

        assert_eq!(a.n(), 3);
        assert_eq!(a.ids(), &[1, 2, 3]);
        assert_eq!(a.centroid(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_with_pair_merges_statistics() {
        let left = TreeNode::with_leaf(LeafEntry::from_point(1u32, &[0.0, 1.0]), 4);
        let right = TreeNode::with_leaf(LeafEntry::from_point(2u32, &[2.0, 3.0]), 4);
        let parent = TreeNode::with_pair(left, right, 4);

        assert!(!parent.is_leaf_level());
        assert_eq!(parent.children().len(), 2);
        assert_eq!(parent.cf().n, 2);
        assert_eq!(parent.cf().ls, vec![2.0, 4.0]);
    }
}
