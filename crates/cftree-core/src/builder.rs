//! Factory that bulk-loads a CF-tree under a leaf budget.
//!
//! The builder inserts points one by one and rebuilds the tree with a larger
//! threshold whenever the number of leaves exceeds the budget. The budget is
//! either relative to the input size (`max_leaves <= 1`) or absolute.

use tracing::debug;

use crate::absorption::AbsorptionKind;
use crate::config::CFTreeConfig;
use crate::distance::DistanceKind;
use crate::error::{ClusterError, ClusterResult};
use crate::tree::CFTree;

/// Creates and bulk-loads [`CFTree`]s from a validated [`CFTreeConfig`].
///
/// # Example
///
/// ```
/// use cftree_core::CFTreeConfig;
///
/// let builder = CFTreeConfig::default()
///     .with_branching_factor(4)
///     .with_max_leaves(3.0)
///     .builder()
///     .unwrap();
///
/// let points: Vec<(usize, Vec<f64>)> =
///     (0..20).map(|i| (i, vec![i as f64, (i % 3) as f64])).collect();
/// let tree = builder
///     .build(points.iter().map(|(id, p)| (*id, p.as_slice())))
///     .unwrap();
///
/// assert_eq!(tree.len(), 20);
/// // Exceeding three leaves forced at least one rebuild.
/// assert!(tree.threshold() > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CFTreeBuilder {
    distance: DistanceKind,
    absorption: AbsorptionKind,
    threshold: f64,
    branching_factor: usize,
    max_leaves: f64,
}

impl CFTreeBuilder {
    /// Create a builder from a configuration, validating it first.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::Config` if the configuration is invalid.
    pub fn from_config(config: &CFTreeConfig) -> ClusterResult<Self> {
        config.validate()?;
        Ok(Self {
            distance: config.distance,
            absorption: config.absorption,
            threshold: config.threshold,
            branching_factor: config.branching_factor,
            max_leaves: config.max_leaves,
        })
    }

    /// Create an empty tree with this builder's parameters.
    pub fn new_tree<I>(&self) -> ClusterResult<CFTree<I>> {
        CFTree::new(
            self.distance.strategy(),
            self.absorption.criterion(),
            self.threshold,
            self.branching_factor,
        )
    }

    /// Leaf budget for an input of `len` points.
    ///
    /// Values up to 1 are a fraction of the input size, larger values an
    /// absolute count.
    pub fn leaf_budget(&self, len: usize) -> usize {
        if self.max_leaves <= 1.0 {
            (self.max_leaves * len as f64) as usize
        } else {
            self.max_leaves as usize
        }
    }

    /// Insert every `(id, vector)` pair into a fresh tree, rebuilding the
    /// tree whenever it holds more leaves than the budget allows.
    ///
    /// # Errors
    ///
    /// - `ClusterError::DimensionMismatch` if a vector's length differs from
    ///   the first vector's
    /// - `ClusterError::InvalidParameter` if a vector is empty or contains
    ///   NaN/Infinity
    pub fn build<'v, I, P>(&self, points: P) -> ClusterResult<CFTree<I>>
    where
        P: IntoIterator<Item = (I, &'v [f64])>,
        P::IntoIter: ExactSizeIterator,
    {
        let points = points.into_iter();
        let budget = self.leaf_budget(points.len());
        let mut tree = self.new_tree()?;
        let mut dimensionality = None;

        for (position, (id, point)) in points.enumerate() {
            check_point(position, point, &mut dimensionality)?;
            tree.insert(id, point);
            if tree.leaf_count() > budget {
                debug!(
                    leaves = tree.leaf_count(),
                    budget,
                    inserted = position + 1,
                    "Compacting CF-tree"
                );
                tree.rebuild();
            }
        }

        debug!(
            points = tree.len(),
            leaves = tree.leaf_count(),
            threshold = tree.threshold(),
            "Built CF-tree"
        );
        Ok(tree)
    }

    /// Distance strategy selector.
    pub fn distance(&self) -> DistanceKind {
        self.distance
    }

    /// Absorption criterion selector.
    pub fn absorption(&self) -> AbsorptionKind {
        self.absorption
    }

    /// Initial absorption threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Node capacity.
    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Leaf budget, relative or absolute.
    pub fn max_leaves(&self) -> f64 {
        self.max_leaves
    }
}

fn check_point(
    position: usize,
    point: &[f64],
    dimensionality: &mut Option<usize>,
) -> ClusterResult<()> {
    if point.is_empty() {
        return Err(ClusterError::invalid_parameter(format!(
            "vector at position {} is empty",
            position
        )));
    }
    match *dimensionality {
        None => *dimensionality = Some(point.len()),
        Some(expected) if expected != point.len() => {
            return Err(ClusterError::dimension_mismatch(expected, point.len()));
        }
        Some(_) => {}
    }
    if let Some(i) = point.iter().position(|x| !x.is_finite()) {
        return Err(ClusterError::invalid_parameter(format!(
            "vector at position {} has non-finite value {} in dimension {}",
            position, point[i], i
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(max_leaves: f64) -> CFTreeBuilder {
        CFTreeConfig::default()
            .with_branching_factor(4)
            .with_max_leaves(max_leaves)
            .builder()
            .expect("valid config")
    }

    fn line(n: usize) -> Vec<(usize, Vec<f64>)> {
        (0..n).map(|i| (i, vec![i as f64 * 0.5])).collect()
    }

    #[test]
    fn test_leaf_budget_relative_and_absolute() {
        assert_eq!(builder(0.05).leaf_budget(1000), 50);
        assert_eq!(builder(1.0).leaf_budget(7), 7);
        assert_eq!(builder(25.0).leaf_budget(1000), 25);
        assert_eq!(builder(25.0).leaf_budget(3), 25);
    }

    #[test]
    fn test_new_tree_uses_configuration() {
        let b = CFTreeConfig::default()
            .with_threshold(0.5)
            .with_branching_factor(8)
            .with_distance(DistanceKind::CentroidManhattan)
            .builder()
            .unwrap();
        let tree: CFTree<u8> = b.new_tree().unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.capacity(), 8);
        assert_eq!(tree.thresholdsq(), 0.25);
        assert_eq!(tree.distance().name(), "centroid_manhattan");
        assert_eq!(tree.absorption().name(), "diameter");
    }

    #[test]
    fn test_build_compacts_over_absolute_budget() {
        let points = line(200);
        let tree = builder(10.0)
            .build(points.iter().map(|(id, p)| (*id, p.as_slice())))
            .unwrap();

        assert_eq!(tree.len(), 200);
        assert!(tree.leaf_count() < 200, "got {} leaves", tree.leaf_count());
        assert!(tree.threshold() > 0.0);
    }

    #[test]
    fn test_build_without_compaction_keeps_threshold() {
        let points = line(5);
        let tree = builder(1.0)
            .build(points.iter().map(|(id, p)| (*id, p.as_slice())))
            .unwrap();

        assert_eq!(tree.leaf_count(), 5);
        assert_eq!(tree.thresholdsq(), 0.0);
    }

    #[test]
    fn test_build_rejects_dimension_mismatch() {
        let a = [1.0, 2.0];
        let b = [1.0];
        let err = builder(1.0)
            .build(vec![(0, &a[..]), (1, &b[..])])
            .unwrap_err();
        assert_eq!(err, ClusterError::dimension_mismatch(2, 1));
    }

    #[test]
    fn test_build_rejects_non_finite_and_empty() {
        let nan = [1.0, f64::NAN];
        let err = builder(1.0).build(vec![(0, &nan[..])]).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidParameter { .. }));
        assert!(err.to_string().contains("dimension 1"));

        let empty: [f64; 0] = [];
        let err = builder(1.0).build(vec![(0, &empty[..])]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_build_empty_input() {
        let tree = builder(0.05)
            .build(Vec::<(u32, &[f64])>::new())
            .unwrap();
        assert!(tree.is_empty());
    }
}
