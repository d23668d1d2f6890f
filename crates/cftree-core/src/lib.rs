//! CF-tree (BIRCH) for single-pass micro-clustering of numeric vectors.
//!
//! Vectors are streamed into a height-balanced tree of clustering features
//! (count, linear sum, sum of squares). Nearby vectors are absorbed into the
//! same leaf; the leaves are micro-clusters that carry the identifiers of
//! every absorbed vector and can be handed to a downstream clustering step,
//! e.g. k-means over leaf centroids weighted by their counts.
//!
//! # Architecture
//!
//! - **feature**: `ClusteringFeature` and its closed-form statistics
//! - **distance**: BIRCH distances D0-D4 for descent and splits
//! - **absorption**: radius, diameter and Euclidean absorption criteria
//! - **tree**: `CFTree` insertion, split, rebuild, lookup and iteration
//! - **builder**: bulk loading with automatic rebuilds under a leaf budget
//! - **config**: TOML / environment configuration
//! - **error**: `ClusterError` for parameter and configuration validation
//!
//! # Example
//!
//! ```
//! use cftree_core::{CFTreeConfig, ClusterResult};
//!
//! fn example() -> ClusterResult<()> {
//!     let points = vec![
//!         ("a", vec![0.0, 0.0]),
//!         ("b", vec![0.1, 0.1]),
//!         ("c", vec![5.0, 5.0]),
//!     ];
//!     let builder = CFTreeConfig::default().with_threshold(0.5).builder()?;
//!     let tree = builder.build(points.iter().map(|(id, p)| (*id, p.as_slice())))?;
//!
//!     assert_eq!(tree.len(), 3);
//!     for leaf in tree.leaves() {
//!         println!("{:?} n={} centroid={:?}", leaf.ids(), leaf.n(), leaf.centroid());
//!     }
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod absorption;
pub mod builder;
pub mod config;
pub mod distance;
pub mod error;
pub mod feature;
pub mod tree;

// Re-exports for convenience
pub use absorption::{
    AbsorptionCriterion, AbsorptionKind, DiameterCriterion, EuclideanCriterion, RadiusCriterion,
};
pub use builder::CFTreeBuilder;
pub use config::CFTreeConfig;
pub use distance::{
    AverageInterCluster, AverageIntraCluster, BirchDistance, CentroidEuclidean, CentroidManhattan,
    DistanceKind, VarianceIncrease,
};
pub use error::{ClusterError, ClusterResult};
pub use feature::ClusteringFeature;
pub use tree::{CFTree, Children, IntoLeaves, LeafEntry, Leaves, TreeNode};
