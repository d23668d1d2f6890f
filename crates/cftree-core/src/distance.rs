//! Distance strategies used to route vectors and entries through the CF-tree.
//!
//! A [`BirchDistance`] compares a vector with a CF (descent) and two CFs with
//! each other (split seeds, rebuild estimates). Values are only ever ranked,
//! so every strategy returns a *squared* (or otherwise monotonically
//! transformed) distance and skips the square root.
//!
//! | Strategy | BIRCH name | Measures |
//! |----------|------------|----------|
//! | [`CentroidEuclidean`] | D0 | Euclidean distance of centroids |
//! | [`CentroidManhattan`] | D1 | Manhattan distance of centroids (returned squared) |
//! | [`AverageInterCluster`] | D2 | RMS distance between members of the two clusters |
//! | [`AverageIntraCluster`] | D3 | RMS pairwise distance inside the merged cluster |
//! | [`VarianceIncrease`] | D4 | Increase of the sum of squared deviations on merge |
//!
//! All strategies are zero-sized and stateless.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::feature::{clamp, dot, squared_norm, ClusteringFeature};

/// Distance between vectors and clustering features.
///
/// Implementations must be symmetric in the CF-CF case, non-negative, and
/// return `0.0` when a CF is compared with itself (or a singleton CF with
/// its only member).
///
/// Every method returns the *square* of the named distance. For
/// [`CentroidManhattan`] this is `(Σ |c1 - c2|)²`, not the L1 distance
/// itself; take the square root to recover it.
pub trait BirchDistance: fmt::Debug + Send + Sync {
    /// Squared distance between a vector and a CF.
    fn squared_distance_to_point(&self, point: &[f64], cf: &ClusteringFeature) -> f64;

    /// Squared distance between two CFs.
    fn squared_distance(&self, a: &ClusteringFeature, b: &ClusteringFeature) -> f64;

    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;
}

/// D0: squared Euclidean distance between centroids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CentroidEuclidean;

impl BirchDistance for CentroidEuclidean {
    fn squared_distance_to_point(&self, point: &[f64], cf: &ClusteringFeature) -> f64 {
        point
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let d = x - cf.centroid_at(i);
                d * d
            })
            .sum()
    }

    fn squared_distance(&self, a: &ClusteringFeature, b: &ClusteringFeature) -> f64 {
        (0..a.dimensionality())
            .map(|i| {
                let d = a.centroid_at(i) - b.centroid_at(i);
                d * d
            })
            .sum()
    }

    fn name(&self) -> &'static str {
        "centroid_euclidean"
    }
}

/// D1: Manhattan distance between centroids.
///
/// Returned squared so that it ranks like the other strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CentroidManhattan;

impl BirchDistance for CentroidManhattan {
    fn squared_distance_to_point(&self, point: &[f64], cf: &ClusteringFeature) -> f64 {
        let l1: f64 = point
            .iter()
            .enumerate()
            .map(|(i, &x)| (x - cf.centroid_at(i)).abs())
            .sum();
        l1 * l1
    }

    fn squared_distance(&self, a: &ClusteringFeature, b: &ClusteringFeature) -> f64 {
        let l1: f64 = (0..a.dimensionality())
            .map(|i| (a.centroid_at(i) - b.centroid_at(i)).abs())
            .sum();
        l1 * l1
    }

    fn name(&self) -> &'static str {
        "centroid_manhattan"
    }
}

/// D2: average inter-cluster distance.
///
/// `D2² = (SS1 n2 + SS2 n1 - 2 <LS1, LS2>) / (n1 n2)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AverageInterCluster;

impl BirchDistance for AverageInterCluster {
    fn squared_distance_to_point(&self, point: &[f64], cf: &ClusteringFeature) -> f64 {
        if cf.n == 0 {
            return 0.0;
        }
        let n = cf.n as f64;
        // The point is a CF with n = 1, LS = x, SS = ||x||².
        clamp((cf.ss + squared_norm(point) * n - 2.0 * dot(&cf.ls, point)) / n)
    }

    fn squared_distance(&self, a: &ClusteringFeature, b: &ClusteringFeature) -> f64 {
        if a.n == 0 || b.n == 0 {
            return 0.0;
        }
        let (n1, n2) = (a.n as f64, b.n as f64);
        clamp((a.ss * n2 + b.ss * n1 - 2.0 * dot(&a.ls, &b.ls)) / (n1 * n2))
    }

    fn name(&self) -> &'static str {
        "average_inter_cluster"
    }
}

/// D3: average intra-cluster distance of the merged cluster.
///
/// `D3² = 2 (n SS - ||LS||²) / (n (n - 1))` over the union, which is the
/// squared diameter of the merged CF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AverageIntraCluster;

impl BirchDistance for AverageIntraCluster {
    fn squared_distance_to_point(&self, point: &[f64], cf: &ClusteringFeature) -> f64 {
        cf.diameter_sq_with(point)
    }

    fn squared_distance(&self, a: &ClusteringFeature, b: &ClusteringFeature) -> f64 {
        a.diameter_sq_with_cf(b)
    }

    fn name(&self) -> &'static str {
        "average_intra_cluster"
    }
}

/// D4: variance increase (Ward linkage).
///
/// Merging two clusters grows the sum of squared deviations by
/// `n1 n2 / (n1 + n2) * ||c1 - c2||²`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarianceIncrease;

impl BirchDistance for VarianceIncrease {
    fn squared_distance_to_point(&self, point: &[f64], cf: &ClusteringFeature) -> f64 {
        if cf.n == 0 {
            return 0.0;
        }
        let n = cf.n as f64;
        let centroid_dist_sq = CentroidEuclidean.squared_distance_to_point(point, cf);
        n / (n + 1.0) * centroid_dist_sq
    }

    fn squared_distance(&self, a: &ClusteringFeature, b: &ClusteringFeature) -> f64 {
        if a.n == 0 || b.n == 0 {
            return 0.0;
        }
        let (n1, n2) = (a.n as f64, b.n as f64);
        n1 * n2 / (n1 + n2) * CentroidEuclidean.squared_distance(a, b)
    }

    fn name(&self) -> &'static str {
        "variance_increase"
    }
}

/// Selector for the built-in distance strategies.
///
/// # Example
///
/// ```
/// use cftree_core::DistanceKind;
///
/// let kind: DistanceKind = "average_inter_cluster".parse().unwrap();
/// assert_eq!(kind, DistanceKind::AverageInterCluster);
/// assert_eq!(DistanceKind::default(), DistanceKind::VarianceIncrease);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    /// D0, see [`CentroidEuclidean`].
    CentroidEuclidean,
    /// D1, see [`CentroidManhattan`].
    CentroidManhattan,
    /// D2, see [`AverageInterCluster`].
    AverageInterCluster,
    /// D3, see [`AverageIntraCluster`].
    AverageIntraCluster,
    /// D4, see [`VarianceIncrease`].
    #[default]
    VarianceIncrease,
}

impl DistanceKind {
    /// All built-in strategies.
    pub const ALL: [DistanceKind; 5] = [
        DistanceKind::CentroidEuclidean,
        DistanceKind::CentroidManhattan,
        DistanceKind::AverageInterCluster,
        DistanceKind::AverageIntraCluster,
        DistanceKind::VarianceIncrease,
    ];

    /// Instantiate the strategy.
    pub fn strategy(self) -> Box<dyn BirchDistance> {
        match self {
            DistanceKind::CentroidEuclidean => Box::new(CentroidEuclidean),
            DistanceKind::CentroidManhattan => Box::new(CentroidManhattan),
            DistanceKind::AverageInterCluster => Box::new(AverageInterCluster),
            DistanceKind::AverageIntraCluster => Box::new(AverageIntraCluster),
            DistanceKind::VarianceIncrease => Box::new(VarianceIncrease),
        }
    }

    /// Configuration name (snake_case).
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceKind::CentroidEuclidean => "centroid_euclidean",
            DistanceKind::CentroidManhattan => "centroid_manhattan",
            DistanceKind::AverageInterCluster => "average_inter_cluster",
            DistanceKind::AverageIntraCluster => "average_intra_cluster",
            DistanceKind::VarianceIncrease => "variance_increase",
        }
    }
}

impl FromStr for DistanceKind {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistanceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ClusterError::invalid_parameter(format!(
                    "unknown distance '{}'; expected one of centroid_euclidean, centroid_manhattan, \
                     average_inter_cluster, average_intra_cluster, variance_increase",
                    s
                ))
            })
    }
}

impl fmt::Display for DistanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
