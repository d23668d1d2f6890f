//! Absorption criteria: may a leaf swallow a vector or another leaf?
//!
//! The tree compares [`AbsorptionCriterion::squared_criterion_point`] (or the
//! CF-CF variant during rebuilds) against its squared threshold. A criterion
//! measures how much the target's spread would grow, so smaller is tighter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::distance::{BirchDistance, CentroidEuclidean};
use crate::error::ClusterError;
use crate::feature::ClusteringFeature;

/// Policy deciding whether a leaf absorbs new data.
pub trait AbsorptionCriterion: fmt::Debug + Send + Sync {
    /// Squared criterion value for merging `other` into `cf`.
    fn squared_criterion(&self, cf: &ClusteringFeature, other: &ClusteringFeature) -> f64;

    /// Squared criterion value for adding `point` to `cf`.
    fn squared_criterion_point(&self, cf: &ClusteringFeature, point: &[f64]) -> f64;

    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;
}

/// Bound the radius of the merged leaf (the original BIRCH test).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadiusCriterion;

impl AbsorptionCriterion for RadiusCriterion {
    fn squared_criterion(&self, cf: &ClusteringFeature, other: &ClusteringFeature) -> f64 {
        cf.radius_sq_with_cf(other)
    }

    fn squared_criterion_point(&self, cf: &ClusteringFeature, point: &[f64]) -> f64 {
        cf.radius_sq_with(point)
    }

    fn name(&self) -> &'static str {
        "radius"
    }
}

/// Bound the diameter of the merged leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiameterCriterion;

impl AbsorptionCriterion for DiameterCriterion {
    fn squared_criterion(&self, cf: &ClusteringFeature, other: &ClusteringFeature) -> f64 {
        cf.diameter_sq_with_cf(other)
    }

    fn squared_criterion_point(&self, cf: &ClusteringFeature, point: &[f64]) -> f64 {
        cf.diameter_sq_with(point)
    }

    fn name(&self) -> &'static str {
        "diameter"
    }
}

/// Bound the Euclidean distance between the leaf centroid and the newcomer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EuclideanCriterion;

impl AbsorptionCriterion for EuclideanCriterion {
    fn squared_criterion(&self, cf: &ClusteringFeature, other: &ClusteringFeature) -> f64 {
        CentroidEuclidean.squared_distance(cf, other)
    }

    fn squared_criterion_point(&self, cf: &ClusteringFeature, point: &[f64]) -> f64 {
        CentroidEuclidean.squared_distance_to_point(point, cf)
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Selector for the built-in absorption criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsorptionKind {
    /// See [`RadiusCriterion`].
    Radius,
    /// See [`DiameterCriterion`].
    #[default]
    Diameter,
    /// See [`EuclideanCriterion`].
    Euclidean,
}

impl AbsorptionKind {
    /// All built-in criteria.
    pub const ALL: [AbsorptionKind; 3] = [
        AbsorptionKind::Radius,
        AbsorptionKind::Diameter,
        AbsorptionKind::Euclidean,
    ];

    /// Instantiate the criterion.
    pub fn criterion(self) -> Box<dyn AbsorptionCriterion> {
        match self {
            AbsorptionKind::Radius => Box::new(RadiusCriterion),
            AbsorptionKind::Diameter => Box::new(DiameterCriterion),
            AbsorptionKind::Euclidean => Box::new(EuclideanCriterion),
        }
    }

    /// Configuration name (snake_case).
    pub fn as_str(self) -> &'static str {
        match self {
            AbsorptionKind::Radius => "radius",
            AbsorptionKind::Diameter => "diameter",
            AbsorptionKind::Euclidean => "euclidean",
        }
    }
}

impl FromStr for AbsorptionKind {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AbsorptionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ClusterError::invalid_parameter(format!(
                    "unknown absorption criterion '{}'; expected one of radius, diameter, euclidean",
                    s
                ))
            })
    }
}

impl fmt::Display for AbsorptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
