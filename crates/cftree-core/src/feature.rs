//! Clustering Feature (CF): the additive summary stored at every tree node.
//!
//! A CF is a triple `(n, LS, SS)` summarizing a set of d-dimensional points:
//! - `n`: number of points
//! - `LS`: linear sum, the d-dimensional vector `Σ Xi`
//! - `SS`: squared sum, the scalar `Σ ||Xi||²` (summed over all dimensions)
//!
//! CFs are additive: `CF(A ∪ B) = CF(A) + CF(B)`. Centroid, radius and
//! diameter are pure functions of the triple, so neither merging nor
//! threshold tests ever revisit the raw points.
//!
//! # Numerical Stability
//!
//! Radius and diameter are computed as differences of large sums and can
//! come out slightly negative after cancellation. Every squared quantity is
//! clamped to `0.0` before a square root is taken.

use serde::{Deserialize, Serialize};

/// Clustering Feature - statistical summary of a set of vectors.
///
/// # Example
///
/// ```
/// use cftree_core::ClusteringFeature;
///
/// let mut cf = ClusteringFeature::from_point(&[1.0, 2.0, 3.0]);
/// cf.add_point(&[3.0, 4.0, 5.0]);
///
/// assert_eq!(cf.n, 2);
/// assert_eq!(cf.centroid(), vec![2.0, 3.0, 4.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringFeature {
    /// Number of data points summarized.
    pub n: usize,
    /// Linear sum: Σ Xi (d-dimensional vector).
    pub ls: Vec<f64>,
    /// Squared sum: Σ ||Xi||² (scalar).
    pub ss: f64,
}

impl ClusteringFeature {
    /// Create an empty CF (the merge identity) with the given dimensionality.
    pub fn new(dimensionality: usize) -> Self {
        Self {
            n: 0,
            ls: vec![0.0; dimensionality],
            ss: 0.0,
        }
    }

    /// Create a CF summarizing a single point.
    pub fn from_point(point: &[f64]) -> Self {
        Self {
            n: 1,
            ls: point.to_vec(),
            ss: squared_norm(point),
        }
    }

    /// Dimensionality of the summarized vectors.
    #[inline]
    pub fn dimensionality(&self) -> usize {
        self.ls.len()
    }

    /// Check if this CF summarizes no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Absorb one point: `n += 1`, `LS += x`, `SS += ||x||²`.
    pub fn add_point(&mut self, point: &[f64]) {
        debug_assert_eq!(self.ls.len(), point.len(), "CF dimensionality mismatch");
        for (acc, &x) in self.ls.iter_mut().zip(point) {
            *acc += x;
            self.ss += x * x;
        }
        self.n += 1;
    }

    /// Merge another CF into this one.
    ///
    /// CF(A ∪ B) = (n_A + n_B, LS_A + LS_B, SS_A + SS_B)
    pub fn merge(&mut self, other: &ClusteringFeature) {
        debug_assert_eq!(self.ls.len(), other.ls.len(), "CF dimensionality mismatch");
        for (acc, &x) in self.ls.iter_mut().zip(&other.ls) {
            *acc += x;
        }
        self.ss += other.ss;
        self.n += other.n;
    }

    /// Reset to the empty CF, keeping the dimensionality.
    pub fn reset(&mut self) {
        self.n = 0;
        self.ls.iter_mut().for_each(|x| *x = 0.0);
        self.ss = 0.0;
    }

    /// Centroid coordinate `LS[i] / n`, or `0.0` for an empty CF.
    #[inline]
    pub fn centroid_at(&self, i: usize) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.ls[i] / self.n as f64
        }
    }

    /// Compute the centroid (mean point). Zero vector if `n == 0`.
    pub fn centroid(&self) -> Vec<f64> {
        (0..self.ls.len()).map(|i| self.centroid_at(i)).collect()
    }

    /// Sum of squared deviations from the centroid: `SS - ||LS||² / n`.
    pub fn sum_of_squared_deviations(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        clamp(self.ss - squared_norm(&self.ls) / self.n as f64)
    }

    /// Radius: RMS distance from the members to the centroid.
    ///
    /// `radius = sqrt(SS/n - ||LS/n||²)`, `0.0` for `n <= 1`.
    pub fn radius(&self) -> f64 {
        radius_sq(self.n, squared_norm(&self.ls), self.ss).sqrt()
    }

    /// Squared radius after hypothetically absorbing `point`.
    pub fn radius_sq_with(&self, point: &[f64]) -> f64 {
        radius_sq(
            self.n + 1,
            squared_norm_of_sum(&self.ls, point),
            self.ss + squared_norm(point),
        )
    }

    /// Radius after hypothetically absorbing `point`; `self` is not modified.
    pub fn radius_with(&self, point: &[f64]) -> f64 {
        self.radius_sq_with(point).sqrt()
    }

    /// Squared radius of the hypothetical merge of `self` and `other`.
    pub fn radius_sq_with_cf(&self, other: &ClusteringFeature) -> f64 {
        radius_sq(
            self.n + other.n,
            squared_norm_of_sum(&self.ls, &other.ls),
            self.ss + other.ss,
        )
    }

    /// Diameter: RMS pairwise distance between members.
    ///
    /// `diameter = sqrt(2 (n SS - ||LS||²) / (n (n - 1)))`, `0.0` for `n <= 1`.
    pub fn diameter(&self) -> f64 {
        diameter_sq(self.n, squared_norm(&self.ls), self.ss).sqrt()
    }

    /// Squared diameter after hypothetically absorbing `point`.
    pub fn diameter_sq_with(&self, point: &[f64]) -> f64 {
        diameter_sq(
            self.n + 1,
            squared_norm_of_sum(&self.ls, point),
            self.ss + squared_norm(point),
        )
    }

    /// Squared diameter of the hypothetical merge of `self` and `other`.
    pub fn diameter_sq_with_cf(&self, other: &ClusteringFeature) -> f64 {
        diameter_sq(
            self.n + other.n,
            squared_norm_of_sum(&self.ls, &other.ls),
            self.ss + other.ss,
        )
    }
}

/// `max(x, 0)`, mapping NaN from cancellation to zero as well.
#[inline]
pub(crate) fn clamp(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

#[inline]
pub(crate) fn squared_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `||a + b||²` without allocating the sum.
#[inline]
pub(crate) fn squared_norm_of_sum(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let s = x + y;
            s * s
        })
        .sum()
}

fn radius_sq(n: usize, ls_sq: f64, ss: f64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    clamp(ss / n - ls_sq / (n * n))
}

fn diameter_sq(n: usize, ls_sq: f64, ss: f64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    clamp(2.0 * (n * ss - ls_sq) / (n * (n - 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_from_point_is_singleton() {
        let cf = ClusteringFeature::from_point(&[1.0, 2.0]);
        assert_eq!(cf.n, 1);
        assert_eq!(cf.ls, vec![1.0, 2.0]);
        assert!((cf.ss - 5.0).abs() < EPS);
        assert_eq!(cf.radius(), 0.0);
        assert_eq!(cf.diameter(), 0.0);
    }

    #[test]
    fn test_empty_cf_degenerates_to_zero() {
        let cf = ClusteringFeature::new(3);
        assert!(cf.is_empty());
        assert_eq!(cf.dimensionality(), 3);
        assert_eq!(cf.centroid(), vec![0.0, 0.0, 0.0]);
        assert_eq!(cf.radius(), 0.0);
        assert_eq!(cf.diameter(), 0.0);
        assert_eq!(cf.sum_of_squared_deviations(), 0.0);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut a = ClusteringFeature::from_point(&[1.0, 0.0]);
        a.add_point(&[3.0, 0.0]);
        let mut b = ClusteringFeature::from_point(&[0.0, 2.0]);
        b.add_point(&[0.0, 4.0]);

        let mut merged = a.clone();
        merged.merge(&b);

        let mut direct = ClusteringFeature::new(2);
        for p in [[1.0, 0.0], [3.0, 0.0], [0.0, 2.0], [0.0, 4.0]] {
            direct.add_point(&p);
        }

        assert_eq!(merged.n, direct.n);
        assert_eq!(merged.ls, direct.ls);
        assert!((merged.ss - direct.ss).abs() < EPS);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let mut cf = ClusteringFeature::from_point(&[1.5, -2.5]);
        let before = cf.clone();
        cf.merge(&ClusteringFeature::new(2));
        assert_eq!(cf, before);
    }

    #[test]
    fn test_reset_keeps_dimensionality() {
        let mut cf = ClusteringFeature::from_point(&[1.0, 2.0, 3.0]);
        cf.reset();
        assert_eq!(cf, ClusteringFeature::new(3));
    }

    #[test]
    fn test_radius_and_diameter_of_two_points() {
        // (0,0) and (2,0): centroid (1,0), every member at distance 1.
        let mut cf = ClusteringFeature::from_point(&[0.0, 0.0]);
        cf.add_point(&[2.0, 0.0]);

        assert!((cf.radius() - 1.0).abs() < EPS);
        // Single pair at distance 2.
        assert!((cf.diameter() - 2.0).abs() < EPS);
        assert!((cf.sum_of_squared_deviations() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_with_point_matches_actual_absorption() {
        let mut cf = ClusteringFeature::from_point(&[0.5, 1.0, -1.0]);
        cf.add_point(&[1.5, 0.0, 2.0]);
        let point = [4.0, -3.0, 0.5];

        let predicted_r = cf.radius_with(&point);
        let predicted_d = cf.diameter_sq_with(&point);
        let before = cf.clone();

        let mut absorbed = cf.clone();
        absorbed.add_point(&point);

        assert_eq!(cf, before, "with-point queries must not mutate");
        assert!((predicted_r - absorbed.radius()).abs() < 1e-9);
        assert!((predicted_d.sqrt() - absorbed.diameter()).abs() < 1e-9);
    }

    #[test]
    fn test_with_cf_matches_merge() {
        let mut a = ClusteringFeature::from_point(&[0.0, 1.0]);
        a.add_point(&[1.0, 1.0]);
        let mut b = ClusteringFeature::from_point(&[5.0, 5.0]);
        b.add_point(&[6.0, 4.0]);
        b.add_point(&[5.5, 4.5]);

        let mut merged = a.clone();
        merged.merge(&b);

        assert!((a.radius_sq_with_cf(&b).sqrt() - merged.radius()).abs() < 1e-9);
        assert!((a.diameter_sq_with_cf(&b).sqrt() - merged.diameter()).abs() < 1e-9);
    }

    #[test]
    fn test_identical_points_clamp_cancellation() {
        let mut cf = ClusteringFeature::new(2);
        for _ in 0..1000 {
            cf.add_point(&[0.1, 0.7]);
        }
        let r = cf.radius();
        let d = cf.diameter();
        assert!(r >= 0.0 && !r.is_nan());
        assert!(d >= 0.0 && !d.is_nan());
        assert!(r < 1e-6);
        assert!(cf.diameter_sq_with(&[0.1, 0.7]) >= 0.0);
    }

    #[test]
    fn test_cf_serialization_roundtrip() {
        let mut cf = ClusteringFeature::from_point(&[1.0, 2.0, 3.0]);
        cf.add_point(&[4.0, 5.0, 6.0]);

        let json = serde_json::to_string(&cf).expect("serialize must succeed");
        let restored: ClusteringFeature =
            serde_json::from_str(&json).expect("deserialize must succeed");

        assert_eq!(cf, restored);
    }
}
