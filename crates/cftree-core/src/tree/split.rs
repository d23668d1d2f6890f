//! Quadratic farthest-pair split of an overflowing node.
//!
//! Given a full child list plus one incoming child:
//! 1. compute all pairwise distances and pick the farthest pair as seeds
//!    (first pair found in row-major order wins ties);
//! 2. send every entry to the closer seed, breaking exact ties towards the
//!    side that currently holds fewer entries (the kept side when equal).
//!
//! Entries keep their relative order on both sides; the incoming entry is
//! considered last.

use crate::distance::BirchDistance;
use crate::feature::ClusteringFeature;

use super::node::Summarized;

/// Result of splitting one child list into two.
#[derive(Debug)]
pub(crate) struct Split<T> {
    /// Entries that stay in the original node (seed 1's side).
    pub kept: Vec<T>,
    pub kept_cf: ClusteringFeature,
    /// Entries moved into the new sibling (seed 2's side).
    pub moved: Vec<T>,
    pub moved_cf: ClusteringFeature,
}

pub(crate) fn split_entries<T: Summarized>(
    mut entries: Vec<T>,
    incoming: T,
    distance: &dyn BirchDistance,
) -> Split<T> {
    let dim = incoming.cf().dimensionality();
    entries.push(incoming);
    let size = entries.len();
    debug_assert!(size >= 3, "split requires a full node of capacity >= 2");

    let mut dists = vec![0.0f64; size * size];
    let (mut m1, mut m2) = (0, 1);
    let mut maxd = f64::NEG_INFINITY;
    for i in 0..size {
        for j in (i + 1)..size {
            let d = distance.squared_distance(entries[i].cf(), entries[j].cf());
            dists[i * size + j] = d;
            dists[j * size + i] = d;
            if d > maxd {
                maxd = d;
                m1 = i;
                m2 = j;
            }
        }
    }

    let mut kept = Vec::with_capacity(size - 1);
    let mut moved = Vec::with_capacity(size - 1);
    let mut kept_cf = ClusteringFeature::new(dim);
    let mut moved_cf = ClusteringFeature::new(dim);
    for (i, entry) in entries.into_iter().enumerate() {
        let d1 = dists[m1 * size + i];
        let d2 = dists[m2 * size + i];
        let keep = i == m1 || (i != m2 && (d1 < d2 || (d1 == d2 && kept.len() <= moved.len())));
        if keep {
            kept_cf.merge(entry.cf());
            kept.push(entry);
        } else {
            moved_cf.merge(entry.cf());
            moved.push(entry);
        }
    }

    Split {
        kept,
        kept_cf,
        moved,
        moved_cf,
    }
}
