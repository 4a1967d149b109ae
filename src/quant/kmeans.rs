// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic 1-D K-Means clustering for scalar codebooks.
//!
//! Guarantees bit-identical centroids given the same input values: the data
//! is sorted once, centroids start evenly spaced between the extremes, and a
//! fixed number of Lloyd iterations runs over contiguous ranges of the sorted
//! data (in one dimension every cluster is an interval).

use crate::config::{KMEANS_ITERATIONS, KMEANS_SMALL_CLUSTER_FACTOR};
use crate::error::{FormatError, MembError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarKMeans {
    centroids: Vec<f32>,
    /// Midpoints between neighbouring centroids.
    splits: Vec<f32>,
}

impl ScalarKMeans {
    /// Fits at most `k` centroids to `values`.
    ///
    /// Clusters holding no more than `1 / KMEANS_SMALL_CLUSTER_FACTOR` of the
    /// largest cluster are pruned before a final update, so the result can be
    /// shorter than `k`. Centroids are sorted ascending.
    pub fn fit(values: &[f32], k: usize) -> Result<Self> {
        if values.is_empty() || k == 0 {
            return Err(MembError::EmptyInput);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f32::total_cmp);

        // Interpolate in f64; `hi - lo` can exceed `f32::MAX`.
        let lo = sorted[0] as f64;
        let hi = sorted[sorted.len() - 1] as f64;
        let initial: Vec<f32> = if k == 1 {
            vec![sorted[0]]
        } else {
            (0..k)
                .map(|i| (lo + (i as f64 / (k - 1) as f64) * (hi - lo)) as f32)
                .collect()
        };
        let mut model = Self::with_centroids(initial);

        for _ in 0..KMEANS_ITERATIONS {
            model.update(&sorted);
        }

        let counts = model.cluster_counts(&sorted);
        let largest = counts.iter().copied().max().unwrap_or(0);
        let limit = largest as f64 / KMEANS_SMALL_CLUSTER_FACTOR as f64;
        let kept: Vec<f32> = model
            .centroids
            .iter()
            .zip(&counts)
            .filter(|(_, count)| **count as f64 > limit)
            .map(|(c, _)| *c)
            .collect();

        let mut model = Self::with_centroids(kept);
        model.update(&sorted);
        Ok(model)
    }

    /// Restores a fitted model from stored centroids.
    pub fn from_centroids(centroids: Vec<f32>) -> Result<Self> {
        if centroids.is_empty() || centroids.len() > 256 {
            return Err(FormatError::Corrupt(format!("codebook of {} entries", centroids.len())).into());
        }
        if centroids.iter().any(|c| !c.is_finite()) || centroids.windows(2).any(|w| w[0] > w[1]) {
            return Err(FormatError::Corrupt("codebook is not sorted and finite".into()).into());
        }
        Ok(Self::with_centroids(centroids))
    }

    /// Index of the nearest centroid.
    #[inline]
    pub fn predict(&self, value: f32) -> u8 {
        self.splits.partition_point(|s| *s < value) as u8
    }

    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    pub fn into_centroids(self) -> Vec<f32> {
        self.centroids
    }

    fn with_centroids(centroids: Vec<f32>) -> Self {
        let splits = centroids
            .windows(2)
            .map(|w| (0.5 * (w[0] as f64 + w[1] as f64)) as f32)
            .collect();
        Self { centroids, splits }
    }

    /// Half-open ranges of `sorted` assigned to each centroid.
    fn cluster_bounds(&self, sorted: &[f32]) -> Vec<(usize, usize)> {
        let mut bounds = Vec::with_capacity(self.centroids.len());
        let mut start = 0;
        for split in &self.splits {
            let end = sorted.partition_point(|v| v <= split);
            bounds.push((start, end));
            start = end;
        }
        bounds.push((start, sorted.len()));
        bounds
    }

    fn cluster_counts(&self, sorted: &[f32]) -> Vec<usize> {
        self.cluster_bounds(sorted).iter().map(|(s, e)| e - s).collect()
    }

    /// One Lloyd step. Empty clusters keep their previous centroid.
    /// Each cluster is summed on its own in f64.
    fn update(&mut self, sorted: &[f32]) {
        let mut next: Vec<f32> = self
            .cluster_bounds(sorted)
            .iter()
            .zip(&self.centroids)
            .map(|(&(s, e), &old)| {
                if e > s {
                    let sum: f64 = sorted[s..e].iter().map(|&v| v as f64).sum();
                    (sum / (e - s) as f64) as f32
                } else {
                    old
                }
            })
            .collect();
        next.sort_by(f32::total_cmp);
        *self = Self::with_centroids(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separated_clusters_are_recovered() {
        let mut data = Vec::new();
        let mut expected = Vec::new();
        for i in 0..8 {
            data.push(-0.5 + i as f32 * 0.125);
            expected.push(1u8);
        }
        for i in 0..16 {
            data.push(-9.0 + i as f32 * 0.125);
            expected.push(0u8);
        }
        for i in 0..4 {
            data.push(11.75 + i as f32 * 0.125);
            expected.push(2u8);
        }

        let model = ScalarKMeans::fit(&data, 3).unwrap();
        let assigned: Vec<u8> = data.iter().map(|v| model.predict(*v)).collect();
        assert_eq!(assigned, expected);
    }

    #[test]
    fn test_constant_input_collapses_to_one_centroid() {
        let model = ScalarKMeans::fit(&[0.25; 50], 16).unwrap();
        assert_eq!(model.centroids(), &[0.25]);
        assert_eq!(model.predict(0.25), 0);
    }

    #[test]
    fn test_fit_is_bit_identical() {
        let data: Vec<f32> = (0..1000).map(|i| ((i * 37) % 101) as f32 / 7.0 - 3.0).collect();
        let a = ScalarKMeans::fit(&data, 16).unwrap();
        let b = ScalarKMeans::fit(&data, 16).unwrap();
        assert_eq!(a.centroids().len(), b.centroids().len());
        for (x, y) in a.centroids().iter().zip(b.centroids()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_extreme_range_stays_finite() {
        let data = [-3e38f32, 3e38, 0.0, 1.0, 1.5, 2.0];
        let model = ScalarKMeans::fit(&data, 16).unwrap();
        assert!(model.centroids().iter().all(|c| c.is_finite()));
        assert_eq!(model.centroids().first(), Some(&-3e38));
        assert_eq!(model.centroids().last(), Some(&3e38));
        let small = model.centroids()[model.predict(1.5) as usize];
        assert!((small - 1.5).abs() <= 0.5, "1.5 decoded as {small}");
    }

    #[test]
    fn test_from_centroids_rejects_unsorted() {
        assert!(ScalarKMeans::from_centroids(vec![1.0, 0.0]).is_err());
        assert!(ScalarKMeans::from_centroids(Vec::new()).is_err());
        assert!(ScalarKMeans::from_centroids(vec![-1.0, 0.5, 2.0]).is_ok());
    }
}
