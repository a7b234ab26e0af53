//! # Cluster aggregation
//!
//! Collapses the pairwise estimates of one cluster into a single [`ClusterAggregate`] row.
//!
//! ## Attributed samples
//!
//! Each estimate is attributed to **both** observations that produced it. For every
//! member `o` and every estimate `e` involving `o`, one [`AttributedSample`] is formed:
//!
//! | field            | source                                   |
//! |------------------|------------------------------------------|
//! | latitude/longitude | the shared object location of `e`      |
//! | bearing          | `o`'s own bearing                        |
//! | baseline         | baseline of `e`                          |
//! | object distance  | distance from `o`'s capture point to `e` |
//! | capture lat/lon  | `o`'s capture point                      |
//!
//! A cluster of `n` fully triangulated members therefore yields `n (n − 1)` samples, each
//! object location counted twice. Means and sample standard deviations (`N − 1`
//! denominator) are computed over all samples.

use serde::{Deserialize, Serialize};

use crate::clustering::observation_index::ObjectCluster;
use crate::clustering::ClusterId;
use crate::constants::{Degree, Feet, VIEWER_BASE_URL, VIEWER_OBJECT_PITCH};
use crate::geoloc_errors::GeolocError;
use crate::triangulation::PairwiseEstimate;

/// Mean and sample standard deviation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl SummaryStats {
    /// Summary of `values`, `None` with fewer than two values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let values: Vec<f64> = values.into_iter().collect();
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(SummaryStats {
            mean,
            std_dev: var.sqrt(),
        })
    }
}

/// One estimate as seen from one of its two observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributedSample {
    pub latitude: Degree,
    pub longitude: Degree,
    pub bearing: Degree,
    pub baseline_distance: Feet,
    pub object_distance: Feet,
    pub capture_latitude: Degree,
    pub capture_longitude: Degree,
}

/// Final per-cluster output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAggregate {
    pub cluster_id: ClusterId,
    pub label: String,
    pub member_count: usize,
    pub pair_count: usize,
    pub skipped_pairs: usize,
    pub sample_count: usize,
    pub latitude: SummaryStats,
    pub longitude: SummaryStats,
    pub bearing: SummaryStats,
    pub baseline_distance: SummaryStats,
    pub object_distance: SummaryStats,
    pub capture_latitude: SummaryStats,
    pub capture_longitude: SummaryStats,
    pub external_viewer_url: String,
}

/// Panorama viewer link looking from `(latitude, longitude)` along `heading`.
///
/// The URL API expects `viewpoint=lat,lon`; cardinal-view links use the same order.
pub fn viewer_url(latitude: Degree, longitude: Degree, heading: Degree) -> String {
    format!(
        "{VIEWER_BASE_URL}&viewpoint={latitude},{longitude}&heading={heading}&pitch={VIEWER_OBJECT_PITCH}"
    )
}

/// Attribute every estimate to the cluster members that produced it.
///
/// Estimates that do not involve a member are ignored.
pub fn attributed_samples(
    cluster: &ObjectCluster,
    estimates: &[PairwiseEstimate],
) -> Vec<AttributedSample> {
    cluster
        .members()
        .iter()
        .flat_map(|obs| {
            let id = obs.observation_id();
            estimates.iter().filter_map(move |est| {
                let object_distance = est.distance_from(id)?;
                let capture = est.capture_of(id)?;
                Some(AttributedSample {
                    latitude: est.estimated_latitude,
                    longitude: est.estimated_longitude,
                    bearing: obs.bearing(),
                    baseline_distance: est.baseline_distance,
                    object_distance,
                    capture_latitude: capture.latitude,
                    capture_longitude: capture.longitude,
                })
            })
        })
        .collect()
}

/// Aggregate the estimates of one cluster.
///
/// Arguments
/// -----------------
/// * `cluster`: the object cluster.
/// * `estimates`: the successful pairwise estimates of that cluster.
///
/// Return
/// ----------
/// * The [`ClusterAggregate`], or [`GeolocError::InsufficientSamplesError`] when fewer
///   than two samples can be attributed.
///
/// See also
/// ------------
/// * [`crate::triangulation::PairwiseTriangulator::triangulate_cluster`] – Producer of `estimates`.
pub fn aggregate(
    cluster: &ObjectCluster,
    estimates: &[PairwiseEstimate],
) -> Result<ClusterAggregate, GeolocError> {
    let samples = attributed_samples(cluster, estimates);

    let insufficient = || GeolocError::InsufficientSamplesError {
        cluster_id: cluster.id(),
        samples: samples.len(),
    };
    let stats = |f: fn(&AttributedSample) -> f64| -> Result<SummaryStats, GeolocError> {
        SummaryStats::from_values(samples.iter().map(f)).ok_or_else(insufficient)
    };

    let latitude = stats(|s| s.latitude)?;
    let longitude = stats(|s| s.longitude)?;
    let bearing = stats(|s| s.bearing)?;

    let n = cluster.len();
    let pair_count = estimates.len();

    Ok(ClusterAggregate {
        cluster_id: cluster.id(),
        label: cluster.label().to_string(),
        member_count: n,
        pair_count,
        skipped_pairs: (n * n.saturating_sub(1) / 2).saturating_sub(pair_count),
        sample_count: samples.len(),
        external_viewer_url: viewer_url(latitude.mean, longitude.mean, bearing.mean),
        latitude,
        longitude,
        bearing,
        baseline_distance: stats(|s| s.baseline_distance)?,
        object_distance: stats(|s| s.object_distance)?,
        capture_latitude: stats(|s| s.capture_latitude)?,
        capture_longitude: stats(|s| s.capture_longitude)?,
    })
}
