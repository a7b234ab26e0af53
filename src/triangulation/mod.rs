//! # Pairwise triangulation
//!
//! Two observations of the same object, taken from different capture points, each define
//! a line in the survey plane:
//!
//! ```text
//! P_a + s · d_a        d = (sin θ, cos θ)   (easting, northing)
//! P_b + t · d_b
//! ```
//!
//! Their intersection is the estimated object location. The 2×2 system
//! `[d_a  −d_b] · (s, t)ᵀ = P_b − P_a` has determinant `−sin(θa − θb)`, so bearings that
//! are equal **or opposite** have no usable solution and yield
//! [`GeolocError::ParallelBearingsError`]. Lines are intersected, not rays: an
//! intersection behind a capture point is still reported.
//!
//! ## Overview
//!
//! - [`PairwiseEstimate`] – intersection, geographic position and the pair geometry
//! - [`PairwiseTriangulator`] – single pair ([`PairwiseTriangulator::estimate`]) and
//!   whole cluster ([`PairwiseTriangulator::triangulate_cluster`])
//! - [`SkippedPair`] – a pair left out of a cluster, with the reason
//!
//! ## See also
//! * [`crate::aggregation`] – Turns the estimates of a cluster into one aggregate row.

use itertools::Itertools;
use log::warn;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::clustering::observation_index::ObjectCluster;
use crate::clustering::ClusterId;
use crate::constants::{Degree, Feet, ObservationId, PARALLEL_EPS, RADEG};
use crate::geoloc_errors::{ErrorKind, GeolocError};
use crate::observations::Observation;
use crate::ref_system::{CoordinateTransform, GeoPoint};

/// Triangulated location of an object seen by exactly two observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseEstimate {
    pub observation_id_a: ObservationId,
    pub observation_id_b: ObservationId,
    pub estimated_easting: Feet,
    pub estimated_northing: Feet,
    pub estimated_latitude: Degree,
    pub estimated_longitude: Degree,
    /// Geographic position of the first capture point
    pub capture_a: GeoPoint,
    /// Geographic position of the second capture point
    pub capture_b: GeoPoint,
    pub bearing_a: Degree,
    pub bearing_b: Degree,
    /// Arithmetic mean of the two bearings, not wrap-aware: 350° and 10° give 180°.
    pub mean_bearing: Degree,
    pub baseline_distance: Feet,
    pub distance_a_to_object: Feet,
    pub distance_b_to_object: Feet,
}

impl PairwiseEstimate {
    /// Distance from the given observation's capture point to the estimate, if it takes part.
    pub fn distance_from(&self, observation_id: ObservationId) -> Option<Feet> {
        if observation_id == self.observation_id_a {
            Some(self.distance_a_to_object)
        } else if observation_id == self.observation_id_b {
            Some(self.distance_b_to_object)
        } else {
            None
        }
    }

    /// Geographic capture point of the given observation, if it takes part.
    pub fn capture_of(&self, observation_id: ObservationId) -> Option<GeoPoint> {
        if observation_id == self.observation_id_a {
            Some(self.capture_a)
        } else if observation_id == self.observation_id_b {
            Some(self.capture_b)
        } else {
            None
        }
    }

    pub fn involves(&self, observation_id: ObservationId) -> bool {
        observation_id == self.observation_id_a || observation_id == self.observation_id_b
    }
}

/// A pair of a cluster that produced no estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub cluster_id: ClusterId,
    pub observation_a: ObservationId,
    pub observation_b: ObservationId,
    pub error_kind: ErrorKind,
    pub message: String,
}

/// All estimates of one cluster, plus the pairs that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTriangulation {
    pub cluster_id: ClusterId,
    pub estimates: Vec<PairwiseEstimate>,
    pub skipped: Vec<SkippedPair>,
}

/// Intersects bearing lines and georeferences the result.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseTriangulator {
    transform: CoordinateTransform,
    parallel_tolerance: f64,
}

impl PairwiseTriangulator {
    pub fn new(transform: CoordinateTransform) -> Self {
        PairwiseTriangulator {
            transform,
            parallel_tolerance: PARALLEL_EPS,
        }
    }

    /// Override the `|sin(θa − θb)|` threshold below which lines count as parallel.
    pub fn with_parallel_tolerance(mut self, tolerance: f64) -> Self {
        self.parallel_tolerance = tolerance;
        self
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Triangulate one pair of observations.
    ///
    /// Arguments
    /// -----------------
    /// * `obs_a`, `obs_b`: two observations assigned to the same cluster.
    ///
    /// Return
    /// ----------
    /// * The [`PairwiseEstimate`], or
    ///   - [`GeolocError::MismatchedClusters`] if the cluster ids differ or are missing,
    ///   - [`GeolocError::ParallelBearingsError`] if the bearing lines do not cross,
    ///   - [`GeolocError::CoordinateError`] if a point cannot be georeferenced.
    pub fn estimate(
        &self,
        obs_a: &Observation,
        obs_b: &Observation,
    ) -> Result<PairwiseEstimate, GeolocError> {
        match (obs_a.cluster_id(), obs_b.cluster_id()) {
            (Some(a), Some(b)) if a == b => {}
            _ => {
                return Err(GeolocError::MismatchedClusters {
                    observation_a: obs_a.observation_id(),
                    observation_b: obs_b.observation_id(),
                })
            }
        }

        let point = self.intersect(obs_a, obs_b)?;
        let capture_a = obs_a.capture_point();
        let capture_b = obs_b.capture_point();

        let object = self.transform.to_geo_point(point.x, point.y)?;

        Ok(PairwiseEstimate {
            observation_id_a: obs_a.observation_id(),
            observation_id_b: obs_b.observation_id(),
            estimated_easting: point.x,
            estimated_northing: point.y,
            estimated_latitude: object.latitude,
            estimated_longitude: object.longitude,
            capture_a: self.transform.to_geo_point(capture_a.x, capture_a.y)?,
            capture_b: self.transform.to_geo_point(capture_b.x, capture_b.y)?,
            bearing_a: obs_a.bearing(),
            bearing_b: obs_b.bearing(),
            mean_bearing: (obs_a.bearing() + obs_b.bearing()) / 2.0,
            baseline_distance: (capture_b - capture_a).norm(),
            distance_a_to_object: (point - capture_a).norm(),
            distance_b_to_object: (point - capture_b).norm(),
        })
    }

    /// Planar intersection of the two bearing lines.
    fn intersect(
        &self,
        obs_a: &Observation,
        obs_b: &Observation,
    ) -> Result<Vector2<f64>, GeolocError> {
        let parallel = || GeolocError::ParallelBearingsError {
            observation_a: obs_a.observation_id(),
            observation_b: obs_b.observation_id(),
        };

        let angle = (obs_a.bearing() - obs_b.bearing()) * RADEG;
        if angle.sin().abs() < self.parallel_tolerance {
            return Err(parallel());
        }

        let d_a = obs_a.direction();
        let d_b = obs_b.direction();
        let system = Matrix2::new(d_a.x, -d_b.x, d_a.y, -d_b.y);
        let rhs = obs_b.capture_point() - obs_a.capture_point();

        let st = system.lu().solve(&rhs).ok_or_else(parallel)?;
        let point = obs_a.capture_point() + d_a * st.x;

        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(parallel());
        }
        Ok(point)
    }

    /// Triangulate every unordered pair of a cluster.
    ///
    /// Pairs follow the member order (ascending observation id). A pair that fails is
    /// recorded in [`ClusterTriangulation::skipped`] and the remaining pairs still run.
    pub fn triangulate_cluster(&self, cluster: &ObjectCluster) -> ClusterTriangulation {
        let mut estimates = Vec::new();
        let mut skipped = Vec::new();

        for (a, b) in cluster.members().iter().tuple_combinations() {
            match self.estimate(a, b) {
                Ok(estimate) => estimates.push(estimate),
                Err(err) => {
                    warn!(
                        "cluster {}: skipping pair ({}, {}): {err}",
                        cluster.id(),
                        a.observation_id(),
                        b.observation_id()
                    );
                    skipped.push(SkippedPair {
                        cluster_id: cluster.id(),
                        observation_a: a.observation_id(),
                        observation_b: b.observation_id(),
                        error_kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        ClusterTriangulation {
            cluster_id: cluster.id(),
            estimates,
            skipped,
        }
    }
}

#[cfg(test)]
mod triangulation_test {
    use super::*;
    use crate::constants::EPSG_WGS84;
    use approx::assert_abs_diff_eq;

    const E0: f64 = 6_056_000.0;
    const N0: f64 = 2_252_000.0;

    fn triangulator() -> PairwiseTriangulator {
        PairwiseTriangulator::new(CoordinateTransform::new(2230, EPSG_WGS84).unwrap())
    }

    fn obs(id: ObservationId, e: f64, n: f64, bearing: f64) -> Observation {
        Observation::new(id, E0 + e, N0 + n, bearing, "stop sign")
            .unwrap()
            .with_cluster(ClusterId::from_u128(7))
    }

    #[test]
    fn test_estimate_symmetric_pair() {
        let est = triangulator()
            .estimate(&obs(1, 0.0, 0.0, 45.0), &obs(2, 100.0, 0.0, 315.0))
            .unwrap();

        assert_abs_diff_eq!(est.estimated_easting, E0 + 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(est.estimated_northing, N0 + 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(est.baseline_distance, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(est.distance_a_to_object, 50.0 * 2f64.sqrt(), epsilon = 1e-6);
        assert_abs_diff_eq!(est.distance_b_to_object, 50.0 * 2f64.sqrt(), epsilon = 1e-6);
        assert_abs_diff_eq!(est.mean_bearing, 180.0);
        assert_eq!(est.distance_from(2), Some(est.distance_b_to_object));
        assert_eq!(est.distance_from(3), None);

        let geo = triangulator()
            .transform()
            .to_geo_point(E0 + 50.0, N0 + 50.0)
            .unwrap();
        assert_abs_diff_eq!(est.estimated_latitude, geo.latitude, epsilon = 1e-9);
        assert_abs_diff_eq!(est.estimated_longitude, geo.longitude, epsilon = 1e-9);
    }

    #[test]
    fn test_estimate_parallel_bearings() {
        let t = triangulator();
        assert_eq!(
            t.estimate(&obs(1, 0.0, 0.0, 30.0), &obs(2, 50.0, 0.0, 30.0)),
            Err(GeolocError::ParallelBearingsError {
                observation_a: 1,
                observation_b: 2
            })
        );
        // Opposite bearings describe the same family of lines.
        assert!(matches!(
            t.estimate(&obs(1, 0.0, 0.0, 30.0), &obs(2, 50.0, 0.0, 210.0)),
            Err(GeolocError::ParallelBearingsError { .. })
        ));
    }

    #[test]
    fn test_estimate_requires_same_cluster() {
        let a = obs(1, 0.0, 0.0, 45.0);
        let b = Observation::new(2, E0 + 100.0, N0, 315.0, "stop sign").unwrap();
        assert_eq!(
            triangulator().estimate(&a, &b),
            Err(GeolocError::MismatchedClusters {
                observation_a: 1,
                observation_b: 2
            })
        );
        let c = b.with_cluster(ClusterId::from_u128(8));
        assert!(triangulator().estimate(&a, &c).is_err());
    }

    #[test]
    fn test_intersection_behind_capture_point() {
        // Both lines cross at (50, -50), behind the two cameras.
        let est = triangulator()
            .estimate(&obs(1, 0.0, 0.0, 315.0), &obs(2, 100.0, 0.0, 45.0))
            .unwrap();
        assert_abs_diff_eq!(est.estimated_easting - E0, 50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(est.estimated_northing - N0, -50.0, epsilon = 1e-6);
    }

    #[test]
    fn test_triangulate_cluster_skips_parallel_pair() {
        let id = ClusterId::from_u128(7);
        let members = vec![
            obs(1, 0.0, 0.0, 45.0),
            obs(2, 100.0, 0.0, 315.0),
            obs(3, 30.0, -20.0, 45.0),
        ];
        let cluster = ObjectCluster::new(id, 0, members).unwrap();
        let result = triangulator().triangulate_cluster(&cluster);

        assert_eq!(result.cluster_id, id);
        assert_eq!(result.estimates.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(
            (result.skipped[0].observation_a, result.skipped[0].observation_b),
            (1, 3)
        );
        assert_eq!(result.skipped[0].error_kind, ErrorKind::ParallelBearingsError);
        let pairs: Vec<_> = result
            .estimates
            .iter()
            .map(|e| (e.observation_id_a, e.observation_id_b))
            .collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3)]);
    }
}
