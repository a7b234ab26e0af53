//! # Point clustering
//!
//! Observations of the same physical object are captured from nearby points along a
//! street, so they are grouped by density-clustering their **capture points**. The
//! clustering primitive itself sits behind the [`PointClusterer`] trait; a reference
//! DBSCAN ([`dbscan::Dbscan`]) is bundled.
//!
//! ## Overview
//!
//! - [`ClusterLabel`] – raw output of a clusterer: a numeric label or noise
//! - [`ClusteringParams`] – search distance and minimum member count
//! - [`ClusterId`] – opaque, stable identifier given to each retained cluster
//! - [`observation_index::ObservationIndex`] – labels → [`observation_index::ObjectCluster`]s

pub mod dbscan;
pub mod observation_index;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{Feet, ObservationId};
use crate::geoloc_errors::GeolocError;

/// Namespace of membership-derived cluster identifiers (UUID v5).
const CLUSTER_ID_NAMESPACE: Uuid = Uuid::from_u128(0x8c1f_4e52_9a7d_4b0e_b3c6_51d2_7e90_a4f3);

/// Output label of a clustering primitive for one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterLabel {
    /// The point is not dense enough to belong to any cluster.
    Noise,
    /// The point belongs to the cluster with this numeric label.
    Cluster(u32),
}

impl ClusterLabel {
    /// Interpret a raw integer label; negative values (conventionally `-1`) are noise.
    pub fn from_raw(raw: i64) -> Self {
        match u32::try_from(raw) {
            Ok(label) => ClusterLabel::Cluster(label),
            Err(_) if raw < 0 => ClusterLabel::Noise,
            Err(_) => ClusterLabel::Cluster(u32::MAX),
        }
    }

    pub fn is_noise(&self) -> bool {
        matches!(self, ClusterLabel::Noise)
    }
}

/// Parameters of a density-clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusteringParams {
    /// Neighbourhood radius in survey feet.
    pub search_distance: Feet,
    /// Minimum number of points (the point itself included) for a dense neighbourhood.
    pub min_members: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        ClusteringParams {
            search_distance: 50.0,
            min_members: 2,
        }
    }
}

/// A density-based point-clustering primitive.
///
/// Implementations must return exactly one label per input point, aligned by index.
pub trait PointClusterer {
    fn cluster(
        &self,
        points: &[[f64; 2]],
        params: &ClusteringParams,
    ) -> Result<Vec<ClusterLabel>, GeolocError>;
}

/// Opaque identifier of an object cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(Uuid);

impl ClusterId {
    pub const fn from_u128(value: u128) -> Self {
        ClusterId(Uuid::from_u128(value))
    }

    /// A fresh random identifier (UUID v4).
    pub fn new_random() -> Self {
        ClusterId(Uuid::new_v4())
    }

    /// Identifier derived from the cluster membership (UUID v5).
    ///
    /// The ids are sorted first, so the result does not depend on member order; the same
    /// membership always yields the same identifier.
    pub fn from_members(member_ids: &[ObservationId]) -> Self {
        let mut ids = member_ids.to_vec();
        ids.sort_unstable();
        let key = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        ClusterId(Uuid::new_v5(&CLUSTER_ID_NAMESPACE, key.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod clustering_test {
    use super::*;

    #[test]
    fn test_label_from_raw() {
        assert_eq!(ClusterLabel::from_raw(-1), ClusterLabel::Noise);
        assert_eq!(ClusterLabel::from_raw(-7), ClusterLabel::Noise);
        assert_eq!(ClusterLabel::from_raw(0), ClusterLabel::Cluster(0));
        assert_eq!(ClusterLabel::from_raw(12), ClusterLabel::Cluster(12));
        assert!(ClusterLabel::Noise.is_noise());
    }

    #[test]
    fn test_membership_id_is_order_independent() {
        let a = ClusterId::from_members(&[3, 1, 2]);
        let b = ClusterId::from_members(&[1, 2, 3]);
        let c = ClusterId::from_members(&[1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_uuid().get_version_num(), 5);
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(ClusterId::new_random(), ClusterId::new_random());
    }

    #[test]
    fn test_display_is_hyphenated_uuid() {
        let id = ClusterId::from_u128(1);
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000001");
    }
}
