//! # Observation index
//!
//! Turns the flat label vector of a [`PointClusterer`] into [`ObjectCluster`]s: one
//! identified, ordered group of observations per numeric label. Noise is dropped.
//!
//! Every retained cluster has at least two members. A clusterer may still produce a
//! singleton label (e.g. with `min_members = 1`); such clusters are rejected with
//! [`GeolocError::ClusterMembershipError`]:
//! * [`ObservationIndex::build_clusters`] fails on the first rejection,
//! * [`ObservationIndex::index`] returns rejections next to the retained clusters, so a
//!   batch caller can record them and move on.
//!
//! ## Ordering
//!
//! Clusters are returned by ascending raw label; members by ascending observation id.
//! Both orders depend only on the input, never on hashing or worker scheduling.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::clustering::{ClusterId, ClusterLabel, ClusteringParams, PointClusterer};
use crate::constants::{ClusterMembers, ObservationId};
use crate::geoloc_errors::GeolocError;
use crate::observations::Observation;

/// How cluster identifiers are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClusterIdStrategy {
    /// UUID v5 over the sorted member ids: identical membership, identical id.
    #[default]
    MembershipHash,
    /// Fresh UUID v4 per cluster and per run.
    Random,
}

impl ClusterIdStrategy {
    fn assign(&self, member_ids: &[ObservationId]) -> ClusterId {
        match self {
            ClusterIdStrategy::MembershipHash => ClusterId::from_members(member_ids),
            ClusterIdStrategy::Random => ClusterId::new_random(),
        }
    }
}

/// Observations believed to show the same physical object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCluster {
    id: ClusterId,
    raw_label: u32,
    label: String,
    members: ClusterMembers,
}

impl ObjectCluster {
    /// Build a cluster from already grouped observations.
    ///
    /// Members are re-assigned to `id` and sorted by observation id.
    ///
    /// Errors
    /// ----------
    /// * [`GeolocError::ClusterMembershipError`] with fewer than two members.
    /// * [`GeolocError::DuplicateObservationId`] when two members share an id, since
    ///   samples are attributed to observations by id.
    pub fn new(
        id: ClusterId,
        raw_label: u32,
        members: impl IntoIterator<Item = Observation>,
    ) -> Result<Self, GeolocError> {
        let mut members: ClusterMembers = members
            .into_iter()
            .map(|obs| obs.with_cluster(id))
            .collect();
        members.sort_by_key(Observation::observation_id);

        if members.len() < 2 {
            return Err(GeolocError::ClusterMembershipError {
                cluster_id: id,
                members: members.len(),
            });
        }
        if let Some(pair) = members
            .windows(2)
            .find(|w| w[0].observation_id() == w[1].observation_id())
        {
            return Err(GeolocError::DuplicateObservationId(pair[0].observation_id()));
        }

        let label = members
            .iter()
            .map(Observation::label)
            .unique()
            .sorted()
            .join("|");

        Ok(ObjectCluster {
            id,
            raw_label,
            label,
            members,
        })
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn raw_label(&self) -> u32 {
        self.raw_label
    }

    /// Object class shared by the members; distinct classes are joined with `|`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn members(&self) -> &[Observation] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_ids(&self) -> Vec<ObservationId> {
        self.members.iter().map(Observation::observation_id).collect()
    }
}

/// A label group that could not become an [`ObjectCluster`].
#[derive(Debug)]
pub struct RejectedCluster {
    pub cluster_id: ClusterId,
    pub raw_label: u32,
    pub member_ids: Vec<ObservationId>,
    pub error: GeolocError,
}

/// Result of a lenient indexing run.
#[derive(Debug, Default)]
pub struct IndexedClusters {
    pub clusters: Vec<ObjectCluster>,
    pub rejected: Vec<RejectedCluster>,
    /// Ids of the observations labelled as noise.
    pub noise: Vec<ObservationId>,
}

/// Groups observations into object clusters through a clustering primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationIndex {
    id_strategy: ClusterIdStrategy,
}

impl ObservationIndex {
    pub fn new(id_strategy: ClusterIdStrategy) -> Self {
        ObservationIndex { id_strategy }
    }

    pub fn id_strategy(&self) -> ClusterIdStrategy {
        self.id_strategy
    }

    /// Cluster the observations and keep rejected groups aside.
    ///
    /// Arguments
    /// -----------------
    /// * `observations`: observations to group; their capture points are clustered.
    /// * `params`: search distance and minimum member count for the clusterer.
    /// * `clusterer`: the clustering primitive.
    ///
    /// Return
    /// ----------
    /// * [`IndexedClusters`] with retained clusters, rejected groups and noise ids, or
    ///   [`GeolocError::ClusteringFailed`] when the clusterer fails or returns a label
    ///   vector of the wrong length.
    pub fn index<C: PointClusterer + ?Sized>(
        &self,
        observations: &[Observation],
        params: &ClusteringParams,
        clusterer: &C,
    ) -> Result<IndexedClusters, GeolocError> {
        let points: Vec<[f64; 2]> = observations
            .iter()
            .map(|obs| [obs.capture_easting(), obs.capture_northing()])
            .collect();

        let labels = clusterer.cluster(&points, params)?;
        if labels.len() != observations.len() {
            return Err(GeolocError::ClusteringFailed(format!(
                "clusterer returned {} labels for {} points",
                labels.len(),
                observations.len()
            )));
        }

        let mut groups: BTreeMap<u32, Vec<&Observation>> = BTreeMap::new();
        let mut indexed = IndexedClusters::default();

        for (obs, label) in observations.iter().zip(labels) {
            match label {
                ClusterLabel::Noise => indexed.noise.push(obs.observation_id()),
                ClusterLabel::Cluster(raw) => groups.entry(raw).or_default().push(obs),
            }
        }

        for (raw_label, group) in groups {
            let member_ids: Vec<ObservationId> = group
                .iter()
                .map(|obs| obs.observation_id())
                .sorted()
                .collect();
            let id = self.id_strategy.assign(&member_ids);

            match ObjectCluster::new(id, raw_label, group.into_iter().cloned()) {
                Ok(cluster) => indexed.clusters.push(cluster),
                Err(error) => indexed.rejected.push(RejectedCluster {
                    cluster_id: id,
                    raw_label,
                    member_ids,
                    error,
                }),
            }
        }

        debug!(
            "indexed {} observations: {} clusters, {} rejected, {} noise",
            observations.len(),
            indexed.clusters.len(),
            indexed.rejected.len(),
            indexed.noise.len()
        );

        Ok(indexed)
    }

    /// Cluster the observations, failing on the first undersized cluster.
    ///
    /// See also
    /// ------------
    /// * [`ObservationIndex::index`] – Lenient variant used by the pipeline.
    pub fn build_clusters<C: PointClusterer + ?Sized>(
        &self,
        observations: &[Observation],
        params: &ClusteringParams,
        clusterer: &C,
    ) -> Result<Vec<ObjectCluster>, GeolocError> {
        let indexed = self.index(observations, params, clusterer)?;
        match indexed.rejected.into_iter().next() {
            Some(rejected) => Err(rejected.error),
            None => Ok(indexed.clusters),
        }
    }
}
