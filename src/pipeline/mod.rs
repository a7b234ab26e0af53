//! # Geolocation pipeline
//!
//! Batch driver from raw observations to per-object aggregates.
//!
//! ## Stages
//!
//! 1. **Filter** – drop observations whose known confidence is below `min_confidence`.
//! 2. **Partition** – one partition per object class (or a single one), in label order.
//! 3. **Cluster** – [`ObservationIndex::index`] per partition. Undersized clusters are
//!    recorded as failures at stage [`ClusterStage::Clustered`]; a partition whose
//!    clustering fails is reported in [`PipelineOutput::failed_partitions`].
//! 4. **Triangulate** – every unordered pair of every cluster; failed pairs are skipped and
//!    reported in [`PipelineOutput::skipped_pairs`].
//! 5. **Aggregate** – one [`ClusterAggregate`] per cluster, or a failure at stage
//!    [`ClusterStage::Triangulated`].
//!
//! Clusters are independent: a failure in one never affects another. With the `parallel`
//! feature stages 4–5 run on the rayon pool; results are collected by position, so the
//! output order is the same as in a sequential run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use photogeo::clustering::dbscan::Dbscan;
//! use photogeo::observations::csv_reader::read_observations_csv;
//! use photogeo::pipeline::{GeolocationPipeline, PipelineParams};
//! use camino::Utf8Path;
//!
//! let observations = read_observations_csv(Utf8Path::new("observations.csv")).unwrap();
//! let pipeline = GeolocationPipeline::new(PipelineParams::default(), Dbscan).unwrap();
//! let output = pipeline.run(&observations).unwrap();
//! for agg in &output.aggregates {
//!     println!("{} {} {}", agg.cluster_id, agg.latitude.mean, agg.longitude.mean);
//! }
//! ```

pub mod params;
#[cfg(feature = "progress")]
mod progress;

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::aggregation::{aggregate, ClusterAggregate};
use crate::clustering::observation_index::{ObjectCluster, ObservationIndex};
use crate::clustering::{ClusterId, PointClusterer};
use crate::constants::ObservationId;
use crate::geoloc_errors::{ErrorKind, GeolocError};
use crate::observations::Observation;
use crate::ref_system::CoordinateTransform;
use crate::store::FeatureStore;
use crate::triangulation::{ClusterTriangulation, PairwiseTriangulator, SkippedPair};

pub use params::{PipelineParams, PipelineParamsBuilder};

/// Lifecycle of one cluster.
///
/// `Clustered → Triangulated → Aggregated`, or `Clustered | Triangulated → Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterStage {
    Clustered,
    Triangulated,
    Aggregated,
    Failed,
}

/// Manifest entry of a cluster that produced no aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub cluster_id: ClusterId,
    pub label: String,
    pub error_kind: ErrorKind,
    pub message: String,
    /// Last stage reached before failing
    pub stage: ClusterStage,
}

impl FailureRecord {
    fn new(cluster_id: ClusterId, label: &str, error: &GeolocError, stage: ClusterStage) -> Self {
        FailureRecord {
            cluster_id,
            label: label.to_string(),
            error_kind: error.kind(),
            message: error.to_string(),
            stage,
        }
    }
}

/// A partition whose observations could not be clustered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFailure {
    /// Partition key: the object label, or empty without label partitioning
    pub partition: String,
    pub observation_ids: Vec<ObservationId>,
    pub error_kind: ErrorKind,
    pub message: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// Successful aggregates, partitions in label order then clusters in raw-label order
    pub aggregates: Vec<ClusterAggregate>,
    pub failures: Vec<FailureRecord>,
    pub failed_partitions: Vec<PartitionFailure>,
    pub skipped_pairs: Vec<SkippedPair>,
    /// Observations labelled as noise by the clusterer
    pub noise: Vec<ObservationId>,
    /// Observations dropped by the confidence filter
    pub filtered_out: usize,
}

impl PipelineOutput {
    /// Final stage of a cluster of this run, `None` for unknown ids.
    pub fn stage_of(&self, cluster_id: ClusterId) -> Option<ClusterStage> {
        if self.aggregates.iter().any(|a| a.cluster_id == cluster_id) {
            Some(ClusterStage::Aggregated)
        } else if self.failures.iter().any(|f| f.cluster_id == cluster_id) {
            Some(ClusterStage::Failed)
        } else {
            None
        }
    }

    /// Write aggregates and failures to a store, keyed by cluster id.
    pub fn persist<S: FeatureStore>(
        &self,
        store: &mut S,
        aggregates_table: &str,
        failures_table: &str,
    ) -> Result<(), GeolocError> {
        for agg in &self.aggregates {
            store.upsert(aggregates_table, &agg.cluster_id.to_string(), agg)?;
        }
        for failure in &self.failures {
            store.upsert(failures_table, &failure.cluster_id.to_string(), failure)?;
        }
        Ok(())
    }
}

/// Drives observations through clustering, triangulation and aggregation.
#[derive(Debug, Clone)]
pub struct GeolocationPipeline<C: PointClusterer> {
    params: PipelineParams,
    clusterer: C,
    index: ObservationIndex,
    triangulator: PairwiseTriangulator,
}

impl<C: PointClusterer> GeolocationPipeline<C> {
    /// Build a pipeline.
    ///
    /// Arguments
    /// -----------------
    /// * `params`: run configuration; validated again here.
    /// * `clusterer`: clustering primitive used for every partition.
    ///
    /// Return
    /// ----------
    /// * The pipeline, or the validation error of `params`.
    pub fn new(params: PipelineParams, clusterer: C) -> Result<Self, GeolocError> {
        let params = PipelineParamsBuilder::from(params).build()?;
        let transform = CoordinateTransform::new(params.source_epsg, params.target_epsg)?;

        Ok(GeolocationPipeline {
            index: ObservationIndex::new(params.id_strategy),
            triangulator: PairwiseTriangulator::new(transform)
                .with_parallel_tolerance(params.parallel_tolerance),
            params,
            clusterer,
        })
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    fn keep(&self, obs: &Observation) -> bool {
        match (self.params.min_confidence, obs.confidence()) {
            (Some(floor), Some(confidence)) => confidence >= floor,
            _ => true,
        }
    }

    /// Observations grouped by the partition key, in key order.
    fn partition(&self, observations: Vec<Observation>) -> BTreeMap<String, Vec<Observation>> {
        let mut partitions: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for obs in observations {
            let key = if self.params.partition_by_label {
                obs.label().to_string()
            } else {
                String::new()
            };
            partitions.entry(key).or_default().push(obs);
        }
        partitions
    }

    /// Run the whole batch.
    ///
    /// Per-pair, per-cluster and per-partition failures are reported in the output and
    /// never abort the run.
    pub fn run(&self, observations: &[Observation]) -> Result<PipelineOutput, GeolocError> {
        let mut output = PipelineOutput::default();

        let kept: Vec<Observation> = observations
            .iter()
            .filter(|obs| self.keep(obs))
            .cloned()
            .collect();
        output.filtered_out = observations.len() - kept.len();
        if output.filtered_out > 0 {
            debug!(
                "{} observation(s) below the confidence floor",
                output.filtered_out
            );
        }

        let clustering = self.params.clustering();
        let mut clusters: Vec<ObjectCluster> = Vec::new();

        for (key, members) in self.partition(kept) {
            let indexed = match self.index.index(&members, &clustering, &self.clusterer) {
                Ok(indexed) => indexed,
                Err(err) => {
                    warn!("partition '{key}' could not be clustered: {err}");
                    output.failed_partitions.push(PartitionFailure {
                        partition: key,
                        observation_ids: members.iter().map(Observation::observation_id).collect(),
                        error_kind: err.kind(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            debug!(
                "partition '{key}': {} observations, {} clusters",
                members.len(),
                indexed.clusters.len()
            );

            for rejected in indexed.rejected {
                warn!("cluster {} rejected: {}", rejected.cluster_id, rejected.error);
                output.failures.push(FailureRecord::new(
                    rejected.cluster_id,
                    &key,
                    &rejected.error,
                    ClusterStage::Clustered,
                ));
            }
            output.noise.extend(indexed.noise);
            clusters.extend(indexed.clusters);
        }

        for (cluster, (triangulation, result)) in
            clusters.iter().zip(self.process_clusters(&clusters))
        {
            output.skipped_pairs.extend(triangulation.skipped);
            match result {
                Ok(agg) => output.aggregates.push(agg),
                Err(err) => {
                    warn!("cluster {} failed: {err}", cluster.id());
                    output.failures.push(FailureRecord::new(
                        cluster.id(),
                        cluster.label(),
                        &err,
                        ClusterStage::Triangulated,
                    ));
                }
            }
        }

        info!(
            "{} clusters aggregated, {} failed, {} partitions failed, {} pairs skipped, \
             {} noise observations",
            output.aggregates.len(),
            output.failures.len(),
            output.failed_partitions.len(),
            output.skipped_pairs.len(),
            output.noise.len()
        );

        Ok(output)
    }

    /// Triangulate and aggregate every cluster, one result slot per cluster.
    fn process_clusters(
        &self,
        clusters: &[ObjectCluster],
    ) -> Vec<(ClusterTriangulation, Result<ClusterAggregate, GeolocError>)> {
        let triangulator = &self.triangulator;

        #[cfg(feature = "progress")]
        let pb = progress::cluster_progress_bar(clusters.len());

        let process = |cluster: &ObjectCluster| {
            let triangulation = triangulator.triangulate_cluster(cluster);
            let result = aggregate(cluster, &triangulation.estimates);
            #[cfg(feature = "progress")]
            pb.inc(1);
            (triangulation, result)
        };

        #[cfg(feature = "parallel")]
        let results = {
            use rayon::prelude::*;
            clusters.par_iter().map(process).collect::<Vec<_>>()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = clusters.iter().map(process).collect();

        #[cfg(feature = "progress")]
        pb.finish_and_clear();

        results
    }
}
