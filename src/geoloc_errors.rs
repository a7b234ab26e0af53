use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clustering::ClusterId;
use crate::constants::ObservationId;

#[derive(Error, Debug)]
pub enum GeolocError {
    #[error("Invalid coordinate input: {0}")]
    CoordinateError(String),

    #[error("Unsupported coordinate reference system: EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("Bearing is undefined: {0}")]
    UndefinedBearing(String),

    #[error("Cluster {cluster_id} has {members} member(s), at least 2 are required")]
    ClusterMembershipError {
        cluster_id: ClusterId,
        members: usize,
    },

    #[error(
        "Bearings of observations {observation_a} and {observation_b} are parallel; \
         the intersection is undefined"
    )]
    ParallelBearingsError {
        observation_a: ObservationId,
        observation_b: ObservationId,
    },

    #[error("Observation id {0} appears more than once")]
    DuplicateObservationId(ObservationId),

    #[error("Cluster {cluster_id} produced {samples} attributed sample(s), at least 2 are required")]
    InsufficientSamplesError { cluster_id: ClusterId, samples: usize },

    #[error("Observations {observation_a} and {observation_b} do not belong to the same cluster")]
    MismatchedClusters {
        observation_a: ObservationId,
        observation_b: ObservationId,
    },

    #[error("Point clustering failed: {0}")]
    ClusteringFailed(String),

    #[error("Invalid pipeline parameter: {0}")]
    InvalidPipelineParameter(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Coarse classification of a [`GeolocError`], as reported in failure manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    CoordinateError,
    UnsupportedCrs,
    UndefinedBearing,
    ClusterMembershipError,
    DuplicateObservationId,
    ParallelBearingsError,
    InsufficientSamplesError,
    MismatchedClusters,
    ClusteringFailed,
    InvalidPipelineParameter,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl GeolocError {
    /// Classify this error for a failure manifest.
    pub fn kind(&self) -> ErrorKind {
        use GeolocError::*;
        match self {
            CoordinateError(_) => ErrorKind::CoordinateError,
            UnsupportedCrs(_) => ErrorKind::UnsupportedCrs,
            UndefinedBearing(_) => ErrorKind::UndefinedBearing,
            ClusterMembershipError { .. } => ErrorKind::ClusterMembershipError,
            DuplicateObservationId(_) => ErrorKind::DuplicateObservationId,
            ParallelBearingsError { .. } => ErrorKind::ParallelBearingsError,
            InsufficientSamplesError { .. } => ErrorKind::InsufficientSamplesError,
            MismatchedClusters { .. } => ErrorKind::MismatchedClusters,
            ClusteringFailed(_) => ErrorKind::ClusteringFailed,
            InvalidPipelineParameter(_) => ErrorKind::InvalidPipelineParameter,
            IoError(_) | CsvError(_) | JsonError(_) => ErrorKind::Io,
        }
    }
}

impl PartialEq for GeolocError {
    fn eq(&self, other: &Self) -> bool {
        use GeolocError::*;
        match (self, other) {
            (CoordinateError(a), CoordinateError(b)) => a == b,
            (UnsupportedCrs(a), UnsupportedCrs(b)) => a == b,
            (UndefinedBearing(a), UndefinedBearing(b)) => a == b,
            (
                ClusterMembershipError {
                    cluster_id: c1,
                    members: m1,
                },
                ClusterMembershipError {
                    cluster_id: c2,
                    members: m2,
                },
            ) => c1 == c2 && m1 == m2,
            (
                ParallelBearingsError {
                    observation_a: a1,
                    observation_b: b1,
                },
                ParallelBearingsError {
                    observation_a: a2,
                    observation_b: b2,
                },
            ) => a1 == a2 && b1 == b2,
            (
                InsufficientSamplesError {
                    cluster_id: c1,
                    samples: s1,
                },
                InsufficientSamplesError {
                    cluster_id: c2,
                    samples: s2,
                },
            ) => c1 == c2 && s1 == s2,
            (
                MismatchedClusters {
                    observation_a: a1,
                    observation_b: b1,
                },
                MismatchedClusters {
                    observation_a: a2,
                    observation_b: b2,
                },
            ) => a1 == a2 && b1 == b2,
            (DuplicateObservationId(a), DuplicateObservationId(b)) => a == b,
            (ClusteringFailed(a), ClusteringFailed(b)) => a == b,
            (InvalidPipelineParameter(a), InvalidPipelineParameter(b)) => a == b,

            // Not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}
