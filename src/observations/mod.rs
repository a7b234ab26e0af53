//! # Observations
//!
//! An [`Observation`] is one detection of a candidate object seen from one photosphere
//! capture point: where the camera stood (planar survey coordinates), which way the object
//! lies (compass bearing) and what it is (class label).
//!
//! Observations are validated on construction and never mutated afterwards. Cluster
//! assignment produces a new value through [`Observation::with_cluster`].
//!
//! ## See also
//! * [`read_observations_csv`](crate::observations::csv_reader::read_observations_csv) – Tabular ingest.
//! * [`observations_from_capture`](crate::detections::observations_from_capture) – Derivation from cardinal-view detections.
//! * [`ObservationIndex`](crate::clustering::observation_index::ObservationIndex) – Grouping into clusters.

pub mod csv_reader;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::bearing::normalize_degrees;
use crate::clustering::ClusterId;
use crate::constants::{Degree, Feet, ObservationId, RADEG};
use crate::geoloc_errors::GeolocError;

/// A single directional sighting of an object.
///
/// # Fields
///
/// * `observation_id` - Stable identifier of the source row
/// * `capture_easting` / `capture_northing` - Capture point in the survey system (feet)
/// * `bearing` - Direction from the capture point toward the object, degrees in `[0, 360)`
/// * `label` - Object class, e.g. `"stop sign"`
/// * `confidence` - Detection confidence in `[0, 1]`, when known
/// * `cluster_id` - Cluster assigned by the observation index, `None` for noise / unindexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    observation_id: ObservationId,
    capture_easting: Feet,
    capture_northing: Feet,
    bearing: Degree,
    label: String,
    confidence: Option<f64>,
    cluster_id: Option<ClusterId>,
}

impl Observation {
    /// Create a new observation.
    ///
    /// Arguments
    /// ---------
    /// * `observation_id`: stable identifier of the source row.
    /// * `capture_easting`, `capture_northing`: capture point in survey feet.
    /// * `bearing`: direction toward the object in degrees; normalized into `[0, 360)`.
    /// * `label`: object class.
    ///
    /// Return
    /// ------
    /// * The observation, or
    ///   - [`GeolocError::CoordinateError`] if a capture coordinate is not finite,
    ///   - [`GeolocError::UndefinedBearing`] if the bearing is not finite.
    pub fn new(
        observation_id: ObservationId,
        capture_easting: Feet,
        capture_northing: Feet,
        bearing: Degree,
        label: impl Into<String>,
    ) -> Result<Self, GeolocError> {
        if !capture_easting.is_finite() || !capture_northing.is_finite() {
            return Err(GeolocError::CoordinateError(format!(
                "observation {observation_id}: capture point ({capture_easting}, {capture_northing})"
            )));
        }
        if !bearing.is_finite() {
            return Err(GeolocError::UndefinedBearing(format!(
                "observation {observation_id}: bearing {bearing}"
            )));
        }
        Ok(Observation {
            observation_id,
            capture_easting,
            capture_northing,
            bearing: normalize_degrees(bearing),
            label: label.into(),
            confidence: None,
            cluster_id: None,
        })
    }

    /// Attach a detection confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Copy of this observation assigned to `cluster_id`.
    pub fn with_cluster(&self, cluster_id: ClusterId) -> Self {
        Observation {
            cluster_id: Some(cluster_id),
            ..self.clone()
        }
    }

    pub fn observation_id(&self) -> ObservationId {
        self.observation_id
    }

    pub fn capture_easting(&self) -> Feet {
        self.capture_easting
    }

    pub fn capture_northing(&self) -> Feet {
        self.capture_northing
    }

    pub fn bearing(&self) -> Degree {
        self.bearing
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        self.cluster_id
    }

    /// Capture point as an `(easting, northing)` vector.
    pub fn capture_point(&self) -> Vector2<f64> {
        Vector2::new(self.capture_easting, self.capture_northing)
    }

    /// Unit direction of the bearing line, `(sin θ, cos θ)` in `(easting, northing)`.
    pub fn direction(&self) -> Vector2<f64> {
        let theta = self.bearing * RADEG;
        Vector2::new(theta.sin(), theta.cos())
    }
}
