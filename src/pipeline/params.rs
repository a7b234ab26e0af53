//! # Pipeline parameters
//!
//! [`PipelineParams`] gathers every tunable of a [`GeolocationPipeline`](crate::pipeline::GeolocationPipeline)
//! run: clustering radius and density, the parallel-bearing tolerance, how cluster ids are
//! made, pre-filtering, and the coordinate reference pair.
//!
//! Values are validated by [`PipelineParamsBuilder::build`], which also runs on parameters
//! loaded from JSON with [`PipelineParams::from_json_file`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use photogeo::pipeline::PipelineParams;
//!
//! let params = PipelineParams::builder()
//!     .search_distance(40.0)
//!     .min_confidence(Some(0.6))
//!     .build()
//!     .unwrap();
//! println!("{params:#}");
//! ```

use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::clustering::observation_index::ClusterIdStrategy;
use crate::clustering::ClusteringParams;
use crate::constants::{Feet, EPSG_CA_ZONE6_FTUS, EPSG_WGS84, PARALLEL_EPS};
use crate::geoloc_errors::GeolocError;
use crate::ref_system::CoordinateTransform;

/// Configuration of a geolocation run.
///
/// Fields
/// -----------------
/// * `search_distance` – clustering radius around each capture point, in survey feet.
/// * `min_members` – minimum neighbourhood size for a dense point; also the smallest
///   cluster that can be triangulated, so at least 2.
/// * `parallel_tolerance` – bearing lines with `|sin(θa − θb)|` below this are parallel.
/// * `id_strategy` – how cluster identifiers are produced.
/// * `partition_by_label` – cluster each object class separately.
/// * `min_confidence` – drop observations whose known confidence is below this value.
/// * `source_epsg` – projected system of the capture coordinates.
/// * `target_epsg` – geographic output system (only 4326).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub search_distance: Feet,
    pub min_members: usize,
    pub parallel_tolerance: f64,
    pub id_strategy: ClusterIdStrategy,
    pub partition_by_label: bool,
    pub min_confidence: Option<f64>,
    pub source_epsg: u32,
    pub target_epsg: u32,
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            search_distance: 50.0,
            min_members: 2,
            parallel_tolerance: PARALLEL_EPS,
            id_strategy: ClusterIdStrategy::MembershipHash,
            partition_by_label: true,
            min_confidence: None,
            source_epsg: EPSG_CA_ZONE6_FTUS,
            target_epsg: EPSG_WGS84,
        }
    }
}

impl PipelineParams {
    pub fn builder() -> PipelineParamsBuilder {
        PipelineParamsBuilder::new()
    }

    /// Clustering part of the parameters.
    pub fn clustering(&self) -> ClusteringParams {
        ClusteringParams {
            search_distance: self.search_distance,
            min_members: self.min_members,
        }
    }

    /// Load and validate parameters from a JSON file.
    ///
    /// Missing keys take their default value.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, GeolocError> {
        let content = std::fs::read_to_string(path)?;
        let params: PipelineParams = serde_json::from_str(&content)?;
        PipelineParamsBuilder::from(params).build()
    }
}

impl From<PipelineParams> for PipelineParamsBuilder {
    fn from(params: PipelineParams) -> Self {
        PipelineParamsBuilder { params }
    }
}

/// Builder for [`PipelineParams`], with validation.
#[derive(Debug, Clone)]
pub struct PipelineParamsBuilder {
    params: PipelineParams,
}

impl Default for PipelineParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: PipelineParams::default(),
        }
    }

    pub fn search_distance(mut self, v: Feet) -> Self {
        self.params.search_distance = v;
        self
    }
    pub fn min_members(mut self, v: usize) -> Self {
        self.params.min_members = v;
        self
    }
    pub fn parallel_tolerance(mut self, v: f64) -> Self {
        self.params.parallel_tolerance = v;
        self
    }
    pub fn id_strategy(mut self, v: ClusterIdStrategy) -> Self {
        self.params.id_strategy = v;
        self
    }
    pub fn partition_by_label(mut self, v: bool) -> Self {
        self.params.partition_by_label = v;
        self
    }
    pub fn min_confidence(mut self, v: Option<f64>) -> Self {
        self.params.min_confidence = v;
        self
    }
    pub fn source_epsg(mut self, v: u32) -> Self {
        self.params.source_epsg = v;
        self
    }
    pub fn target_epsg(mut self, v: u32) -> Self {
        self.params.target_epsg = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Return true iff a <= b and comparable (i.e., not NaN).
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    /// Finalize the builder.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(PipelineParams)` when every value is usable, or
    ///   - [`GeolocError::InvalidPipelineParameter`] naming the offending value,
    ///   - [`GeolocError::UnsupportedCrs`] for an unknown EPSG pair.
    pub fn build(self) -> Result<PipelineParams, GeolocError> {
        let p = &self.params;

        if !Self::gt0(p.search_distance) || !p.search_distance.is_finite() {
            return Err(GeolocError::InvalidPipelineParameter(
                "search_distance must be a finite value > 0".into(),
            ));
        }
        if p.min_members < 2 {
            return Err(GeolocError::InvalidPipelineParameter(
                "min_members must be >= 2".into(),
            ));
        }
        if !(Self::ge0(p.parallel_tolerance) && Self::le(p.parallel_tolerance, 1.0)) {
            return Err(GeolocError::InvalidPipelineParameter(
                "parallel_tolerance must be in [0, 1]".into(),
            ));
        }
        if let Some(c) = p.min_confidence {
            if !(Self::ge0(c) && Self::le(c, 1.0)) {
                return Err(GeolocError::InvalidPipelineParameter(
                    "min_confidence must be in [0, 1]".into(),
                ));
            }
        }

        CoordinateTransform::new(p.source_epsg, p.target_epsg)?;

        Ok(self.params)
    }
}

impl fmt::Display for PipelineParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Geolocation Pipeline Parameters")?;
            writeln!(f, "-------------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Clustering]")?;
            line!(
                "search_distance    = {:.2} ftUS",
                self.search_distance,
                "Neighbourhood radius"
            )?;
            line!(
                "min_members        = {}",
                self.min_members,
                "Dense neighbourhood size"
            )?;
            line!(
                "id_strategy        = {:?}",
                self.id_strategy,
                "Cluster identifier scheme"
            )?;
            line!(
                "partition_by_label = {}",
                self.partition_by_label,
                "Cluster each class separately"
            )?;
            line!(
                "min_confidence     = {}",
                self.min_confidence
                    .map_or_else(|| "none".to_string(), |c| format!("{c:.2}")),
                "Detection confidence floor"
            )?;

            writeln!(f, "\n[Triangulation]")?;
            line!(
                "parallel_tolerance = {:.1e}",
                self.parallel_tolerance,
                "Parallel bearing threshold"
            )?;
            line!(
                "source_epsg        = {}",
                self.source_epsg,
                "Capture coordinate system"
            )?;
            line!(
                "target_epsg        = {}",
                self.target_epsg,
                "Output coordinate system"
            )?;

            Ok(())
        } else {
            write!(
                f,
                "PipelineParams(search_distance={:.1}ft, min_members={}, parallel_tolerance={:.1e}, id={:?}, by_label={}, min_confidence={:?}, EPSG:{}→EPSG:{})",
                self.search_distance,
                self.min_members,
                self.parallel_tolerance,
                self.id_strategy,
                self.partition_by_label,
                self.min_confidence,
                self.source_epsg,
                self.target_epsg,
            )
        }
    }
}

#[cfg(test)]
mod params_test {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = PipelineParams::builder().build().unwrap();
        assert_eq!(params, PipelineParams::default());
        assert_eq!(params.clustering(), ClusteringParams::default());
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        let bad = [
            PipelineParams::builder().search_distance(0.0),
            PipelineParams::builder().search_distance(f64::NAN),
            PipelineParams::builder().search_distance(f64::INFINITY),
            PipelineParams::builder().min_members(1),
            PipelineParams::builder().parallel_tolerance(-1e-3),
            PipelineParams::builder().min_confidence(Some(1.5)),
            PipelineParams::builder().min_confidence(Some(f64::NAN)),
        ];
        for builder in bad {
            assert!(matches!(
                builder.build(),
                Err(GeolocError::InvalidPipelineParameter(_))
            ));
        }
        assert_eq!(
            PipelineParams::builder().source_epsg(9999).build(),
            Err(GeolocError::UnsupportedCrs(9999))
        );
        assert_eq!(
            PipelineParams::builder().target_epsg(4269).build(),
            Err(GeolocError::UnsupportedCrs(4269))
        );
    }

    #[test]
    fn test_display_compact_and_pretty() {
        let params = PipelineParams::default();
        let compact = format!("{params}");
        assert!(compact.starts_with("PipelineParams(search_distance=50.0ft"));
        assert!(compact.contains("EPSG:2230→EPSG:4326"));

        let pretty = format!("{params:#}");
        assert!(pretty.contains("[Clustering]"));
        assert!(pretty.contains("min_confidence     = none"));
        assert!(pretty.contains("# Parallel bearing threshold"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("params.json")).unwrap();

        std::fs::write(&path, r#"{ "search_distance": 35.0, "id_strategy": "Random" }"#).unwrap();
        let params = PipelineParams::from_json_file(&path).unwrap();
        assert_eq!(params.search_distance, 35.0);
        assert_eq!(params.id_strategy, ClusterIdStrategy::Random);
        assert_eq!(params.min_members, 2);

        std::fs::write(&path, r#"{ "min_members": 0 }"#).unwrap();
        assert!(matches!(
            PipelineParams::from_json_file(&path),
            Err(GeolocError::InvalidPipelineParameter(_))
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineParams::from_json_file(&path),
            Err(GeolocError::JsonError(_))
        ));
    }
}
