//! # Constants and type definitions for photogeo
//!
//! This module centralizes the **geodetic constants**, **unit conversions**, **survey image
//! geometry**, and **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Ellipsoid parameters (GRS80) and the US survey foot
//! - Unit conversions (degrees ↔ radians, feet ↔ metres)
//! - Photosphere / cardinal crop geometry
//! - Type aliases for angles, distances and identifiers
//! - The container type used for cluster members

use crate::observations::Observation;
use smallvec::SmallVec;

// -------------------------------------------------------------------------------------------------
// Geodetic constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// GRS80 semi-major axis in metres (also used for WGS84, the two differ below a millimetre here)
pub const GRS80_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// GRS80 inverse flattening
pub const GRS80_INVERSE_FLATTENING: f64 = 298.257_222_101;

/// Length of one US survey foot in metres
pub const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// A full turn in degrees
pub const FULL_TURN: f64 = 360.0;

/// EPSG identifier of geographic WGS84
pub const EPSG_WGS84: u32 = 4326;

/// EPSG identifier of NAD83 / California zone 6 (ftUS), the default survey system
pub const EPSG_CA_ZONE6_FTUS: u32 = 2230;

/// Tolerance on `|sin(θa − θb)|` below which two bearing lines are treated as parallel
pub const PARALLEL_EPS: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------
// Photosphere and cardinal crop geometry
// -------------------------------------------------------------------------------------------------

/// Width of a photosphere image in pixels
pub const PHOTOSPHERE_WIDTH_PX: u32 = 8000;

/// Side of a square cardinal crop in pixels
pub const CARDINAL_CROP_PX: u32 = 1000;

/// Top row (inclusive) of the horizontal band cropped out of a photosphere
pub const CARDINAL_BAND_TOP_PX: u32 = 1550;

/// Number of cardinal crops per photosphere
pub const CARDINAL_VIEW_COUNT: usize = 8;

/// Horizontal field of view of one cardinal crop, in degrees
pub const CARDINAL_VIEW_SPAN: Degree = 45.0;

/// Angular size of one crop pixel, in degrees
pub const DEGREES_PER_PIXEL: Degree = CARDINAL_VIEW_SPAN / CARDINAL_CROP_PX as f64;

/// Upper bound on the detections kept for a single cardinal view
pub const MAX_DETECTIONS_PER_VIEW: usize = 30;

// -------------------------------------------------------------------------------------------------
// External viewer
// -------------------------------------------------------------------------------------------------

/// Street-level panorama viewer base URL; the viewpoint and heading are appended
pub const VIEWER_BASE_URL: &str = "https://www.google.com/maps/@?api=1&map_action=pano";

/// Pitch used for object viewer links
pub const VIEWER_OBJECT_PITCH: i32 = 10;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in US survey feet
pub type Feet = f64;
/// Distance in metres
pub type Meter = f64;

/// Identifier of an observation, stable per source row
pub type ObservationId = u64;

/// A small, inline-optimized container for the members of one object cluster.
pub type ClusterMembers = SmallVec<[Observation; 6]>;
