//! Geolocation of street objects (stop signs, fire hydrants, …) from directional
//! observations taken at photosphere capture points.
//!
//! Observations are clustered by capture point, every pair of a cluster is triangulated,
//! and the pairwise estimates are aggregated into one georeferenced row per object.
//! See [`pipeline::GeolocationPipeline`] for the batch entry point.

pub mod aggregation;
pub mod bearing;
pub mod clustering;
pub mod constants;
pub mod detections;
pub mod geoloc_errors;
pub mod observations;
pub mod pipeline;
pub mod ref_system;
pub mod store;
pub mod triangulation;
