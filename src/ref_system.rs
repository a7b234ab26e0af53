//! # Survey reference systems
//!
//! Conversion between the planar survey system in which photosphere capture points are
//! recorded (a state-plane Lambert Conformal Conic projection, usually in US survey feet)
//! and geographic WGS84 longitude/latitude.
//!
//! ## Overview
//!
//! - [`Ellipsoid`] – reference ellipsoid (GRS80 for every supported system)
//! - [`LambertConformalConic`] – the two-standard-parallel projection, forward and inverse
//! - [`ProjectedSystem`] – an EPSG registry entry: identifier, name, projection
//! - [`CoordinateTransform`] – the source ↔ target pair used by the rest of the crate
//!
//! ## Notes
//!
//! * NAD83 and WGS84 are treated as coincident; no datum shift is applied.
//! * Formulas follow the EPSG guidance note for the LCC 2SP method; the inverse latitude is
//!   obtained by fixed-point iteration.
//! * Elevations are carried through unchanged.

use serde::{Deserialize, Serialize};

use crate::constants::{
    Degree, Meter, Radian, EPSG_WGS84, GRS80_INVERSE_FLATTENING, GRS80_SEMI_MAJOR_AXIS, RADEG,
    US_SURVEY_FOOT,
};
use crate::geoloc_errors::GeolocError;

/// Convergence threshold of the inverse latitude iteration, in radians
const LATITUDE_ITERATION_EPS: Radian = 1e-12;

/// Safety cap on the inverse latitude iteration
const LATITUDE_MAX_ITERATIONS: usize = 30;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: Degree,
    pub longitude: Degree,
}

/// Linear unit of a projected system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearUnit {
    UsSurveyFoot,
    Metre,
}

impl LinearUnit {
    /// Length of one unit in metres.
    pub fn to_metres(&self) -> Meter {
        match self {
            LinearUnit::UsSurveyFoot => US_SURVEY_FOOT,
            LinearUnit::Metre => 1.0,
        }
    }
}

/// Reference ellipsoid given by its semi-major axis and inverse flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major_axis: Meter,
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const GRS80: Ellipsoid = Ellipsoid {
        semi_major_axis: GRS80_SEMI_MAJOR_AXIS,
        inverse_flattening: GRS80_INVERSE_FLATTENING,
    };

    /// First eccentricity `e`.
    pub fn eccentricity(&self) -> f64 {
        let f = 1.0 / self.inverse_flattening;
        (2.0 * f - f * f).sqrt()
    }
}

/// Lambert Conformal Conic projection with two standard parallels.
///
/// The derived constants (`n`, `F`, `ρ_F`) are computed once at construction; projection
/// and inversion then only evaluate closed forms plus a short latitude iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformalConic {
    ellipsoid: Ellipsoid,
    eccentricity: f64,
    cone_constant: f64,
    scale_factor: f64,
    rho_origin: Meter,
    longitude_origin: Radian,
    false_easting: Meter,
    false_northing: Meter,
    unit: LinearUnit,
}

impl LambertConformalConic {
    /// Build a projection from its defining parameters.
    ///
    /// Arguments
    /// -----------------
    /// * `ellipsoid`: the reference ellipsoid.
    /// * `standard_parallel_1`, `standard_parallel_2`: latitudes of the standard parallels (degrees).
    /// * `latitude_origin`, `longitude_origin`: false origin (degrees).
    /// * `false_easting`, `false_northing`: false origin offsets, **in metres**.
    /// * `unit`: the linear unit of projected coordinates.
    ///
    /// Return
    /// ----------
    /// * The projection with its cone constant and scale factor precomputed.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ellipsoid: Ellipsoid,
        standard_parallel_1: Degree,
        standard_parallel_2: Degree,
        latitude_origin: Degree,
        longitude_origin: Degree,
        false_easting: Meter,
        false_northing: Meter,
        unit: LinearUnit,
    ) -> Self {
        let e = ellipsoid.eccentricity();
        let phi1 = standard_parallel_1 * RADEG;
        let phi2 = standard_parallel_2 * RADEG;
        let phi0 = latitude_origin * RADEG;

        let m1 = meridian_factor(phi1, e);
        let m2 = meridian_factor(phi2, e);
        let t1 = isometric_factor(phi1, e);
        let t2 = isometric_factor(phi2, e);
        let t0 = isometric_factor(phi0, e);

        let n = if (phi1 - phi2).abs() < f64::EPSILON {
            phi1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let big_f = m1 / (n * t1.powf(n));
        let rho_origin = ellipsoid.semi_major_axis * big_f * t0.powf(n);

        LambertConformalConic {
            ellipsoid,
            eccentricity: e,
            cone_constant: n,
            scale_factor: big_f,
            rho_origin,
            longitude_origin: longitude_origin * RADEG,
            false_easting,
            false_northing,
            unit,
        }
    }

    pub fn unit(&self) -> LinearUnit {
        self.unit
    }

    /// Project a geographic position to planar coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `longitude`, `latitude`: geographic position in degrees.
    ///
    /// Return
    /// ----------
    /// * `(easting, northing)` in the projection's linear unit.
    pub fn project(&self, longitude: Degree, latitude: Degree) -> (f64, f64) {
        let n = self.cone_constant;
        let t = isometric_factor(latitude * RADEG, self.eccentricity);
        let rho = self.ellipsoid.semi_major_axis * self.scale_factor * t.powf(n);
        let theta = n * (longitude * RADEG - self.longitude_origin);

        let easting = self.false_easting + rho * theta.sin();
        let northing = self.false_northing + self.rho_origin - rho * theta.cos();

        let k = self.unit.to_metres();
        (easting / k, northing / k)
    }

    /// Invert planar coordinates back to a geographic position.
    ///
    /// Arguments
    /// -----------------
    /// * `easting`, `northing`: planar coordinates in the projection's linear unit.
    ///
    /// Return
    /// ----------
    /// * `(longitude, latitude)` in degrees.
    pub fn unproject(&self, easting: f64, northing: f64) -> (Degree, Degree) {
        let n = self.cone_constant;
        let e = self.eccentricity;
        let k = self.unit.to_metres();

        let dx = easting * k - self.false_easting;
        let dy = self.rho_origin - (northing * k - self.false_northing);

        let rho = n.signum() * dx.hypot(dy);
        let theta = if n > 0.0 {
            dx.atan2(dy)
        } else {
            (-dx).atan2(-dy)
        };

        let t = (rho / (self.ellipsoid.semi_major_axis * self.scale_factor)).powf(1.0 / n);

        let mut phi = std::f64::consts::FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..LATITUDE_MAX_ITERATIONS {
            let es = e * phi.sin();
            let ratio = ((1.0 - es) / (1.0 + es)).powf(e / 2.0);
            let next = std::f64::consts::FRAC_PI_2 - 2.0 * (t * ratio).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < LATITUDE_ITERATION_EPS {
                break;
            }
        }

        let lambda = theta / n + self.longitude_origin;
        (lambda / RADEG, phi / RADEG)
    }
}

/// `m = cos φ / sqrt(1 − e² sin² φ)`
fn meridian_factor(phi: Radian, e: f64) -> f64 {
    let es = e * phi.sin();
    phi.cos() / (1.0 - es * es).sqrt()
}

/// `t = tan(π/4 − φ/2) / ((1 − e sin φ)/(1 + e sin φ))^(e/2)`
fn isometric_factor(phi: Radian, e: f64) -> f64 {
    let es = e * phi.sin();
    (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// A projected survey system known to the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedSystem {
    pub epsg: u32,
    pub name: &'static str,
    pub projection: LambertConformalConic,
}

impl ProjectedSystem {
    /// Look up a projected system by EPSG identifier.
    ///
    /// Supported: 2227, 2229, 2230 (NAD83 California zones 3, 5, 6 in US survey feet) and
    /// 26946 (NAD83 California zone 6 in metres).
    ///
    /// Errors
    /// ----------
    /// * [`GeolocError::UnsupportedCrs`] for any other identifier.
    pub fn from_epsg(epsg: u32) -> Result<Self, GeolocError> {
        let (name, sp1, sp2, lat0, lon0, unit) = match epsg {
            2227 => (
                "NAD83 / California zone 3 (ftUS)",
                38.0 + 26.0 / 60.0,
                37.0 + 4.0 / 60.0,
                36.5,
                -120.5,
                LinearUnit::UsSurveyFoot,
            ),
            2229 => (
                "NAD83 / California zone 5 (ftUS)",
                35.0 + 28.0 / 60.0,
                34.0 + 2.0 / 60.0,
                33.5,
                -118.0,
                LinearUnit::UsSurveyFoot,
            ),
            2230 => (
                "NAD83 / California zone 6 (ftUS)",
                33.0 + 53.0 / 60.0,
                32.0 + 47.0 / 60.0,
                32.0 + 10.0 / 60.0,
                -116.25,
                LinearUnit::UsSurveyFoot,
            ),
            26946 => (
                "NAD83 / California zone 6",
                33.0 + 53.0 / 60.0,
                32.0 + 47.0 / 60.0,
                32.0 + 10.0 / 60.0,
                -116.25,
                LinearUnit::Metre,
            ),
            other => return Err(GeolocError::UnsupportedCrs(other)),
        };

        // All California zones share the same false origin offsets.
        let projection = LambertConformalConic::new(
            Ellipsoid::GRS80,
            sp1,
            sp2,
            lat0,
            lon0,
            2_000_000.0,
            500_000.0,
            unit,
        );

        Ok(ProjectedSystem {
            epsg,
            name,
            projection,
        })
    }
}

/// Source ↔ target coordinate reference pair.
///
/// The source is a [`ProjectedSystem`], the target is geographic WGS84 (EPSG:4326).
/// Both conversions are pure and reject non-finite input with
/// [`GeolocError::CoordinateError`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTransform {
    source: ProjectedSystem,
    target_epsg: u32,
}

impl CoordinateTransform {
    /// Build a transform between two EPSG identifiers.
    ///
    /// Errors
    /// ----------
    /// * [`GeolocError::UnsupportedCrs`] if the source is not a known projected system or the
    ///   target is not 4326.
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, GeolocError> {
        if target_epsg != EPSG_WGS84 {
            return Err(GeolocError::UnsupportedCrs(target_epsg));
        }
        Ok(CoordinateTransform {
            source: ProjectedSystem::from_epsg(source_epsg)?,
            target_epsg,
        })
    }

    pub fn source(&self) -> &ProjectedSystem {
        &self.source
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Convert planar survey coordinates to geographic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `easting`, `northing`: planar coordinates in the source unit.
    /// * `elevation`: optional elevation, passed through.
    ///
    /// Return
    /// ----------
    /// * `(longitude, latitude, elevation)` with angles in degrees.
    pub fn to_geographic(
        &self,
        easting: f64,
        northing: f64,
        elevation: Option<f64>,
    ) -> Result<(Degree, Degree, Option<f64>), GeolocError> {
        check_finite(&[("easting", easting), ("northing", northing)])?;
        if let Some(z) = elevation {
            check_finite(&[("elevation", z)])?;
        }
        let (longitude, latitude) = self.source.projection.unproject(easting, northing);
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(GeolocError::CoordinateError(format!(
                "({easting}, {northing}) has no geographic image in EPSG:{}",
                self.source.epsg
            )));
        }
        Ok((longitude, latitude, elevation))
    }

    /// Convenience wrapper returning a [`GeoPoint`] and dropping the elevation.
    pub fn to_geo_point(&self, easting: f64, northing: f64) -> Result<GeoPoint, GeolocError> {
        let (longitude, latitude, _) = self.to_geographic(easting, northing, None)?;
        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }

    /// Convert geographic coordinates back to planar survey coordinates.
    ///
    /// Return
    /// ----------
    /// * `(easting, northing, elevation)` in the source unit.
    pub fn to_projected(
        &self,
        longitude: Degree,
        latitude: Degree,
        elevation: Option<f64>,
    ) -> Result<(f64, f64, Option<f64>), GeolocError> {
        check_finite(&[("longitude", longitude), ("latitude", latitude)])?;
        if let Some(z) = elevation {
            check_finite(&[("elevation", z)])?;
        }
        if latitude.abs() > 90.0 {
            return Err(GeolocError::CoordinateError(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        let (easting, northing) = self.source.projection.project(longitude, latitude);
        Ok((easting, northing, elevation))
    }
}

fn check_finite(values: &[(&str, f64)]) -> Result<(), GeolocError> {
    for (name, v) in values {
        if !v.is_finite() {
            return Err(GeolocError::CoordinateError(format!("{name} is {v}")));
        }
    }
    Ok(())
}
