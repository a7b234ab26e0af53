//! # Bearing arithmetic and cardinal sectors
//!
//! Compass bearings are measured in degrees **clockwise from north**, in `[0, 360)`.
//! A planar displacement `(dx, dy)` = (Δeasting, Δnorthing) therefore has bearing
//! `atan2(dx, dy)`, and the unit direction of a bearing `θ` is `(sin θ, cos θ)`.
//!
//! ## Cardinal sectors
//!
//! The compass rose is split into 32 sectors of 11.25°, each a half-open interval
//! `[low, high)`. Sector `N` straddles north (354.375° → 360° and 0° → 5.625°) and is the
//! only sector with a wrapped interval. Bearings are rounded to 3 decimals before lookup,
//! so every bearing falls in exactly one sector.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{Degree, FULL_TURN};
use crate::geoloc_errors::GeolocError;

/// Width of one cardinal sector, in degrees
pub const SECTOR_WIDTH: Degree = FULL_TURN / 32.0;

/// Normalize an angle into `[0, 360)`.
///
/// `rem_euclid` can return exactly `360.0` for tiny negative inputs; that case is folded
/// back to `0.0`.
pub fn normalize_degrees(angle: Degree) -> Degree {
    let r = angle.rem_euclid(FULL_TURN);
    if r >= FULL_TURN {
        0.0
    } else {
        r
    }
}

/// Compass bearing of the planar vector `(dx, dy)`.
///
/// Arguments
/// -----------------
/// * `dx`: easting component of the displacement.
/// * `dy`: northing component of the displacement.
///
/// Return
/// ----------
/// * The bearing in `[0, 360)`, clockwise from north.
///
/// Errors
/// ----------
/// * [`GeolocError::UndefinedBearing`] for a zero-length or non-finite vector.
pub fn bearing(dx: f64, dy: f64) -> Result<Degree, GeolocError> {
    if !dx.is_finite() || !dy.is_finite() {
        return Err(GeolocError::UndefinedBearing(format!(
            "non-finite displacement ({dx}, {dy})"
        )));
    }
    if dx == 0.0 && dy == 0.0 {
        return Err(GeolocError::UndefinedBearing(
            "zero-length displacement".into(),
        ));
    }
    Ok(normalize_degrees(dx.atan2(dy).to_degrees()))
}

/// Modular addition of two angles: `add_degrees(350.0, 20.0) == 10.0`.
pub fn add_degrees(base: Degree, delta: Degree) -> Degree {
    normalize_degrees(base + delta)
}

/// One of the 32 points of the compass rose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardinalSector {
    N,
    NbE,
    NNE,
    NEbN,
    NE,
    NEbE,
    ENE,
    EbN,
    E,
    EbS,
    ESE,
    SEbE,
    SE,
    SEbS,
    SSE,
    SbE,
    S,
    SbW,
    SSW,
    SWbS,
    SW,
    SWbW,
    WSW,
    WbS,
    W,
    WbN,
    WNW,
    NWbW,
    NW,
    NWbN,
    NNW,
    NbW,
}

impl CardinalSector {
    /// All sectors in clockwise order starting at north.
    pub const ALL: [CardinalSector; 32] = [
        CardinalSector::N,
        CardinalSector::NbE,
        CardinalSector::NNE,
        CardinalSector::NEbN,
        CardinalSector::NE,
        CardinalSector::NEbE,
        CardinalSector::ENE,
        CardinalSector::EbN,
        CardinalSector::E,
        CardinalSector::EbS,
        CardinalSector::ESE,
        CardinalSector::SEbE,
        CardinalSector::SE,
        CardinalSector::SEbS,
        CardinalSector::SSE,
        CardinalSector::SbE,
        CardinalSector::S,
        CardinalSector::SbW,
        CardinalSector::SSW,
        CardinalSector::SWbS,
        CardinalSector::SW,
        CardinalSector::SWbW,
        CardinalSector::WSW,
        CardinalSector::WbS,
        CardinalSector::W,
        CardinalSector::WbN,
        CardinalSector::WNW,
        CardinalSector::NWbW,
        CardinalSector::NW,
        CardinalSector::NWbN,
        CardinalSector::NNW,
        CardinalSector::NbW,
    ];

    /// Sector containing a bearing.
    ///
    /// The bearing is normalized into `[0, 360)` and rounded to 3 decimals, then the
    /// sector index is `⌊(b + 5.625) / 11.25⌋ mod 32`, which realises the half-open
    /// intervals `[low, high)` with the north sector wrapping around 0°.
    ///
    /// Errors
    /// ----------
    /// * [`GeolocError::UndefinedBearing`] for a non-finite bearing.
    pub fn from_bearing(bearing: Degree) -> Result<Self, GeolocError> {
        if !bearing.is_finite() {
            return Err(GeolocError::UndefinedBearing(format!(
                "cannot classify bearing {bearing}"
            )));
        }
        let rounded = (normalize_degrees(bearing) * 1000.0).round() / 1000.0;
        let index = ((rounded + SECTOR_WIDTH / 2.0) / SECTOR_WIDTH).floor() as usize % 32;
        Ok(Self::ALL[index])
    }

    /// Position of the sector in clockwise order (`N` is 0).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Central bearing of the sector.
    pub fn center(&self) -> Degree {
        self.index() as f64 * SECTOR_WIDTH
    }

    /// Half-open interval `[low, high)` covered by the sector.
    ///
    /// For [`CardinalSector::N`] the interval wraps: `low` is 354.375 and `high` 5.625.
    pub fn bounds(&self) -> (Degree, Degree) {
        let half = SECTOR_WIDTH / 2.0;
        (
            normalize_degrees(self.center() - half),
            self.center() + half,
        )
    }

    /// Short label, e.g. `"NbE"`.
    pub fn label(&self) -> &'static str {
        use CardinalSector::*;
        match self {
            N => "N",
            NbE => "NbE",
            NNE => "NNE",
            NEbN => "NEbN",
            NE => "NE",
            NEbE => "NEbE",
            ENE => "ENE",
            EbN => "EbN",
            E => "E",
            EbS => "EbS",
            ESE => "ESE",
            SEbE => "SEbE",
            SE => "SE",
            SEbS => "SEbS",
            SSE => "SSE",
            SbE => "SbE",
            S => "S",
            SbW => "SbW",
            SSW => "SSW",
            SWbS => "SWbS",
            SW => "SW",
            SWbW => "SWbW",
            WSW => "WSW",
            WbS => "WbS",
            W => "W",
            WbN => "WbN",
            WNW => "WNW",
            NWbW => "NWbW",
            NW => "NW",
            NWbN => "NWbN",
            NNW => "NNW",
            NbW => "NbW",
        }
    }
}

impl fmt::Display for CardinalSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod bearing_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_bearing_quadrants() {
        assert_abs_diff_eq!(bearing(0.0, 1.0).unwrap(), 0.0);
        assert_abs_diff_eq!(bearing(1.0, 1.0).unwrap(), 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(1.0, 0.0).unwrap(), 90.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(0.0, -1.0).unwrap(), 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(-1.0, 0.0).unwrap(), 270.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bearing(-50.0, 50.0).unwrap(), 315.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bearing_zero_vector() {
        assert!(matches!(
            bearing(0.0, 0.0),
            Err(GeolocError::UndefinedBearing(_))
        ));
        assert!(matches!(
            bearing(f64::NAN, 1.0),
            Err(GeolocError::UndefinedBearing(_))
        ));
    }

    #[test]
    fn test_add_degrees_wraps() {
        assert_eq!(add_degrees(350.0, 20.0), 10.0);
        assert_eq!(add_degrees(10.0, -20.0), 350.0);
        assert_eq!(add_degrees(0.0, 360.0), 0.0);
        assert_eq!(add_degrees(180.0, 720.0), 180.0);
        assert_eq!(add_degrees(-1e-20, 0.0), 0.0);
    }

    #[test]
    fn test_add_degrees_inverse() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let a = rng.random_range(0.0..360.0);
            let b = rng.random_range(-1000.0..1000.0);
            let back = add_degrees(add_degrees(a, b), -b);
            // Compare on the circle: 359.9999999 and 0.0 are the same angle.
            let diff = (back - a).abs();
            assert!(diff.min(FULL_TURN - diff) < 1e-9, "a={a}, b={b}, back={back}");
        }
    }

    #[test]
    fn test_sector_wraparound() {
        assert_eq!(CardinalSector::from_bearing(0.0).unwrap(), CardinalSector::N);
        assert_eq!(
            CardinalSector::from_bearing(359.999999).unwrap(),
            CardinalSector::N
        );
        assert_eq!(
            CardinalSector::from_bearing(354.375).unwrap(),
            CardinalSector::N
        );
        assert_eq!(
            CardinalSector::from_bearing(354.374).unwrap(),
            CardinalSector::NbW
        );
        assert_eq!(
            CardinalSector::from_bearing(5.624).unwrap(),
            CardinalSector::N
        );
        assert_eq!(
            CardinalSector::from_bearing(-5.0).unwrap(),
            CardinalSector::N
        );
    }

    #[test]
    fn test_sector_boundaries_half_open() {
        for (i, sector) in CardinalSector::ALL.iter().enumerate() {
            let (low, high) = sector.bounds();
            assert_eq!(CardinalSector::from_bearing(low).unwrap(), *sector);
            let next = CardinalSector::ALL[(i + 1) % 32];
            assert_eq!(CardinalSector::from_bearing(high).unwrap(), next);
        }
        assert_eq!(
            CardinalSector::from_bearing(5.625).unwrap(),
            CardinalSector::NbE
        );
        assert_eq!(
            CardinalSector::from_bearing(90.0).unwrap(),
            CardinalSector::E
        );
        assert_eq!(
            CardinalSector::from_bearing(185.625).unwrap(),
            CardinalSector::SbW
        );
    }

    #[test]
    fn test_sector_total_over_circle() {
        let mut counts = [0usize; 32];
        let mut b = 0.0;
        while b < FULL_TURN {
            counts[CardinalSector::from_bearing(b).unwrap().index()] += 1;
            b += 0.125;
        }
        // 2880 samples, 90 per sector.
        assert!(counts.iter().all(|&c| c == 90), "{counts:?}");
    }

    #[test]
    fn test_sector_labels() {
        assert_eq!(CardinalSector::NEbN.to_string(), "NEbN");
        assert_eq!(CardinalSector::NbW.label(), "NbW");
        assert_eq!(CardinalSector::N.bounds(), (354.375, 5.625));
        assert!(CardinalSector::from_bearing(f64::INFINITY).is_err());
    }
}
