#![allow(dead_code)]

use approx::assert_abs_diff_eq;
use photogeo::bearing::bearing;
use photogeo::observations::Observation;
use photogeo::ref_system::{CoordinateTransform, GeoPoint};
use rand::rngs::StdRng;
use rand::Rng;

/// Survey origin inside California zone 6 (ftUS).
pub const E0: f64 = 6_056_000.0;
pub const N0: f64 = 2_252_000.0;

pub fn zone6() -> CoordinateTransform {
    CoordinateTransform::new(2230, 4326).unwrap()
}

/// Observations of one object at `(object_e, object_n)` (relative to the origin) seen from
/// each camera offset, ids starting at `first_id`.
pub fn sightings(
    object: (f64, f64),
    cameras: &[(f64, f64)],
    first_id: u64,
    label: &str,
) -> Vec<Observation> {
    cameras
        .iter()
        .enumerate()
        .map(|(i, (ce, cn))| {
            let b = bearing(object.0 - ce, object.1 - cn).unwrap();
            Observation::new(first_id + i as u64, E0 + ce, N0 + cn, b, label).unwrap()
        })
        .collect()
}

/// A straight street along the easting axis with one object every `spacing` feet,
/// seen from three cameras on the opposite kerb.
///
/// Camera positions are jittered by a few tenths of a foot.
pub fn street_survey(
    rng: &mut StdRng,
    objects: usize,
    spacing: f64,
    label: &str,
) -> (Vec<Observation>, Vec<(f64, f64)>) {
    let mut observations = Vec::new();
    let mut truth = Vec::new();

    for k in 0..objects {
        let object = (k as f64 * spacing, rng.random_range(5.0..15.0));
        let cameras: Vec<(f64, f64)> = [-15.0, 0.0, 15.0]
            .iter()
            .map(|dx| {
                (
                    object.0 + dx + rng.random_range(-0.5..0.5),
                    -25.0 + rng.random_range(-0.5..0.5),
                )
            })
            .collect();
        observations.extend(sightings(object, &cameras, (k * 10) as u64, label));
        truth.push(object);
    }

    (observations, truth)
}

/// Geographic position of a point given relative to the survey origin.
pub fn geo_of(point: (f64, f64)) -> GeoPoint {
    zone6().to_geo_point(E0 + point.0, N0 + point.1).unwrap()
}

pub fn assert_geo_close(latitude: f64, longitude: f64, expected: GeoPoint, epsilon: f64) {
    assert_abs_diff_eq!(latitude, expected.latitude, epsilon = epsilon);
    assert_abs_diff_eq!(longitude, expected.longitude, epsilon = epsilon);
}
