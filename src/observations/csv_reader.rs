//! CSV ingest of observation rows.
//!
//! Expected header (column order is free, `confidence` is optional):
//!
//! ```text
//! observation_id,easting,northing,bearing,label,confidence
//! 101,6056120.4,2252010.7,48.2,stop sign,0.91
//! ```
//!
//! Every row goes through [`Observation::new`], so malformed coordinates or bearings are
//! reported with the row's identifier. Identifiers must be unique within a file.

use std::collections::HashSet;
use std::io::Read;

use ahash::RandomState;
use camino::Utf8Path;
use serde::Deserialize;

use crate::constants::{Degree, Feet, ObservationId};
use crate::geoloc_errors::GeolocError;
use crate::observations::Observation;

#[derive(Debug, Deserialize)]
struct ObservationRow {
    observation_id: ObservationId,
    easting: Feet,
    northing: Feet,
    bearing: Degree,
    label: String,
    #[serde(default)]
    confidence: Option<f64>,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = GeolocError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let obs = Observation::new(
            row.observation_id,
            row.easting,
            row.northing,
            row.bearing,
            row.label.trim(),
        )?;
        Ok(match row.confidence {
            Some(c) => obs.with_confidence(c),
            None => obs,
        })
    }
}

/// Read observations from any CSV source.
///
/// Arguments
/// -----------------
/// * `reader`: a reader over headered CSV content.
///
/// Return
/// ----------
/// * The observations in file order, or the first CSV / validation error.
///   A repeated `observation_id` yields [`GeolocError::DuplicateObservationId`].
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>, GeolocError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen: HashSet<ObservationId, RandomState> = HashSet::default();
    csv_reader
        .deserialize::<ObservationRow>()
        .map(|row| {
            let obs = Observation::try_from(row?)?;
            if !seen.insert(obs.observation_id()) {
                return Err(GeolocError::DuplicateObservationId(obs.observation_id()));
            }
            Ok(obs)
        })
        .collect()
}

/// Read observations from a CSV file.
///
/// See also
/// ------------
/// * [`read_observations`] – Same parser over an arbitrary reader.
pub fn read_observations_csv(path: &Utf8Path) -> Result<Vec<Observation>, GeolocError> {
    let file = std::fs::File::open(path)?;
    read_observations(file)
}
