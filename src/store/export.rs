//! File exports of pipeline results.
//!
//! * [`write_aggregates_csv`] – one flat CSV row per [`ClusterAggregate`], statistics
//!   spread over `<field>_mean` / `<field>_std` columns.
//! * [`write_manifest_json`] – the failure manifest as pretty-printed JSON.

use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;

use crate::aggregation::ClusterAggregate;
use crate::geoloc_errors::GeolocError;
use crate::pipeline::FailureRecord;

#[derive(Debug, Serialize)]
struct AggregateRow<'a> {
    cluster_id: String,
    label: &'a str,
    member_count: usize,
    pair_count: usize,
    skipped_pairs: usize,
    sample_count: usize,
    latitude_mean: f64,
    latitude_std: f64,
    longitude_mean: f64,
    longitude_std: f64,
    bearing_mean: f64,
    bearing_std: f64,
    baseline_distance_mean: f64,
    baseline_distance_std: f64,
    object_distance_mean: f64,
    object_distance_std: f64,
    capture_latitude_mean: f64,
    capture_latitude_std: f64,
    capture_longitude_mean: f64,
    capture_longitude_std: f64,
    external_viewer_url: &'a str,
}

impl<'a> From<&'a ClusterAggregate> for AggregateRow<'a> {
    fn from(agg: &'a ClusterAggregate) -> Self {
        AggregateRow {
            cluster_id: agg.cluster_id.to_string(),
            label: &agg.label,
            member_count: agg.member_count,
            pair_count: agg.pair_count,
            skipped_pairs: agg.skipped_pairs,
            sample_count: agg.sample_count,
            latitude_mean: agg.latitude.mean,
            latitude_std: agg.latitude.std_dev,
            longitude_mean: agg.longitude.mean,
            longitude_std: agg.longitude.std_dev,
            bearing_mean: agg.bearing.mean,
            bearing_std: agg.bearing.std_dev,
            baseline_distance_mean: agg.baseline_distance.mean,
            baseline_distance_std: agg.baseline_distance.std_dev,
            object_distance_mean: agg.object_distance.mean,
            object_distance_std: agg.object_distance.std_dev,
            capture_latitude_mean: agg.capture_latitude.mean,
            capture_latitude_std: agg.capture_latitude.std_dev,
            capture_longitude_mean: agg.capture_longitude.mean,
            capture_longitude_std: agg.capture_longitude.std_dev,
            external_viewer_url: &agg.external_viewer_url,
        }
    }
}

/// Write aggregates as CSV to any writer.
pub fn write_aggregates<W: Write>(
    writer: W,
    aggregates: &[ClusterAggregate],
) -> Result<(), GeolocError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for agg in aggregates {
        csv_writer.serialize(AggregateRow::from(agg))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write aggregates to a CSV file, replacing it if present.
pub fn write_aggregates_csv(
    path: &Utf8Path,
    aggregates: &[ClusterAggregate],
) -> Result<(), GeolocError> {
    let file = std::fs::File::create(path)?;
    write_aggregates(file, aggregates)
}

/// Write the failure manifest to a JSON file.
pub fn write_manifest_json(path: &Utf8Path, failures: &[FailureRecord]) -> Result<(), GeolocError> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, failures)?;
    writer.flush()?;
    Ok(())
}
