mod common;

use camino::{Utf8Path, Utf8PathBuf};
use common::{assert_geo_close, geo_of};
use photogeo::clustering::dbscan::Dbscan;
use photogeo::observations::csv_reader::read_observations_csv;
use photogeo::pipeline::{FailureRecord, GeolocationPipeline, PipelineParams};
use photogeo::store::export::{write_aggregates_csv, write_manifest_json};

const SURVEY: &str = "tests/data/survey_observations.csv";

#[test]
fn test_survey_file_end_to_end() {
    let observations = read_observations_csv(Utf8Path::new(SURVEY)).unwrap();
    assert_eq!(observations.len(), 10);
    assert_eq!(observations[9].confidence(), None);

    let pipeline = GeolocationPipeline::new(PipelineParams::default(), Dbscan).unwrap();
    let output = pipeline.run(&observations).unwrap();

    assert_eq!(output.noise, vec![110]);
    assert!(output.failures.is_empty());

    let labels: Vec<&str> = output.aggregates.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(labels, vec!["fire hydrant", "stop sign", "stop sign"]);

    let expected = [(40.0, -8.0), (0.0, 12.0), (620.0, 11.0)];
    for (agg, object) in output.aggregates.iter().zip(expected) {
        assert_eq!(agg.sample_count, 6);
        assert_geo_close(agg.latitude.mean, agg.longitude.mean, geo_of(object), 1e-8);
    }
}

#[test]
fn test_confidence_floor_on_survey_file() {
    let observations = read_observations_csv(Utf8Path::new(SURVEY)).unwrap();
    let params = PipelineParams::builder()
        .min_confidence(Some(0.8))
        .build()
        .unwrap();
    let output = GeolocationPipeline::new(params, Dbscan)
        .unwrap()
        .run(&observations)
        .unwrap();

    // Hydrant rows (0.77) are dropped; the row without confidence is kept.
    assert_eq!(output.filtered_out, 3);
    assert_eq!(output.aggregates.len(), 2);
    assert!(output.aggregates.iter().all(|a| a.label == "stop sign"));
}

#[test]
fn test_exports_round_trip() {
    let observations = read_observations_csv(Utf8Path::new(SURVEY)).unwrap();
    // A single sighting of the third object is left; it ends up as noise.
    let observations: Vec<_> = observations
        .into_iter()
        .filter(|o| !matches!(o.observation_id(), 108 | 109))
        .collect();
    let output = GeolocationPipeline::new(PipelineParams::default(), Dbscan)
        .unwrap()
        .run(&observations)
        .unwrap();
    assert_eq!(output.aggregates.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    let csv_path = root.join("objects.csv");
    write_aggregates_csv(&csv_path, &output.aggregates).unwrap();
    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "cluster_id");
    assert_eq!(headers.len(), 21);
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], output.aggregates[0].cluster_id.to_string());
    assert_eq!(&rows[1][1], "stop sign");

    let failures = vec![FailureRecord {
        cluster_id: output.aggregates[0].cluster_id,
        label: "fire hydrant".into(),
        error_kind: photogeo::geoloc_errors::ErrorKind::InsufficientSamplesError,
        message: "example".into(),
        stage: photogeo::pipeline::ClusterStage::Triangulated,
    }];
    let json_path = root.join("manifest.json");
    write_manifest_json(&json_path, &failures).unwrap();
    let back: Vec<FailureRecord> =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(back, failures);
}
