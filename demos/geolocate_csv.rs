//! Geolocate the objects of a survey CSV.
//!
//! ```text
//! cargo run --example geolocate_csv --features progress -- \
//!     tests/data/survey_observations.csv --out-dir /tmp/survey
//! ```
//!
//! Writes `objects.csv` (one row per located object) and `failures.json` (clusters that
//! could not be located) into the output directory. Set `RUST_LOG=debug` for per-partition
//! details.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use photogeo::clustering::dbscan::Dbscan;
use photogeo::geoloc_errors::GeolocError;
use photogeo::observations::csv_reader::read_observations_csv;
use photogeo::pipeline::{GeolocationPipeline, PipelineParams};
use photogeo::store::export::{write_aggregates_csv, write_manifest_json};

#[derive(Parser, Debug)]
#[command(name = "geolocate_csv", about = "Locate surveyed objects from bearing observations")]
struct Args {
    /// Observation CSV: observation_id, easting, northing, bearing, label[, confidence]
    input: Utf8PathBuf,

    /// Directory receiving objects.csv and failures.json
    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,

    /// JSON file with pipeline parameters; defaults are used for missing keys
    #[arg(long)]
    params: Option<Utf8PathBuf>,

    /// Clustering radius in survey feet (overrides the parameter file)
    #[arg(long)]
    search_distance: Option<f64>,

    /// Drop observations below this detection confidence
    #[arg(long)]
    min_confidence: Option<f64>,

    /// EPSG code of the capture coordinates
    #[arg(long)]
    source_epsg: Option<u32>,
}

fn main() -> Result<(), GeolocError> {
    env_logger::init();
    let args = Args::parse();

    let base = match &args.params {
        Some(path) => PipelineParams::from_json_file(path)?,
        None => PipelineParams::default(),
    };
    let params = PipelineParams::builder()
        .search_distance(args.search_distance.unwrap_or(base.search_distance))
        .min_members(base.min_members)
        .parallel_tolerance(base.parallel_tolerance)
        .id_strategy(base.id_strategy)
        .partition_by_label(base.partition_by_label)
        .min_confidence(args.min_confidence.or(base.min_confidence))
        .source_epsg(args.source_epsg.unwrap_or(base.source_epsg))
        .target_epsg(base.target_epsg)
        .build()?;
    info!("{params}");

    let observations = read_observations_csv(&args.input)?;
    info!("{} observations read from {}", observations.len(), args.input);

    let pipeline = GeolocationPipeline::new(params, Dbscan)?;
    let output = pipeline.run(&observations)?;

    std::fs::create_dir_all(&args.out_dir)?;
    write_aggregates_csv(&args.out_dir.join("objects.csv"), &output.aggregates)?;
    write_manifest_json(&args.out_dir.join("failures.json"), &output.failures)?;

    println!(
        "{} objects located, {} clusters failed, {} pairs skipped, {} noise observations",
        output.aggregates.len(),
        output.failures.len(),
        output.skipped_pairs.len(),
        output.noise.len()
    );
    Ok(())
}
