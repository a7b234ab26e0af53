use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use photogeo::bearing::bearing;
use photogeo::clustering::dbscan::Dbscan;
use photogeo::clustering::{ClusteringParams, PointClusterer};
use photogeo::observations::Observation;
use photogeo::pipeline::{GeolocationPipeline, PipelineParams};

const E0: f64 = 6_056_000.0;
const N0: f64 = 2_252_000.0;

/// One object every 150 ft along a street, each seen from `per_object` cameras.
fn synthetic_survey(rng: &mut StdRng, objects: usize, per_object: usize) -> Vec<Observation> {
    let mut observations = Vec::with_capacity(objects * per_object);
    let mut id = 0u64;
    for k in 0..objects {
        let object = (k as f64 * 150.0, rng.random_range(5.0..15.0));
        for _ in 0..per_object {
            let camera = (
                object.0 + rng.random_range(-20.0..20.0),
                rng.random_range(-30.0..-20.0),
            );
            let b = bearing(object.0 - camera.0, object.1 - camera.1).unwrap();
            observations
                .push(Observation::new(id, E0 + camera.0, N0 + camera.1, b, "stop sign").unwrap());
            id += 1;
        }
    }
    observations
}

fn bench_dbscan(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let points: Vec<[f64; 2]> = synthetic_survey(&mut rng, 2_000, 4)
        .iter()
        .map(|o| [o.capture_easting(), o.capture_northing()])
        .collect();
    let params = ClusteringParams::default();

    c.bench_function("dbscan/8000_points", |b| {
        b.iter(|| Dbscan.cluster(black_box(&points), &params).unwrap())
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let pipeline = GeolocationPipeline::new(PipelineParams::default(), Dbscan).unwrap();

    for per_object in [3usize, 6] {
        c.bench_function(&format!("pipeline/500_objects_x{per_object}"), |b| {
            b.iter_batched(
                || synthetic_survey(&mut rng, 500, per_object),
                |observations| black_box(pipeline.run(&observations).unwrap()),
                BatchSize::LargeInput,
            )
        });
    }
}

criterion_group!(benches, bench_dbscan, bench_pipeline);
criterion_main!(benches);
