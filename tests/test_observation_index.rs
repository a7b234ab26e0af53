mod common;

use std::collections::BTreeSet;

use common::street_survey;
use photogeo::clustering::dbscan::Dbscan;
use photogeo::clustering::observation_index::{ObjectCluster, ObservationIndex};
use photogeo::clustering::{ClusterId, ClusteringParams};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn memberships(clusters: &[ObjectCluster]) -> BTreeSet<(ClusterId, Vec<u64>)> {
    clusters
        .iter()
        .map(|c| (c.id(), c.member_ids()))
        .collect()
}

#[test]
fn test_build_clusters_is_repeatable() {
    let mut rng = StdRng::seed_from_u64(7);
    let (observations, truth) = street_survey(&mut rng, 8, 200.0, "stop sign");

    let index = ObservationIndex::default();
    let params = ClusteringParams::default();
    let first = index.build_clusters(&observations, &params, &Dbscan).unwrap();
    let second = index.build_clusters(&observations, &params, &Dbscan).unwrap();

    assert_eq!(first.len(), truth.len());
    assert_eq!(first, second);
}

#[test]
fn test_membership_does_not_depend_on_input_order() {
    let mut rng = StdRng::seed_from_u64(11);
    let (observations, _) = street_survey(&mut rng, 6, 250.0, "stop sign");

    let mut shuffled = observations.clone();
    shuffled.shuffle(&mut rng);

    let index = ObservationIndex::default();
    let params = ClusteringParams::default();
    let a = index.build_clusters(&observations, &params, &Dbscan).unwrap();
    let b = index.build_clusters(&shuffled, &params, &Dbscan).unwrap();

    assert_eq!(memberships(&a), memberships(&b));
    for cluster in a.iter().chain(&b) {
        assert!(cluster.len() >= 2);
        assert!(cluster
            .members()
            .windows(2)
            .all(|w| w[0].observation_id() < w[1].observation_id()));
    }
}

#[test]
fn test_small_radius_leaves_only_noise() {
    let mut rng = StdRng::seed_from_u64(3);
    let (observations, _) = street_survey(&mut rng, 4, 200.0, "stop sign");

    let params = ClusteringParams {
        search_distance: 1.0,
        min_members: 2,
    };
    let indexed = ObservationIndex::default()
        .index(&observations, &params, &Dbscan)
        .unwrap();
    assert!(indexed.clusters.is_empty());
    assert!(indexed.rejected.is_empty());
    assert_eq!(indexed.noise.len(), observations.len());
}
