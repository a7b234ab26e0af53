//! Reference DBSCAN over a k-d tree.
//!
//! A point is a **core** point when at least `min_members` points (itself included) lie
//! within `search_distance`. Clusters grow from core points through their neighbourhoods;
//! non-core points reached from a cluster become **border** members of the first cluster
//! that reaches them. Everything else is [`ClusterLabel::Noise`].
//!
//! Labels are numbered `0, 1, 2, …` in the input order of the first core point of each
//! cluster, so the output is fully determined by the input order.
//!
//! Coincident points (every detection of one photosphere shares its capture point) are
//! merged into weighted sites before the tree is built. Coincident points always share
//! a label, so clustering the sites is equivalent and the tree never holds duplicates.

use std::collections::{HashMap, VecDeque};

use ahash::RandomState;
use kiddo::{KdTree, SquaredEuclidean};

use crate::clustering::{ClusterLabel, ClusteringParams, PointClusterer};
use crate::geoloc_errors::GeolocError;

/// Density-based clustering (DBSCAN) of planar points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dbscan;

impl PointClusterer for Dbscan {
    fn cluster(
        &self,
        points: &[[f64; 2]],
        params: &ClusteringParams,
    ) -> Result<Vec<ClusterLabel>, GeolocError> {
        if params.min_members == 0 {
            return Err(GeolocError::ClusteringFailed(
                "min_members must be >= 1".into(),
            ));
        }
        if !(params.search_distance.is_finite() && params.search_distance > 0.0) {
            return Err(GeolocError::ClusteringFailed(format!(
                "search distance must be positive, got {}",
                params.search_distance
            )));
        }
        if let Some(p) = points
            .iter()
            .find(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(GeolocError::ClusteringFailed(format!(
                "non-finite point {p:?}"
            )));
        }
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let sites = Sites::from_points(points);
        let tree: KdTree<f64, 2> = (&sites.coords).into();
        let radius_sq = params.search_distance * params.search_distance;

        // Sites within reach of `i` and the number of points they stand for.
        let neighbours = |i: usize| -> (Vec<usize>, usize) {
            let mut found: Vec<usize> = tree
                .within_unsorted::<SquaredEuclidean>(&sites.coords[i], radius_sq)
                .into_iter()
                .map(|nn| nn.item as usize)
                .collect();
            // Visit order must not depend on the tree layout.
            found.sort_unstable();
            let weight = found.iter().map(|&j| sites.weights[j]).sum();
            (found, weight)
        };

        let mut labels: Vec<Option<ClusterLabel>> = vec![None; sites.coords.len()];
        let mut next_label = 0u32;

        for i in 0..sites.coords.len() {
            if labels[i].is_some() {
                continue;
            }

            let (seeds, weight) = neighbours(i);
            if weight < params.min_members {
                labels[i] = Some(ClusterLabel::Noise);
                continue;
            }

            let current = ClusterLabel::Cluster(next_label);
            next_label += 1;
            labels[i] = Some(current);

            let mut queue: VecDeque<usize> = seeds.into();
            while let Some(j) = queue.pop_front() {
                match labels[j] {
                    Some(ClusterLabel::Cluster(_)) => {}
                    Some(ClusterLabel::Noise) => labels[j] = Some(current),
                    None => {
                        labels[j] = Some(current);
                        let (reach, weight) = neighbours(j);
                        if weight >= params.min_members {
                            queue.extend(reach);
                        }
                    }
                }
            }
        }

        Ok(sites
            .site_of
            .iter()
            .map(|&s| labels[s].unwrap_or(ClusterLabel::Noise))
            .collect())
    }
}

/// Distinct input coordinates, in order of first appearance.
struct Sites {
    coords: Vec<[f64; 2]>,
    weights: Vec<usize>,
    /// Site index of every input point.
    site_of: Vec<usize>,
}

impl Sites {
    fn from_points(points: &[[f64; 2]]) -> Self {
        let mut lookup: HashMap<(u64, u64), usize, RandomState> =
            HashMap::with_capacity_and_hasher(points.len(), RandomState::new());
        let mut coords = Vec::new();
        let mut weights = Vec::new();
        let mut site_of = Vec::with_capacity(points.len());

        for p in points {
            // `+ 0.0` folds -0.0 into 0.0 so both hash alike.
            let key = ((p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits());
            let site = *lookup.entry(key).or_insert_with(|| {
                coords.push(*p);
                weights.push(0);
                coords.len() - 1
            });
            weights[site] += 1;
            site_of.push(site);
        }

        Sites {
            coords,
            weights,
            site_of,
        }
    }
}

#[cfg(test)]
mod dbscan_test {
    use super::*;

    fn params(search_distance: f64, min_members: usize) -> ClusteringParams {
        ClusteringParams {
            search_distance,
            min_members,
        }
    }

    #[test]
    fn test_two_groups_and_noise() {
        let points = [
            [0.0, 0.0],
            [10.0, 1.0],
            [500.0, 500.0],
            [20.0, -2.0],
            [1000.0, 1.0],
            [1012.0, 3.0],
        ];
        let labels = Dbscan.cluster(&points, &params(15.0, 2)).unwrap();
        assert_eq!(
            labels,
            vec![
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(0),
                ClusterLabel::Noise,
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(1),
                ClusterLabel::Cluster(1),
            ]
        );
    }

    #[test]
    fn test_border_point_joins_cluster() {
        // With min_members = 3, (0,0) and (8,0) are core; (17,0) only sees (8,0) and itself.
        let points = [[0.0, 0.0], [8.0, 0.0], [4.0, 3.0], [17.0, 0.0]];
        let labels = Dbscan.cluster(&points, &params(10.0, 3)).unwrap();
        assert!(labels.iter().all(|l| *l == ClusterLabel::Cluster(0)));
    }

    #[test]
    fn test_sparse_points_are_noise() {
        let points = [[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]];
        let labels = Dbscan.cluster(&points, &params(50.0, 2)).unwrap();
        assert!(labels.iter().all(ClusterLabel::is_noise));
    }

    #[test]
    fn test_empty_and_invalid_input() {
        assert!(Dbscan.cluster(&[], &params(10.0, 2)).unwrap().is_empty());
        assert!(matches!(
            Dbscan.cluster(&[[f64::NAN, 0.0]], &params(10.0, 2)),
            Err(GeolocError::ClusteringFailed(_))
        ));
        assert!(matches!(
            Dbscan.cluster(&[[0.0, 0.0]], &params(0.0, 2)),
            Err(GeolocError::ClusteringFailed(_))
        ));
        assert!(matches!(
            Dbscan.cluster(&[[0.0, 0.0]], &params(10.0, 0)),
            Err(GeolocError::ClusteringFailed(_))
        ));
    }

    #[test]
    fn test_coincident_points_share_a_label() {
        // One photosphere with many detections: every point sits on the capture point.
        let mut points = vec![[6_056_000.0, 2_252_000.0]; 40];
        points.push([6_056_030.0, 2_252_000.0]);
        points.push([6_059_000.0, 2_252_000.0]);

        let labels = Dbscan.cluster(&points, &params(50.0, 2)).unwrap();
        assert_eq!(labels.len(), 42);
        assert!(labels[..41].iter().all(|l| *l == ClusterLabel::Cluster(0)));
        assert_eq!(labels[41], ClusterLabel::Noise);
    }

    #[test]
    fn test_coincident_points_count_towards_core() {
        // Three copies of one point reach min_members = 3 on their own.
        let points = [[5.0, 5.0], [5.0, 5.0], [500.0, 0.0], [5.0, 5.0], [-0.0, 0.0], [0.0, 0.0]];
        let labels = Dbscan.cluster(&points, &params(1.0, 3)).unwrap();
        assert_eq!(
            labels,
            vec![
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(0),
                ClusterLabel::Noise,
                ClusterLabel::Cluster(0),
                ClusterLabel::Noise,
                ClusterLabel::Noise,
            ]
        );
    }
}
