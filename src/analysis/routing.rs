//! Hop-count statistics over NPU pairs.
//!
//! All ordered pairs are evaluated in parallel; for large topologies a
//! seeded random sample of pairs can be used instead.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::topology::{DeviceId, Topology, TopologyError};

use super::types::{PairSelection, RouteStats};

/// Hop counts for every ordered pair of distinct NPUs
pub fn all_pairs_stats(topology: &Topology) -> Result<RouteStats, TopologyError> {
    let npus_count = topology.npus_count();
    let hops = (0..npus_count)
        .into_par_iter()
        .map(|src| {
            (0..npus_count)
                .filter(|&dst| dst != src)
                .map(|dst| topology.hop_count(src, dst))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    log::info!(
        "Computed hop counts for {} pairs on {}",
        hops.len(),
        topology.describe()
    );
    Ok(summarize(topology, PairSelection::AllPairs, &hops))
}

/// Hop counts for `samples` random pairs of distinct NPUs
pub fn sampled_stats(
    topology: &Topology,
    samples: usize,
    seed: u64,
) -> Result<RouteStats, TopologyError> {
    let npus_count = topology.npus_count();
    let pairs = sample_pairs(npus_count, samples, seed);
    let hops = pairs
        .par_iter()
        .map(|&(src, dst)| topology.hop_count(src, dst))
        .collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "Sampled {} pairs on {} (seed {})",
        hops.len(),
        topology.describe(),
        seed
    );
    Ok(summarize(
        topology,
        PairSelection::Sampled { samples, seed },
        &hops,
    ))
}

fn sample_pairs(npus_count: usize, samples: usize, seed: u64) -> Vec<(DeviceId, DeviceId)> {
    if npus_count < 2 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..samples)
        .map(|_| {
            let src = rng.gen_range(0..npus_count);
            // skip over src so the pair is always distinct
            let mut dst = rng.gen_range(0..npus_count - 1);
            if dst >= src {
                dst += 1;
            }
            (src, dst)
        })
        .collect()
}

fn summarize(topology: &Topology, selection: PairSelection, hops: &[usize]) -> RouteStats {
    let mut histogram = BTreeMap::new();
    for &h in hops {
        *histogram.entry(h).or_insert(0) += 1;
    }
    let mean_hops = if hops.is_empty() {
        0.0
    } else {
        hops.iter().sum::<usize>() as f64 / hops.len() as f64
    };

    RouteStats {
        topology: topology.describe(),
        npus_count: topology.npus_count(),
        selection,
        pairs: hops.len(),
        min_hops: hops.iter().copied().min().unwrap_or(0),
        max_hops: hops.iter().copied().max().unwrap_or(0),
        mean_hops,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{construct_topology, AxisSpec, TopologyBuildingBlock};

    fn topology(block: TopologyBuildingBlock, npus_count: usize) -> Topology {
        construct_topology(&[AxisSpec {
            block,
            npus_count,
            bandwidth: 50.0,
            latency: 500.0,
            bidirectional: true,
        }])
        .unwrap()
    }

    #[test]
    fn test_ring_all_pairs() {
        let stats = all_pairs_stats(&topology(TopologyBuildingBlock::Ring, 8)).unwrap();
        assert_eq!(stats.pairs, 56);
        assert_eq!(stats.min_hops, 1);
        assert_eq!(stats.max_hops, 4);
        // every source sees distances 1,1,2,2,3,3,4
        assert_eq!(stats.histogram.get(&1), Some(&16));
        assert_eq!(stats.histogram.get(&4), Some(&8));
        assert!((stats.mean_hops - 16.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_fully_connected_is_one_hop() {
        let stats =
            all_pairs_stats(&topology(TopologyBuildingBlock::FullyConnected, 5)).unwrap();
        assert_eq!(stats.pairs, 20);
        assert_eq!((stats.min_hops, stats.max_hops), (1, 1));
        assert_eq!(stats.histogram.len(), 1);
    }

    #[test]
    fn test_sampled_is_deterministic() {
        let hypercube = topology(TopologyBuildingBlock::HyperCube, 16);
        let a = sampled_stats(&hypercube, 200, 7).unwrap();
        let b = sampled_stats(&hypercube, 200, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pairs, 200);
        assert!(a.min_hops >= 1 && a.max_hops <= 4);
        assert_eq!(a.selection, PairSelection::Sampled { samples: 200, seed: 7 });
    }

    #[test]
    fn test_sample_pairs_are_distinct() {
        for (src, dst) in sample_pairs(3, 500, 42) {
            assert_ne!(src, dst);
            assert!(src < 3 && dst < 3);
        }
        assert!(sample_pairs(1, 10, 1).is_empty());
    }

    #[test]
    fn test_single_npu() {
        let stats = all_pairs_stats(&topology(TopologyBuildingBlock::Ring, 1)).unwrap();
        assert_eq!(stats.pairs, 0);
        assert_eq!(stats.mean_hops, 0.0);
    }
}
