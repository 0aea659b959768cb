//! HyperCube topology.
//!
//! NPU `i` is linked to every `i ^ (1 << b)`. The hop count between two NPUs
//! is the Hamming distance of their ids; routes correct differing bits from
//! the lowest bit upward.

use super::basic::AxisParams;
use super::links::LinkGraph;
use super::types::{
    Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock, TopologyError,
};

#[derive(Debug, Clone)]
pub struct HyperCube {
    params: AxisParams,
    degree: u32,
    links: LinkGraph,
}

impl HyperCube {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params =
            AxisParams::new(TopologyBuildingBlock::HyperCube, npus_count, bandwidth, latency)?;
        if !npus_count.is_power_of_two() {
            log::error!("HyperCube constructed with {} NPUs (not a power of two)", npus_count);
            return Err(TopologyError::NotPowerOfTwo { npus_count });
        }
        let mut hypercube = Self {
            params,
            degree: npus_count.trailing_zeros(),
            links: LinkGraph::new(npus_count),
        };
        if !is_multi_dim {
            hypercube.links = params.build_links(npus_count, &hypercube.connection_policies())?;
        }
        Ok(hypercube)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    /// log2 of the NPU count
    pub fn degree(&self) -> u32 {
        self.degree
    }

    /// Hamming distance between src and dst
    pub fn hop_count(&self, src: DeviceId, dst: DeviceId) -> Result<usize, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        Ok((src ^ dst).count_ones() as usize)
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        let hops = self.hop_count(src, dst)?;
        let mut route = Route::with_capacity(hops + 1);
        let mut current = src;
        route.push(current);
        for bit in 0..self.degree {
            let mask = 1 << bit;
            if (current ^ dst) & mask != 0 {
                current ^= mask;
                route.push(current);
            }
        }
        Ok(route)
    }

    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        (0..self.params.npus_count)
            .flat_map(|i| (0..self.degree).map(move |bit| ConnectionPolicy::new(i, i ^ (1 << bit))))
            .collect()
    }
}
