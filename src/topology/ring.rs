//! Ring topology.
//!
//! Ring(8) example:
//! ```text
//! 0 - 1 - 2 - 3
//! |           |
//! 7 - 6 - 5 - 4
//! ```
//! A unidirectional ring only routes clockwise; a bidirectional ring takes
//! the shorter arc, preferring clockwise on ties.

use super::basic::{dedup_policies, AxisParams};
use super::links::LinkGraph;
use super::types::{
    Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock, TopologyError,
};

#[derive(Debug, Clone)]
pub struct Ring {
    params: AxisParams,
    bidirectional: bool,
    links: LinkGraph,
}

impl Ring {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        bidirectional: bool,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params = AxisParams::new(TopologyBuildingBlock::Ring, npus_count, bandwidth, latency)?;
        let mut ring = Self {
            params,
            bidirectional,
            links: LinkGraph::new(npus_count),
        };
        if !is_multi_dim {
            ring.links = params.build_links(npus_count, &ring.connection_policies())?;
        }
        Ok(ring)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        let npus_count = self.params.npus_count;

        let clockwise_dist = (dst + npus_count - src) % npus_count;
        let anticlockwise_dist = npus_count - clockwise_dist;
        let clockwise = !self.bidirectional || anticlockwise_dist >= clockwise_dist;

        let mut route = Route::with_capacity(clockwise_dist.min(anticlockwise_dist) + 1);
        let mut current = src;
        while current != dst {
            route.push(current);
            current = if clockwise {
                (current + 1) % npus_count
            } else {
                (current + npus_count - 1) % npus_count
            };
        }
        route.push(dst);
        Ok(route)
    }

    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        let npus_count = self.params.npus_count;
        let mut policies: Vec<ConnectionPolicy> = (0..npus_count)
            .map(|i| ConnectionPolicy::new(i, (i + 1) % npus_count))
            .collect();
        if self.bidirectional {
            policies.extend(
                (0..npus_count).map(|i| ConnectionPolicy::new((i + 1) % npus_count, i)),
            );
        }
        dedup_policies(policies)
    }
}
