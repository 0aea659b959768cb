//! Fully-connected topology: a direct link between every ordered NPU pair.

use super::basic::AxisParams;
use super::links::LinkGraph;
use super::types::{
    Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock, TopologyError,
};

#[derive(Debug, Clone)]
pub struct FullyConnected {
    params: AxisParams,
    links: LinkGraph,
}

impl FullyConnected {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params = AxisParams::new(
            TopologyBuildingBlock::FullyConnected,
            npus_count,
            bandwidth,
            latency,
        )?;
        let mut topology = Self {
            params,
            links: LinkGraph::new(npus_count),
        };
        if !is_multi_dim {
            topology.links = params.build_links(npus_count, &topology.connection_policies())?;
        }
        Ok(topology)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        Ok(vec![src, dst])
    }

    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        let npus_count = self.params.npus_count;
        (0..npus_count)
            .flat_map(|src| {
                (0..npus_count)
                    .filter(move |dst| *dst != src)
                    .map(move |dst| ConnectionPolicy::new(src, dst))
            })
            .collect()
    }
}
