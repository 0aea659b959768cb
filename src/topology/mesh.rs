//! One-dimensional mesh (chain) topology.
//!
//! Mesh(4): `0 - 1 - 2 - 3`, every neighbouring pair linked both ways.

use super::basic::AxisParams;
use super::links::LinkGraph;
use super::types::{
    Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock, TopologyError,
};

#[derive(Debug, Clone)]
pub struct Mesh {
    params: AxisParams,
    links: LinkGraph,
}

impl Mesh {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params = AxisParams::new(TopologyBuildingBlock::Mesh, npus_count, bandwidth, latency)?;
        let mut mesh = Self {
            params,
            links: LinkGraph::new(npus_count),
        };
        if !is_multi_dim {
            mesh.links = params.build_links(npus_count, &mesh.connection_policies())?;
        }
        Ok(mesh)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    /// Walk the contiguous range between src and dst
    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        let route = if dst > src {
            (src..=dst).collect()
        } else {
            (dst..=src).rev().collect()
        };
        Ok(route)
    }

    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        (0..self.params.npus_count.saturating_sub(1))
            .flat_map(|i| [ConnectionPolicy::new(i, i + 1), ConnectionPolicy::new(i + 1, i)])
            .collect()
    }
}
