//! Switch topology.
//!
//! Switch(4) example:
//! ```text
//! <-switch->
//! |  |  |  |
//! 0  1  2  3
//! ```
//! The switch is device 4, so there are 4 NPUs and 5 devices, and
//! send(0 -> 2) flows through `0 -> switch -> 2`.

use super::basic::AxisParams;
use super::links::LinkGraph;
use super::types::{
    Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock, TopologyError,
};

#[derive(Debug, Clone)]
pub struct Switch {
    params: AxisParams,
    switch_id: DeviceId,
    links: LinkGraph,
}

impl Switch {
    pub fn new(
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
        is_multi_dim: bool,
    ) -> Result<Self, TopologyError> {
        let params =
            AxisParams::new(TopologyBuildingBlock::Switch, npus_count, bandwidth, latency)?;
        let mut switch = Self {
            params,
            switch_id: npus_count,
            links: LinkGraph::new(npus_count + 1),
        };
        if !is_multi_dim {
            switch.links = params.build_links(npus_count + 1, &switch.connection_policies())?;
        }
        Ok(switch)
    }

    pub fn params(&self) -> &AxisParams {
        &self.params
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    pub fn switch_id(&self) -> DeviceId {
        self.switch_id
    }

    pub fn devices_count(&self) -> usize {
        self.params.npus_count + 1
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        self.params.check_endpoints(src, dst)?;
        Ok(vec![src, self.switch_id, dst])
    }

    /// For 4 NPUs: (0, 4), (1, 4), (2, 4), (3, 4), (4, 0), (4, 1), (4, 2), (4, 3)
    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        let npus = 0..self.params.npus_count;
        npus.clone()
            .map(|i| ConnectionPolicy::new(i, self.switch_id))
            .chain(npus.map(|i| ConnectionPolicy::new(self.switch_id, i)))
            .collect()
    }
}
