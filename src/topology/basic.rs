//! Single-axis (basic) topologies.
//!
//! `BasicTopology` is a closed set of shapes sharing one capability surface:
//! `route`, `hop_count` and `connection_policies`. Each shape lives in its own
//! file; this file holds the shared parameters and the dispatching enum.

use std::collections::HashSet;

use super::fully_connected::FullyConnected;
use super::hypercube::HyperCube;
use super::links::LinkGraph;
use super::mesh::Mesh;
use super::ring::Ring;
use super::switch::Switch;
use super::tree::{BinaryTree, DoubleBinaryTree};
use super::types::{
    AxisSpec, Bandwidth, ConnectionPolicy, DeviceId, Latency, Route, TopologyBuildingBlock,
    TopologyError,
};

/// Validated size and link parameters of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisParams {
    pub npus_count: usize,
    pub bandwidth: Bandwidth,
    pub latency: Latency,
}

impl AxisParams {
    /// Check the construction contract shared by every shape.
    pub fn new(
        block: TopologyBuildingBlock,
        npus_count: usize,
        bandwidth: Bandwidth,
        latency: Latency,
    ) -> Result<Self, TopologyError> {
        if npus_count == 0 {
            log::error!("{} constructed with zero NPUs", block);
            return Err(TopologyError::EmptyTopology { block });
        }
        if !(bandwidth > 0.0) {
            log::error!("{} constructed with bandwidth {} GB/s", block, bandwidth);
            return Err(TopologyError::InvalidBandwidth { block, bandwidth });
        }
        if !(latency >= 0.0) {
            log::error!("{} constructed with latency {} ns", block, latency);
            return Err(TopologyError::InvalidLatency { block, latency });
        }
        Ok(Self {
            npus_count,
            bandwidth,
            latency,
        })
    }

    /// Both endpoints must be NPUs of this axis and must differ
    pub fn check_endpoints(&self, src: DeviceId, dst: DeviceId) -> Result<(), TopologyError> {
        for device in [src, dst] {
            if device >= self.npus_count {
                return Err(TopologyError::UnknownDevice {
                    device,
                    count: self.npus_count,
                });
            }
        }
        if src == dst {
            return Err(TopologyError::SameEndpoints { device: src });
        }
        Ok(())
    }

    /// Instantiate one unidirectional link per policy
    pub fn build_links(
        &self,
        devices_count: usize,
        policies: &[ConnectionPolicy],
    ) -> Result<LinkGraph, TopologyError> {
        let mut links = LinkGraph::new(devices_count);
        for policy in policies {
            links.connect(policy.src, policy.dst, self.bandwidth, self.latency, false)?;
        }
        Ok(links)
    }
}

/// Drop self loops and repeated policies, keeping first-seen order
pub(crate) fn dedup_policies(policies: Vec<ConnectionPolicy>) -> Vec<ConnectionPolicy> {
    let mut seen = HashSet::new();
    policies
        .into_iter()
        .filter(|policy| policy.src != policy.dst && seen.insert(*policy))
        .collect()
}

/// One axis of the interconnect
#[derive(Debug, Clone)]
pub enum BasicTopology {
    Ring(Ring),
    Mesh(Mesh),
    FullyConnected(FullyConnected),
    Switch(Switch),
    BinaryTree(BinaryTree),
    DoubleBinaryTree(DoubleBinaryTree),
    HyperCube(HyperCube),
}

impl BasicTopology {
    /// Build an axis from its description.
    ///
    /// With `is_multi_dim` set, no links are instantiated: the composite
    /// topology replicates the connection policies itself.
    pub fn build(spec: &AxisSpec, is_multi_dim: bool) -> Result<Self, TopologyError> {
        let AxisSpec {
            block,
            npus_count,
            bandwidth,
            latency,
            bidirectional,
        } = *spec;
        let topology = match block {
            TopologyBuildingBlock::Ring => BasicTopology::Ring(Ring::new(
                npus_count,
                bandwidth,
                latency,
                bidirectional,
                is_multi_dim,
            )?),
            TopologyBuildingBlock::Mesh => {
                BasicTopology::Mesh(Mesh::new(npus_count, bandwidth, latency, is_multi_dim)?)
            }
            TopologyBuildingBlock::FullyConnected => BasicTopology::FullyConnected(
                FullyConnected::new(npus_count, bandwidth, latency, is_multi_dim)?,
            ),
            TopologyBuildingBlock::Switch => {
                BasicTopology::Switch(Switch::new(npus_count, bandwidth, latency, is_multi_dim)?)
            }
            TopologyBuildingBlock::BinaryTree => BasicTopology::BinaryTree(BinaryTree::new(
                npus_count,
                bandwidth,
                latency,
                is_multi_dim,
            )?),
            TopologyBuildingBlock::DoubleBinaryTree => BasicTopology::DoubleBinaryTree(
                DoubleBinaryTree::new(npus_count, bandwidth, latency, is_multi_dim)?,
            ),
            TopologyBuildingBlock::HyperCube => BasicTopology::HyperCube(HyperCube::new(
                npus_count,
                bandwidth,
                latency,
                is_multi_dim,
            )?),
        };
        log::debug!(
            "Built {} axis: {} NPUs, {} GB/s, {} ns, multi-dim: {}",
            block,
            npus_count,
            bandwidth,
            latency,
            is_multi_dim
        );
        Ok(topology)
    }

    pub fn building_block(&self) -> TopologyBuildingBlock {
        match self {
            BasicTopology::Ring(_) => TopologyBuildingBlock::Ring,
            BasicTopology::Mesh(_) => TopologyBuildingBlock::Mesh,
            BasicTopology::FullyConnected(_) => TopologyBuildingBlock::FullyConnected,
            BasicTopology::Switch(_) => TopologyBuildingBlock::Switch,
            BasicTopology::BinaryTree(_) => TopologyBuildingBlock::BinaryTree,
            BasicTopology::DoubleBinaryTree(_) => TopologyBuildingBlock::DoubleBinaryTree,
            BasicTopology::HyperCube(_) => TopologyBuildingBlock::HyperCube,
        }
    }

    fn params(&self) -> &AxisParams {
        match self {
            BasicTopology::Ring(t) => t.params(),
            BasicTopology::Mesh(t) => t.params(),
            BasicTopology::FullyConnected(t) => t.params(),
            BasicTopology::Switch(t) => t.params(),
            BasicTopology::BinaryTree(t) => t.params(),
            BasicTopology::DoubleBinaryTree(t) => t.params(),
            BasicTopology::HyperCube(t) => t.params(),
        }
    }

    pub fn npus_count(&self) -> usize {
        self.params().npus_count
    }

    /// NPUs plus any switch device the shape adds
    pub fn devices_count(&self) -> usize {
        match self {
            BasicTopology::Switch(t) => t.devices_count(),
            _ => self.npus_count(),
        }
    }

    pub fn bandwidth(&self) -> Bandwidth {
        self.params().bandwidth
    }

    pub fn link_latency(&self) -> Latency {
        self.params().latency
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, BasicTopology::Switch(_))
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        match self {
            BasicTopology::Ring(t) => t.route(src, dst),
            BasicTopology::Mesh(t) => t.route(src, dst),
            BasicTopology::FullyConnected(t) => t.route(src, dst),
            BasicTopology::Switch(t) => t.route(src, dst),
            BasicTopology::BinaryTree(t) => t.route(src, dst),
            BasicTopology::DoubleBinaryTree(t) => t.route(src, dst),
            BasicTopology::HyperCube(t) => t.route(src, dst),
        }
    }

    /// Number of link traversals between two NPUs
    pub fn hop_count(&self, src: DeviceId, dst: DeviceId) -> Result<usize, TopologyError> {
        match self {
            BasicTopology::HyperCube(t) => t.hop_count(src, dst),
            _ => Ok(self.route(src, dst)?.len() - 1),
        }
    }

    pub fn connection_policies(&self) -> Vec<ConnectionPolicy> {
        match self {
            BasicTopology::Ring(t) => t.connection_policies(),
            BasicTopology::Mesh(t) => t.connection_policies(),
            BasicTopology::FullyConnected(t) => t.connection_policies(),
            BasicTopology::Switch(t) => t.connection_policies(),
            BasicTopology::BinaryTree(t) => t.connection_policies(),
            BasicTopology::DoubleBinaryTree(t) => t.connection_policies(),
            BasicTopology::HyperCube(t) => t.connection_policies(),
        }
    }

    /// Links instantiated by the axis itself (empty when built as part of a composite)
    pub fn links(&self) -> &LinkGraph {
        match self {
            BasicTopology::Ring(t) => t.links(),
            BasicTopology::Mesh(t) => t.links(),
            BasicTopology::FullyConnected(t) => t.links(),
            BasicTopology::Switch(t) => t.links(),
            BasicTopology::BinaryTree(t) => t.links(),
            BasicTopology::DoubleBinaryTree(t) => t.links(),
            BasicTopology::HyperCube(t) => t.links(),
        }
    }
}
