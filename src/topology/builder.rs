//! Topology factory.
//!
//! A single dimension yields the basic topology with its own links; several
//! dimensions yield a `MultiDimTopology` whose links are replicated across
//! all axes.

use super::basic::BasicTopology;
use super::links::LinkGraph;
use super::multi_dim::MultiDimTopology;
use super::types::{AxisSpec, Bandwidth, DeviceId, Route, TopologyError};

/// A fully built physical topology
#[derive(Debug, Clone)]
pub enum Topology {
    Basic(BasicTopology),
    MultiDim(MultiDimTopology),
}

impl Topology {
    pub fn dims_count(&self) -> usize {
        match self {
            Topology::Basic(_) => 1,
            Topology::MultiDim(t) => t.dims_count(),
        }
    }

    pub fn npus_count(&self) -> usize {
        match self {
            Topology::Basic(t) => t.npus_count(),
            Topology::MultiDim(t) => t.npus_count(),
        }
    }

    pub fn npus_count_per_dim(&self) -> Vec<usize> {
        match self {
            Topology::Basic(t) => vec![t.npus_count()],
            Topology::MultiDim(t) => t.npus_count_per_dim().to_vec(),
        }
    }

    pub fn bandwidth_per_dim(&self) -> Vec<Bandwidth> {
        match self {
            Topology::Basic(t) => vec![t.bandwidth()],
            Topology::MultiDim(t) => t.bandwidth_per_dim().to_vec(),
        }
    }

    /// Instantiated devices, switches included
    pub fn devices_count(&self) -> usize {
        match self {
            Topology::Basic(t) => t.devices_count(),
            Topology::MultiDim(t) => t.total_num_devices(),
        }
    }

    pub fn switch_ids(&self) -> Vec<DeviceId> {
        match self {
            Topology::Basic(t) if t.is_switch() => vec![t.npus_count()],
            Topology::Basic(_) => Vec::new(),
            Topology::MultiDim(t) => t.switch_ids(),
        }
    }

    pub fn links(&self) -> &LinkGraph {
        match self {
            Topology::Basic(t) => t.links(),
            Topology::MultiDim(t) => t.links(),
        }
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        match self {
            Topology::Basic(t) => t.route(src, dst),
            Topology::MultiDim(t) => t.route(src, dst),
        }
    }

    pub fn hop_count(&self, src: DeviceId, dst: DeviceId) -> Result<usize, TopologyError> {
        match self {
            Topology::Basic(t) => t.hop_count(src, dst),
            Topology::MultiDim(t) => t.hop_count(src, dst),
        }
    }

    /// Short human-readable shape, e.g. `Ring(4) x Switch(2)`
    pub fn describe(&self) -> String {
        match self {
            Topology::Basic(t) => format!("{}({})", t.building_block(), t.npus_count()),
            Topology::MultiDim(t) => (0..t.dims_count())
                .filter_map(|dim| t.dim(dim))
                .map(|axis| format!("{}({})", axis.building_block(), axis.npus_count()))
                .collect::<Vec<_>>()
                .join(" x "),
        }
    }
}

/// Build the topology described by `dims`, first entry least significant
pub fn construct_topology(dims: &[AxisSpec]) -> Result<Topology, TopologyError> {
    match dims {
        [] => Err(TopologyError::NoDimensions),
        [single] => Ok(Topology::Basic(BasicTopology::build(single, false)?)),
        _ => {
            let mut multi_dim = MultiDimTopology::new();
            for spec in dims {
                multi_dim.append_dimension(BasicTopology::build(spec, true)?);
            }
            multi_dim.initialize_all_devices();
            multi_dim.make_connections()?;
            Ok(Topology::MultiDim(multi_dim))
        }
    }
}
