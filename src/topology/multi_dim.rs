//! Multi-dimensional composite topology.
//!
//! Axes are appended in order of increasing significance. A transfer is
//! routed through the most significant differing dimension first, and each
//! dimension's sub-route is spliced onto the accumulated route.

use super::address::{generate_address_pairs, AddressSpace};
use super::basic::BasicTopology;
use super::links::LinkGraph;
use super::types::{Bandwidth, DeviceId, MultiDimAddress, Route, TopologyError};

#[derive(Debug, Clone)]
pub struct MultiDimTopology {
    topology_per_dim: Vec<BasicTopology>,
    npus_count_per_dim: Vec<usize>,
    bandwidth_per_dim: Vec<Bandwidth>,
    npus_count: usize,
    devices_count: usize,
    address_space: AddressSpace,
    links: LinkGraph,
    devices_initialized: bool,
}

impl Default for MultiDimTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiDimTopology {
    pub fn new() -> Self {
        Self {
            topology_per_dim: Vec::new(),
            npus_count_per_dim: Vec::new(),
            bandwidth_per_dim: Vec::new(),
            npus_count: 1,
            devices_count: 1,
            address_space: AddressSpace::new(Vec::new()),
            links: LinkGraph::default(),
            devices_initialized: false,
        }
    }

    /// Append the next (more significant) dimension
    pub fn append_dimension(&mut self, topology: BasicTopology) {
        self.npus_count *= topology.npus_count();
        self.devices_count *= topology.devices_count();
        self.bandwidth_per_dim.push(topology.bandwidth());
        self.npus_count_per_dim.push(topology.npus_count());
        self.topology_per_dim.push(topology);

        let is_switch_dim = self.topology_per_dim.iter().map(BasicTopology::is_switch).collect();
        self.address_space =
            AddressSpace::with_switches(self.npus_count_per_dim.clone(), is_switch_dim);
    }

    pub fn dims_count(&self) -> usize {
        self.topology_per_dim.len()
    }

    pub fn npus_count(&self) -> usize {
        self.npus_count
    }

    /// Product of per-axis device counts
    pub fn devices_count(&self) -> usize {
        self.devices_count
    }

    pub fn npus_count_per_dim(&self) -> &[usize] {
        &self.npus_count_per_dim
    }

    pub fn bandwidth_per_dim(&self) -> &[Bandwidth] {
        &self.bandwidth_per_dim
    }

    pub fn dim(&self, dim: usize) -> Option<&BasicTopology> {
        self.topology_per_dim.get(dim)
    }

    pub fn address_space(&self) -> &AddressSpace {
        &self.address_space
    }

    pub fn links(&self) -> &LinkGraph {
        &self.links
    }

    /// NPUs plus one device per switch instance
    pub fn total_num_devices(&self) -> usize {
        self.address_space.total_devices_count()
    }

    pub fn switch_ids(&self) -> Vec<DeviceId> {
        (self.npus_count..self.total_num_devices()).collect()
    }

    pub fn translate_address(&self, npu_id: DeviceId) -> Result<MultiDimAddress, TopologyError> {
        self.address_space.translate_address(npu_id)
    }

    pub fn translate_address_back(&self, address: &[usize]) -> Result<DeviceId, TopologyError> {
        self.address_space.translate_address_back(address)
    }

    /// First dimension in which two NPUs differ
    pub fn dim_to_transfer(&self, src: DeviceId, dst: DeviceId) -> Result<usize, TopologyError> {
        let src_address = self.translate_address(src)?;
        let dst_address = self.translate_address(dst)?;
        self.address_space
            .dim_to_transfer(&src_address, &dst_address)
            .ok_or(TopologyError::SameEndpoints { device: src })
    }

    pub fn initialize_all_devices(&mut self) {
        self.links = LinkGraph::new(self.total_num_devices());
        self.devices_initialized = true;
    }

    /// Replicate every axis' policies across all other dimensions
    pub fn make_connections(&mut self) -> Result<(), TopologyError> {
        if !self.devices_initialized {
            return Err(TopologyError::DevicesNotInitialized);
        }
        for (dim, topology) in self.topology_per_dim.iter().enumerate() {
            let policies = topology.connection_policies();
            if policies.is_empty() {
                log::error!(
                    "Dimension {} ({}) has no connection policies",
                    dim,
                    topology.building_block()
                );
                return Err(TopologyError::NoPolicies {
                    dim,
                    block: topology.building_block(),
                });
            }
            let bandwidth = self.bandwidth_per_dim[dim];
            let latency = topology.link_latency();
            for policy in &policies {
                for (src_address, dst_address) in
                    generate_address_pairs(&self.npus_count_per_dim, policy, dim)
                {
                    let src = self.address_space.translate_address_back(&src_address)?;
                    let dst = self.address_space.translate_address_back(&dst_address)?;
                    self.links.connect(src, dst, bandwidth, latency, false)?;
                }
            }
        }
        log::info!(
            "Connected {}-dimensional topology {:?}: {} devices, {} links",
            self.dims_count(),
            self.npus_count_per_dim,
            self.links.devices_count(),
            self.links.links_count()
        );
        Ok(())
    }

    pub fn route(&self, src: DeviceId, dst: DeviceId) -> Result<Route, TopologyError> {
        if src == dst && src < self.npus_count {
            return Err(TopologyError::SameEndpoints { device: src });
        }
        let src_address = self.translate_address(src)?;
        let dst_address = self.translate_address(dst)?;

        let mut route = Route::new();
        let mut last_address = src_address.clone();

        for dim in (0..self.dims_count()).rev() {
            if src_address[dim] == dst_address[dim] {
                continue;
            }
            let mut next_address = last_address.clone();
            next_address[dim] = dst_address[dim];

            let internal_route =
                self.topology_per_dim[dim].route(last_address[dim], next_address[dim])?;
            let mut route_in_dim = Vec::with_capacity(internal_route.len());
            for internal_device in internal_route {
                let mut address = last_address.clone();
                address[dim] = internal_device;
                route_in_dim.push(self.address_space.translate_address_back(&address)?);
            }

            let skip = usize::from(!route.is_empty());
            route.extend(route_in_dim.into_iter().skip(skip));
            last_address = next_address;
        }

        debug_assert_eq!(route.first(), Some(&src));
        debug_assert_eq!(route.last(), Some(&dst));
        Ok(route)
    }

    pub fn hop_count(&self, src: DeviceId, dst: DeviceId) -> Result<usize, TopologyError> {
        Ok(self.route(src, dst)?.len() - 1)
    }
}
