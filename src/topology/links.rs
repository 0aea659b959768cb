//! Device and link bookkeeping.
//!
//! Every topology owns a `LinkGraph`: a flat device table where each device
//! keeps its outgoing links keyed by destination.

use std::collections::BTreeMap;

use super::types::{Bandwidth, DeviceId, Latency, TopologyError};

/// A directed physical link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub bandwidth: Bandwidth,
    pub latency: Latency,
}

/// A simulated endpoint (NPU or switch)
#[derive(Debug, Clone, Default)]
pub struct Device {
    id: DeviceId,
    links: BTreeMap<DeviceId, Link>,
}

impl Device {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            links: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn is_connected(&self, dst: DeviceId) -> bool {
        self.links.contains_key(&dst)
    }

    pub fn link_to(&self, dst: DeviceId) -> Option<&Link> {
        self.links.get(&dst)
    }

    pub fn out_degree(&self) -> usize {
        self.links.len()
    }
}

/// Device table plus directed links
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    devices: Vec<Device>,
}

impl LinkGraph {
    pub fn new(devices_count: usize) -> Self {
        Self {
            devices: (0..devices_count).map(Device::new).collect(),
        }
    }

    pub fn devices_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Connect src -> dst (and dst -> src when bidirectional).
    ///
    /// Connecting an already existing link is a contract failure.
    pub fn connect(
        &mut self,
        src: DeviceId,
        dst: DeviceId,
        bandwidth: Bandwidth,
        latency: Latency,
        bidirectional: bool,
    ) -> Result<(), TopologyError> {
        self.connect_one(src, dst, bandwidth, latency)?;
        if bidirectional {
            self.connect_one(dst, src, bandwidth, latency)?;
        }
        Ok(())
    }

    fn connect_one(
        &mut self,
        src: DeviceId,
        dst: DeviceId,
        bandwidth: Bandwidth,
        latency: Latency,
    ) -> Result<(), TopologyError> {
        let count = self.devices.len();
        if dst >= count {
            return Err(TopologyError::UnknownDevice { device: dst, count });
        }
        let device = self
            .devices
            .get_mut(src)
            .ok_or(TopologyError::UnknownDevice { device: src, count })?;
        if device.is_connected(dst) {
            return Err(TopologyError::DuplicateLink { src, dst });
        }
        device.links.insert(dst, Link { bandwidth, latency });
        Ok(())
    }

    pub fn is_connected(&self, src: DeviceId, dst: DeviceId) -> bool {
        self.devices
            .get(src)
            .map_or(false, |device| device.is_connected(dst))
    }

    pub fn link(&self, src: DeviceId, dst: DeviceId) -> Option<&Link> {
        self.devices.get(src).and_then(|device| device.link_to(dst))
    }

    /// Total number of directed links
    pub fn links_count(&self) -> usize {
        self.devices.iter().map(Device::out_degree).sum()
    }

    /// All directed links in (src, dst) order
    pub fn iter_links(&self) -> impl Iterator<Item = (DeviceId, DeviceId, &Link)> + '_ {
        self.devices
            .iter()
            .flat_map(|device| device.links.iter().map(move |(dst, link)| (device.id, *dst, link)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_bidirectional() {
        let mut graph = LinkGraph::new(3);
        graph.connect(0, 1, 50.0, 500.0, true).unwrap();

        assert!(graph.is_connected(0, 1));
        assert!(graph.is_connected(1, 0));
        assert!(!graph.is_connected(1, 2));
        assert_eq!(graph.links_count(), 2);
        assert_eq!(graph.link(0, 1).unwrap().bandwidth, 50.0);
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let mut graph = LinkGraph::new(2);
        graph.connect(0, 1, 1.0, 0.0, false).unwrap();
        assert_eq!(
            graph.connect(0, 1, 1.0, 0.0, false),
            Err(TopologyError::DuplicateLink { src: 0, dst: 1 })
        );
    }

    #[test]
    fn test_unknown_device_rejected() {
        let mut graph = LinkGraph::new(2);
        assert!(matches!(
            graph.connect(0, 5, 1.0, 0.0, false),
            Err(TopologyError::UnknownDevice { device: 5, .. })
        ));
    }
}
