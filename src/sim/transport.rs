//! Timing models for the memory bus and the network.
//!
//! Bandwidth is in GB/s, which is the same as bytes per nanosecond, so a
//! transfer of `size` bytes takes `size / bandwidth` ns on top of latency.
//! Every delay is rounded up to a whole nanosecond.

use crate::collective::{PacketBundle, Transmission};
use crate::config::{MemoryConfig, ValidationError};
use crate::topology::{Bandwidth, DeviceId, Latency, Topology};

use super::types::{SimTime, SimulationError};

fn to_sim_time(ns: f64) -> SimTime {
    ns.max(0.0).ceil() as SimTime
}

/// Memory bus between an NPU and its memory accelerator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryBus {
    pub fast_latency: Latency,
    pub usual_latency: Latency,
    pub bandwidth: Bandwidth,
}

impl MemoryBus {
    pub fn new(fast_latency: Latency, usual_latency: Latency, bandwidth: Bandwidth) -> Self {
        Self {
            fast_latency,
            usual_latency,
            bandwidth,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self, ValidationError> {
        let latency = |name: &str, value: &crate::config::Quantity| {
            value
                .as_latency()
                .map_err(|e| ValidationError::InvalidMemory(format!("{}: {}", name, e)))
        };
        let bandwidth = config
            .bandwidth
            .as_bandwidth()
            .map_err(|e| ValidationError::InvalidMemory(format!("bandwidth: {}", e)))?;
        Ok(Self::new(
            latency("fast_latency", &config.fast_latency)?,
            latency("usual_latency", &config.usual_latency)?,
            bandwidth,
        ))
    }

    /// Time until a released bundle comes back as `General` events
    pub fn delay(&self, bundle: &PacketBundle) -> SimTime {
        let latency = match bundle.transmission {
            Transmission::Fast => self.fast_latency,
            Transmission::Usual => self.usual_latency,
        };
        to_sim_time(latency + bundle.bytes() as f64 / self.bandwidth)
    }
}

/// Network timing over the physical topology
#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
}

impl Network {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Summed link latency along the route plus serialization on the slowest link
    pub fn transfer_time(
        &self,
        src: DeviceId,
        dst: DeviceId,
        size: u64,
    ) -> Result<SimTime, SimulationError> {
        let route = self.topology.route(src, dst)?;
        let mut latency = 0.0;
        let mut bottleneck = f64::INFINITY;
        for hop in route.windows(2) {
            let link = self
                .topology
                .links()
                .link(hop[0], hop[1])
                .ok_or(SimulationError::MissingLink {
                    src: hop[0],
                    dst: hop[1],
                })?;
            latency += link.latency;
            bottleneck = bottleneck.min(link.bandwidth);
        }
        if !bottleneck.is_finite() {
            return Ok(to_sim_time(latency));
        }
        Ok(to_sim_time(latency + size as f64 / bottleneck))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::BundleTarget;
    use crate::topology::{construct_topology, AxisSpec, TopologyBuildingBlock};

    fn bundle(packets: usize, transmission: Transmission) -> PacketBundle {
        PacketBundle {
            packets: vec![
                crate::collective::Packet {
                    queue_id: 0,
                    preferred_src: 0,
                    preferred_dest: 1,
                };
                packets
            ],
            processed: false,
            send_back: false,
            msg_size: 1000,
            transmission,
            target: BundleTarget::Npu,
        }
    }

    #[test]
    fn test_memory_bus_delay() {
        let bus = MemoryBus::new(5.0, 50.0, 100.0);
        assert_eq!(bus.delay(&bundle(1, Transmission::Fast)), 15);
        assert_eq!(bus.delay(&bundle(2, Transmission::Usual)), 70);

        let slow = MemoryBus::new(0.0, 0.0, 3.0);
        assert_eq!(slow.delay(&bundle(1, Transmission::Fast)), 334);
    }

    #[test]
    fn test_memory_bus_from_config() {
        let bus = MemoryBus::from_config(&MemoryConfig::default()).unwrap();
        assert_eq!(bus, MemoryBus::new(5.0, 50.0, 100.0));
    }

    #[test]
    fn test_transfer_time_along_route() {
        let topology = construct_topology(&[AxisSpec {
            block: TopologyBuildingBlock::Ring,
            npus_count: 8,
            bandwidth: 50.0,
            latency: 500.0,
            bidirectional: true,
        }])
        .unwrap();
        let network = Network::new(topology);

        // one hop
        assert_eq!(network.transfer_time(0, 1, 1000).unwrap(), 520);
        // three hops the short way round
        assert_eq!(network.transfer_time(0, 5, 1000).unwrap(), 1520);
        assert!(network.transfer_time(3, 3, 1000).is_err());
    }

    #[test]
    fn test_transfer_time_through_switch() {
        let topology = construct_topology(&[AxisSpec {
            block: TopologyBuildingBlock::Switch,
            npus_count: 4,
            bandwidth: 25.0,
            latency: 100.0,
            bidirectional: true,
        }])
        .unwrap();
        let network = Network::new(topology);
        assert_eq!(network.transfer_time(0, 3, 100).unwrap(), 204);
    }
}
