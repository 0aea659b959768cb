//! Topology type definitions.
//!
//! Shared identifiers, units and error types for the physical topologies:
//! the single-axis building blocks and the multi-dimensional composite.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device ID, starting from 0. NPUs come first, switches after them.
pub type DeviceId = usize;

/// Bandwidth in GB/s (equivalently bytes per ns)
pub type Bandwidth = f64;

/// Latency in ns
pub type Latency = f64;

/// Chunk size in bytes
pub type ChunkSize = u64;

/// Ordered device sequence from src to dest, both inclusive
pub type Route = Vec<DeviceId>;

/// Multi-dimensional address of a device.
///
/// For a topology of shape `[2, 8, 4]`, NPU 47 is `[1, 7, 2]`:
/// dimension 0 has stride 1, dimension 1 stride 2, dimension 2 stride 16.
pub type MultiDimAddress = Vec<usize>;

/// Single-axis topology shapes that can be used alone or stacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopologyBuildingBlock {
    Ring,
    FullyConnected,
    Switch,
    BinaryTree,
    DoubleBinaryTree,
    Mesh,
    HyperCube,
}

impl fmt::Display for TopologyBuildingBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopologyBuildingBlock::Ring => "Ring",
            TopologyBuildingBlock::FullyConnected => "FullyConnected",
            TopologyBuildingBlock::Switch => "Switch",
            TopologyBuildingBlock::BinaryTree => "BinaryTree",
            TopologyBuildingBlock::DoubleBinaryTree => "DoubleBinaryTree",
            TopologyBuildingBlock::Mesh => "Mesh",
            TopologyBuildingBlock::HyperCube => "HyperCube",
        };
        write!(f, "{}", name)
    }
}

/// A directed link (src -> dst) that a topology wants instantiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionPolicy {
    pub src: DeviceId,
    pub dst: DeviceId,
}

impl ConnectionPolicy {
    pub fn new(src: DeviceId, dst: DeviceId) -> Self {
        Self { src, dst }
    }
}

/// Fully resolved description of one topology axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub block: TopologyBuildingBlock,
    pub npus_count: usize,
    pub bandwidth: Bandwidth,
    pub latency: Latency,
    /// Only meaningful for rings
    pub bidirectional: bool,
}

/// Construction contract and routing invariant failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("{block} requires at least one NPU")]
    EmptyTopology { block: TopologyBuildingBlock },
    #[error("{block}: invalid bandwidth {bandwidth} GB/s (must be positive)")]
    InvalidBandwidth {
        block: TopologyBuildingBlock,
        bandwidth: Bandwidth,
    },
    #[error("{block}: invalid latency {latency} ns (must be non-negative)")]
    InvalidLatency {
        block: TopologyBuildingBlock,
        latency: Latency,
    },
    #[error("HyperCube size {npus_count} is not a power of two")]
    NotPowerOfTwo { npus_count: usize },
    #[error("device {device} out of range ({count} devices)")]
    UnknownDevice { device: DeviceId, count: usize },
    #[error("route requires distinct endpoints, got {device} -> {device}")]
    SameEndpoints { device: DeviceId },
    #[error("no path to device {device} in {tree} tree")]
    PathNotFound { device: DeviceId, tree: &'static str },
    #[error("address {address:?} is invalid for shape {shape:?}")]
    InvalidAddress {
        address: MultiDimAddress,
        shape: Vec<usize>,
    },
    #[error("link {src} -> {dst} already exists")]
    DuplicateLink { src: DeviceId, dst: DeviceId },
    #[error("no link {src} -> {dst}")]
    MissingLink { src: DeviceId, dst: DeviceId },
    #[error("topology has no dimensions")]
    NoDimensions,
    #[error("dimension {dim} ({block}) contributes no connection policies")]
    NoPolicies {
        dim: usize,
        block: TopologyBuildingBlock,
    },
    #[error("devices have not been initialized")]
    DevicesNotInitialized,
}
