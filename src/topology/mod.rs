//! Physical topology module.
//!
//! This module contains the single-axis building blocks (ring, mesh,
//! fully-connected, switch, trees, hypercube), the multi-dimensional
//! composite that stacks them, address translation, and the ns-3 exporter.

pub mod address;
pub mod basic;
pub mod builder;
pub mod export;
pub mod fully_connected;
pub mod hypercube;
pub mod links;
pub mod mesh;
pub mod multi_dim;
pub mod ring;
pub mod switch;
pub mod tree;
pub mod types;

// Re-export key types and functions for easier access
pub use address::{generate_address_pairs, AddressSpace, SwitchTranslationUnit};
pub use basic::BasicTopology;
pub use builder::{construct_topology, Topology};
pub use links::{Device, Link, LinkGraph};
pub use multi_dim::MultiDimTopology;
pub use types::{
    AxisSpec, Bandwidth, ChunkSize, ConnectionPolicy, DeviceId, Latency, MultiDimAddress, Route,
    TopologyBuildingBlock, TopologyError,
};
