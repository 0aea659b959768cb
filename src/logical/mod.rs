//! Logical topologies used by the collective algorithms.
//!
//! Unlike the physical topologies, a logical topology only answers
//! "who do I send to and receive from" for one participating node.

pub mod topology;
pub mod types;

pub use topology::LogicalTopology;
pub use types::{Dimension, Direction, LogicalTopologyError, LogicalTopologyKind};
