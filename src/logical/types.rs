//! Logical topology type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rotation direction over the cyclic index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    Clockwise,
    Anticlockwise,
}

/// Which level of the machine a logical topology spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Dimension {
    #[default]
    Local,
    Vertical,
    Horizontal,
    NA,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Local => "local",
            Dimension::Vertical => "vertical",
            Dimension::Horizontal => "horizontal",
            Dimension::NA => "n/a",
        };
        write!(f, "{}", name)
    }
}

/// Flavour of logical topology an algorithm runs over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LogicalTopologyKind {
    #[default]
    HyperCube,
    Mesh,
}

impl fmt::Display for LogicalTopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalTopologyKind::HyperCube => "hypercube",
            LogicalTopologyKind::Mesh => "mesh",
        };
        write!(f, "{}", name)
    }
}

/// Neighbor-map construction and lookup failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogicalTopologyError {
    #[error("{kind} has no participants")]
    EmptyParticipants { kind: LogicalTopologyKind },
    #[error("{kind}: node {id} is not among the participants")]
    NodeNotParticipant { kind: LogicalTopologyKind, id: usize },
    #[error("{kind}: node {id} listed more than once")]
    DuplicateParticipant { kind: LogicalTopologyKind, id: usize },
    #[error("{kind}: no index for node {id}")]
    UnknownNode { kind: LogicalTopologyKind, id: usize },
    #[error(
        "{kind} ({dimension}) at node {id}: negative receiver {receiver} from node {node} \
         (index {index}, offset {offset})"
    )]
    NegativeReceiver {
        kind: LogicalTopologyKind,
        dimension: Dimension,
        id: usize,
        node: usize,
        index: usize,
        offset: usize,
        receiver: i64,
    },
    #[error(
        "{kind}: invalid homogeneous layout (nodes {nodes_count}, index {index}, offset {offset})"
    )]
    InvalidLayout {
        kind: LogicalTopologyKind,
        nodes_count: usize,
        index: usize,
        offset: usize,
    },
    #[error("{kind}: group membership requires a homogeneous layout")]
    NotHomogeneous { kind: LogicalTopologyKind },
}
