//! Algorithm-facing logical topology.
//!
//! A logical topology orders the participants of one collective on a cycle.
//! Each participant has an index; the clockwise receiver of index `i` is
//! `i + 1`, wrapping at the end. The id/index maps are built once and are
//! read-only afterwards.

use std::collections::HashMap;

use super::types::{Dimension, Direction, LogicalTopologyError, LogicalTopologyKind};

#[derive(Debug, Clone)]
pub struct LogicalTopology {
    kind: LogicalTopologyKind,
    dimension: Dimension,
    id: usize,
    nodes_count: usize,
    index: usize,
    /// Stride between consecutive participants; only for homogeneous layouts
    offset: Option<usize>,
    id_to_index: HashMap<usize, usize>,
    index_to_id: Vec<usize>,
}

impl LogicalTopology {
    /// Build from an explicit participant list; position in the list is the index.
    pub fn from_participants(
        kind: LogicalTopologyKind,
        dimension: Dimension,
        id: usize,
        participants: &[usize],
    ) -> Result<Self, LogicalTopologyError> {
        if participants.is_empty() {
            log::error!("Custom {} for node {} has no participants", kind, id);
            return Err(LogicalTopologyError::EmptyParticipants { kind });
        }
        let mut id_to_index = HashMap::with_capacity(participants.len());
        for (index, npu) in participants.iter().enumerate() {
            if id_to_index.insert(*npu, index).is_some() {
                log::error!("Custom {} lists node {} more than once", kind, npu);
                return Err(LogicalTopologyError::DuplicateParticipant { kind, id: *npu });
            }
        }
        let Some(&index) = id_to_index.get(&id) else {
            log::error!("Custom {}: node {} is not in {:?}", kind, id, participants);
            return Err(LogicalTopologyError::NodeNotParticipant { kind, id });
        };

        log::info!(
            "custom {}, id: {}, dimension: {}, total nodes: {}, index: {}",
            kind,
            id,
            dimension,
            participants.len(),
            index
        );

        Ok(Self {
            kind,
            dimension,
            id,
            nodes_count: participants.len(),
            index,
            offset: None,
            id_to_index,
            index_to_id: participants.to_vec(),
        })
    }

    /// Build an evenly strided layout.
    ///
    /// Participants are `offset` ids apart. Starting from this node, the maps
    /// are filled by walking clockwise `nodes_count - 1` steps; the step out
    /// of the last index wraps back by `nodes_count * offset`.
    pub fn homogeneous(
        kind: LogicalTopologyKind,
        dimension: Dimension,
        id: usize,
        nodes_count: usize,
        index: usize,
        offset: usize,
    ) -> Result<Self, LogicalTopologyError> {
        let span = nodes_count
            .checked_mul(offset)
            .and_then(|span| i64::try_from(span).ok());
        let span = match span {
            Some(span) if nodes_count > 0 && index < nodes_count && offset > 0 => span,
            _ => {
                log::error!(
                    "{} of node {}: invalid layout (nodes {}, index {}, offset {})",
                    kind,
                    id,
                    nodes_count,
                    index,
                    offset
                );
                return Err(LogicalTopologyError::InvalidLayout {
                    kind,
                    nodes_count,
                    index,
                    offset,
                });
            }
        };
        if id == 0 {
            log::info!(
                "{} of node 0, dimension: {}, total nodes: {}, index: {}, offset: {}",
                kind,
                dimension,
                nodes_count,
                index,
                offset
            );
        }

        let mut id_to_index = HashMap::with_capacity(nodes_count);
        let mut index_to_id = vec![0; nodes_count];
        id_to_index.insert(id, index);
        index_to_id[index] = id;

        let mut node = id;
        let mut node_index = index;
        for _ in 1..nodes_count {
            let mut receiver = node as i64 + offset as i64;
            if node_index == nodes_count - 1 {
                receiver -= span;
                node_index = 0;
            } else {
                node_index += 1;
            }
            if receiver < 0 {
                log::error!(
                    "{} ({}) at id {}: index {}, node {}, offset {}, receiver {}",
                    kind,
                    dimension,
                    id,
                    node_index,
                    node,
                    offset,
                    receiver
                );
                return Err(LogicalTopologyError::NegativeReceiver {
                    kind,
                    dimension,
                    id,
                    node,
                    index: node_index,
                    offset,
                    receiver,
                });
            }
            node = receiver as usize;
            id_to_index.insert(node, node_index);
            index_to_id[node_index] = node;
        }

        Ok(Self {
            kind,
            dimension,
            id,
            nodes_count,
            index,
            offset: Some(offset),
            id_to_index,
            index_to_id,
        })
    }

    pub fn kind(&self) -> LogicalTopologyKind {
        self.kind
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes_count
    }

    /// Index of the owning node
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Participant ids in index order
    pub fn participants(&self) -> &[usize] {
        &self.index_to_id
    }

    pub fn get_index(&self, node_id: usize) -> Result<usize, LogicalTopologyError> {
        self.id_to_index
            .get(&node_id)
            .copied()
            .ok_or(LogicalTopologyError::UnknownNode {
                kind: self.kind,
                id: node_id,
            })
    }

    /// Node that `node_id` sends to when rotating in `direction`
    pub fn get_receiver(
        &self,
        node_id: usize,
        direction: Direction,
    ) -> Result<usize, LogicalTopologyError> {
        let index = self.get_index(node_id)?;
        Ok(self.index_to_id[self.step(index, direction)])
    }

    /// Node that `node_id` receives from when rotating in `direction`
    pub fn get_sender(
        &self,
        node_id: usize,
        direction: Direction,
    ) -> Result<usize, LogicalTopologyError> {
        let index = self.get_index(node_id)?;
        let reverse = match direction {
            Direction::Clockwise => Direction::Anticlockwise,
            Direction::Anticlockwise => Direction::Clockwise,
        };
        Ok(self.index_to_id[self.step(index, reverse)])
    }

    /// Whether this node heads its group, i.e. `id - index * offset == 0`
    pub fn is_enabled(&self) -> Result<bool, LogicalTopologyError> {
        let offset = self
            .offset
            .ok_or(LogicalTopologyError::NotHomogeneous { kind: self.kind })?;
        Ok(self.id as i64 - (self.index * offset) as i64 == 0)
    }

    fn step(&self, index: usize, direction: Direction) -> usize {
        match direction {
            Direction::Clockwise => (index + 1) % self.nodes_count,
            Direction::Anticlockwise => (index + self.nodes_count - 1) % self.nodes_count,
        }
    }
}
