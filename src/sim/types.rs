//! Type definitions for the discrete-event driver.

use serde::Serialize;
use std::cmp::Ordering;

use crate::collective::{CollectiveError, ComType, StreamState};
use crate::config::ValidationError;
use crate::logical::LogicalTopologyError;
use crate::topology::{DeviceId, TopologyError};

/// Simulated time in nanoseconds
pub type SimTime = u64;

/// Transfers are matched on (destination, source, tag)
pub type TransferKey = (DeviceId, DeviceId, u64);

/// Events on the driver queue. `node` is a participant slot, not an NPU id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    StreamInit { node: usize },
    /// Memory bus has handed one packet back
    General { node: usize },
    PacketReceived { node: usize },
    /// Bytes of one transfer reached the destination NPU
    TransferArrived { key: TransferKey },
}

/// Queue entry; earliest time first, insertion order breaks ties
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time: SimTime,
    pub seq: u64,
    pub event: SimEvent,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap behavior
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceKind {
    StreamInit,
    General,
    PacketReceived,
    Release,
    Send,
    Recv,
    StateChange,
    Finish,
}

/// One line of the optional event trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub time_ns: SimTime,
    pub npu: DeviceId,
    pub kind: TraceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<DeviceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StreamState>,
}

/// Outcome for one participant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResult {
    pub npu: DeviceId,
    pub finish_time_ns: SimTime,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    /// Steps the collective needed at this node
    pub rounds: u64,
    pub final_data_size: u64,
    pub state: StreamState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub collective: ComType,
    pub topology: String,
    pub npus_count: usize,
    pub participants: usize,
    pub data_size: u64,
    pub completion_time_ns: SimTime,
    pub events_processed: u64,
    pub nodes: Vec<NodeResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceRecord>,
}

impl SimulationResult {
    pub fn total_bytes_sent(&self) -> u64 {
        self.nodes.iter().map(|n| n.bytes_sent).sum()
    }

    pub fn total_packets_sent(&self) -> u64 {
        self.nodes.iter().map(|n| n.packets_sent).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Logical(#[from] LogicalTopologyError),
    #[error(transparent)]
    Collective(#[from] CollectiveError),
    #[error("route from {src} to {dst} uses a link that does not exist")]
    MissingLink { src: DeviceId, dst: DeviceId },
    #[error("collective has no participants")]
    NoParticipants,
    #[error("no participant for NPU {npu}")]
    UnknownParticipant { npu: DeviceId },
    #[error("node {npu} stalled in state {state:?} with an empty event queue")]
    Stall { npu: DeviceId, state: StreamState },
    #[error("{count} transfer(s) were never matched")]
    UnmatchedTransfers { count: usize },
}
