//! Collective algorithm type definitions.
//!
//! The algorithm never calls its collaborators directly. Every outbound
//! action is an `Effect` that the caller (scheduler, memory bus, network)
//! carries out.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::logical::LogicalTopologyError;

/// Collective operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComType {
    AllReduce,
    AllGather,
    ReduceScatter,
    AllToAll,
}

impl fmt::Display for ComType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComType::AllReduce => "AllReduce",
            ComType::AllGather => "AllGather",
            ComType::ReduceScatter => "ReduceScatter",
            ComType::AllToAll => "AllToAll",
        };
        write!(f, "{}", name)
    }
}

/// How many packets are kept in flight per round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InjectionPolicy {
    #[default]
    Normal,
    Aggressive,
}

/// Events delivered to an algorithm instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    StreamInit,
    PacketReceived,
    General,
}

/// Stream lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StreamState {
    #[default]
    Created,
    Ready,
    Executing,
    Zombie,
    Dead,
}

/// Memory bus transmission class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transmission {
    Fast,
    Usual,
}

/// Where a released bundle is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BundleTarget {
    /// NPU to memory accelerator
    MemoryAccelerator,
    Npu,
}

/// The stream an algorithm instance belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamContext {
    pub stream_id: u64,
    pub queue_id: usize,
    pub state: StreamState,
}

impl StreamContext {
    pub fn new(stream_id: u64, queue_id: usize) -> Self {
        Self {
            stream_id,
            queue_id,
            state: StreamState::Created,
        }
    }
}

/// One in-flight chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub queue_id: usize,
    pub preferred_src: usize,
    pub preferred_dest: usize,
}

/// Locked packets handed to the memory bus in one transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketBundle {
    pub packets: Vec<Packet>,
    pub processed: bool,
    pub send_back: bool,
    pub msg_size: u64,
    pub transmission: Transmission,
    pub target: BundleTarget,
}

impl PacketBundle {
    /// Bytes moved over the memory bus
    pub fn bytes(&self) -> u64 {
        self.msg_size * self.packets.len() as u64
    }
}

/// Point-to-point transfer request; `tag` is the stream id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferRequest {
    pub src: usize,
    pub dst: usize,
    pub size: u64,
    pub tag: u64,
    pub vnet: usize,
}

/// Outbound request produced by a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    ChangeState(StreamState),
    ReleasePackets(PacketBundle),
    Send(TransferRequest),
    Recv(TransferRequest),
    /// The stream is finished; its owner should start the next one
    ProceedToNext,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectiveError {
    #[error("node {id}: stream {stream_id} should not inject nothing")]
    InjectNothing { id: usize, stream_id: u64 },
    #[error("node {id}: gathering {data_size} bytes from {nodes_count} nodes overflows")]
    DataSizeOverflow {
        id: usize,
        data_size: u64,
        nodes_count: usize,
    },
    #[error(transparent)]
    Topology(#[from] LogicalTopologyError),
}
