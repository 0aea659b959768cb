//! Discrete-event driver for one collective.
//!
//! Every participant owns one `CollectiveAlgorithm` and one stream. The
//! driver feeds events to the algorithms and carries out the effects they
//! return: state changes, packet release to the memory bus, point-to-point
//! sends and receives, and stream completion.

use std::collections::{BinaryHeap, HashMap};

use log::{debug, info, trace};

use crate::collective::{
    CollectiveAlgorithm, ComType, Effect, EventType, StreamContext, StreamState, TransferRequest,
};
use crate::config::{CollectiveConfig, Config, Layout, ValidationError};
use crate::logical::LogicalTopology;
use crate::topology::{construct_topology, DeviceId, Topology};

use super::transport::{MemoryBus, Network};
use super::types::{
    NodeResult, ScheduledEvent, SimEvent, SimTime, SimulationError, SimulationResult, TraceKind,
    TraceRecord, TransferKey,
};

/// Per-participant bookkeeping
#[derive(Debug)]
struct NodeState {
    npu: DeviceId,
    algorithm: CollectiveAlgorithm,
    stream: StreamContext,
    rounds: u64,
    bytes_sent: u64,
    finish_time: Option<SimTime>,
}

pub struct Simulation {
    network: Network,
    bus: MemoryBus,
    com_type: ComType,
    data_size: u64,
    nodes: Vec<NodeState>,
    slots: HashMap<DeviceId, usize>,

    queue: BinaryHeap<ScheduledEvent>,
    now: SimTime,
    next_seq: u64,
    events_processed: u64,

    /// Receives posted before their bytes arrived
    posted_recvs: HashMap<TransferKey, usize>,
    /// Bytes that arrived before the matching receive was posted
    early_arrivals: HashMap<TransferKey, usize>,

    trace: Option<Vec<TraceRecord>>,
}

impl Simulation {
    /// Build the physical topology, the logical topologies and one algorithm
    /// per participant from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self, SimulationError> {
        let topology = construct_topology(&config.axis_specs()?)?;
        let bus = MemoryBus::from_config(&config.memory())?;
        let logical = build_logical_topologies(&config.collective, topology.npus_count())?;

        let stream_id = config.collective.stream_id;
        let mut algorithms = Vec::with_capacity(logical.len());
        for neighbors in &logical {
            algorithms.push(CollectiveAlgorithm::new(
                config.collective.com_type,
                neighbors.id(),
                neighbors,
                config.collective.data_size,
                config.collective.direction,
                config.collective.injection_policy,
            )?);
        }

        Self::new(topology, bus, algorithms, stream_id)
    }

    /// Drive the given algorithms, all on stream `stream_id`
    pub fn new(
        topology: Topology,
        bus: MemoryBus,
        algorithms: Vec<CollectiveAlgorithm>,
        stream_id: u64,
    ) -> Result<Self, SimulationError> {
        let Some(first) = algorithms.first() else {
            return Err(SimulationError::NoParticipants);
        };
        let (com_type, data_size) = (first.com_type(), first.data_size());

        let mut slots = HashMap::with_capacity(algorithms.len());
        let mut nodes = Vec::with_capacity(algorithms.len());
        for (slot, algorithm) in algorithms.into_iter().enumerate() {
            let npu = algorithm.id();
            if npu >= topology.npus_count() {
                return Err(SimulationError::UnknownParticipant { npu });
            }
            slots.insert(npu, slot);
            nodes.push(NodeState {
                npu,
                rounds: algorithm.stream_count(),
                algorithm,
                stream: StreamContext::new(stream_id, 0),
                bytes_sent: 0,
                finish_time: None,
            });
        }

        Ok(Self {
            network: Network::new(topology),
            bus,
            com_type,
            data_size,
            nodes,
            slots,
            queue: BinaryHeap::new(),
            now: 0,
            next_seq: 0,
            events_processed: 0,
            posted_recvs: HashMap::new(),
            early_arrivals: HashMap::new(),
            trace: None,
        })
    }

    /// Record every event and effect in the result
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Vec::new());
        self
    }

    pub fn topology(&self) -> &Topology {
        self.network.topology()
    }

    fn schedule(&mut self, delay: SimTime, event: SimEvent) {
        self.queue.push(ScheduledEvent {
            time: self.now + delay,
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    fn record(
        &mut self,
        npu: DeviceId,
        kind: TraceKind,
        peer: Option<DeviceId>,
        bytes: Option<u64>,
        state: Option<StreamState>,
    ) {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(TraceRecord {
                time_ns: self.now,
                npu,
                kind,
                peer,
                bytes,
                state,
            });
        }
    }

    /// Run until the event queue drains
    pub fn run(mut self) -> Result<SimulationResult, SimulationError> {
        info!(
            "Simulating {} of {} bytes on {} with {} participant(s)",
            self.com_type,
            self.data_size,
            self.network.topology().describe(),
            self.nodes.len()
        );

        for node in 0..self.nodes.len() {
            self.schedule(0, SimEvent::StreamInit { node });
        }

        while let Some(scheduled) = self.queue.pop() {
            self.now = scheduled.time;
            self.events_processed += 1;
            self.process_event(scheduled.event)?;
        }

        self.finish()
    }

    fn process_event(&mut self, event: SimEvent) -> Result<(), SimulationError> {
        match event {
            SimEvent::StreamInit { node } => self.deliver(node, EventType::StreamInit),
            SimEvent::General { node } => self.deliver(node, EventType::General),
            SimEvent::PacketReceived { node } => self.deliver(node, EventType::PacketReceived),
            SimEvent::TransferArrived { key } => self.handle_arrival(key),
        }
    }

    fn deliver(&mut self, node: usize, event: EventType) -> Result<(), SimulationError> {
        let state = &mut self.nodes[node];
        let npu = state.npu;
        if state.stream.state == StreamState::Dead {
            trace!("t={} node {}: dropping {:?} for finished stream", self.now, npu, event);
            return Ok(());
        }

        let effects = state.algorithm.run(event, &state.stream)?;
        let kind = match event {
            EventType::StreamInit => TraceKind::StreamInit,
            EventType::General => TraceKind::General,
            EventType::PacketReceived => TraceKind::PacketReceived,
        };
        self.record(npu, kind, None, None, None);

        for effect in effects {
            self.apply(node, effect)?;
        }
        Ok(())
    }

    fn apply(&mut self, node: usize, effect: Effect) -> Result<(), SimulationError> {
        let npu = self.nodes[node].npu;
        match effect {
            Effect::ChangeState(state) => {
                self.nodes[node].stream.state = state;
                self.record(npu, TraceKind::StateChange, None, None, Some(state));
            }
            Effect::ReleasePackets(bundle) => {
                let delay = self.bus.delay(&bundle);
                self.record(npu, TraceKind::Release, None, Some(bundle.bytes()), None);
                for _ in 0..bundle.packets.len() {
                    self.schedule(delay, SimEvent::General { node });
                }
            }
            Effect::Send(request) => self.send(node, request)?,
            Effect::Recv(request) => self.post_recv(request)?,
            Effect::ProceedToNext => {
                let state = &mut self.nodes[node];
                state.stream.state = StreamState::Dead;
                state.finish_time = Some(self.now);
                debug!("t={} node {} finished", self.now, npu);
                self.record(npu, TraceKind::Finish, None, None, Some(StreamState::Dead));
            }
        }
        Ok(())
    }

    fn send(&mut self, node: usize, request: TransferRequest) -> Result<(), SimulationError> {
        let delay = self
            .network
            .transfer_time(request.src, request.dst, request.size)?;
        self.nodes[node].bytes_sent += request.size;
        self.record(
            request.src,
            TraceKind::Send,
            Some(request.dst),
            Some(request.size),
            None,
        );
        trace!(
            "t={} {} -> {} ({} B) arrives at {}",
            self.now,
            request.src,
            request.dst,
            request.size,
            self.now + delay
        );
        self.schedule(
            delay,
            SimEvent::TransferArrived {
                key: (request.dst, request.src, request.tag),
            },
        );
        Ok(())
    }

    fn post_recv(&mut self, request: TransferRequest) -> Result<(), SimulationError> {
        let key = (request.dst, request.src, request.tag);
        self.record(
            request.dst,
            TraceKind::Recv,
            Some(request.src),
            Some(request.size),
            None,
        );
        if take_one(&mut self.early_arrivals, &key) {
            let node = self.slot(request.dst)?;
            self.schedule(0, SimEvent::PacketReceived { node });
        } else {
            *self.posted_recvs.entry(key).or_insert(0) += 1;
        }
        Ok(())
    }

    fn handle_arrival(&mut self, key: TransferKey) -> Result<(), SimulationError> {
        if take_one(&mut self.posted_recvs, &key) {
            let node = self.slot(key.0)?;
            self.deliver(node, EventType::PacketReceived)
        } else {
            *self.early_arrivals.entry(key).or_insert(0) += 1;
            Ok(())
        }
    }

    fn slot(&self, npu: DeviceId) -> Result<usize, SimulationError> {
        self.slots
            .get(&npu)
            .copied()
            .ok_or(SimulationError::UnknownParticipant { npu })
    }

    fn finish(self) -> Result<SimulationResult, SimulationError> {
        if let Some(node) = self
            .nodes
            .iter()
            .find(|n| n.stream.state != StreamState::Dead)
        {
            log::error!(
                "Node {} stalled in {:?} after {} events",
                node.npu,
                node.stream.state,
                self.events_processed
            );
            return Err(SimulationError::Stall {
                npu: node.npu,
                state: node.stream.state,
            });
        }

        let unmatched: usize = self.posted_recvs.values().sum::<usize>()
            + self.early_arrivals.values().sum::<usize>();
        if unmatched > 0 {
            log::error!("{} transfer(s) left unmatched", unmatched);
            return Err(SimulationError::UnmatchedTransfers { count: unmatched });
        }

        let nodes: Vec<NodeResult> = self
            .nodes
            .iter()
            .map(|n| NodeResult {
                npu: n.npu,
                finish_time_ns: n.finish_time.unwrap_or(self.now),
                packets_sent: n.algorithm.total_packets_sent(),
                packets_received: n.algorithm.total_packets_received(),
                bytes_sent: n.bytes_sent,
                rounds: n.rounds,
                final_data_size: n.algorithm.final_data_size(),
                state: n.stream.state,
            })
            .collect();
        let completion_time_ns = nodes.iter().map(|n| n.finish_time_ns).max().unwrap_or(0);

        info!(
            "Collective completed at {} ns after {} events",
            completion_time_ns, self.events_processed
        );

        Ok(SimulationResult {
            collective: self.com_type,
            topology: self.network.topology().describe(),
            npus_count: self.network.topology().npus_count(),
            participants: nodes.len(),
            data_size: self.data_size,
            completion_time_ns,
            events_processed: self.events_processed,
            nodes,
            trace: self.trace.unwrap_or_default(),
        })
    }
}

fn take_one(counts: &mut HashMap<TransferKey, usize>, key: &TransferKey) -> bool {
    match counts.get_mut(key) {
        Some(count) if *count > 0 => {
            *count -= 1;
            if *count == 0 {
                counts.remove(key);
            }
            true
        }
        _ => false,
    }
}

/// One logical topology per participant, in participant order
pub fn build_logical_topologies(
    collective: &CollectiveConfig,
    npus_count: usize,
) -> Result<Vec<LogicalTopology>, SimulationError> {
    let kind = collective.algorithm;
    let dimension = collective.dimension;

    match &collective.layout {
        None => {
            let participants: Vec<usize> = (0..npus_count).collect();
            participants
                .iter()
                .map(|&id| {
                    LogicalTopology::from_participants(kind, dimension, id, &participants)
                        .map_err(SimulationError::from)
                })
                .collect()
        }
        Some(Layout::Participants { participants }) => participants
            .iter()
            .map(|&id| {
                LogicalTopology::from_participants(kind, dimension, id, participants)
                    .map_err(SimulationError::from)
            })
            .collect(),
        Some(Layout::Strided { group_size, offset }) => {
            let span = group_size.checked_mul(*offset).ok_or_else(|| {
                ValidationError::InvalidCollective(format!(
                    "group_size {} times offset {} overflows",
                    group_size, offset
                ))
            })?;
            (0..npus_count)
                .map(|id| {
                    let index = (id % span) / offset;
                    LogicalTopology::homogeneous(kind, dimension, id, *group_size, index, *offset)
                        .map_err(SimulationError::from)
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::InjectionPolicy;
    use crate::logical::{Dimension, Direction, LogicalTopologyKind};
    use crate::topology::{AxisSpec, TopologyBuildingBlock};

    fn ring(npus_count: usize) -> Topology {
        construct_topology(&[AxisSpec {
            block: TopologyBuildingBlock::Ring,
            npus_count,
            bandwidth: 50.0,
            latency: 500.0,
            bidirectional: true,
        }])
        .unwrap()
    }

    fn algorithms(
        com_type: ComType,
        participants: &[usize],
        policy: InjectionPolicy,
    ) -> Vec<CollectiveAlgorithm> {
        participants
            .iter()
            .map(|&id| {
                let topology = LogicalTopology::from_participants(
                    LogicalTopologyKind::HyperCube,
                    Dimension::Local,
                    id,
                    participants,
                )
                .unwrap();
                CollectiveAlgorithm::new(
                    com_type,
                    id,
                    &topology,
                    4096,
                    Direction::Clockwise,
                    policy,
                )
                .unwrap()
            })
            .collect()
    }

    fn bus() -> MemoryBus {
        MemoryBus::new(5.0, 50.0, 100.0)
    }

    #[test]
    fn test_all_reduce_on_ring() {
        let sim = Simulation::new(
            ring(4),
            bus(),
            algorithms(ComType::AllReduce, &[0, 1, 2, 3], InjectionPolicy::Normal),
            1,
        )
        .unwrap();
        let result = sim.run().unwrap();

        assert_eq!(result.participants, 4);
        for node in &result.nodes {
            assert_eq!(node.state, StreamState::Dead);
            assert_eq!(node.rounds, 4);
            assert_eq!(node.packets_sent, 4);
            assert_eq!(node.packets_received, 4);
            assert_eq!(node.bytes_sent, 4 * 1024);
            assert_eq!(node.final_data_size, 4096);
            assert!(node.finish_time_ns > 0);
        }
        assert_eq!(
            result.completion_time_ns,
            result.nodes.iter().map(|n| n.finish_time_ns).max().unwrap()
        );
        assert!(result.trace.is_empty());
    }

    #[test]
    fn test_aggressive_all_to_all() {
        let result = Simulation::new(
            ring(4),
            bus(),
            algorithms(ComType::AllToAll, &[0, 1, 2, 3], InjectionPolicy::Aggressive),
            1,
        )
        .unwrap()
        .run()
        .unwrap();
        for node in &result.nodes {
            assert_eq!(node.packets_sent, 6);
            assert_eq!(node.packets_received, 6);
        }
    }

    #[test]
    fn test_single_participant_finishes_without_traffic() {
        let result = Simulation::new(
            ring(4),
            bus(),
            algorithms(ComType::AllReduce, &[2], InjectionPolicy::Normal),
            1,
        )
        .unwrap()
        .with_trace()
        .run()
        .unwrap();
        let node = &result.nodes[0];
        assert_eq!(node.packets_sent, 0);
        assert_eq!(node.bytes_sent, 0);
        assert_eq!(node.state, StreamState::Dead);
        // a single fast release of the whole 4096 bytes
        assert_eq!(node.finish_time_ns, 46);
        assert!(result
            .trace
            .iter()
            .any(|r| r.kind == TraceKind::Finish && r.npu == 2));
    }

    #[test]
    fn test_trace_pairs_sends_and_receives() {
        let result = Simulation::new(
            ring(8),
            bus(),
            algorithms(ComType::AllGather, &[0, 2, 4, 6], InjectionPolicy::Normal),
            3,
        )
        .unwrap()
        .with_trace()
        .run()
        .unwrap();
        let sends = result
            .trace
            .iter()
            .filter(|r| r.kind == TraceKind::Send)
            .count();
        let recvs = result
            .trace
            .iter()
            .filter(|r| r.kind == TraceKind::Recv)
            .count();
        assert_eq!(sends, recvs);
        assert_eq!(sends as u64, result.total_packets_sent());
        assert!(result
            .trace
            .windows(2)
            .all(|w| w[0].time_ns <= w[1].time_ns));
    }

    #[test]
    fn test_unknown_participant() {
        let err = Simulation::new(
            ring(4),
            bus(),
            algorithms(ComType::AllReduce, &[0, 9], InjectionPolicy::Normal),
            1,
        )
        .err()
        .unwrap();
        assert!(matches!(err, SimulationError::UnknownParticipant { npu: 9 }));
    }

    #[test]
    fn test_no_participants() {
        let err = Simulation::new(ring(4), bus(), Vec::new(), 1).err().unwrap();
        assert!(matches!(err, SimulationError::NoParticipants));
    }

    #[test]
    fn test_strided_logical_topologies() {
        let collective: CollectiveConfig = serde_yaml::from_str(
            "type: AllReduce\ndata_size: 64\nlayout: { group_size: 2, offset: 2 }\n",
        )
        .unwrap();
        let topologies = build_logical_topologies(&collective, 8).unwrap();
        assert_eq!(topologies.len(), 8);
        assert_eq!(topologies[1].participants(), &[1, 3]);
        assert_eq!(topologies[6].participants(), &[4, 6]);
        assert_eq!(topologies[6].index(), 1);
        assert!(topologies[0].is_enabled().unwrap());
        assert!(topologies[2].is_enabled().unwrap());
        assert!(!topologies[5].is_enabled().unwrap());
    }

    #[test]
    fn test_strided_span_overflow() {
        let collective: CollectiveConfig = serde_yaml::from_str(
            "type: AllReduce\ndata_size: 64\n\
             layout: { group_size: 4294967296, offset: 4294967296 }\n",
        )
        .unwrap();
        let err = build_logical_topologies(&collective, 8).err().unwrap();
        assert!(matches!(
            err,
            SimulationError::Config(ValidationError::InvalidCollective(_))
        ));
    }
}
