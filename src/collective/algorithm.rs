//! Packet-level collective state machine (HyperCube and Mesh flavours).
//!
//! One instance drives one node's part of one collective. Events come in
//! through [`CollectiveAlgorithm::run`], which answers with the effects the
//! scheduler, memory bus and network must carry out.
//!
//! Per round the node injects `parallel_reduce` packets that go straight to
//! the memory accelerator, followed by `(N - 1) * parallel_reduce` packets
//! that go back to the NPU. Every injected packet is released to the memory
//! bus right away; the bus answers with a `General` event, at which point the
//! head packet is sent to the clockwise (or anticlockwise) neighbor. The
//! collective finishes once all rounds are spent and every free slot has come
//! back.

use std::collections::VecDeque;

use super::types::{
    BundleTarget, CollectiveError, ComType, Effect, EventType, InjectionPolicy, Packet,
    PacketBundle, StreamContext, StreamState, TransferRequest, Transmission,
};
use crate::logical::{Dimension, Direction, LogicalTopology, LogicalTopologyKind};

/// Stream view and effects accumulated while handling one event
struct Transition {
    stream: StreamContext,
    effects: Vec<Effect>,
}

impl Transition {
    fn new(stream: StreamContext) -> Self {
        Self {
            stream,
            effects: Vec::new(),
        }
    }

    fn change_state(&mut self, state: StreamState) {
        self.stream.state = state;
        self.effects.push(Effect::ChangeState(state));
    }
}

#[derive(Debug, Clone)]
pub struct CollectiveAlgorithm {
    com_type: ComType,
    kind: LogicalTopologyKind,
    id: usize,
    direction: Direction,
    injection_policy: InjectionPolicy,
    transmission: Transmission,
    nodes_count: usize,
    curr_receiver: usize,
    curr_sender: usize,

    data_size: u64,
    final_data_size: u64,
    msg_size: u64,

    /// Remaining rounds
    stream_count: u64,
    max_count: i64,
    remained_packets_per_max_count: u64,
    remained_packets_per_message: u64,
    parallel_reduce: u64,

    zero_latency_packets: u64,
    non_zero_latency_packets: u64,
    toggle: bool,
    free_packets: u64,
    total_packets_sent: u64,
    total_packets_received: u64,

    packets: VecDeque<Packet>,
    locked_packets: Vec<Packet>,
    processed: bool,
    send_back: bool,
    npu_to_ma: bool,
    exited: bool,
}

impl CollectiveAlgorithm {
    pub fn new(
        com_type: ComType,
        id: usize,
        topology: &LogicalTopology,
        data_size: u64,
        direction: Direction,
        injection_policy: InjectionPolicy,
    ) -> Result<Self, CollectiveError> {
        let nodes_count = topology.nodes_count();
        let curr_receiver = topology.get_receiver(id, direction)?;
        let curr_sender = topology.get_sender(id, direction)?;
        let n = nodes_count as u64;
        let log_rounds = (nodes_count as f64).ln().ceil() as u64;

        let (stream_count, parallel_reduce) = match com_type {
            ComType::AllReduce => (2 * log_rounds, 1),
            ComType::AllToAll => {
                let parallel_reduce = match injection_policy {
                    InjectionPolicy::Aggressive => n.saturating_sub(1).max(1),
                    InjectionPolicy::Normal => 1,
                };
                (n * n.saturating_sub(1) / 2, parallel_reduce)
            }
            ComType::AllGather | ComType::ReduceScatter => (log_rounds, 1),
        };
        let max_count = match com_type {
            ComType::AllToAll | ComType::AllGather => 0,
            ComType::AllReduce | ComType::ReduceScatter => n as i64 - 1,
        };
        let (final_data_size, msg_size) = match com_type {
            ComType::AllReduce => (data_size, data_size / n),
            ComType::AllGather => {
                let gathered = data_size
                    .checked_mul(n)
                    .ok_or(CollectiveError::DataSizeOverflow {
                        id,
                        data_size,
                        nodes_count,
                    })?;
                (gathered, data_size)
            }
            ComType::ReduceScatter => (data_size / n, data_size / n),
            ComType::AllToAll => (data_size, data_size / n),
        };
        let transmission = if topology.dimension() == Dimension::Local {
            Transmission::Fast
        } else {
            Transmission::Usual
        };

        log::debug!(
            "{} {} at node {}: {} nodes, receiver {}, sender {}, {} rounds, parallel {}, msg {} B",
            topology.kind(),
            com_type,
            id,
            nodes_count,
            curr_receiver,
            curr_sender,
            stream_count,
            parallel_reduce,
            msg_size
        );

        Ok(Self {
            com_type,
            kind: topology.kind(),
            id,
            direction,
            injection_policy,
            transmission,
            nodes_count,
            curr_receiver,
            curr_sender,
            data_size,
            final_data_size,
            msg_size,
            stream_count,
            max_count,
            remained_packets_per_max_count: 1,
            remained_packets_per_message: 1,
            parallel_reduce,
            zero_latency_packets: 0,
            non_zero_latency_packets: 0,
            toggle: false,
            free_packets: 0,
            total_packets_sent: 0,
            total_packets_received: 0,
            packets: VecDeque::new(),
            locked_packets: Vec::new(),
            processed: false,
            send_back: false,
            npu_to_ma: false,
            exited: false,
        })
    }

    /// Handle one event for the given stream and return the resulting effects.
    pub fn run(
        &mut self,
        event: EventType,
        stream: &StreamContext,
    ) -> Result<Vec<Effect>, CollectiveError> {
        log::trace!(
            "node {} stream {} {:?} in {:?}: rounds {}, free {}, pending {}",
            self.id,
            stream.stream_id,
            event,
            stream.state,
            self.stream_count,
            self.free_packets,
            self.packets.len()
        );
        let mut transition = Transition::new(*stream);
        match event {
            EventType::General => {
                self.free_packets += 1;
                self.ready(&mut transition);
                self.iteratable(&mut transition);
            }
            EventType::PacketReceived => {
                self.total_packets_received += 1;
                self.insert_packet(&mut transition)?;
            }
            EventType::StreamInit => {
                for _ in 0..self.parallel_reduce {
                    self.insert_packet(&mut transition)?;
                }
            }
        }
        Ok(transition.effects)
    }

    fn non_zero_latency_packets_per_round(&self) -> u64 {
        (self.nodes_count as u64).saturating_sub(1) * self.parallel_reduce
    }

    fn insert_packet(&mut self, transition: &mut Transition) -> Result<(), CollectiveError> {
        if self.zero_latency_packets == 0 && self.non_zero_latency_packets == 0 {
            self.zero_latency_packets = self.parallel_reduce;
            self.non_zero_latency_packets = self.non_zero_latency_packets_per_round();
            self.toggle = !self.toggle;
        }

        if self.zero_latency_packets > 0 {
            self.lock_new_packet(transition);
            self.processed = false;
            self.send_back = false;
            self.npu_to_ma = true;
            self.process_max_count(transition);
            self.zero_latency_packets -= 1;
            return Ok(());
        }
        if self.non_zero_latency_packets > 0 {
            self.lock_new_packet(transition);
            self.processed = self.com_type == ComType::ReduceScatter
                || (self.com_type == ComType::AllReduce && self.toggle);
            self.send_back = self.non_zero_latency_packets > self.parallel_reduce;
            self.npu_to_ma = false;
            self.process_max_count(transition);
            self.non_zero_latency_packets -= 1;
            return Ok(());
        }

        log::error!(
            "node {} stream {}: should not inject nothing",
            self.id,
            transition.stream.stream_id
        );
        Err(CollectiveError::InjectNothing {
            id: self.id,
            stream_id: transition.stream.stream_id,
        })
    }

    fn lock_new_packet(&mut self, transition: &Transition) {
        let packet = Packet {
            queue_id: transition.stream.queue_id,
            preferred_src: self.curr_sender,
            preferred_dest: self.curr_receiver,
        };
        self.packets.push_back(packet);
        self.locked_packets.push(packet);
    }

    fn process_max_count(&mut self, transition: &mut Transition) {
        if self.remained_packets_per_max_count > 0 {
            self.remained_packets_per_max_count -= 1;
        }
        if self.remained_packets_per_max_count == 0 {
            self.max_count -= 1;
            self.release_packets(transition);
            self.remained_packets_per_max_count = 1;
        }
    }

    fn release_packets(&mut self, transition: &mut Transition) {
        let target = if self.npu_to_ma {
            BundleTarget::MemoryAccelerator
        } else {
            BundleTarget::Npu
        };
        transition.effects.push(Effect::ReleasePackets(PacketBundle {
            packets: std::mem::take(&mut self.locked_packets),
            processed: self.processed,
            send_back: self.send_back,
            msg_size: self.msg_size,
            transmission: self.transmission,
            target,
        }));
    }

    fn ready(&mut self, transition: &mut Transition) -> bool {
        if matches!(
            transition.stream.state,
            StreamState::Created | StreamState::Ready
        ) {
            transition.change_state(StreamState::Executing);
        }
        let Some(packet) = self.packets.front().copied() else {
            return false;
        };
        if self.stream_count == 0 || self.free_packets == 0 {
            return false;
        }

        let stream_id = transition.stream.stream_id;
        let vnet = transition.stream.queue_id;
        transition.effects.push(Effect::Send(TransferRequest {
            src: self.id,
            dst: packet.preferred_dest,
            size: self.msg_size,
            tag: stream_id,
            vnet,
        }));
        transition.effects.push(Effect::Recv(TransferRequest {
            src: packet.preferred_src,
            dst: self.id,
            size: self.msg_size,
            tag: stream_id,
            vnet,
        }));
        self.reduce(transition);
        true
    }

    fn reduce(&mut self, transition: &mut Transition) {
        self.process_stream_count(transition);
        self.packets.pop_front();
        self.free_packets -= 1;
        self.total_packets_sent += 1;
    }

    fn process_stream_count(&mut self, transition: &mut Transition) {
        if self.remained_packets_per_message > 0 {
            self.remained_packets_per_message -= 1;
        }
        if self.remained_packets_per_message == 0 && self.stream_count > 0 {
            self.stream_count -= 1;
            if self.stream_count > 0 {
                self.remained_packets_per_message = 1;
            }
        }
        if self.remained_packets_per_message == 0
            && self.stream_count == 0
            && transition.stream.state != StreamState::Dead
        {
            transition.change_state(StreamState::Zombie);
        }
    }

    fn iteratable(&mut self, transition: &mut Transition) -> bool {
        if self.stream_count == 0 && self.free_packets == self.parallel_reduce {
            if let Some(effect) = self.exit() {
                transition.effects.push(effect);
            }
            return false;
        }
        true
    }

    /// Drop all pending and locked packets and hand the stream back to its
    /// owner. Only the first call yields `ProceedToNext`.
    pub fn exit(&mut self) -> Option<Effect> {
        self.packets.clear();
        self.locked_packets.clear();
        if self.exited {
            return None;
        }
        self.exited = true;
        log::debug!(
            "node {} finished {} ({} sent, {} received)",
            self.id,
            self.com_type,
            self.total_packets_sent,
            self.total_packets_received
        );
        Some(Effect::ProceedToNext)
    }

    pub fn com_type(&self) -> ComType {
        self.com_type
    }

    pub fn kind(&self) -> LogicalTopologyKind {
        self.kind
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn injection_policy(&self) -> InjectionPolicy {
        self.injection_policy
    }

    pub fn transmission(&self) -> Transmission {
        self.transmission
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes_count
    }

    pub fn curr_receiver(&self) -> usize {
        self.curr_receiver
    }

    pub fn curr_sender(&self) -> usize {
        self.curr_sender
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn final_data_size(&self) -> u64 {
        self.final_data_size
    }

    pub fn msg_size(&self) -> u64 {
        self.msg_size
    }

    /// Remaining rounds
    pub fn stream_count(&self) -> u64 {
        self.stream_count
    }

    pub fn max_count(&self) -> i64 {
        self.max_count
    }

    pub fn parallel_reduce(&self) -> u64 {
        self.parallel_reduce
    }

    pub fn zero_latency_packets(&self) -> u64 {
        self.zero_latency_packets
    }

    pub fn non_zero_latency_packets(&self) -> u64 {
        self.non_zero_latency_packets
    }

    pub fn free_packets(&self) -> u64 {
        self.free_packets
    }

    pub fn pending_packets(&self) -> usize {
        self.packets.len()
    }

    pub fn locked_packets(&self) -> usize {
        self.locked_packets.len()
    }

    pub fn total_packets_sent(&self) -> u64 {
        self.total_packets_sent
    }

    pub fn total_packets_received(&self) -> u64 {
        self.total_packets_received
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(nodes_count: usize, dimension: Dimension) -> LogicalTopology {
        let participants: Vec<usize> = (0..nodes_count).collect();
        LogicalTopology::from_participants(
            LogicalTopologyKind::HyperCube,
            dimension,
            0,
            &participants,
        )
        .unwrap()
    }

    fn algorithm(
        com_type: ComType,
        nodes_count: usize,
        policy: InjectionPolicy,
    ) -> CollectiveAlgorithm {
        CollectiveAlgorithm::new(
            com_type,
            0,
            &ring(nodes_count, Dimension::Local),
            1024,
            Direction::Clockwise,
            policy,
        )
        .unwrap()
    }

    #[derive(Debug, Default)]
    struct Outcome {
        sends: u64,
        sends_at_zombie: Option<u64>,
        finished: bool,
        states: Vec<StreamState>,
    }

    /// Run one node against a loopback: every posted receive is answered at
    /// once and every released packet comes back as a `General` event.
    fn drive(algorithm: &mut CollectiveAlgorithm) -> Outcome {
        let mut stream = StreamContext::new(7, 0);
        let mut queue = VecDeque::from([EventType::StreamInit]);
        let mut outcome = Outcome::default();
        while let Some(event) = queue.pop_front() {
            if stream.state == StreamState::Dead {
                break;
            }
            for effect in algorithm.run(event, &stream).unwrap() {
                match effect {
                    Effect::ChangeState(state) => {
                        stream.state = state;
                        outcome.states.push(state);
                        if state == StreamState::Zombie {
                            outcome.sends_at_zombie = Some(outcome.sends);
                        }
                    }
                    Effect::ReleasePackets(bundle) => {
                        let released = bundle.packets.len();
                        queue.extend(std::iter::repeat(EventType::General).take(released))
                    }
                    Effect::Send(request) => {
                        assert_eq!(request.tag, 7);
                        outcome.sends += 1;
                    }
                    Effect::Recv(_) => queue.push_back(EventType::PacketReceived),
                    Effect::ProceedToNext => {
                        outcome.finished = true;
                        stream.state = StreamState::Dead;
                    }
                }
            }
        }
        outcome
    }

    #[test]
    fn test_round_table() {
        let all_reduce = algorithm(ComType::AllReduce, 8, InjectionPolicy::Normal);
        assert_eq!(all_reduce.stream_count(), 6);
        assert_eq!(all_reduce.max_count(), 7);
        assert_eq!(all_reduce.final_data_size(), 1024);
        assert_eq!(all_reduce.msg_size(), 128);

        let reduce_scatter = algorithm(ComType::ReduceScatter, 8, InjectionPolicy::Normal);
        assert_eq!(reduce_scatter.stream_count(), 3);
        assert_eq!(reduce_scatter.max_count(), 7);
        assert_eq!(reduce_scatter.final_data_size(), 128);
        assert_eq!(reduce_scatter.msg_size(), 128);

        let all_gather = algorithm(ComType::AllGather, 8, InjectionPolicy::Normal);
        assert_eq!(all_gather.stream_count(), 3);
        assert_eq!(all_gather.max_count(), 0);
        assert_eq!(all_gather.final_data_size(), 8192);
        assert_eq!(all_gather.msg_size(), 1024);

        let all_to_all = algorithm(ComType::AllToAll, 8, InjectionPolicy::Normal);
        assert_eq!(all_to_all.stream_count(), 28);
        assert_eq!(all_to_all.max_count(), 0);
        assert_eq!(all_to_all.final_data_size(), 1024);
        assert_eq!(all_to_all.msg_size(), 128);
    }

    #[test]
    fn test_parallel_reduce() {
        for nodes_count in 2..=16 {
            let aggressive = algorithm(ComType::AllToAll, nodes_count, InjectionPolicy::Aggressive);
            assert_eq!(aggressive.parallel_reduce(), nodes_count as u64 - 1);
            let normal = algorithm(ComType::AllToAll, nodes_count, InjectionPolicy::Normal);
            assert_eq!(normal.parallel_reduce(), 1);
            let all_reduce =
                algorithm(ComType::AllReduce, nodes_count, InjectionPolicy::Aggressive);
            assert_eq!(all_reduce.parallel_reduce(), 1);
        }
        let single = algorithm(ComType::AllToAll, 1, InjectionPolicy::Aggressive);
        assert_eq!(single.parallel_reduce(), 1);
    }

    #[test]
    fn test_transmission_follows_dimension() {
        let local = algorithm(ComType::AllReduce, 4, InjectionPolicy::Normal);
        assert_eq!(local.transmission(), Transmission::Fast);

        let vertical = CollectiveAlgorithm::new(
            ComType::AllReduce,
            0,
            &ring(4, Dimension::Vertical),
            1024,
            Direction::Clockwise,
            InjectionPolicy::Normal,
        )
        .unwrap();
        assert_eq!(vertical.transmission(), Transmission::Usual);
    }

    #[test]
    fn test_neighbors() {
        let clockwise = algorithm(ComType::AllReduce, 4, InjectionPolicy::Normal);
        assert_eq!((clockwise.curr_receiver(), clockwise.curr_sender()), (1, 3));

        let anticlockwise = CollectiveAlgorithm::new(
            ComType::AllReduce,
            0,
            &ring(4, Dimension::Local),
            1024,
            Direction::Anticlockwise,
            InjectionPolicy::Normal,
        )
        .unwrap();
        assert_eq!((anticlockwise.curr_receiver(), anticlockwise.curr_sender()), (3, 1));
    }

    #[test]
    fn test_all_reduce_rounds_before_zombie() {
        for nodes_count in [2, 3, 4, 8, 16] {
            let mut all_reduce =
                algorithm(ComType::AllReduce, nodes_count, InjectionPolicy::Normal);
            let rounds = 2 * (nodes_count as f64).ln().ceil() as u64;
            let outcome = drive(&mut all_reduce);
            assert_eq!(outcome.sends_at_zombie, Some(rounds), "N = {}", nodes_count);
            assert_eq!(outcome.sends, rounds);
            assert!(outcome.finished);
            assert_eq!(outcome.states, vec![StreamState::Executing, StreamState::Zombie]);
            assert_eq!(all_reduce.stream_count(), 0);
            assert_eq!(all_reduce.total_packets_sent(), rounds);
            assert_eq!(all_reduce.total_packets_received(), rounds);
        }
    }

    #[test]
    fn test_aggressive_all_to_all_completes() {
        let mut all_to_all = algorithm(ComType::AllToAll, 4, InjectionPolicy::Aggressive);
        let outcome = drive(&mut all_to_all);
        assert_eq!(outcome.sends, 6);
        assert!(outcome.finished);
        assert_eq!(all_to_all.pending_packets(), 0);
        assert_eq!(all_to_all.free_packets(), 3);
    }

    #[test]
    fn test_single_node_finishes_without_sending() {
        let mut all_reduce = algorithm(ComType::AllReduce, 1, InjectionPolicy::Normal);
        assert_eq!(all_reduce.stream_count(), 0);
        let outcome = drive(&mut all_reduce);
        assert_eq!(outcome.sends, 0);
        assert!(outcome.finished);
    }

    #[test]
    fn test_stream_init_injects_parallel_reduce_packets() {
        let mut all_to_all = algorithm(ComType::AllToAll, 5, InjectionPolicy::Aggressive);
        let effects = all_to_all
            .run(EventType::StreamInit, &StreamContext::new(1, 2))
            .unwrap();
        assert_eq!(effects.len(), 4);
        for effect in effects {
            let bundle = match effect {
                Effect::ReleasePackets(bundle) => bundle,
                other => panic!("unexpected effect {:?}", other),
            };
            assert_eq!(bundle.target, BundleTarget::MemoryAccelerator);
            assert!(!bundle.processed && !bundle.send_back);
            assert_eq!(bundle.packets.len(), 1);
            assert_eq!(bundle.packets[0].queue_id, 2);
        }
        assert_eq!(all_to_all.pending_packets(), 4);
        assert_eq!(all_to_all.zero_latency_packets(), 0);
        assert_eq!(all_to_all.non_zero_latency_packets(), 16);
    }

    #[test]
    fn test_pools_refill_with_toggle() {
        let mut all_reduce = algorithm(ComType::AllReduce, 4, InjectionPolicy::Normal);
        let stream = StreamContext::new(1, 0);
        all_reduce.run(EventType::StreamInit, &stream).unwrap();
        assert_eq!(
            (all_reduce.zero_latency_packets(), all_reduce.non_zero_latency_packets()),
            (0, 3)
        );

        let mut bundles = Vec::new();
        for _ in 0..3 {
            for effect in all_reduce.run(EventType::PacketReceived, &stream).unwrap() {
                if let Effect::ReleasePackets(bundle) = effect {
                    bundles.push(bundle);
                }
            }
        }
        assert_eq!(
            (all_reduce.zero_latency_packets(), all_reduce.non_zero_latency_packets()),
            (0, 0)
        );
        // first round has toggle set: reduced in the network
        assert!(bundles.iter().all(|b| b.processed && b.target == BundleTarget::Npu));
        assert_eq!(
            bundles.iter().map(|b| b.send_back).collect::<Vec<_>>(),
            vec![true, true, false]
        );

        let effects = all_reduce.run(EventType::PacketReceived, &stream).unwrap();
        assert_eq!(
            (all_reduce.zero_latency_packets(), all_reduce.non_zero_latency_packets()),
            (0, 3)
        );
        assert!(matches!(
            &effects[..],
            [Effect::ReleasePackets(PacketBundle { target: BundleTarget::MemoryAccelerator, .. })]
        ));

        // second round: toggle cleared, AllReduce packets are not reduced
        let effects = all_reduce.run(EventType::PacketReceived, &stream).unwrap();
        assert!(matches!(
            &effects[..],
            [Effect::ReleasePackets(PacketBundle { processed: false, .. })]
        ));
    }

    #[test]
    fn test_reduce_scatter_always_processed() {
        let mut reduce_scatter = algorithm(ComType::ReduceScatter, 4, InjectionPolicy::Normal);
        let stream = StreamContext::new(1, 0);
        reduce_scatter.run(EventType::StreamInit, &stream).unwrap();
        for _ in 0..3 {
            reduce_scatter.run(EventType::PacketReceived, &stream).unwrap();
        }
        reduce_scatter.run(EventType::PacketReceived, &stream).unwrap();
        let effects = reduce_scatter.run(EventType::PacketReceived, &stream).unwrap();
        assert!(matches!(
            &effects[..],
            [Effect::ReleasePackets(PacketBundle { processed: true, .. })]
        ));
    }

    #[test]
    fn test_ready_waits_for_free_slot() {
        let mut all_gather = algorithm(ComType::AllGather, 4, InjectionPolicy::Normal);
        let stream = StreamContext::new(3, 1);
        all_gather.run(EventType::StreamInit, &stream).unwrap();
        assert_eq!(all_gather.pending_packets(), 1);

        let effects = all_gather.run(EventType::General, &stream).unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::ChangeState(StreamState::Executing),
                Effect::Send(TransferRequest { src: 0, dst: 1, size: 1024, tag: 3, vnet: 1 }),
                Effect::Recv(TransferRequest { src: 3, dst: 0, size: 1024, tag: 3, vnet: 1 }),
            ]
        );
        assert_eq!(all_gather.free_packets(), 0);
        assert_eq!(all_gather.pending_packets(), 0);

        // nothing pending: the free slot is kept
        let executing = StreamContext {
            state: StreamState::Executing,
            ..stream
        };
        assert!(all_gather.run(EventType::General, &executing).unwrap().is_empty());
        assert_eq!(all_gather.free_packets(), 1);
    }

    #[test]
    fn test_exit_is_idempotent() {
        let mut all_reduce = algorithm(ComType::AllReduce, 4, InjectionPolicy::Normal);
        all_reduce.run(EventType::StreamInit, &StreamContext::new(1, 0)).unwrap();
        assert_eq!(all_reduce.exit(), Some(Effect::ProceedToNext));
        assert_eq!(all_reduce.pending_packets(), 0);
        assert_eq!(all_reduce.locked_packets(), 0);
        assert_eq!(all_reduce.exit(), None);
        assert!(all_reduce.has_exited());
    }

    #[test]
    fn test_inject_nothing_is_an_error() {
        let mut all_reduce = algorithm(ComType::AllReduce, 4, InjectionPolicy::Normal);
        all_reduce.parallel_reduce = 0;
        assert_eq!(
            all_reduce
                .run(EventType::PacketReceived, &StreamContext::new(9, 0))
                .unwrap_err(),
            CollectiveError::InjectNothing { id: 0, stream_id: 9 }
        );
    }

    #[test]
    fn test_all_gather_size_overflow() {
        let err = CollectiveAlgorithm::new(
            ComType::AllGather,
            0,
            &ring(8, Dimension::Local),
            1 << 62,
            Direction::Clockwise,
            InjectionPolicy::Normal,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CollectiveError::DataSizeOverflow {
                id: 0,
                data_size: 1 << 62,
                nodes_count: 8
            }
        );

        // the same size is fine when nothing is gathered
        let all_reduce = CollectiveAlgorithm::new(
            ComType::AllReduce,
            0,
            &ring(8, Dimension::Local),
            1 << 62,
            Direction::Clockwise,
            InjectionPolicy::Normal,
        )
        .unwrap();
        assert_eq!(all_reduce.msg_size(), 1 << 59);
    }

    #[test]
    fn test_unknown_node_rejected() {
        let err = CollectiveAlgorithm::new(
            ComType::AllReduce,
            9,
            &ring(4, Dimension::Local),
            1024,
            Direction::Clockwise,
            InjectionPolicy::Normal,
        )
        .unwrap_err();
        assert!(matches!(err, CollectiveError::Topology(_)));
    }
}
