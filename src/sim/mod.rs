//! Reference discrete-event driver.
//!
//! Stands in for the scheduler, the memory bus and the network backend so a
//! collective can be run end to end and timed.

pub mod engine;
pub mod transport;
pub mod types;

pub use engine::{build_logical_topologies, Simulation};
pub use transport::{MemoryBus, Network};
pub use types::{
    NodeResult, ScheduledEvent, SimEvent, SimTime, SimulationError, SimulationResult, TraceKind,
    TraceRecord, TransferKey,
};
