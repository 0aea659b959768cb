//! Collective communication algorithms.

pub mod algorithm;
pub mod types;

pub use algorithm::CollectiveAlgorithm;
pub use types::{
    BundleTarget, CollectiveError, ComType, Effect, EventType, InjectionPolicy, Packet,
    PacketBundle, StreamContext, StreamState, TransferRequest, Transmission,
};
