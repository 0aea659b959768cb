//! Core data types for route statistics and simulation reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sim::SimulationResult;

/// How the NPU pairs were chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairSelection {
    AllPairs,
    Sampled { samples: usize, seed: u64 },
}

/// Hop-count statistics over a set of NPU pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub topology: String,
    pub npus_count: usize,
    pub selection: PairSelection,
    pub pairs: usize,
    pub min_hops: usize,
    pub max_hops: usize,
    pub mean_hops: f64,
    /// hop count -> number of pairs
    pub histogram: BTreeMap<usize, usize>,
}

/// Metadata about the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub config_path: String,
    pub topology: String,
    pub npus_count: usize,
    pub devices_count: usize,
}

/// Everything written by `simulate`
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub metadata: ReportMetadata,
    pub result: SimulationResult,
    pub summary: SimulationSummary,
}

/// Aggregates over all participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub completion_time_ns: u64,
    pub first_finish_ns: u64,
    pub mean_finish_ns: f64,
    pub total_packets_sent: u64,
    pub total_bytes_sent: u64,
    /// Bytes per nanosecond, i.e. GB/s, over the whole collective
    pub effective_bandwidth: f64,
}

impl SimulationSummary {
    pub fn from_result(result: &SimulationResult) -> Self {
        let finishes: Vec<u64> = result.nodes.iter().map(|n| n.finish_time_ns).collect();
        let mean_finish_ns = if finishes.is_empty() {
            0.0
        } else {
            finishes.iter().sum::<u64>() as f64 / finishes.len() as f64
        };
        let total_bytes_sent = result.total_bytes_sent();
        let effective_bandwidth = if result.completion_time_ns > 0 {
            total_bytes_sent as f64 / result.completion_time_ns as f64
        } else {
            0.0
        };

        Self {
            completion_time_ns: result.completion_time_ns,
            first_finish_ns: finishes.iter().copied().min().unwrap_or(0),
            mean_finish_ns,
            total_packets_sent: result.total_packets_sent(),
            total_bytes_sent,
            effective_bandwidth,
        }
    }
}
