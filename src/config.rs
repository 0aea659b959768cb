//! Simulation configuration.
//!
//! One YAML document describes the physical network (one entry per
//! dimension, least significant first), an optional memory-bus model and the
//! collective to run. Quantities such as bandwidth and latency may be given
//! either as bare numbers or as unit strings (`"50GBps"`, `"500ns"`).

use serde::{Deserialize, Serialize};

use crate::collective::{ComType, InjectionPolicy};
use crate::logical::{Dimension, Direction, LogicalTopologyKind};
use crate::topology::{AxisSpec, Bandwidth, Latency, TopologyBuildingBlock};
use crate::utils::units::{parse_bandwidth, parse_latency};

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub network: NetworkConfig,
    pub memory: Option<MemoryConfig>,
    pub collective: CollectiveConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: Option<String>,
    /// Seed for sampled route statistics
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub dims: Vec<DimensionConfig>,
}

/// One physical dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionConfig {
    pub topology: TopologyBuildingBlock,
    pub npus_count: usize,
    pub bandwidth: Quantity,
    pub latency: Quantity,
    /// Rings only; defaults to true
    pub bidirectional: Option<bool>,
}

/// A number or a string with a unit suffix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl Quantity {
    /// Bandwidth in GB/s
    pub fn as_bandwidth(&self) -> Result<Bandwidth, String> {
        match self {
            Quantity::Number(value) => Ok(*value),
            Quantity::Text(text) => parse_bandwidth(text),
        }
    }

    /// Latency in nanoseconds
    pub fn as_latency(&self) -> Result<Latency, String> {
        match self {
            Quantity::Number(value) => Ok(*value),
            Quantity::Text(text) => parse_latency(text),
        }
    }
}

/// Memory bus between an NPU and its memory accelerator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_fast_latency")]
    pub fast_latency: Quantity,
    #[serde(default = "default_usual_latency")]
    pub usual_latency: Quantity,
    #[serde(default = "default_memory_bandwidth")]
    pub bandwidth: Quantity,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            fast_latency: default_fast_latency(),
            usual_latency: default_usual_latency(),
            bandwidth: default_memory_bandwidth(),
        }
    }
}

fn default_fast_latency() -> Quantity {
    Quantity::Text("5ns".to_string())
}

fn default_usual_latency() -> Quantity {
    Quantity::Text("50ns".to_string())
}

fn default_memory_bandwidth() -> Quantity {
    Quantity::Text("100GBps".to_string())
}

fn default_stream_id() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectiveConfig {
    #[serde(rename = "type")]
    pub com_type: ComType,
    /// Bytes
    pub data_size: u64,
    #[serde(default)]
    pub algorithm: LogicalTopologyKind,
    #[serde(default)]
    pub injection_policy: InjectionPolicy,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub dimension: Dimension,
    #[serde(default = "default_stream_id")]
    pub stream_id: u64,
    pub layout: Option<Layout>,
}

/// Which NPUs take part in the collective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layout {
    /// Explicit ring order
    Participants { participants: Vec<usize> },
    /// Groups of `group_size` nodes, `offset` ids apart
    Strided { group_size: usize, offset: usize },
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ValidationError::InvalidGeneral(format!(
                    "unknown log level '{}'",
                    level
                )));
            }
        }

        self.validate_network()?;

        if let Some(memory) = &self.memory {
            Self::validate_memory(memory)?;
        }

        self.validate_collective()
    }

    fn validate_network(&self) -> Result<(), ValidationError> {
        if self.network.dims.is_empty() {
            return Err(ValidationError::InvalidNetwork(
                "at least one dimension is required".to_string(),
            ));
        }

        let mut total: usize = 1;
        for (i, dim) in self.network.dims.iter().enumerate() {
            total = total.checked_mul(dim.npus_count).ok_or_else(|| {
                ValidationError::InvalidNetwork(format!(
                    "dimension {}: total NPU count overflows",
                    i
                ))
            })?;
            if dim.npus_count == 0 {
                return Err(ValidationError::InvalidNetwork(format!(
                    "dimension {}: npus_count must be greater than 0",
                    i
                )));
            }
            let bandwidth = dim
                .bandwidth
                .as_bandwidth()
                .map_err(|e| ValidationError::InvalidNetwork(format!("dimension {}: {}", i, e)))?;
            if bandwidth <= 0.0 {
                return Err(ValidationError::InvalidNetwork(format!(
                    "dimension {}: bandwidth must be positive, got {}",
                    i, bandwidth
                )));
            }
            let latency = dim
                .latency
                .as_latency()
                .map_err(|e| ValidationError::InvalidNetwork(format!("dimension {}: {}", i, e)))?;
            if latency < 0.0 {
                return Err(ValidationError::InvalidNetwork(format!(
                    "dimension {}: latency cannot be negative, got {}",
                    i, latency
                )));
            }
            if dim.topology == TopologyBuildingBlock::HyperCube && !dim.npus_count.is_power_of_two()
            {
                return Err(ValidationError::InvalidNetwork(format!(
                    "dimension {}: HyperCube needs a power-of-two npus_count, got {}",
                    i, dim.npus_count
                )));
            }
            if dim.bidirectional.is_some() && dim.topology != TopologyBuildingBlock::Ring {
                log::warn!(
                    "dimension {}: bidirectional only applies to Ring, ignoring it for {}",
                    i,
                    dim.topology
                );
            }
        }

        Ok(())
    }

    fn validate_memory(memory: &MemoryConfig) -> Result<(), ValidationError> {
        for (name, latency) in [
            ("fast_latency", &memory.fast_latency),
            ("usual_latency", &memory.usual_latency),
        ] {
            let value = latency
                .as_latency()
                .map_err(|e| ValidationError::InvalidMemory(format!("{}: {}", name, e)))?;
            if value < 0.0 {
                return Err(ValidationError::InvalidMemory(format!(
                    "{} cannot be negative",
                    name
                )));
            }
        }
        let bandwidth = memory
            .bandwidth
            .as_bandwidth()
            .map_err(|e| ValidationError::InvalidMemory(format!("bandwidth: {}", e)))?;
        if bandwidth <= 0.0 {
            return Err(ValidationError::InvalidMemory(
                "bandwidth must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_collective(&self) -> Result<(), ValidationError> {
        let collective = &self.collective;
        if collective.data_size == 0 {
            return Err(ValidationError::InvalidCollective(
                "data_size must be greater than 0".to_string(),
            ));
        }

        let npus_count = self.npus_count();
        if collective.com_type == ComType::AllGather
            && collective.data_size.checked_mul(npus_count as u64).is_none()
        {
            return Err(ValidationError::InvalidCollective(format!(
                "AllGather of {} bytes over {} NPUs overflows",
                collective.data_size, npus_count
            )));
        }

        match &collective.layout {
            None => {}
            Some(Layout::Participants { participants }) => {
                crate::utils::validation::validate_participants(participants, npus_count)
                    .map_err(ValidationError::InvalidCollective)?;
            }
            Some(Layout::Strided { group_size, offset }) => {
                if *group_size == 0 || *offset == 0 {
                    return Err(ValidationError::InvalidCollective(format!(
                        "group_size and offset must be at least 1, got {} and {}",
                        group_size, offset
                    )));
                }
                let span = group_size.checked_mul(*offset).ok_or_else(|| {
                    ValidationError::InvalidCollective(format!(
                        "group_size {} times offset {} overflows",
                        group_size, offset
                    ))
                })?;
                if npus_count % span != 0 {
                    return Err(ValidationError::InvalidCollective(format!(
                        "{} NPUs cannot be split into groups of {} with offset {}",
                        npus_count, group_size, offset
                    )));
                }
            }
        }

        Ok(())
    }

    /// Total number of NPUs over all dimensions
    pub fn npus_count(&self) -> usize {
        self.network.dims.iter().map(|d| d.npus_count).product()
    }

    /// Axis descriptions for the topology factory. Call after `validate`.
    pub fn axis_specs(&self) -> Result<Vec<AxisSpec>, ValidationError> {
        self.network
            .dims
            .iter()
            .enumerate()
            .map(|(i, dim)| {
                let bandwidth = dim.bandwidth.as_bandwidth().map_err(|e| {
                    ValidationError::InvalidNetwork(format!("dimension {}: {}", i, e))
                })?;
                let latency = dim.latency.as_latency().map_err(|e| {
                    ValidationError::InvalidNetwork(format!("dimension {}: {}", i, e))
                })?;
                Ok(AxisSpec {
                    block: dim.topology,
                    npus_count: dim.npus_count,
                    bandwidth,
                    latency,
                    bidirectional: dim.bidirectional.unwrap_or(true),
                })
            })
            .collect()
    }

    /// Memory bus settings, falling back to the defaults
    pub fn memory(&self) -> MemoryConfig {
        self.memory.clone().unwrap_or_default()
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid memory configuration: {0}")]
    InvalidMemory(String),
    #[error("Invalid collective configuration: {0}")]
    InvalidCollective(String),
}
