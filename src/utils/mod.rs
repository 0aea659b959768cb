//! Shared utilities: unit parsing and formatting, validation.

pub mod units;
pub mod validation;

pub use units::{format_gbps, format_ms, format_ns, parse_bandwidth, parse_latency};
pub use validation::{validate_endpoints, validate_participants};
