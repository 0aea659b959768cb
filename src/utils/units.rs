//! Bandwidth and latency unit handling.
//!
//! Internally bandwidth is GB/s (which is also bytes per ns) and latency is
//! ns. Configuration strings may carry a unit suffix.

use std::sync::LazyLock;

use regex::Regex;

/// Compiled patterns for quantity strings
pub struct UnitPatterns {
    /// Match: "50", "50GBps", "12.5 Gbps", "800MBps"
    pub bandwidth: Regex,
    /// Match: "500", "500ns", "1.5 us", "0.005ms", "1s"
    pub latency: Regex,
}

impl UnitPatterns {
    pub fn new() -> Self {
        Self {
            bandwidth: Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(GBps|GB/s|Gbps|MBps|MB/s|Mbps)?\s*$")
                .expect("Invalid bandwidth regex"),
            latency: Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(ns|us|ms|s)?\s*$")
                .expect("Invalid latency regex"),
        }
    }
}

impl Default for UnitPatterns {
    fn default() -> Self {
        Self::new()
    }
}

pub static UNIT_PATTERNS: LazyLock<UnitPatterns> = LazyLock::new(UnitPatterns::new);

/// Parse a bandwidth string into GB/s.
///
/// Supported suffixes:
/// - Gigabytes per second: "GBps", "GB/s" (also the default)
/// - Gigabits per second: "Gbps"
/// - Megabytes per second: "MBps", "MB/s"
/// - Megabits per second: "Mbps"
///
/// # Examples
/// ```
/// use collsim::utils::units::parse_bandwidth;
///
/// assert_eq!(parse_bandwidth("50"), Ok(50.0));
/// assert_eq!(parse_bandwidth("400Gbps"), Ok(50.0));
/// assert!(parse_bandwidth("fast").is_err());
/// ```
pub fn parse_bandwidth(value: &str) -> Result<f64, String> {
    let caps = UNIT_PATTERNS
        .bandwidth
        .captures(value)
        .ok_or_else(|| format!("Invalid bandwidth format: {}", value))?;
    let number: f64 = caps[1]
        .parse()
        .map_err(|e| format!("Invalid bandwidth number in '{}': {}", value, e))?;
    let divisor = match caps.get(2).map(|m| m.as_str()) {
        None | Some("GBps") | Some("GB/s") => 1.0,
        Some("Gbps") => 8.0,
        Some("MBps") | Some("MB/s") => 1e3,
        Some("Mbps") => 8e3,
        Some(other) => return Err(format!("Unknown bandwidth unit: {}", other)),
    };
    Ok(number / divisor)
}

/// Parse a latency string into ns.
///
/// A bare number is taken as ns; "us", "ms" and "s" suffixes are scaled.
///
/// # Examples
/// ```
/// use collsim::utils::units::parse_latency;
///
/// assert_eq!(parse_latency("500"), Ok(500.0));
/// assert_eq!(parse_latency("2us"), Ok(2000.0));
/// ```
pub fn parse_latency(value: &str) -> Result<f64, String> {
    let caps = UNIT_PATTERNS
        .latency
        .captures(value)
        .ok_or_else(|| format!("Invalid latency format: {}", value))?;
    let number: f64 = caps[1]
        .parse()
        .map_err(|e| format!("Invalid latency number in '{}': {}", value, e))?;
    let scale = match caps.get(2).map(|m| m.as_str()) {
        None | Some("ns") => 1.0,
        Some("us") => 1e3,
        Some("ms") => 1e6,
        Some("s") => 1e9,
        Some(other) => return Err(format!("Unknown latency unit: {}", other)),
    };
    Ok(number * scale)
}

/// GB/s rendered as an ns-3 data rate, e.g. `400Gbps`
pub fn format_gbps(bandwidth: f64) -> String {
    format!("{}Gbps", trim_float(bandwidth * 8.0))
}

/// ns rendered as an ns-3 delay, e.g. `0.005ms`
pub fn format_ms(latency: f64) -> String {
    format!("{}ms", trim_float(latency / 1e6))
}

/// Human-readable duration from ns
pub fn format_ns(ns: u64) -> String {
    match ns {
        0..=9_999 => format!("{} ns", ns),
        10_000..=9_999_999 => format!("{:.2} us", ns as f64 / 1e3),
        10_000_000..=9_999_999_999 => format!("{:.2} ms", ns as f64 / 1e6),
        _ => format!("{:.3} s", ns as f64 / 1e9),
    }
}

fn trim_float(value: f64) -> String {
    let text = format!("{:.9}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
