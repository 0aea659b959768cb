//! Validation helpers shared by the configuration and the CLI.
//!
//! These return plain `String` errors; callers wrap them into their own
//! error types.

use std::collections::HashSet;

/// Validate an explicit participant list
///
/// Checks for:
/// - A non-empty list
/// - Ids within the NPU range
/// - Duplicate ids
///
/// # Arguments
/// * `participants` - NPU ids in ring order
/// * `npus_count` - Number of NPUs in the physical topology
///
/// # Returns
/// * `Ok(())` if validation succeeds
/// * `Err(String)` with an error message if validation fails
///
/// # Examples
/// ```
/// use collsim::utils::validation::validate_participants;
///
/// assert!(validate_participants(&[0, 2, 4, 6], 8).is_ok());
/// assert!(validate_participants(&[0, 0], 8).is_err());
/// ```
pub fn validate_participants(participants: &[usize], npus_count: usize) -> Result<(), String> {
    if participants.is_empty() {
        return Err("participant list cannot be empty".to_string());
    }

    let mut seen = HashSet::with_capacity(participants.len());
    for &npu in participants {
        if npu >= npus_count {
            return Err(format!(
                "participant {} is out of range (topology has {} NPUs)",
                npu, npus_count
            ));
        }
        if !seen.insert(npu) {
            return Err(format!("participant {} is listed more than once", npu));
        }
    }

    Ok(())
}

/// Validate a source/destination pair for a route query
///
/// # Arguments
/// * `src` - Source NPU id
/// * `dst` - Destination NPU id
/// * `npus_count` - Number of NPUs in the physical topology
pub fn validate_endpoints(src: usize, dst: usize, npus_count: usize) -> Result<(), String> {
    for (name, id) in [("source", src), ("destination", dst)] {
        if id >= npus_count {
            return Err(format!(
                "{} {} is out of range (topology has {} NPUs)",
                name, id, npus_count
            ));
        }
    }
    if src == dst {
        return Err(format!("source and destination are both {}", src));
    }
    Ok(())
}
