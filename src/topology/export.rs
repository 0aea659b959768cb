//! ns-3 topology export.
//!
//! Layout of the generated file:
//! ```text
//! <devices> <switches> <links>
//! <switch ids, space separated>
//! <src> <dst> <rate>Gbps <delay>ms 0
//! ...
//! ```
//! ns-3 links are full duplex, so a pair of opposite directed links with the
//! same parameters is written once.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::builder::Topology;
use crate::utils::units::{format_gbps, format_ms};

/// Render the physical topology in ns-3 text format
pub fn to_ns3(topology: &Topology) -> String {
    let links = topology.links();
    let mut lines = Vec::new();
    for (src, dst, link) in links.iter_links() {
        if let Some(reverse) = links.link(dst, src) {
            if dst < src && reverse == link {
                continue;
            }
        }
        lines.push(format!(
            "{} {} {} {} 0",
            src,
            dst,
            format_gbps(link.bandwidth),
            format_ms(link.latency)
        ));
    }

    let switch_ids = topology.switch_ids();
    let mut output = String::new();
    output.push_str(&format!(
        "{} {} {}\n",
        topology.devices_count(),
        switch_ids.len(),
        lines.len()
    ));
    output.push_str(
        &switch_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(" "),
    );
    output.push('\n');
    for line in lines {
        output.push_str(&line);
        output.push('\n');
    }
    output
}

/// Write the ns-3 topology file
pub fn write_ns3(topology: &Topology, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, to_ns3(topology))
        .with_context(|| format!("Failed to write ns-3 topology to {}", path.display()))?;
    log::info!("Wrote ns-3 topology ({}) to {}", topology.describe(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::builder::construct_topology;
    use crate::topology::types::{AxisSpec, TopologyBuildingBlock};

    fn spec(block: TopologyBuildingBlock, npus_count: usize, bidirectional: bool) -> AxisSpec {
        AxisSpec {
            block,
            npus_count,
            bandwidth: 3.125,
            latency: 5000.0,
            bidirectional,
        }
    }

    #[test]
    fn test_unidirectional_ring() {
        let topology =
            construct_topology(&[spec(TopologyBuildingBlock::Ring, 4, false)]).unwrap();
        let expected = "4 0 4\n\n\
                        0 1 25Gbps 0.005ms 0\n\
                        1 2 25Gbps 0.005ms 0\n\
                        2 3 25Gbps 0.005ms 0\n\
                        3 0 25Gbps 0.005ms 0\n";
        assert_eq!(to_ns3(&topology), expected);
    }

    #[test]
    fn test_full_duplex_pairs_written_once() {
        let topology = construct_topology(&[spec(TopologyBuildingBlock::Switch, 3, true)]).unwrap();
        let output = to_ns3(&topology);
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("4 1 3"));
        assert_eq!(lines.next(), Some("3"));
        assert_eq!(lines.next(), Some("0 3 25Gbps 0.005ms 0"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_write_ns3() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topo").join("ring.txt");
        let topology = construct_topology(&[spec(TopologyBuildingBlock::Ring, 8, true)]).unwrap();
        write_ns3(&topology, &path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("8 0 8\n"));
    }
}
