//! Route statistics and simulation reports.
//!
//! This module turns topologies and simulation results into hop-count
//! statistics and JSON/text reports.

pub mod types;
pub mod routing;
pub mod report;

pub use types::*;
pub use routing::{all_pairs_stats, sampled_stats};
pub use report::{
    build_report, generate_json_report, generate_text_report, generate_trace, print_route_stats,
    print_summary, render_text_report,
};
