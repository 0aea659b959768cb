//! # CollSim - Packet-level simulator for collective communication
//!
//! This library simulates collective communication primitives (AllReduce,
//! AllGather, ReduceScatter, AllToAll) as used by distributed training jobs,
//! over a configurable interconnect, to estimate completion time and
//! packet-level behavior without real hardware.
//!
//! ## Overview
//!
//! Two subsystems do the real work. The topology engine builds physical
//! shapes (ring, mesh, hypercube, binary tree, double binary tree,
//! fully-connected, switch), stacks them into multi-dimensional topologies,
//! and answers routing and hop-count queries. The collective state machine
//! drives one node's part of a collective as an event-driven process of
//! packet injection, release and reduction over a logical ring of
//! participants.
//!
//! A small discrete-event driver ties both together so a whole collective can
//! be run end to end and timed.
//!
//! ## Architecture
//!
//! - `topology`: physical building blocks, multi-dimensional composite,
//!   address translation, link graph and ns-3 export
//! - `logical`: participant ordering and neighbor lookup for one collective
//! - `collective`: per-node collective state machine and its effects
//! - `sim`: event queue, memory bus and network timing, transfer matching
//! - `analysis`: route statistics and simulation reports
//! - `config` / `config_loader`: YAML configuration and validation
//! - `utils`: unit parsing and formatting, validation helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use collsim::{config_loader, sim::Simulation};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("configs/ring_allreduce.yaml"))?;
//! let result = Simulation::from_config(&config)?.run()?;
//! println!("finished after {} ns", result.completion_time_ns);
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! network:
//!   dims:
//!     - topology: Ring
//!       npus_count: 8
//!       bandwidth: "50GBps"
//!       latency: "500ns"
//! collective:
//!   type: AllReduce
//!   data_size: 1048576
//! ```
//!
//! ## Error Handling
//!
//! Each subsystem has its own `thiserror` enum; the binary reports them
//! through `color_eyre` with context.

pub mod analysis;
pub mod collective;
pub mod config;
pub mod config_loader;
pub mod logical;
pub mod sim;
pub mod topology;
pub mod utils;
