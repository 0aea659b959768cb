//! Command-line entry point for the collective communication simulator.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use env_logger::Env;
use log::info;

use collsim::analysis::{self, routing};
use collsim::config::Config;
use collsim::config_loader;
use collsim::sim::Simulation;
use collsim::topology::{construct_topology, export, Topology};
use collsim::utils::validation::validate_endpoints;

/// Packet-level simulator for collective communication
#[derive(Parser, Debug)]
#[command(name = "collsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the simulation configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the configured collective and write reports
    Simulate {
        /// Output directory for reports
        #[arg(short, long, default_value = "collsim_output")]
        output: PathBuf,

        /// Also write the full event trace
        #[arg(long)]
        trace: bool,
    },

    /// Print the route between two NPUs
    Route {
        #[arg(long)]
        src: usize,

        #[arg(long)]
        dst: usize,
    },

    /// Hop-count statistics over NPU pairs
    Stats {
        /// Sample this many random pairs instead of all pairs
        #[arg(long)]
        samples: Option<usize>,
    },

    /// Write the physical topology as an ns-3 topology file
    ExportNs3 {
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| peek_log_level(&cli.config))
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = config_loader::load_config(&cli.config)
        .wrap_err_with(|| format!("Invalid configuration {}", cli.config.display()))?;

    match cli.command {
        Commands::Simulate { output, trace } => {
            run_simulation(&config, &cli.config, &output, trace)
        }
        Commands::Route { src, dst } => print_route(&config, src, dst),
        Commands::Stats { samples } => print_stats(&config, samples),
        Commands::ExportNs3 { output } => {
            let topology = build_topology(&config)?;
            export::write_ns3(&topology, &output)?;
            println!(
                "Wrote {} ({} devices, {} links) to {}",
                topology.describe(),
                topology.devices_count(),
                topology.links().links_count(),
                output.display()
            );
            Ok(())
        }
    }
}

/// Log level from the config file, read before the logger exists
fn peek_log_level(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let value: serde_yaml::Value = serde_yaml::from_str(&content).ok()?;
    value
        .get("general")?
        .get("log_level")?
        .as_str()
        .map(str::to_string)
}

fn build_topology(config: &Config) -> Result<Topology> {
    let topology = construct_topology(&config.axis_specs()?)
        .wrap_err("Failed to build the physical topology")?;
    info!(
        "Built {} with {} NPUs and {} devices",
        topology.describe(),
        topology.npus_count(),
        topology.devices_count()
    );
    Ok(topology)
}

fn run_simulation(config: &Config, config_path: &Path, output: &Path, trace: bool) -> Result<()> {
    let mut simulation = Simulation::from_config(config).wrap_err_with(|| {
        format!(
            "Failed to set up {} on {} NPUs",
            config.collective.com_type,
            config.npus_count()
        )
    })?;
    if trace {
        simulation = simulation.with_trace();
    }
    let topology = simulation.topology().clone();
    let result = simulation.run().wrap_err("Simulation failed")?;

    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    let report = analysis::build_report(result, &topology, config_path);
    analysis::generate_json_report(&report, &output.join("report.json"))?;
    analysis::generate_text_report(&report, &output.join("report.txt"))?;
    if trace {
        analysis::generate_trace(&report.result, &output.join("trace.json"))?;
    }

    analysis::print_summary(&report);
    Ok(())
}

fn print_route(config: &Config, src: usize, dst: usize) -> Result<()> {
    let topology = build_topology(config)?;
    validate_endpoints(src, dst, topology.npus_count()).map_err(|e| eyre!(e))?;

    let route = topology
        .route(src, dst)
        .wrap_err_with(|| format!("No route from {} to {}", src, dst))?;
    let path: Vec<String> = route.iter().map(|d| d.to_string()).collect();
    println!("Route: {}", path.join(" -> "));
    println!("Hops: {}", topology.hop_count(src, dst)?);
    Ok(())
}

fn print_stats(config: &Config, samples: Option<usize>) -> Result<()> {
    let topology = build_topology(config)?;
    let stats = match samples {
        Some(samples) => {
            let seed = config.general.seed.unwrap_or(0);
            routing::sampled_stats(&topology, samples, seed)?
        }
        None => routing::all_pairs_stats(&topology)?,
    };
    analysis::print_route_stats(&stats);
    Ok(())
}
