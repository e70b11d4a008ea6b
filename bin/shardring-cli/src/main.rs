//! Shardring CLI - Ring driver and inspection tool
//!
//! This binary builds an in-process shard ring and exercises it: the
//! reference add/lookup/remove scenario, load simulations and lookups.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shardring_common::{Config, MachineId, MachineLoad, RingStats};
use shardring_placement::{ShardRing, SharedRing};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "shardring-cli")]
#[command(about = "Shardring micro-shard ring driver")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "SHARDRING_CONFIG")]
    config: Option<String>,

    /// Number of positions on the ring (N)
    #[arg(short = 'n', long)]
    domain_size: Option<u64>,

    /// Micro-shards per machine (k)
    #[arg(short = 'k', long)]
    shards_per_machine: Option<u64>,

    /// Seed for reproducible placement and sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add machines, look up random hash codes, remove and re-add them
    Demo {
        /// Number of machines to add
        #[arg(short, long, default_value = "4")]
        machines: u64,
        /// Number of random lookups
        #[arg(short, long, default_value = "19")]
        lookups: usize,
    },
    /// Measure how evenly random hash codes spread across machines
    Simulate {
        /// Number of machines to add
        #[arg(short, long, default_value = "10")]
        machines: u64,
        /// Number of random hash codes to resolve
        #[arg(short, long, default_value = "10000")]
        samples: usize,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve specific hash codes against a freshly built ring
    Lookup {
        /// Number of machines to add first
        #[arg(short, long, default_value = "3")]
        machines: u64,
        /// Hash codes to resolve
        #[arg(required = true)]
        hash_codes: Vec<u64>,
    },
}

/// Outcome of a load simulation
#[derive(Debug, Serialize)]
struct SimulationReport {
    ring: RingStats,
    samples: usize,
    machines: Vec<MachineReport>,
}

#[derive(Debug, Serialize)]
struct MachineReport {
    #[serde(flatten)]
    load: MachineLoad,
    share: f64,
    hits: usize,
}

/// Read the config file (if any) and apply command line overrides
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_config_file(Path::new(path))?,
        None => Config::default(),
    };

    if let Some(domain_size) = args.domain_size {
        config.ring.domain_size = domain_size;
    }
    if let Some(shards) = args.shards_per_machine {
        config.ring.shards_per_machine = shards;
    }
    if args.seed.is_some() {
        config.ring.seed = args.seed;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }

    config.validate()?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Sampling RNG, derived from the placement seed so runs are repeatable
fn sampler(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, |s| {
        StdRng::seed_from_u64(s.wrapping_add(1))
    })
}

fn add_machines(ring: &SharedRing, count: u64) -> BTreeMap<MachineId, Vec<u64>> {
    let mut placed = BTreeMap::new();
    for raw in 1..=count {
        let machine_id = MachineId::new(raw);
        let shards = ring.add_machine(machine_id);
        if shards.is_empty() {
            info!(%machine_id, "ring is full, stopping");
            break;
        }
        placed.insert(machine_id, shards);
    }
    placed
}

fn format_shards(shards: &[u64]) -> String {
    shards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn run_demo(config: &Config, machines: u64, lookups: usize) -> Result<()> {
    let ring = SharedRing::from_config(&config.ring)?;
    let mut rng = sampler(config.ring.seed);

    for (machine_id, shards) in add_machines(&ring, machines) {
        println!("machine {machine_id} shards [{}]", format_shards(&shards));
    }

    let domain_size = ring.domain_size();
    for _ in 0..lookups {
        let hash_code = rng.gen_range(0..domain_size);
        match ring.machine_for(hash_code) {
            Some(machine_id) => println!("hash code {hash_code} machine id {machine_id}"),
            None => println!("hash code {hash_code} machine id none"),
        }
    }

    let ids = ring.machines();
    for &machine_id in &ids {
        let freed = ring.remove_machine(machine_id);
        debug!(%machine_id, freed = freed.len(), "removed machine");
    }
    println!("removed {} machines, ring empty: {}", ids.len(), ring.snapshot().shards == 0);

    for machine_id in ids {
        let shards = ring.add_machine(machine_id);
        println!("machine {machine_id} shards [{}]", format_shards(&shards));
    }

    Ok(())
}

fn simulate(config: &Config, machines: u64, samples: usize) -> Result<SimulationReport> {
    let ring = SharedRing::from_config(&config.ring)?;
    let mut rng = sampler(config.ring.seed);
    add_machines(&ring, machines);

    let domain_size = ring.domain_size();
    let mut hits: BTreeMap<MachineId, usize> = BTreeMap::new();
    for _ in 0..samples {
        if let Some(machine_id) = ring.machine_for(rng.gen_range(0..domain_size)) {
            *hits.entry(machine_id).or_default() += 1;
        }
    }

    let machines = ring
        .load()
        .into_iter()
        .map(|load| MachineReport {
            share: load.share(domain_size),
            hits: hits.get(&load.machine_id).copied().unwrap_or(0),
            load,
        })
        .collect();

    Ok(SimulationReport {
        ring: ring.snapshot(),
        samples,
        machines,
    })
}

fn print_report(report: &SimulationReport) {
    println!("Ring");
    println!("====");
    println!("Domain size:        {}", report.ring.domain_size);
    println!("Shards per machine: {}", report.ring.shards_per_machine);
    println!("Machines:           {}", report.ring.machines);
    println!("Free positions:     {}", report.ring.available);
    println!("Machine headroom:   {}", report.ring.machine_headroom());
    println!();
    println!("{:<10} {:>8} {:>10} {:>8} {:>10}", "MACHINE", "SHARDS", "OWNED", "SHARE", "HITS");
    for m in &report.machines {
        println!(
            "{:<10} {:>8} {:>10} {:>7.2}% {:>10}",
            m.load.machine_id.to_string(),
            m.load.shards,
            m.load.owned,
            m.share * 100.0,
            m.hits
        );
    }
}

fn lookup(config: &Config, machines: u64, hash_codes: &[u64]) -> Result<()> {
    let mut ring = ShardRing::from_config(&config.ring)?;
    for raw in 1..=machines {
        let machine_id = MachineId::new(raw);
        let shards = ring
            .try_add_machine(machine_id)
            .with_context(|| format!("failed to add machine {machine_id}"))?;
        println!("machine {machine_id} shards [{}]", format_shards(&shards));
    }

    for &hash_code in hash_codes {
        match ring.try_machine_for(hash_code)? {
            Some(machine_id) => println!("{hash_code} -> {machine_id}"),
            None => println!("{hash_code} -> none"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let config = resolve_config(&args)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        domain_size = config.ring.domain_size,
        shards_per_machine = config.ring.shards_per_machine,
        seed = ?config.ring.seed,
        "ring configured"
    );

    match args.command {
        Commands::Demo { machines, lookups } => run_demo(&config, machines, lookups)?,
        Commands::Simulate {
            machines,
            samples,
            json,
        } => {
            let report = simulate(&config, machines, samples)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Lookup {
            machines,
            hash_codes,
        } => lookup(&config, machines, &hash_codes)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["shardring-cli"];
        argv.extend_from_slice(extra);
        argv.push("demo");
        Args::parse_from(argv)
    }

    #[test]
    fn test_resolve_config_defaults() {
        let config = resolve_config(&args(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_resolve_config_overrides() {
        let config = resolve_config(&args(&["-n", "1000", "-k", "8", "--seed", "5"])).unwrap();
        assert_eq!(config.ring.domain_size, 1000);
        assert_eq!(config.ring.shards_per_machine, 8);
        assert_eq!(config.ring.seed, Some(5));
    }

    #[test]
    fn test_resolve_config_rejects_invalid_shape() {
        assert!(resolve_config(&args(&["-n", "4", "-k", "5"])).is_err());
    }

    #[test]
    fn test_simulate_covers_every_sample() {
        let mut config = Config::default();
        config.ring.domain_size = 500;
        config.ring.shards_per_machine = 5;
        config.ring.seed = Some(9);

        let report = simulate(&config, 6, 2_000).unwrap();

        assert_eq!(report.ring.machines, 6);
        assert_eq!(report.machines.len(), 6);
        assert_eq!(report.machines.iter().map(|m| m.hits).sum::<usize>(), 2_000);
        assert_eq!(report.machines.iter().map(|m| m.load.owned).sum::<u64>(), 500);
    }

    #[test]
    fn test_simulate_stops_when_ring_full() {
        let mut config = Config::default();
        config.ring.domain_size = 10;
        config.ring.shards_per_machine = 3;
        config.ring.seed = Some(1);

        let report = simulate(&config, 5, 10).unwrap();
        assert_eq!(report.ring.machines, 3);
        assert_eq!(report.ring.available, 1);
        assert_eq!(report.ring.machine_headroom(), 0);
    }

    #[test]
    fn test_simulate_reports_headroom() {
        let mut config = Config::default();
        config.ring.domain_size = 100;
        config.ring.shards_per_machine = 3;
        config.ring.seed = Some(2);

        let report = simulate(&config, 4, 10).unwrap();
        assert_eq!(report.ring.available, 88);
        assert_eq!(report.ring.machine_headroom(), 29);
    }

    #[test]
    fn test_report_serializes_flat() {
        let mut config = Config::default();
        config.ring.seed = Some(3);
        let report = simulate(&config, 2, 10).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ring"]["domain_size"], 100);
        assert!(json["machines"][0]["machine_id"].is_u64());
        assert!(json["machines"][0]["owned"].is_u64());
    }

    #[test]
    fn test_lookup_rejects_out_of_range() {
        let config = Config::default();
        assert!(lookup(&config, 1, &[100]).is_err());
    }
}
