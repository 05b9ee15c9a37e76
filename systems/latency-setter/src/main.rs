use std::{
    net::IpAddr,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use netshape::{
    Randomizer,
    latency::{
        CommandRunner, DryRunRunner, IpZoneTable, ShapingPlan, SystemRunner, ZoneLatencyMatrix,
        apply, interface_ipv4, unset_commands,
    },
};

/// Emulates inter-zone latencies on a network interface with `tc`.
#[derive(Parser, Debug)]
#[command(name = "latency-setter")]
struct Args {
    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Install one delay class per destination zone.
    Set {
        /// CSV with `Node`, `IP` and `Zone` columns.
        ip_zones_csv: PathBuf,
        /// CSV matrix of latencies from row zone to column zone, in ms.
        latency_matrix_csv: PathBuf,
        interface: String,
        /// Use this address instead of the one bound to the interface.
        #[arg(long)]
        local_ip: Option<IpAddr>,
        /// Print the commands instead of running them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove every shaping rule from the interface.
    Unset {
        interface: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Sample the delays a host would see towards every zone.
    Preview {
        ip_zones_csv: PathBuf,
        latency_matrix_csv: PathBuf,
        #[arg(long)]
        local_ip: IpAddr,
        #[arg(long, default_value_t = 5)]
        samples: usize,
        #[arg(long, default_value_t = 69)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    netshape::init_logger();

    match Args::parse().command {
        Action::Set {
            ip_zones_csv,
            latency_matrix_csv,
            interface,
            local_ip,
            dry_run,
        } => {
            let local_ip = match local_ip {
                Some(ip) => ip,
                None => interface_ipv4(&interface)?,
            };
            let plan = load_plan(&ip_zones_csv, &latency_matrix_csv, &interface, local_ip)?;

            let local = plan.local();
            for class in plan.classes() {
                for target in &class.targets {
                    println!(
                        "# Setting latency from {}/{} ({}) to {}/{} ({}): {:.2}ms +/- {:.2}ms",
                        local.node,
                        local.ip,
                        local.zone,
                        target.node,
                        target.ip,
                        class.zone,
                        class.delay.mean_ms(),
                        class.delay.jitter_ms(),
                    );
                }
            }

            run(&plan.commands(), dry_run)
        }
        Action::Unset { interface, dry_run } => run(&unset_commands(&interface), dry_run),
        Action::Preview {
            ip_zones_csv,
            latency_matrix_csv,
            local_ip,
            samples,
            seed,
        } => {
            let plan = load_plan(&ip_zones_csv, &latency_matrix_csv, "preview", local_ip)?;
            let mut randomizer = Randomizer::new(seed);
            for class in plan.classes() {
                let sampled: Vec<String> = (0..samples)
                    .map(|_| format!("{:.2}", class.delay.sample(&mut randomizer)))
                    .collect();
                println!(
                    "{} -> {}: {:.2}ms +/- {:.2}ms, samples [{}]",
                    plan.local().zone,
                    class.zone,
                    class.delay.mean_ms(),
                    class.delay.jitter_ms(),
                    sampled.join(", "),
                );
            }
            Ok(())
        }
    }
}

fn load_plan(
    ip_zones_csv: &Path,
    latency_matrix_csv: &Path,
    interface: &str,
    local_ip: IpAddr,
) -> Result<ShapingPlan> {
    let table = IpZoneTable::from_path(ip_zones_csv)?;
    let matrix = ZoneLatencyMatrix::from_path(latency_matrix_csv)?;
    info!(
        "Loaded {} hosts and {} zones",
        table.len(),
        matrix.zones().len()
    );
    Ok(ShapingPlan::build(interface, local_ip, &table, &matrix)?)
}

fn run(commands: &[netshape::latency::TcCommand], dry_run: bool) -> Result<()> {
    let mut dry_runner = DryRunRunner::default();
    let mut system_runner = SystemRunner;
    let runner: &mut dyn CommandRunner = if dry_run {
        &mut dry_runner
    } else {
        &mut system_runner
    };

    apply(commands, runner)?;

    for command in dry_runner.executed() {
        println!("{command}");
    }
    Ok(())
}
