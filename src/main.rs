use std::time::Instant;

use clap::Parser;
use itertools::iproduct;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use traffic_net::math::{Point2d, Vector2d};
use traffic_net::{MapModule, Simulation, SimulationAttributes, Topology};

#[derive(Parser)]
#[command(name = "traffic-net")]
#[command(about = "Runs a demo road grid without a user interface")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "6000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f64,

    /// Seed for vehicle generation
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Vehicles generated per site per second
    #[arg(long, default_value = "0.05")]
    frequency: f64,

    /// Number of junctions along each side of the grid
    #[arg(long, default_value = "3")]
    size: usize,

    /// Simulated seconds between progress reports
    #[arg(long, default_value = "60")]
    report: f64,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    assert!(cli.delta > 0.0, "Time delta must be positive");

    let sim = build_grid(cli.size, cli.frequency);
    println!(
        "Grid of {} nodes, {} edges and {} sites",
        sim.topology().node_count(),
        sim.topology().edge_count(),
        sim.iter_sites().count()
    );
    if let Some(bounds) = sim.map_bounds() {
        println!("Covering {:.0} m x {:.0} m", bounds.width(), bounds.height());
    }

    run_headless(sim, &cli);
}

/// Builds a square grid of four-way junctions, with a site at the end of every outer arm.
fn build_grid(size: usize, frequency: f64) -> Simulation {
    let attribs = SimulationAttributes {
        frequency,
        ..Default::default()
    };
    let mut sim = Simulation::new(Topology::new(), attribs);
    let junction = MapModule::cross(100.0, sim.default_speed_limit());
    for (x, y) in iproduct!(0..size, 0..size) {
        let anchor = Point2d::new(200.0 * x as f64, 200.0 * y as f64);
        sim = sim.add_module(&junction, anchor, Vector2d::new(1.0, 0.0));
    }

    // Arms that did not join a neighbouring junction lead nowhere else
    let ends = sim
        .iter_nodes()
        .map(|n| n.id())
        .filter(|id| sim.topology().incident_edges(*id).count() == 2)
        .collect::<Vec<_>>();
    for id in ends {
        sim = sim.change_node(id);
    }

    // The joins between junctions are plain chains
    sim.optimize(sim.default_speed_limit())
}

/// Runs the simulation and prints throughput and trip statistics.
fn run_headless(mut sim: Simulation, cli: &Cli) {
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let start = Instant::now();
    let mut next_report = cli.report;

    for _ in 0..cli.ticks {
        sim.step(&mut rng, cli.delta);
        if sim.time() >= next_report {
            next_report += cli.report;
            let stats = sim.stats();
            let busiest = sim
                .edge_traffic()
                .into_iter()
                .map(|t| t.congestion)
                .fold(0.0, f64::max);
            println!(
                "t={:>7.1}s  vehicles={:>4}  generated={:>5}  completed={:>5}  abandoned={:>3}  max congestion={:.2}",
                sim.time(),
                sim.vehicle_count(),
                stats.generated,
                stats.completed,
                stats.abandoned,
                busiest,
            );
        }
    }

    let elapsed = start.elapsed();
    info!("ran {} ticks in {:?}", cli.ticks, elapsed);
    println!();
    println!(
        "Simulated {:.0} s in {:.2} s ({:.0}x real time)",
        sim.time(),
        elapsed.as_secs_f64(),
        sim.time() / elapsed.as_secs_f64().max(1e-9)
    );
    match sim.stats().mean_trip_time() {
        Some(mean) => println!("Mean round trip: {:.1} s", mean),
        None => println!("No vehicle completed a round trip"),
    }
}
