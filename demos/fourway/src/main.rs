//! fourway — one intersection, three control policies, the same traffic.
//!
//! Runs an identical seeded stream of vehicles through the classic four-way
//! single-lane intersection under the autonomous scheduler, the fixed signal
//! plan, and the all-way stop, then prints a per-vehicle wait table.  The
//! light run takes roughly one signal cycle of wall time; a renderer would
//! poll the same `Controller::snapshot` rows this demo prints counts from.

mod network;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use xing_control::{AutoPolicy, ControlPolicy, Controller, LightPolicy, StopPolicy};
use xing_core::{ControlConfig, NodeId, VehicleId};
use xing_topology::{Intersection, LaneKind};
use xing_vehicle::{SpeedAdvice, Vehicle};

use network::{four_way, light_phases};

// ── Constants ─────────────────────────────────────────────────────────────────

const VEHICLE_COUNT: usize    = 12;
const SEED:          u64      = 42;
const SPEED_LIMIT:   f64      = 10.0;
const TICK:          Duration = Duration::from_millis(25);
const SPAWN_GAP:     Duration = Duration::from_millis(60);
const REPORT_EVERY:  Duration = Duration::from_millis(500);
const RUN_DEADLINE:  Duration = Duration::from_secs(90);

// ── One policy run ────────────────────────────────────────────────────────────

/// Drive the full demand through one controller; returns the exited vehicles
/// in id order.
fn run_policy<P: ControlPolicy>(
    label:        &str,
    policy:       P,
    intersection: Arc<Intersection>,
    trips:        &[(NodeId, NodeId)],
) -> Result<Vec<Vehicle>> {
    let mut controller =
        Controller::new(intersection, policy, ControlConfig::with_tick_interval(TICK));
    controller.start().context("starting controller")?;
    info!(policy = label, vehicles = trips.len(), "run started");

    for (n, &(source, destination)) in trips.iter().enumerate() {
        let mut vehicle = Vehicle::new(VehicleId(n as u64 + 1), source, destination, SPEED_LIMIT);
        // The spawner flags left-turners with a slow-down advisory, as a
        // renderer or driver model would; controlled motion ignores it.
        let kind = controller
            .intersection()
            .lane_between(source, destination)
            .and_then(|id| controller.intersection().lane(id))
            .map(|lane| lane.kind);
        if kind == Some(LaneKind::Left) {
            vehicle.advise(SpeedAdvice::SlowDown);
        }
        controller.submit(vehicle).context("submitting vehicle")?;
        thread::sleep(SPAWN_GAP);
    }

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut exited: Vec<Vehicle> = Vec::with_capacity(trips.len());
    while exited.len() < trips.len() {
        if started.elapsed() > RUN_DEADLINE {
            bail!(
                "[{label}] {} of {} vehicles still crossing at the deadline",
                trips.len() - exited.len(),
                trips.len()
            );
        }
        exited.extend(controller.take_exited());
        if last_report.elapsed() >= REPORT_EVERY {
            last_report = Instant::now();
            println!(
                "[{label:>5}] {:>6}  crossing {:2}  done {:2}",
                controller.current_tick().to_string(),
                controller.snapshot().len(),
                exited.len(),
            );
        }
        thread::sleep(TICK);
    }
    controller.stop().context("stopping controller")?;
    info!(policy = label, final_tick = %controller.current_tick(), "run finished");

    exited.sort_by_key(Vehicle::id);
    Ok(exited)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== fourway — intersection control engine ===");
    println!("Vehicles: {VEHICLE_COUNT}  |  Seed: {SEED}  |  Tick: {TICK:?}");
    println!();

    // 1. Build the intersection; one copy serves all three runs.
    let (intersection, lanes) = four_way(SPEED_LIMIT)?;
    println!(
        "Topology: {} nodes, {} lanes",
        intersection.node_count(),
        intersection.lane_count()
    );
    println!();
    let intersection = Arc::new(intersection);

    // 2. Seeded demand, identical for every policy.
    let mut rng = SmallRng::seed_from_u64(SEED);
    let trips: Vec<(NodeId, NodeId)> = (0..VEHICLE_COUNT)
        .map(|_| {
            let i = rng.gen_range(0..4usize);
            let j = (i + rng.gen_range(1..4usize)) % 4;
            (NodeId(i as u32), NodeId(j as u32))
        })
        .collect();

    // 3. The same crossing under each policy.
    let auto = run_policy("auto", AutoPolicy::new(), Arc::clone(&intersection), &trips)?;
    let light = run_policy(
        "light",
        LightPolicy::new(light_phases(&lanes)),
        Arc::clone(&intersection),
        &trips,
    )?;
    let stop = run_policy("stop", StopPolicy::new(), Arc::clone(&intersection), &trips)?;

    // 4. Wait table: ticks spent beyond the free-flow crossing time.
    println!();
    println!("{:<8} {:<8} {:>6} {:>6} {:>6}", "Vehicle", "Trip", "auto", "light", "stop");
    println!("{}", "-".repeat(38));
    for n in 0..VEHICLE_COUNT {
        let (source, destination) = trips[n];
        println!(
            "{:<8} {:<8} {:>6} {:>6} {:>6}",
            n + 1,
            format!("{}->{}", source.0, destination.0),
            auto[n].wait_ticks(),
            light[n].wait_ticks(),
            stop[n].wait_ticks(),
        );
    }
    println!("{}", "-".repeat(38));
    let total = |set: &[Vehicle]| set.iter().map(Vehicle::wait_ticks).sum::<u64>();
    println!(
        "{:<8} {:<8} {:>6} {:>6} {:>6}",
        "total",
        "",
        total(&auto),
        total(&light),
        total(&stop),
    );

    Ok(())
}
