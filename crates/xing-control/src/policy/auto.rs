//! Autonomous policy: conflict-free interval scheduling at admission time.
//!
//! Every pod is assigned, once, an intersection-occupancy interval
//! `[entry, entry + crossing_ticks)` such that no two pods on conflicting
//! lanes ever hold overlapping intervals.  The assignment is a single forward
//! sweep over the world queue, which this policy keeps sorted by ascending
//! entry tick.  After admission the pod simply drives: a feed-forward pacing
//! countdown slows it on the approach so it reaches the stop line near its
//! assigned tick without stopping, and no re-planning ever happens.

use tracing::debug;
use xing_core::{Tick, VehicleId};
use xing_topology::Lane;

use crate::pod::{Motion, Pod, Zone};
use crate::policy::ControlPolicy;
use crate::state::{ControlState, WorldSlot};

/// Countdown ticks granted per tick of intended delay.  One slowed tick
/// loses a quarter of a full-speed tick's distance, so four countdown ticks
/// buy one tick of delay.
const PACING_FACTOR: f64 = 4.0;

/// Approach speed multiplier while the pacing countdown is running.
const SLOWDOWN_RATIO: f64 = 0.75;

/// The interval scheduler.  Stateless: the schedule lives in the world queue
/// and in each pod's assigned ticks.
#[derive(Copy, Clone, Debug, Default)]
pub struct AutoPolicy;

impl AutoPolicy {
    pub fn new() -> Self {
        AutoPolicy
    }

    /// Earliest entry tick whose occupancy interval collides with no
    /// already-scheduled conflicting pod.
    ///
    /// Sweeps the entry-sorted world queue while growing a banned window
    /// `[0, banned_exit)`; the candidate may enter at the first point where a
    /// `crossing`-sized gap separates `banned_exit` from the next conflicting
    /// interval, or at `banned_exit` after the last queued pod.
    fn find_entry(state: &ControlState, lane: &Lane, earliest: Tick, crossing: u64) -> Tick {
        let mut banned_exit = earliest;

        for slot in &state.world_queue {
            let (Some(q_entry), Some(q_exit)) = (slot.entry, slot.exit) else {
                continue;
            };
            // Fully inside the banned window: cannot move the candidate.
            if q_exit < banned_exit {
                continue;
            }
            // Everything from here on starts at or after q_entry (sorted
            // queue), so a gap before it is a gap for good.
            if q_entry >= banned_exit.offset(crossing) {
                return banned_exit;
            }
            if lane.allows(slot.lane) {
                continue;
            }
            if q_entry <= banned_exit {
                banned_exit = banned_exit.max(q_exit);
            } else if q_entry.saturating_since(banned_exit) >= crossing {
                return banned_exit;
            } else {
                banned_exit = banned_exit.max(q_exit);
            }
        }
        banned_exit
    }

    /// Feed-forward pacing countdown for a pod told to enter at `entry`:
    /// `4·(entry − now) − 4·(approach distance / approach speed)`, clamped at
    /// zero.  Positive values hold the pod at [`SLOWDOWN_RATIO`] of its
    /// source speed.
    fn pacing_countdown(entry: Tick, now: Tick, lane: &Lane) -> u64 {
        let lead = entry.saturating_since(now) as f64;
        let approach = lane.begin_intersection / lane.source_speed;
        let paced = PACING_FACTOR * lead - PACING_FACTOR * approach;
        if paced > 0.0 { paced as u64 } else { 0 }
    }
}

impl ControlPolicy for AutoPolicy {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn admit(&self, state: &mut ControlState, lane: &Lane, vehicle: VehicleId) {
        let now = state.now();

        // Strictly after the same-origin pod admitted just before this one
        // (the candidate itself is already at the back of the bucket).
        let predecessor_entry = state
            .lane_queues
            .get(&lane.source)
            .and_then(|queue| queue.len().checked_sub(2).and_then(|i| queue.get(i)))
            .and_then(|&ahead| state.pod(ahead))
            .and_then(Pod::entry);

        let (predicted, crossing) = match state.pod(vehicle) {
            Some(pod) => (pod.predicted_entry(lane), pod.crossing_ticks()),
            None => return,
        };
        let earliest = match predecessor_entry {
            Some(ahead) => predicted.max(ahead.offset(1)),
            None => predicted,
        };

        let entry = Self::find_entry(state, lane, earliest, crossing);
        let pacing = Self::pacing_countdown(entry, now, lane);
        if let Some(pod) = state.pod_mut(vehicle) {
            pod.set_schedule(entry, pacing);
        }
        state.insert_world_sorted(WorldSlot::scheduled(
            vehicle,
            lane.id,
            entry,
            entry.offset(crossing),
        ));

        debug!(%vehicle, lane = %lane.id, %entry, pacing, "scheduled");
    }

    fn pod_action(&self, pod: &Pod, lane: &Lane, state: &ControlState) -> Motion {
        let me = pod.vehicle_id();
        match pod.zone(lane) {
            Zone::Gone => Motion::evict(),
            Zone::Past => {
                let mut motion = Motion::drive(lane.destination_speed);
                motion.pop_world = state.world_head() == Some(me);
                motion
            }
            Zone::Inside => {
                let mut motion = Motion::drive(lane.destination_speed);
                motion.pop_lane = state.lane_head(lane.source) == Some(me);
                motion
            }
            Zone::Approach => match pod.countdown() {
                Some(left) if left > 0 => Motion::drive(lane.source_speed * SLOWDOWN_RATIO),
                _ => Motion::drive(lane.source_speed),
            },
        }
    }
}
