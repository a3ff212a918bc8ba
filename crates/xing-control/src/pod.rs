//! Pods — the controller-side wrapper around one supervised vehicle.
//!
//! A [`Pod`] owns its [`Vehicle`] for the duration of supervision and tracks
//! everything the policies need per tick: scalar position along the lane, the
//! queue rank, the hold/pacing countdown, and (under the autonomous policy)
//! the assigned entry/exit ticks.  Pods never touch each other or the shared
//! queues; each tick they receive exactly one [`Motion`] computed read-only
//! and applied afterwards in a single writer pass.

use xing_core::{LaneId, Tick, VehicleId};
use xing_topology::Lane;
use xing_vehicle::Vehicle;

// ── Zone ──────────────────────────────────────────────────────────────────────

/// Where along its lane a pod currently sits, relative to the intersection
/// zone `[begin, end]` and the lane end.
///
/// Boundary positions classify downward: a pod exactly on the stop line is
/// still [`Approach`](Zone::Approach), exactly on the zone exit still
/// [`Inside`](Zone::Inside), exactly on the lane end still
/// [`Past`](Zone::Past).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Zone {
    /// `position ≤ begin_intersection`.
    Approach,
    /// `begin_intersection < position ≤ end_intersection`.
    Inside,
    /// `end_intersection < position ≤ length`.
    Past,
    /// `position > length` — the pod is evicted on this tick.
    Gone,
}

// ── Motion ────────────────────────────────────────────────────────────────────

/// One pod's decision for one tick.
///
/// Produced by [`ControlPolicy::pod_action`](crate::ControlPolicy::pod_action)
/// during the read-only phase; the queue flags are deferred requests applied
/// sequentially after every pod has decided, so no pod ever mutates a queue a
/// sibling is concurrently reading.
#[derive(Clone, Debug, Default)]
pub struct Motion {
    /// Distance to drive this tick (units per tick).  Zero means hold still.
    pub speed: f64,

    /// Land exactly on this position instead of driving `speed`.  Used for
    /// queue stacking so accumulated float steps cannot drift off the stop
    /// target.
    pub snap_to: Option<f64>,

    /// Arm the pod's countdown at this many ticks.  Overrides the regular
    /// one-per-tick decrement for this tick.
    pub hold: Option<u64>,

    /// Pop this pod from the head of its origin's lane queue.
    pub pop_lane: bool,

    /// Pop this pod from the head of the world queue.
    pub pop_world: bool,

    /// The pod passed the lane end: detach the vehicle and drop the pod.
    pub evict: bool,
}

impl Motion {
    /// Drive at `speed` this tick.
    pub fn drive(speed: f64) -> Self {
        Motion { speed, ..Motion::default() }
    }

    /// Hold still this tick.
    pub fn stay() -> Self {
        Motion::default()
    }

    /// Hold still and arm the countdown at `ticks`.
    pub fn hold(ticks: u64) -> Self {
        Motion { hold: Some(ticks), ..Motion::default() }
    }

    /// Land exactly on `position` this tick.
    pub fn snap_to(position: f64) -> Self {
        Motion { snap_to: Some(position), ..Motion::default() }
    }

    /// Leave supervision this tick.
    pub fn evict() -> Self {
        Motion { evict: true, ..Motion::default() }
    }
}

// ── Pod ───────────────────────────────────────────────────────────────────────

/// One vehicle under intersection control, bound to the lane it travels.
#[derive(Clone, Debug)]
pub struct Pod {
    vehicle: Vehicle,
    lane:    LaneId,

    /// Tick at which the pod was admitted (position 0 on the lane).
    admitted: Tick,

    /// Scalar distance from the lane start.
    position: f64,

    /// Multi-purpose countdown: pacing delay under the autonomous policy,
    /// stop-line hold under the stop policy.  `None` until first armed; an
    /// armed countdown decrements once per tick down to zero and stays there.
    countdown: Option<u64>,

    /// Assigned intersection-entry tick (autonomous policy only).
    entry: Option<Tick>,

    /// Assigned intersection-exit tick, `entry + crossing_ticks`.
    exit: Option<Tick>,

    /// Whole ticks this pod needs to traverse the zone, frozen at admission.
    crossing_ticks: u64,

    /// Rank in the origin's lane queue, 0 = head.  Maintained only by
    /// policies that stack queued pods; `None` under the autonomous policy.
    rank: Option<usize>,
}

impl Pod {
    pub fn new(vehicle: Vehicle, lane: &Lane, admitted: Tick) -> Self {
        Pod {
            vehicle,
            lane: lane.id,
            admitted,
            position: 0.0,
            countdown: None,
            entry: None,
            exit: None,
            crossing_ticks: lane.crossing_ticks(),
            rank: None,
        }
    }

    // ── Read accessors ────────────────────────────────────────────────────

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle.id()
    }

    pub fn lane(&self) -> LaneId {
        self.lane
    }

    pub fn admitted(&self) -> Tick {
        self.admitted
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn countdown(&self) -> Option<u64> {
        self.countdown
    }

    pub fn entry(&self) -> Option<Tick> {
        self.entry
    }

    pub fn exit(&self) -> Option<Tick> {
        self.exit
    }

    pub fn crossing_ticks(&self) -> u64 {
        self.crossing_ticks
    }

    pub fn rank(&self) -> Option<usize> {
        self.rank
    }

    /// Which zone the pod occupies on `lane` right now.
    pub fn zone(&self, lane: &Lane) -> Zone {
        if self.position > lane.length {
            Zone::Gone
        } else if self.position > lane.end_intersection {
            Zone::Past
        } else if self.position > lane.begin_intersection {
            Zone::Inside
        } else {
            Zone::Approach
        }
    }

    /// True while strictly between the zone bounds.  Display concern; motion
    /// logic always goes through [`zone`](Self::zone).
    pub fn in_intersection_square(&self, lane: &Lane) -> bool {
        self.position > lane.begin_intersection && self.position < lane.end_intersection
    }

    /// Earliest tick this pod can reach the stop line: the whole approach
    /// driven at the source speed limit, truncated to whole ticks.
    pub fn predicted_entry(&self, lane: &Lane) -> Tick {
        self.admitted.offset(lane.approach_ticks())
    }

    // ── Controller-side mutation ──────────────────────────────────────────

    pub(crate) fn set_rank(&mut self, rank: usize) {
        self.rank = Some(rank);
    }

    /// Record the assigned entry slot and arm the pacing countdown.
    pub(crate) fn set_schedule(&mut self, entry: Tick, pacing: u64) {
        self.entry = Some(entry);
        self.exit = Some(entry.offset(self.crossing_ticks));
        self.countdown = Some(pacing);
    }

    /// Apply one tick's motion: step the countdown, move the pod, and feed
    /// the realized speed to the vehicle.
    pub(crate) fn advance(&mut self, motion: &Motion) {
        if let Some(ticks) = motion.hold {
            self.countdown = Some(ticks);
        } else if let Some(left) = self.countdown {
            if left > 0 {
                self.countdown = Some(left - 1);
            }
        }

        let travelled = match motion.snap_to {
            Some(target) => {
                let step = target - self.position;
                self.position = target;
                step
            }
            None => {
                self.position += motion.speed;
                motion.speed
            }
        };
        self.vehicle.apply_speed(travelled);
    }

    /// Surrender the vehicle; ends supervision.
    pub(crate) fn into_vehicle(self) -> Vehicle {
        self.vehicle
    }
}
