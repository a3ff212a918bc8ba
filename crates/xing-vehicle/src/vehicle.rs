//! The vehicle handle exchanged between spawner and controller.

use xing_core::{NodeId, VehicleId};

/// Coarse speed advisory an external collaborator may issue to a vehicle.
///
/// The controller drives vehicles with explicit per-tick speeds; the advisory
/// is recorded on the vehicle as an acceleration mode (−1 / 0 / +1) for
/// outside observers and has no effect on controlled motion.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SpeedAdvice {
    SlowDown,
    Maintain,
    SpeedUp,
}

/// A vehicle crossing the intersection.
///
/// Created by the spawner, moved into the controller at admission, and moved
/// back out through the exit stream once evicted (exited, wait recorded) or
/// drained (released un-exited at shutdown).  While supervised it lives
/// inside its pod; external code observes it through the controller's read
/// view.
#[derive(Clone, Debug)]
pub struct Vehicle {
    id: VehicleId,
    source: NodeId,
    destination: NodeId,

    max_speed: f64,
    current_speed: f64,
    /// Advisory acceleration mode, set by [`advise`](Self::advise).
    acceleration: f64,

    controlled: bool,
    exited: bool,
    wait_ticks: u64,
}

impl Vehicle {
    /// A new vehicle travelling `source` → `destination`, arriving at its
    /// maximum speed.
    pub fn new(id: VehicleId, source: NodeId, destination: NodeId, max_speed: f64) -> Self {
        Self {
            id,
            source,
            destination,
            max_speed,
            current_speed: max_speed,
            acceleration: 0.0,
            controlled: false,
            exited: false,
            wait_ticks: 0,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Speed applied in the most recent tick (units per tick).
    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// Ticks spent beyond the lane's free-flow crossing time.  Meaningful
    /// once [`has_exited`](Self::has_exited) is true.
    pub fn wait_ticks(&self) -> u64 {
        self.wait_ticks
    }

    /// Record an advisory; returns whether it changed the stored mode.
    pub fn advise(&mut self, advice: SpeedAdvice) -> bool {
        let mode = match advice {
            SpeedAdvice::SlowDown => -1.0,
            SpeedAdvice::Maintain => 0.0,
            SpeedAdvice::SpeedUp => 1.0,
        };
        if self.acceleration == mode {
            return false;
        }
        self.acceleration = mode;
        true
    }

    /// Current advisory mode (−1 / 0 / +1).
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    // ── Controller-facing state transitions ───────────────────────────────

    /// Apply a controller-issued speed for this tick; returns the distance
    /// travelled (one tick at that speed).
    pub fn apply_speed(&mut self, speed: f64) -> f64 {
        self.current_speed = speed;
        speed
    }

    /// Flip the supervision flag (set at admission, cleared at detachment).
    pub fn set_controlled(&mut self, controlled: bool) {
        self.controlled = controlled;
    }

    /// Signal that the vehicle cleared the intersection; stores its wait.
    pub fn mark_exited(&mut self, wait_ticks: u64) {
        self.exited = true;
        self.wait_ticks = wait_ticks;
    }
}
