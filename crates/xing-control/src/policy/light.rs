//! Fixed-phase signal policy.
//!
//! A cycling background task steps a [`SignalBoard`] through its phases on a
//! wall-clock schedule (green dwell, then yellow dwell, then the next phase).
//! The board is a single atomic slot index, so the per-tick motion phase
//! reads the current signal without taking any lock beyond the state mutex it
//! already holds.  Queued pods stack one rank unit behind the stop line while
//! their lane is not "go"; yellow counts as not-go for the motion rule and
//! exists only for display.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;
use xing_core::{LaneId, VehicleId};
use xing_topology::Lane;

use crate::pod::{Motion, Pod, Zone};
use crate::policy::ControlPolicy;
use crate::state::{ControlState, WorldSlot};

/// Granularity at which sleeping background tasks re-check the stop flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

// ── Phases and the board ──────────────────────────────────────────────────────

/// One signal phase: the lanes it turns green and its two dwell times.
#[derive(Clone, Debug)]
pub struct Phase {
    /// Lanes that may enter the intersection while this phase is green.
    pub go:     Vec<LaneId>,
    pub green:  Duration,
    pub yellow: Duration,
}

impl Phase {
    pub fn new(go: Vec<LaneId>, green: Duration, yellow: Duration) -> Self {
        Phase { go, green, yellow }
    }
}

/// What a lane's signal shows right now.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SignalColor {
    Green,
    Yellow,
    Red,
}

/// The shared signal state: a phase list and one atomic slot index.
///
/// Slot `2·p` is phase `p` green, slot `2·p + 1` is phase `p` yellow.  The
/// board starts at slot 0, so phase 0 is green from the first tick even
/// before the cycler has run.
#[derive(Debug)]
pub struct SignalBoard {
    phases: Vec<Phase>,
    slot:   AtomicUsize,
}

impl SignalBoard {
    pub fn new(phases: Vec<Phase>) -> Self {
        SignalBoard { phases, slot: AtomicUsize::new(0) }
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Index of the currently showing phase.
    pub fn phase_index(&self) -> usize {
        self.slot.load(Ordering::Relaxed) / 2
    }

    /// May `lane` enter the intersection right now?  Yellow is not go.
    pub fn is_go(&self, lane: LaneId) -> bool {
        let slot = self.slot.load(Ordering::Relaxed);
        slot % 2 == 0
            && self
                .phases
                .get(slot / 2)
                .is_some_and(|phase| phase.go.contains(&lane))
    }

    /// The color `lane` currently shows.
    pub fn color_of(&self, lane: LaneId) -> SignalColor {
        let slot = self.slot.load(Ordering::Relaxed);
        match self.phases.get(slot / 2) {
            Some(phase) if phase.go.contains(&lane) => {
                if slot % 2 == 0 { SignalColor::Green } else { SignalColor::Yellow }
            }
            _ => SignalColor::Red,
        }
    }

    /// Wall-clock dwell of the current slot.
    fn current_dwell(&self) -> Duration {
        let slot = self.slot.load(Ordering::Relaxed);
        match self.phases.get(slot / 2) {
            Some(phase) => {
                if slot % 2 == 0 { phase.green } else { phase.yellow }
            }
            None => Duration::ZERO,
        }
    }

    /// Step to the next slot, wrapping after the last phase's yellow.
    pub(crate) fn advance(&self) {
        let slots = self.phases.len() * 2;
        if slots == 0 {
            return;
        }
        let next = (self.slot.load(Ordering::Relaxed) + 1) % slots;
        self.slot.store(next, Ordering::Relaxed);
        debug!(slot = next, phase = next / 2, yellow = next % 2 == 1, "signal change");
    }
}

/// Sleep `total`, waking every [`SHUTDOWN_POLL`] to honor the stop flag.
fn sleep_while_active(active: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while active.load(Ordering::Relaxed) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return;
        }
        thread::sleep(left.min(SHUTDOWN_POLL));
    }
}

// ── The policy ────────────────────────────────────────────────────────────────

/// Fixed-phase signal control.  World queue is plain admission FIFO; signal
/// state lives on the shared [`SignalBoard`].
#[derive(Debug)]
pub struct LightPolicy {
    board: Arc<SignalBoard>,
}

impl LightPolicy {
    pub fn new(phases: Vec<Phase>) -> Self {
        LightPolicy { board: Arc::new(SignalBoard::new(phases)) }
    }

    /// Handle to the shared board, e.g. for a renderer to draw signal heads.
    pub fn board(&self) -> Arc<SignalBoard> {
        Arc::clone(&self.board)
    }
}

impl ControlPolicy for LightPolicy {
    fn name(&self) -> &'static str {
        "light"
    }

    fn uses_ranks(&self) -> bool {
        true
    }

    fn admit(&self, state: &mut ControlState, lane: &Lane, vehicle: VehicleId) {
        state.push_world_back(WorldSlot::unscheduled(vehicle, lane.id));
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
            Zone::Approach => {
                if self.board.is_go(lane.id) {
                    return Motion::drive(lane.source_speed);
                }
                // Not go: run up to the rank-adjusted stop target, then hold.
                let stop_target = lane.begin_intersection - pod.rank().unwrap_or(0) as f64;
                if pod.position() < stop_target {
                    Motion::drive(lane.source_speed)
                } else {
                    Motion::stay()
                }
            }
        }
    }

    fn start_background(&self, active: &Arc<AtomicBool>) -> Vec<JoinHandle<()>> {
        if self.board.phase_count() == 0 {
            return Vec::new();
        }
        let board = Arc::clone(&self.board);
        let active = Arc::clone(active);
        vec![thread::spawn(move || {
            while active.load(Ordering::Relaxed) {
                sleep_while_active(&active, board.current_dwell());
                if !active.load(Ordering::Relaxed) {
                    break;
                }
                board.advance();
            }
        })]
    }
}
