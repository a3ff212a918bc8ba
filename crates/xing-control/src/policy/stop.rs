//! All-way stop policy: strict cross-lane FIFO with a mandatory hold.
//!
//! Pods run up to a rank-adjusted stop target, landing on it exactly (the
//! approach snaps rather than steps, so float accumulation can never leave a
//! pod a hair short of the line).  On reaching the stop line a pod serves a
//! fixed full-stop hold; once the hold elapses it proceeds only when it heads
//! both its lane queue and the world queue, which releases vehicles in global
//! admission order.  Both queue heads pop exactly once, at release.

use xing_core::VehicleId;
use xing_topology::Lane;

use crate::pod::{Motion, Pod, Zone};
use crate::policy::ControlPolicy;
use crate::state::{ControlState, WorldSlot};

/// Mandatory stop-line hold, in ticks.  The countdown arms on the tick the
/// pod lands on the line, so the full stop lasts `HOLD_TICKS + 1` ticks
/// before the first release check.
const HOLD_TICKS: u64 = 3;

/// The all-way stop.  Stateless; ordering lives in the two queues.
#[derive(Copy, Clone, Debug, Default)]
pub struct StopPolicy;

impl StopPolicy {
    pub fn new() -> Self {
        StopPolicy
    }
}

impl ControlPolicy for StopPolicy {
    fn name(&self) -> &'static str {
        "stop"
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
            // Through the line: nothing can stop the pod any more.
            Zone::Past | Zone::Inside => Motion::drive(lane.destination_speed),
            Zone::Approach => {
                let position = pod.position();
                if position >= lane.begin_intersection {
                    // At the stop line.
                    return match pod.countdown() {
                        None => Motion::hold(HOLD_TICKS),
                        Some(left) if left > 0 => Motion::stay(),
                        Some(_) => {
                            let lane_lead = state.lane_head(lane.source) == Some(me);
                            let world_lead = state.world_head() == Some(me);
                            if lane_lead && world_lead {
                                let mut motion = Motion::drive(lane.destination_speed);
                                motion.pop_lane = true;
                                motion.pop_world = true;
                                motion
                            } else {
                                Motion::stay()
                            }
                        }
                    };
                }

                // Floor at the lane start: a queue deeper than the approach
                // is long must not stack pods at negative positions.
                let stop_target =
                    (lane.begin_intersection - pod.rank().unwrap_or(0) as f64).max(0.0);
                if position + lane.source_speed > stop_target {
                    Motion::snap_to(stop_target)
                } else {
                    Motion::drive(lane.source_speed)
                }
            }
        }
    }
}
