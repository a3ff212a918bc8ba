//! Read-only snapshot rows for renderers and monitors.

use xing_core::{LaneId, VehicleId};
use xing_topology::Lane;

use crate::pod::Pod;

/// One pod as seen from outside the lock: enough to draw it and nothing that
/// aliases controller state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PodView {
    pub vehicle:  VehicleId,
    pub lane:     LaneId,
    /// Scalar distance from the lane start.
    pub position: f64,
    /// Lane-queue rank, 0 = head; `None` under the autonomous policy.
    pub rank:     Option<usize>,
    /// Realized speed of the last tick, units per tick.
    pub speed:    f64,
    /// True while strictly inside the intersection square.
    pub in_intersection: bool,
}

impl PodView {
    pub(crate) fn capture(pod: &Pod, lane: &Lane) -> Self {
        PodView {
            vehicle: pod.vehicle_id(),
            lane: pod.lane(),
            position: pod.position(),
            rank: pod.rank(),
            speed: pod.vehicle().current_speed(),
            in_intersection: pod.in_intersection_square(lane),
        }
    }
}
