//! The shared state bundle: controlled pods, lane queues, world queue, clock.
//!
//! Everything the two controller tasks touch lives in one [`ControlState`]
//! guarded by one mutex (see [`Controller`](crate::Controller)).  A single
//! coarse lock is deliberate: one logical step (admission, a queue pop)
//! routinely touches a lane queue and the world queue together, and two locks
//! would demand a global ordering discipline for no measurable gain at
//! intersection scale.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use xing_core::{LaneId, NodeId, Tick, VehicleId};
use xing_topology::Intersection;
use xing_vehicle::Vehicle;

use crate::pod::Pod;

// ── WorldSlot ─────────────────────────────────────────────────────────────────

/// One world-queue entry.
///
/// Under the autonomous policy a slot carries the assigned occupancy interval
/// so the scheduling sweep reads slots only, never pod state.  The fixed-phase
/// and stop-sign policies queue unscheduled slots in admission order.
#[derive(Copy, Clone, Debug)]
pub struct WorldSlot {
    pub vehicle: VehicleId,
    pub lane:    LaneId,
    pub entry:   Option<Tick>,
    pub exit:    Option<Tick>,
}

impl WorldSlot {
    /// A plain FIFO slot with no assigned interval.
    pub fn unscheduled(vehicle: VehicleId, lane: LaneId) -> Self {
        WorldSlot { vehicle, lane, entry: None, exit: None }
    }

    /// A slot carrying its assigned `[entry, exit)` occupancy interval.
    pub fn scheduled(vehicle: VehicleId, lane: LaneId, entry: Tick, exit: Tick) -> Self {
        WorldSlot { vehicle, lane, entry: Some(entry), exit: Some(exit) }
    }
}

// ── ControlState ──────────────────────────────────────────────────────────────

/// All mutable controller state, locked as one unit.
#[derive(Debug)]
pub struct ControlState {
    /// Every pod currently under supervision, in admission order.
    pub(crate) pods: Vec<Pod>,

    /// Per-origin admission queues: vehicles that have not yet entered the
    /// intersection zone, in admission order.  Keyed by the lane's source
    /// node; one bucket per node, pre-seeded so admission never allocates.
    pub(crate) lane_queues: FxHashMap<NodeId, VecDeque<VehicleId>>,

    /// Global entry-sequencing queue over all supervised pods.  Ascending
    /// assigned-entry order under the autonomous policy, admission order
    /// otherwise.
    pub(crate) world_queue: VecDeque<WorldSlot>,

    /// Monotonic tick clock, incremented once per update pass.
    pub(crate) now: Tick,

    /// Vehicles released from supervision, awaiting collection.
    pub(crate) exited: Vec<Vehicle>,
}

impl ControlState {
    pub fn new(intersection: &Intersection) -> Self {
        let mut lane_queues =
            FxHashMap::with_capacity_and_hasher(intersection.node_count(), Default::default());
        for node in intersection.nodes() {
            lane_queues.insert(node.id, VecDeque::new());
        }
        ControlState {
            pods: Vec::new(),
            lane_queues,
            world_queue: VecDeque::new(),
            now: Tick::ZERO,
            exited: Vec::new(),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn pod_count(&self) -> usize {
        self.pods.len()
    }

    pub fn pods(&self) -> impl Iterator<Item = &Pod> {
        self.pods.iter()
    }

    pub fn pod(&self, vehicle: VehicleId) -> Option<&Pod> {
        self.pods.iter().find(|p| p.vehicle_id() == vehicle)
    }

    pub(crate) fn pod_mut(&mut self, vehicle: VehicleId) -> Option<&mut Pod> {
        self.pods.iter_mut().find(|p| p.vehicle_id() == vehicle)
    }

    /// Head of one origin's lane queue.
    pub fn lane_head(&self, origin: NodeId) -> Option<VehicleId> {
        self.lane_queues.get(&origin).and_then(|q| q.front()).copied()
    }

    /// Queued pod count for one origin.
    pub fn lane_len(&self, origin: NodeId) -> usize {
        self.lane_queues.get(&origin).map_or(0, VecDeque::len)
    }

    /// Head of the world queue.
    pub fn world_head(&self) -> Option<VehicleId> {
        self.world_queue.front().map(|slot| slot.vehicle)
    }

    pub fn world_len(&self) -> usize {
        self.world_queue.len()
    }

    /// World-queue vehicles in departure order, for inspection.
    pub fn world_order(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.world_queue.iter().map(|slot| slot.vehicle)
    }

    /// Drain the exit stream.
    pub fn take_exited(&mut self) -> Vec<Vehicle> {
        std::mem::take(&mut self.exited)
    }

    // ── Queue mutation (single-writer phase only) ─────────────────────────

    /// Append a FIFO world slot.
    pub(crate) fn push_world_back(&mut self, slot: WorldSlot) {
        self.world_queue.push_back(slot);
    }

    /// Insert a scheduled slot before the first strictly later entry, so
    /// equal-entry slots keep their admission order.
    pub(crate) fn insert_world_sorted(&mut self, slot: WorldSlot) {
        let at = self
            .world_queue
            .iter()
            .position(|queued| queued.entry > slot.entry)
            .unwrap_or(self.world_queue.len());
        self.world_queue.insert(at, slot);
    }

    /// Reassign ranks 0..n over one origin's queue after its membership
    /// changed.
    pub(crate) fn rerank_origin(&mut self, origin: NodeId) {
        let Some(queue) = self.lane_queues.get(&origin) else {
            return;
        };
        let pods = &mut self.pods;
        for (rank, &vehicle) in queue.iter().enumerate() {
            if let Some(pod) = pods.iter_mut().find(|p| p.vehicle_id() == vehicle) {
                pod.set_rank(rank);
            }
        }
    }
}
