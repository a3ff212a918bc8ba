//! Admission and the per-tick update pass.
//!
//! Both entry points run under the controller's state lock.  A tick is two
//! phases: a read-only fan-out computing one [`Motion`] per pod (parallel
//! with the `parallel` feature), then a single-writer fan-in applying moves,
//! deferred queue pops, and evictions.  Deferring the pops is what makes the
//! fan-out safe: pods read queue heads while deciding, and no head changes
//! until every pod has decided.

use tracing::{debug, error, trace};
use xing_core::NodeId;
use xing_topology::{Intersection, Lane};
use xing_vehicle::Vehicle;

use crate::error::{ControlError, ControlResult};
use crate::pod::{Motion, Pod};
use crate::policy::ControlPolicy;
use crate::state::ControlState;

/// May a vehicle from `origin` be admitted this tick?  True when the origin's
/// bucket is empty or its most recent admission happened on an earlier tick.
/// Keeps same-origin admissions at most one per tick, so bucket order stays
/// unambiguous.
pub(crate) fn origin_clear(state: &ControlState, origin: NodeId) -> bool {
    match state.lane_queues.get(&origin).and_then(|queue| queue.back()) {
        Some(&last) => match state.pod(last) {
            Some(pod) => pod.admitted() < state.now,
            None => true,
        },
        None => true,
    }
}

/// Take a vehicle under control: resolve its lane, wrap it in a pod, enqueue
/// it, and run the policy's admission step.
///
/// On rejection the vehicle is parked in the exit stream (unadmitted, not
/// marked exited) so it is never lost; callers validate up front and treat a
/// rejection here as a defect.
pub(crate) fn admit_vehicle<P: ControlPolicy>(
    state:  &mut ControlState,
    topo:   &Intersection,
    policy: &P,
    mut vehicle: Vehicle,
) -> ControlResult<()> {
    let vehicle_id = vehicle.id();

    if vehicle.is_controlled() || state.pod(vehicle_id).is_some() {
        state.exited.push(vehicle);
        return Err(ControlError::AlreadyControlled(vehicle_id));
    }
    let lane = topo
        .lane_between(vehicle.source(), vehicle.destination())
        .and_then(|id| topo.lane(id));
    let Some(lane) = lane else {
        let err = ControlError::UnknownLane {
            from:        vehicle.source(),
            destination: vehicle.destination(),
        };
        state.exited.push(vehicle);
        return Err(err);
    };

    vehicle.set_controlled(true);
    state.pods.push(Pod::new(vehicle, lane, state.now));
    state
        .lane_queues
        .entry(lane.source)
        .or_default()
        .push_back(vehicle_id);
    if policy.uses_ranks() {
        state.rerank_origin(lane.source);
    }
    debug!(vehicle = %vehicle_id, lane = %lane.id, tick = %state.now, "admitted");

    policy.admit(state, lane, vehicle_id);
    Ok(())
}

/// Run one tick: decide every pod's motion read-only, apply sequentially,
/// advance the clock.
pub(crate) fn run_tick<P: ControlPolicy>(
    state:  &mut ControlState,
    topo:   &Intersection,
    policy: &P,
) {
    let motions: Vec<Motion> = {
        let snapshot: &ControlState = state;

        #[cfg(not(feature = "parallel"))]
        {
            snapshot
                .pods
                .iter()
                .map(|pod| pod_motion(pod, topo, policy, snapshot))
                .collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            snapshot
                .pods
                .par_iter()
                .map(|pod| pod_motion(pod, topo, policy, snapshot))
                .collect()
        }
    };

    apply_motions(state, topo, policy, motions);
    state.now += 1;
}

/// One pod's read-only decision.
fn pod_motion<P: ControlPolicy>(
    pod:    &Pod,
    topo:   &Intersection,
    policy: &P,
    state:  &ControlState,
) -> Motion {
    match topo.lane(pod.lane()) {
        Some(lane) => policy.pod_action(pod, lane, state),
        None => {
            // A pod bound to a lane the topology does not know is a broken
            // admission invariant; freeze it rather than guess.
            error!(vehicle = %pod.vehicle_id(), lane = %pod.lane(), "pod on unknown lane");
            Motion::stay()
        }
    }
}

/// The single-writer fan-in: move pods, pop queues, evict, rerank.
fn apply_motions<P: ControlPolicy>(
    state:   &mut ControlState,
    topo:    &Intersection,
    policy:  &P,
    motions: Vec<Motion>,
) {
    debug_assert_eq!(state.pods.len(), motions.len());

    for (pod, motion) in state.pods.iter_mut().zip(&motions) {
        pod.advance(motion);
        trace!(
            vehicle = %pod.vehicle_id(),
            position = pod.position(),
            speed = pod.vehicle().current_speed(),
            "moved"
        );
    }

    // Deferred queue pops, in pod order.  At most one pod per queue can have
    // claimed headship in the read-only phase, so each flag pops the pod
    // that set it.
    let mut popped_origins: Vec<NodeId> = Vec::new();
    {
        let pods = &state.pods;
        let lane_queues = &mut state.lane_queues;
        let world_queue = &mut state.world_queue;
        for (pod, motion) in pods.iter().zip(&motions) {
            if motion.pop_lane {
                if let Some(lane) = topo.lane(pod.lane()) {
                    if let Some(queue) = lane_queues.get_mut(&lane.source) {
                        let popped = queue.pop_front();
                        debug_assert_eq!(popped, Some(pod.vehicle_id()));
                        popped_origins.push(lane.source);
                    }
                }
            }
            if motion.pop_world {
                let popped = world_queue.pop_front();
                debug_assert!(popped.is_some_and(|slot| slot.vehicle == pod.vehicle_id()));
            }
        }
    }

    // Evictions: detach the vehicle, record its wait, drop the pod.  A pod
    // can leave while mid-queue in the world queue (it never became head
    // before clearing the lane), so its slot is swept here too.
    if motions.iter().any(|m| m.evict) {
        let now = state.now;
        let pods = std::mem::take(&mut state.pods);
        let mut kept = Vec::with_capacity(pods.len());
        for (pod, motion) in pods.into_iter().zip(&motions) {
            if !motion.evict {
                kept.push(pod);
                continue;
            }
            debug_assert!(
                state.lane_queues.values().all(|q| !q.contains(&pod.vehicle_id())),
                "evicted pod still queued on its origin"
            );
            state.world_queue.retain(|slot| slot.vehicle != pod.vehicle_id());

            let free_flow = topo.lane(pod.lane()).map_or(0, Lane::free_flow_ticks);
            let wait = now.saturating_since(pod.admitted()).saturating_sub(free_flow);
            let mut vehicle = pod.into_vehicle();
            vehicle.set_controlled(false);
            vehicle.mark_exited(wait);
            debug!(vehicle = %vehicle.id(), tick = %now, wait, "evicted");
            state.exited.push(vehicle);
        }
        state.pods = kept;
    }

    if policy.uses_ranks() {
        for origin in popped_origins {
            state.rerank_origin(origin);
        }
    }
}
