//! Integration tests for xing-control.

use std::sync::Arc;
use std::time::{Duration, Instant};

use xing_core::{ControlConfig, LaneId, NodeId, Tick, VehicleId};
use xing_topology::{Intersection, IntersectionBuilder, LaneGeometry, LaneKind};
use xing_vehicle::Vehicle;

use crate::policy::{AutoPolicy, ControlPolicy, LightPolicy, Phase, SignalBoard, SignalColor, StopPolicy};
use crate::pod::{Motion, Pod, Zone};
use crate::state::{ControlState, WorldSlot};
use crate::{ControlError, Controller, engine};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Crossing with four nodes (speed 10) and three straight lanes over a
/// [40, 60] zone on a length-100 lane:
/// `a` = n0→n2, `b` = n1→n3, `c` = n2→n0.  `a` and `c` are mutually
/// compatible (opposing straights); `b` conflicts with both.
///
/// Derived constants: approach = 4 ticks, zone crossing = 2 ticks,
/// free flow = 11 ticks.
fn cross() -> (Intersection, LaneId, LaneId, LaneId) {
    let mut b = IntersectionBuilder::new();
    let n0 = b.add_node(10.0);
    let n1 = b.add_node(10.0);
    let n2 = b.add_node(10.0);
    let n3 = b.add_node(10.0);
    let geom = LaneGeometry::new(100.0, 40.0, 60.0);
    let la = b.add_lane(n0, n2, LaneKind::Straight, geom);
    let lb = b.add_lane(n1, n3, LaneKind::Straight, geom);
    let lc = b.add_lane(n2, n0, LaneKind::Straight, geom);
    b.allow_mutual(la, lc);
    (b.build().unwrap(), la, lb, lc)
}

fn vehicle(n: u64, source: NodeId, destination: NodeId) -> Vehicle {
    Vehicle::new(VehicleId(n), source, destination, 10.0)
}

fn admit<P: ControlPolicy>(
    state: &mut ControlState,
    topo:  &Intersection,
    policy: &P,
    v: Vehicle,
) {
    engine::admit_vehicle(state, topo, policy, v).unwrap();
}

fn run<P: ControlPolicy>(state: &mut ControlState, topo: &Intersection, policy: &P, ticks: u64) {
    for _ in 0..ticks {
        engine::run_tick(state, topo, policy);
    }
}

/// Drive a single vehicle from admission to eviction; returns the exited
/// vehicle and the tick it was evicted on.
fn run_to_exit<P: ControlPolicy>(
    state: &mut ControlState,
    topo:  &Intersection,
    policy: &P,
    v: Vehicle,
) -> (Vehicle, Tick) {
    admit(state, topo, policy, v);
    for _ in 0..200 {
        engine::run_tick(state, topo, policy);
        let mut exited = state.take_exited();
        if let Some(out) = exited.pop() {
            // Eviction happened on the tick before the clock advanced.
            return (out, Tick(state.now().0 - 1));
        }
    }
    panic!("vehicle did not cross within 200 ticks");
}

// ── Pod mechanics ─────────────────────────────────────────────────────────────

mod pod_mechanics {
    use super::*;

    fn lone_pod(position: f64) -> (Intersection, Pod) {
        let (topo, la, _, _) = cross();
        let lane = topo.lane(la).unwrap();
        let mut pod = Pod::new(vehicle(1, lane.source, lane.destination), lane, Tick::ZERO);
        pod.advance(&Motion::snap_to(position));
        (topo, pod)
    }

    #[test]
    fn zone_boundaries_classify_downward() {
        for (position, zone) in [
            (0.0, Zone::Approach),
            (40.0, Zone::Approach),
            (40.5, Zone::Inside),
            (60.0, Zone::Inside),
            (60.5, Zone::Past),
            (100.0, Zone::Past),
            (100.5, Zone::Gone),
        ] {
            let (topo, pod) = lone_pod(position);
            let lane = topo.lane(pod.lane()).unwrap();
            assert_eq!(pod.zone(lane), zone, "position {position}");
        }
    }

    #[test]
    fn intersection_square_is_strictly_between() {
        for (position, inside) in [(40.0, false), (41.0, true), (59.9, true), (60.0, false)] {
            let (topo, pod) = lone_pod(position);
            let lane = topo.lane(pod.lane()).unwrap();
            assert_eq!(pod.in_intersection_square(lane), inside, "position {position}");
        }
    }

    #[test]
    fn snap_lands_exactly_and_reports_the_step() {
        let (_, mut pod) = lone_pod(30.0);
        pod.advance(&Motion::snap_to(37.0));
        assert_eq!(pod.position(), 37.0);
        assert_eq!(pod.vehicle().current_speed(), 7.0);

        // Snapping onto the current position is a zero-speed hold.
        pod.advance(&Motion::snap_to(37.0));
        assert_eq!(pod.position(), 37.0);
        assert_eq!(pod.vehicle().current_speed(), 0.0);
    }

    #[test]
    fn countdown_arms_decrements_and_floors_at_zero() {
        let (_, mut pod) = lone_pod(40.0);
        assert_eq!(pod.countdown(), None);

        pod.advance(&Motion::hold(2));
        assert_eq!(pod.countdown(), Some(2));

        pod.advance(&Motion::stay());
        assert_eq!(pod.countdown(), Some(1));
        pod.advance(&Motion::stay());
        assert_eq!(pod.countdown(), Some(0));
        pod.advance(&Motion::stay());
        assert_eq!(pod.countdown(), Some(0));
    }

    #[test]
    fn predicted_entry_truncates_partial_ticks() {
        // 45 distance units at speed 10 → 4 whole ticks.
        let mut b = IntersectionBuilder::new();
        let n0 = b.add_node(10.0);
        let n1 = b.add_node(10.0);
        let lane = b.add_lane(n0, n1, LaneKind::Straight, LaneGeometry::new(100.0, 45.0, 60.0));
        let topo = b.build().unwrap();
        let lane = topo.lane(lane).unwrap();

        let pod = Pod::new(vehicle(1, n0, n1), lane, Tick(3));
        assert_eq!(pod.predicted_entry(lane), Tick(7));
    }
}

// ── Autonomous policy ─────────────────────────────────────────────────────────

mod auto_policy {
    use super::*;

    #[test]
    fn isolated_pod_enters_at_predicted_tick() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));

        let pod = state.pod(VehicleId(1)).unwrap();
        assert_eq!(pod.entry(), Some(Tick(4)));
        assert_eq!(pod.exit(), Some(Tick(6)));
        assert_eq!(pod.countdown(), Some(0), "no delay, no pacing");
        assert_eq!(state.world_head(), Some(VehicleId(1)));
    }

    #[test]
    fn conflicting_pod_scheduled_after_first_exit() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        admit(&mut state, &topo, &policy, vehicle(2, NodeId(1), NodeId(3)));

        let first = state.pod(VehicleId(1)).unwrap();
        let second = state.pod(VehicleId(2)).unwrap();
        assert_eq!(second.entry(), first.exit());
        assert!(second.entry() >= first.exit());
    }

    #[test]
    fn compatible_pods_share_the_window() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        admit(&mut state, &topo, &policy, vehicle(2, NodeId(2), NodeId(0)));

        // Opposing straights are mutually allowed: same entry tick.
        assert_eq!(state.pod(VehicleId(2)).unwrap().entry(), Some(Tick(4)));
    }

    #[test]
    fn same_origin_pods_strictly_ordered() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        run(&mut state, &topo, &policy, 1);
        admit(&mut state, &topo, &policy, vehicle(2, NodeId(0), NodeId(2)));

        let first = state.pod(VehicleId(1)).unwrap();
        let second = state.pod(VehicleId(2)).unwrap();
        assert!(second.admitted() > first.admitted());
        // A lane conflicts with itself, so the follower waits out the leader.
        assert_eq!(second.entry(), Some(Tick(6)));
        assert!(second.entry() > first.entry());
    }

    #[test]
    fn sweep_fills_first_sufficient_gap() {
        let (topo, _, lb, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        // Two conflicting reservations with a 14-tick hole between them.
        state.insert_world_sorted(WorldSlot::scheduled(VehicleId(8), lb, Tick(4), Tick(6)));
        state.insert_world_sorted(WorldSlot::scheduled(VehicleId(9), lb, Tick(20), Tick(22)));

        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));

        let pod = state.pod(VehicleId(1)).unwrap();
        assert_eq!(pod.entry(), Some(Tick(6)), "slot at the start of the gap");
        let order: Vec<VehicleId> = state.world_order().collect();
        assert_eq!(order, vec![VehicleId(8), VehicleId(1), VehicleId(9)]);
    }

    #[test]
    fn pacing_slows_the_approach() {
        let (topo, _, lb, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        // Forced two ticks late: pacing = 4·(6 − 0) − 4·(40/10) = 8.
        state.insert_world_sorted(WorldSlot::scheduled(VehicleId(8), lb, Tick(4), Tick(6)));
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        assert_eq!(state.pod(VehicleId(1)).unwrap().countdown(), Some(8));

        run(&mut state, &topo, &policy, 1);
        let pod = state.pod(VehicleId(1)).unwrap();
        assert_eq!(pod.position(), 7.5, "three quarters of source speed");
        assert_eq!(pod.countdown(), Some(7));
    }

    #[test]
    fn queues_pop_as_the_pod_crosses() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));

        // Approach: the pod stays queued on its origin.
        run(&mut state, &topo, &policy, 5);
        assert_eq!(state.lane_len(NodeId(0)), 1);
        assert_eq!(state.world_len(), 1);

        // Tick 6 decides at position 50, inside the zone: lane queue pops.
        run(&mut state, &topo, &policy, 1);
        assert_eq!(state.lane_len(NodeId(0)), 0);
        assert_eq!(state.world_len(), 1);

        // Tick 8 decides at position 70, past the zone: world queue pops.
        run(&mut state, &topo, &policy, 2);
        assert_eq!(state.world_len(), 0);

        // Tick 12 decides at position 110, past the lane end: eviction.
        run(&mut state, &topo, &policy, 4);
        assert_eq!(state.pod_count(), 0);
        let exited = state.take_exited();
        assert_eq!(exited.len(), 1);
        assert!(exited[0].has_exited());
        assert!(!exited[0].is_controlled());
        assert_eq!(exited[0].wait_ticks(), 0, "free flow accrues no wait");
    }

    #[test]
    fn assigned_intervals_pairwise_disjoint_under_load() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        // Three admission waves on the two conflicting straights.
        let mut id = 0;
        for _ in 0..3 {
            id += 1;
            admit(&mut state, &topo, &policy, vehicle(id, NodeId(0), NodeId(2)));
            id += 1;
            admit(&mut state, &topo, &policy, vehicle(id, NodeId(1), NodeId(3)));
            run(&mut state, &topo, &policy, 1);
        }

        let schedules: Vec<(Tick, Tick)> = state
            .pods()
            .map(|p| (p.entry().unwrap(), p.exit().unwrap()))
            .collect();
        assert_eq!(schedules.len(), 6);
        for (i, &(entry_a, exit_a)) in schedules.iter().enumerate() {
            for &(entry_b, exit_b) in &schedules[i + 1..] {
                assert!(
                    exit_a <= entry_b || exit_b <= entry_a,
                    "overlap: [{entry_a}, {exit_a}) vs [{entry_b}, {exit_b})"
                );
            }
        }

        // World queue is kept in ascending-entry order.
        let entries: Vec<Tick> = state
            .world_order()
            .map(|v| state.pod(v).unwrap().entry().unwrap())
            .collect();
        assert!(entries.windows(2).all(|w| w[0] <= w[1]));
    }
}

// ── Light policy ──────────────────────────────────────────────────────────────

mod light_policy {
    use super::*;

    /// Phase 0 greens the compatible straights `a`/`c`; phase 1 greens `b`.
    /// Dwells are an hour so nothing changes under a test unless it advances
    /// the board itself.
    fn light_for(la: LaneId, lb: LaneId, lc: LaneId) -> LightPolicy {
        let hour = Duration::from_secs(3600);
        let blink = Duration::from_millis(10);
        LightPolicy::new(vec![
            Phase::new(vec![la, lc], hour, blink),
            Phase::new(vec![lb], hour, blink),
        ])
    }

    #[test]
    fn green_admission_never_holds_before_the_line() {
        let (topo, la, lb, lc) = cross();
        let policy = light_for(la, lb, lc);
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));

        for _ in 0..20 {
            engine::run_tick(&mut state, &topo, &policy);
            match state.pod(VehicleId(1)) {
                Some(pod) => {
                    assert!(pod.vehicle().current_speed() > 0.0, "held at {}", pod.position())
                }
                None => break,
            }
        }
        let exited = state.take_exited();
        assert_eq!(exited.len(), 1);
        assert_eq!(exited[0].wait_ticks(), 0);
    }

    #[test]
    fn red_lane_holds_at_the_stop_line() {
        let (topo, la, lb, lc) = cross();
        let policy = light_for(la, lb, lc);
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(1), NodeId(3)));

        run(&mut state, &topo, &policy, 10);
        let pod = state.pod(VehicleId(1)).unwrap();
        assert_eq!(pod.position(), 40.0, "parked on the stop line");
        assert_eq!(pod.vehicle().current_speed(), 0.0);
        assert_eq!(state.lane_len(NodeId(1)), 1);
        assert_eq!(state.world_len(), 1);
    }

    #[test]
    fn signal_flip_releases_the_held_pod() {
        let (topo, la, lb, lc) = cross();
        let policy = light_for(la, lb, lc);
        let board = policy.board();
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(1), NodeId(3)));

        // Two held ticks at the line, then phase 1 turns `b` green.
        run(&mut state, &topo, &policy, 6);
        assert_eq!(state.pod(VehicleId(1)).unwrap().position(), 40.0);
        board.advance();
        board.advance();
        assert!(board.is_go(lb));

        run(&mut state, &topo, &policy, 8);
        let exited = state.take_exited();
        assert_eq!(exited.len(), 1);
        assert_eq!(exited[0].wait_ticks(), 2, "two red ticks at the line");
    }

    #[test]
    fn queued_pods_stack_one_unit_per_rank() {
        // Unit speeds so ranks land exactly one unit apart.
        let mut b = IntersectionBuilder::new();
        let n0 = b.add_node(1.0);
        let n1 = b.add_node(1.0);
        b.add_lane(n0, n1, LaneKind::Straight, LaneGeometry::new(20.0, 5.0, 8.0));
        let topo = b.build().unwrap();
        // No go phases at all: everything is red forever.
        let policy = LightPolicy::new(vec![Phase::new(
            Vec::new(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        )]);
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, Vehicle::new(VehicleId(1), n0, n1, 1.0));
        run(&mut state, &topo, &policy, 1);
        admit(&mut state, &topo, &policy, Vehicle::new(VehicleId(2), n0, n1, 1.0));
        run(&mut state, &topo, &policy, 10);

        let head = state.pod(VehicleId(1)).unwrap();
        let tail = state.pod(VehicleId(2)).unwrap();
        assert_eq!((head.rank(), head.position()), (Some(0), 5.0));
        assert_eq!((tail.rank(), tail.position()), (Some(1), 4.0));
    }

    #[test]
    fn eviction_sweeps_the_stale_world_slot() {
        let (topo, la, lb, lc) = cross();
        let policy = light_for(la, lb, lc);
        let mut state = ControlState::new(&topo);

        // The red-lane pod is admitted first and owns the world head; the
        // green-lane pod crosses and leaves while never becoming head.
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(1), NodeId(3)));
        admit(&mut state, &topo, &policy, vehicle(2, NodeId(0), NodeId(2)));
        run(&mut state, &topo, &policy, 13);

        assert_eq!(state.take_exited().len(), 1);
        assert_eq!(state.pod_count(), 1);
        assert_eq!(state.world_len(), 1, "exited pod's slot swept at eviction");
        assert_eq!(state.world_head(), Some(VehicleId(1)));
    }

    #[test]
    fn board_reports_go_and_colors_per_slot() {
        let (_, la, lb, lc) = cross();
        let hour = Duration::from_secs(3600);
        let board = SignalBoard::new(vec![
            Phase::new(vec![la, lc], hour, hour),
            Phase::new(vec![lb], hour, hour),
        ]);

        assert!(board.is_go(la));
        assert!(!board.is_go(lb));
        assert_eq!(board.color_of(la), SignalColor::Green);
        assert_eq!(board.color_of(lb), SignalColor::Red);

        board.advance(); // phase 0 yellow
        assert!(!board.is_go(la), "yellow is not go");
        assert_eq!(board.color_of(la), SignalColor::Yellow);

        board.advance(); // phase 1 green
        assert!(board.is_go(lb));
        assert_eq!(board.phase_index(), 1);

        board.advance();
        board.advance(); // wraps to phase 0 green
        assert!(board.is_go(la));
        assert_eq!(board.color_of(la), SignalColor::Green);
    }
}

// ── Stop policy ───────────────────────────────────────────────────────────────

mod stop_policy {
    use super::*;

    #[test]
    fn holds_at_the_line_then_releases() {
        let (topo, _, _, _) = cross();
        let policy = StopPolicy::new();
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));

        // Four driving ticks to the line, arming tick 5.
        run(&mut state, &topo, &policy, 5);
        let pod = state.pod(VehicleId(1)).unwrap();
        assert_eq!(pod.position(), 40.0);
        assert_eq!(pod.countdown(), Some(3));
        assert_eq!(pod.vehicle().current_speed(), 0.0);

        // Three held ticks, then the release tick pops both queues.
        run(&mut state, &topo, &policy, 3);
        assert_eq!(state.pod(VehicleId(1)).unwrap().position(), 40.0);
        run(&mut state, &topo, &policy, 1);
        let pod = state.pod(VehicleId(1)).unwrap();
        assert_eq!(pod.position(), 50.0);
        assert_eq!(state.lane_len(NodeId(0)), 0);
        assert_eq!(state.world_len(), 0);

        // Through and out: the four stationary ticks become the wait.
        run(&mut state, &topo, &policy, 7);
        let exited = state.take_exited();
        assert_eq!(exited.len(), 1);
        assert_eq!(exited[0].wait_ticks(), 4);
    }

    #[test]
    fn releases_in_admission_order_across_origins() {
        let (topo, _, _, _) = cross();
        let policy = StopPolicy::new();
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        admit(&mut state, &topo, &policy, vehicle(2, NodeId(1), NodeId(3)));
        admit(&mut state, &topo, &policy, vehicle(3, NodeId(2), NodeId(0)));

        let mut order = Vec::new();
        for _ in 0..30 {
            engine::run_tick(&mut state, &topo, &policy);
            for v in state.take_exited() {
                order.push((v.id(), v.wait_ticks()));
            }
        }
        assert_eq!(
            order,
            vec![(VehicleId(1), 4), (VehicleId(2), 5), (VehicleId(3), 6)],
            "strict admission order, one extra held tick each"
        );
    }

    #[test]
    fn ready_pod_waits_for_the_world_head() {
        // The first-admitted pod has a longer approach (6 ticks vs 4), so the
        // second is hold-complete first but must still wait its global turn.
        let mut b = IntersectionBuilder::new();
        let n0 = b.add_node(10.0);
        let n1 = b.add_node(10.0);
        let n2 = b.add_node(10.0);
        let n3 = b.add_node(10.0);
        b.add_lane(n0, n2, LaneKind::Straight, LaneGeometry::new(120.0, 60.0, 80.0));
        b.add_lane(n1, n3, LaneKind::Straight, LaneGeometry::new(100.0, 40.0, 60.0));
        let topo = b.build().unwrap();
        let policy = StopPolicy::new();
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, vehicle(1, n0, n2));
        admit(&mut state, &topo, &policy, vehicle(2, n1, n3));

        // Tick 9 leaves the short-lane pod hold-complete at its line while
        // the long-lane pod is still serving its own hold.
        run(&mut state, &topo, &policy, 10);
        assert_eq!(state.pod(VehicleId(2)).unwrap().position(), 40.0);
        assert_eq!(state.pod(VehicleId(2)).unwrap().countdown(), Some(0));
        assert_eq!(state.world_head(), Some(VehicleId(1)));

        // The long-lane pod releases on tick 11; the short one follows.
        run(&mut state, &topo, &policy, 1);
        assert_eq!(state.pod(VehicleId(1)).unwrap().position(), 70.0);
        assert_eq!(state.pod(VehicleId(2)).unwrap().position(), 40.0);
        run(&mut state, &topo, &policy, 1);
        assert_eq!(state.pod(VehicleId(2)).unwrap().position(), 50.0);
    }

    #[test]
    fn follower_snaps_behind_and_inherits_the_line() {
        let (topo, _, _, _) = cross();
        let policy = StopPolicy::new();
        let mut state = ControlState::new(&topo);

        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        run(&mut state, &topo, &policy, 1);
        admit(&mut state, &topo, &policy, vehicle(2, NodeId(0), NodeId(2)));

        // The follower lands exactly one rank unit behind the line.
        run(&mut state, &topo, &policy, 4);
        let follower = state.pod(VehicleId(2)).unwrap();
        assert_eq!(follower.rank(), Some(1));
        assert_eq!(follower.position(), 39.0);

        // The leader releases on tick 8; the follower is reranked, snaps the
        // last unit to the line on tick 9, and arms its own hold.
        run(&mut state, &topo, &policy, 5);
        assert_eq!(state.lane_head(NodeId(0)), Some(VehicleId(2)));
        let follower = state.pod(VehicleId(2)).unwrap();
        assert_eq!((follower.rank(), follower.position()), (Some(0), 40.0));
        run(&mut state, &topo, &policy, 1);
        assert_eq!(state.pod(VehicleId(2)).unwrap().countdown(), Some(3));
    }
}

// ── Engine-level behavior ─────────────────────────────────────────────────────

mod engine_behavior {
    use super::*;

    #[test]
    fn origin_admits_at_most_once_per_tick() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        assert!(engine::origin_clear(&state, NodeId(0)));
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(2)));
        assert!(!engine::origin_clear(&state, NodeId(0)), "same tick");
        assert!(engine::origin_clear(&state, NodeId(1)), "other origins unaffected");

        run(&mut state, &topo, &policy, 1);
        assert!(engine::origin_clear(&state, NodeId(0)), "next tick");
    }

    #[test]
    fn unknown_lane_parks_the_vehicle_unadmitted() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        // No lane connects n0 to n1.
        let result = engine::admit_vehicle(&mut state, &topo, &policy, vehicle(1, NodeId(0), NodeId(1)));
        assert!(matches!(result, Err(ControlError::UnknownLane { .. })));
        assert_eq!(state.pod_count(), 0);

        let parked = state.take_exited();
        assert_eq!(parked.len(), 1);
        assert!(!parked[0].is_controlled());
        assert!(!parked[0].has_exited());
    }

    #[test]
    fn already_controlled_vehicle_rejected() {
        let (topo, _, _, _) = cross();
        let policy = AutoPolicy::new();
        let mut state = ControlState::new(&topo);

        let mut v = vehicle(1, NodeId(0), NodeId(2));
        v.set_controlled(true);
        let result = engine::admit_vehicle(&mut state, &topo, &policy, v);
        assert!(matches!(result, Err(ControlError::AlreadyControlled(_))));
        assert_eq!(state.pod_count(), 0);
    }

    #[test]
    fn all_held_tick_moves_nothing() {
        // Everything red: the pod parks at the line, and further ticks only
        // advance the clock.
        let (topo, _, _, _) = cross();
        let policy = LightPolicy::new(vec![Phase::new(
            Vec::new(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        )]);
        let mut state = ControlState::new(&topo);
        admit(&mut state, &topo, &policy, vehicle(1, NodeId(1), NodeId(3)));
        run(&mut state, &topo, &policy, 6);

        let position = state.pod(VehicleId(1)).unwrap().position();
        let (lanes, world, now) = (state.lane_len(NodeId(1)), state.world_len(), state.now());
        run(&mut state, &topo, &policy, 2);

        assert_eq!(state.pod(VehicleId(1)).unwrap().position(), position);
        assert_eq!(state.lane_len(NodeId(1)), lanes);
        assert_eq!(state.world_len(), world);
        assert_eq!(state.now(), now.offset(2), "only the clock moves");
    }

    #[test]
    fn controlled_time_never_beats_the_kinematic_minimum() {
        // length / speed = 10 ticks on this lane; no policy beats it.
        let (topo, la, lb, lc) = cross();

        let mut state = ControlState::new(&topo);
        let (_, evicted) =
            run_to_exit(&mut state, &topo, &AutoPolicy::new(), vehicle(1, NodeId(0), NodeId(2)));
        assert!(evicted.since(Tick::ZERO) >= 10);

        let hour = Duration::from_secs(3600);
        let light = LightPolicy::new(vec![Phase::new(vec![la, lb, lc], hour, hour)]);
        let mut state = ControlState::new(&topo);
        let (_, evicted) =
            run_to_exit(&mut state, &topo, &light, vehicle(2, NodeId(0), NodeId(2)));
        assert!(evicted.since(Tick::ZERO) >= 10);

        let mut state = ControlState::new(&topo);
        let (_, evicted) =
            run_to_exit(&mut state, &topo, &StopPolicy::new(), vehicle(3, NodeId(0), NodeId(2)));
        assert!(evicted.since(Tick::ZERO) >= 10);
    }
}

// ── Threaded controller ───────────────────────────────────────────────────────

mod controller_harness {
    use super::*;

    fn fast_config() -> ControlConfig {
        ControlConfig {
            tick_interval:  Duration::from_millis(1),
            admission_poll: Duration::from_micros(200),
        }
    }

    #[test]
    fn lifecycle_start_and_stop_once() {
        let (topo, _, _, _) = cross();
        let mut controller = Controller::new(Arc::new(topo), AutoPolicy::new(), fast_config());

        assert!(!controller.is_running());
        controller.start().unwrap();
        assert!(controller.is_running());
        assert!(matches!(controller.start(), Err(ControlError::AlreadyRunning)));

        controller.stop().unwrap();
        assert!(!controller.is_running());
        assert!(matches!(controller.stop(), Err(ControlError::NotRunning)));
    }

    #[test]
    fn submit_validates_endpoints_up_front() {
        let (topo, _, _, _) = cross();
        let controller = Controller::new(Arc::new(topo), AutoPolicy::new(), fast_config());

        let bad = controller.submit(vehicle(1, NodeId(0), NodeId(1)));
        assert!(matches!(bad, Err(ControlError::UnknownLane { .. })));
        assert_eq!(controller.pending(), 0);

        controller.submit(vehicle(2, NodeId(0), NodeId(2))).unwrap();
        assert_eq!(controller.pending(), 1);
    }

    #[test]
    fn drain_returns_everything_unstarted() {
        let (topo, _, _, _) = cross();
        let controller = Controller::new(Arc::new(topo), AutoPolicy::new(), fast_config());
        controller.submit(vehicle(1, NodeId(0), NodeId(2))).unwrap();
        controller.submit(vehicle(2, NodeId(1), NodeId(3))).unwrap();

        let released = controller.drain();
        assert_eq!(released.len(), 2);
        assert!(released.iter().all(|v| !v.is_controlled() && !v.has_exited()));
    }

    #[test]
    fn drain_preserves_recorded_waits() {
        let (topo, _, _, _) = cross();
        let mut controller = Controller::new(Arc::new(topo), AutoPolicy::new(), fast_config());
        controller.submit(vehicle(1, NodeId(0), NodeId(2))).unwrap();
        controller.start().unwrap();

        // Watch the pod appear, then disappear into the exit stream.
        let deadline = Instant::now() + Duration::from_secs(10);
        while controller.pod_of(VehicleId(1)).is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        while controller.pod_of(VehicleId(1)).is_some() {
            assert!(Instant::now() < deadline, "vehicle did not cross");
            std::thread::sleep(Duration::from_millis(1));
        }

        let released = controller.drain();
        assert_eq!(released.len(), 1);
        assert!(released[0].has_exited(), "exited before the drain");
        assert_eq!(released[0].wait_ticks(), 0, "free flow accrues no wait");
    }

    #[test]
    fn signal_cycler_walks_the_phases() {
        let (topo, la, lb, lc) = cross();
        let policy = LightPolicy::new(vec![
            Phase::new(vec![la, lc], Duration::from_millis(40), Duration::from_millis(10)),
            Phase::new(vec![lb], Duration::from_millis(40), Duration::from_millis(10)),
        ]);
        let board = policy.board();
        let mut controller = Controller::new(Arc::new(topo), policy, fast_config());
        controller.start().unwrap();

        // The background cycler must reach phase 1 on its own.
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut saw_phase_one = false;
        while Instant::now() < deadline {
            if board.phase_index() == 1 {
                saw_phase_one = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        controller.stop().unwrap();
        assert!(saw_phase_one, "cycler never advanced past phase 0");
    }

    #[test]
    fn threaded_run_crosses_all_submissions() {
        let (topo, _, _, _) = cross();
        let mut controller = Controller::new(Arc::new(topo), AutoPolicy::new(), fast_config());
        controller.submit(vehicle(1, NodeId(0), NodeId(2))).unwrap();
        controller.submit(vehicle(2, NodeId(1), NodeId(3))).unwrap();
        controller.submit(vehicle(3, NodeId(2), NodeId(0))).unwrap();
        controller.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut exited = Vec::new();
        while exited.len() < 3 && Instant::now() < deadline {
            exited.extend(controller.take_exited());
            std::thread::sleep(Duration::from_millis(2));
        }
        controller.stop().unwrap();

        assert_eq!(exited.len(), 3, "all vehicles crossed");
        assert!(exited.iter().all(Vehicle::has_exited));
        assert!(controller.current_tick() > Tick::ZERO);
    }

    #[test]
    fn snapshot_and_pod_of_expose_the_crossing() {
        let (topo, la, _, _) = cross();
        let mut controller = Controller::new(
            Arc::new(topo),
            StopPolicy::new(),
            ControlConfig {
                tick_interval:  Duration::from_millis(2),
                admission_poll: Duration::from_micros(200),
            },
        );
        controller.submit(vehicle(7, NodeId(0), NodeId(2))).unwrap();
        controller.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = None;
        while seen.is_none() && Instant::now() < deadline {
            seen = controller.pod_of(VehicleId(7));
            std::thread::sleep(Duration::from_millis(1));
        }
        controller.stop().unwrap();

        let view = seen.expect("pod observed while crossing");
        assert_eq!(view.vehicle, VehicleId(7));
        assert_eq!(view.lane, la);
        assert!(view.position >= 0.0);
        assert_eq!(view.rank, Some(0));
        assert_eq!(controller.pod_of(VehicleId(99)), None);

        let rows = controller.snapshot();
        assert!(rows.len() <= 1);
    }
}
