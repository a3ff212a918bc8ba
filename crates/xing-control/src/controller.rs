//! The running controller: two worker tasks over one locked state bundle.
//!
//! An admission task polls the entry queue and hands vehicles to the engine
//! whenever their origin is clear this tick; an update task runs one engine
//! tick per configured interval.  Policies may add background tasks of their
//! own (the signal cycler).  Stop is cooperative: every task polls one shared
//! flag at loop top and finishes its in-flight iteration before exiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{error, info};
use xing_core::{ControlConfig, Tick, VehicleId};
use xing_topology::Intersection;
use xing_vehicle::Vehicle;

use crate::engine;
use crate::error::{ControlError, ControlResult};
use crate::policy::ControlPolicy;
use crate::state::ControlState;
use crate::view::PodView;

/// Everything the worker tasks share.
///
/// Lock order: `entry` before `state`.  The admission task is the only code
/// path holding both; the update task and all read accessors take `state`
/// alone, and [`Controller::submit`] takes `entry` alone.
struct Shared<P> {
    config:       ControlConfig,
    intersection: Arc<Intersection>,
    policy:       P,
    entry:        Mutex<VecDeque<Vehicle>>,
    state:        Mutex<ControlState>,
    active:       Arc<AtomicBool>,
}

/// A poisoned guard still holds a consistent bundle: every mutation path
/// completes under the lock without unwinding mid-structure.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Worker loops ──────────────────────────────────────────────────────────────

fn admission_loop<P: ControlPolicy>(shared: &Shared<P>) {
    while shared.active.load(Ordering::Relaxed) {
        if !try_admit(shared) {
            thread::sleep(shared.config.admission_poll);
        }
    }
}

/// One admission attempt.  False when nothing could be admitted: empty entry
/// queue, or the candidate's origin already admitted on this tick.  The
/// vehicle stays queued and is re-examined next poll.
fn try_admit<P: ControlPolicy>(shared: &Shared<P>) -> bool {
    let mut entry = lock_or_recover(&shared.entry);
    let Some(next) = entry.front() else {
        return false;
    };
    let origin = next.source();

    let mut state = lock_or_recover(&shared.state);
    if !engine::origin_clear(&state, origin) {
        return false;
    }
    let Some(vehicle) = entry.pop_front() else {
        return false;
    };
    if let Err(err) =
        engine::admit_vehicle(&mut state, &shared.intersection, &shared.policy, vehicle)
    {
        error!(%err, "admission rejected; vehicle parked in exit stream");
    }
    true
}

fn update_loop<P: ControlPolicy>(shared: &Shared<P>) {
    while shared.active.load(Ordering::Relaxed) {
        {
            let mut state = lock_or_recover(&shared.state);
            engine::run_tick(&mut state, &shared.intersection, &shared.policy);
        }
        thread::sleep(shared.config.tick_interval);
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

/// One intersection under one policy.
///
/// Owns the state bundle, the entry queue, and the worker threads.  External
/// code interacts through [`submit`](Self::submit) on the producer side and
/// [`snapshot`](Self::snapshot) / [`take_exited`](Self::take_exited) on the
/// consumer side; every accessor crosses the state lock.
pub struct Controller<P: ControlPolicy> {
    shared:  Arc<Shared<P>>,
    workers: Vec<JoinHandle<()>>,
}

impl<P: ControlPolicy> Controller<P> {
    pub fn new(intersection: Arc<Intersection>, policy: P, config: ControlConfig) -> Self {
        let state = ControlState::new(&intersection);
        Controller {
            shared: Arc::new(Shared {
                config,
                intersection,
                policy,
                entry: Mutex::new(VecDeque::new()),
                state: Mutex::new(state),
                active: Arc::new(AtomicBool::new(false)),
            }),
            workers: Vec::new(),
        }
    }

    pub fn intersection(&self) -> &Arc<Intersection> {
        &self.shared.intersection
    }

    pub fn policy(&self) -> &P {
        &self.shared.policy
    }

    /// Queue a vehicle for admission.  Validates that a lane connects its
    /// endpoints and that it is not already supervised; a rejected vehicle
    /// is dropped.
    pub fn submit(&self, vehicle: Vehicle) -> ControlResult<()> {
        if vehicle.is_controlled() {
            return Err(ControlError::AlreadyControlled(vehicle.id()));
        }
        if self
            .shared
            .intersection
            .lane_between(vehicle.source(), vehicle.destination())
            .is_none()
        {
            return Err(ControlError::UnknownLane {
                from:        vehicle.source(),
                destination: vehicle.destination(),
            });
        }
        lock_or_recover(&self.shared.entry).push_back(vehicle);
        Ok(())
    }

    /// Vehicles queued for admission but not yet admitted.
    pub fn pending(&self) -> usize {
        lock_or_recover(&self.shared.entry).len()
    }

    /// Spawn the admission task, the update task, and any policy background
    /// tasks.
    pub fn start(&mut self) -> ControlResult<()> {
        if self.shared.active.swap(true, Ordering::SeqCst) {
            return Err(ControlError::AlreadyRunning);
        }
        let shared = Arc::clone(&self.shared);
        self.workers.push(thread::spawn(move || admission_loop(&shared)));
        let shared = Arc::clone(&self.shared);
        self.workers.push(thread::spawn(move || update_loop(&shared)));
        self.workers
            .extend(self.shared.policy.start_background(&self.shared.active));
        info!(policy = self.shared.policy.name(), "controller started");
        Ok(())
    }

    /// Lower the flag and join every worker.  In-flight iterations complete;
    /// no tick or admission is cut short.
    pub fn stop(&mut self) -> ControlResult<()> {
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            return Err(ControlError::NotRunning);
        }
        for worker in self.workers.drain(..) {
            // A panicked worker already logged; the lock recovery path keeps
            // the survivors consistent.
            let _ = worker.join();
        }
        info!(policy = self.shared.policy.name(), "controller stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn current_tick(&self) -> Tick {
        lock_or_recover(&self.shared.state).now()
    }

    /// One view row per controlled pod, captured under the lock.
    pub fn snapshot(&self) -> Vec<PodView> {
        let state = lock_or_recover(&self.shared.state);
        state
            .pods()
            .filter_map(|pod| {
                self.shared
                    .intersection
                    .lane(pod.lane())
                    .map(|lane| PodView::capture(pod, lane))
            })
            .collect()
    }

    /// The view row for one vehicle, if it is currently supervised.
    pub fn pod_of(&self, vehicle: VehicleId) -> Option<PodView> {
        let state = lock_or_recover(&self.shared.state);
        let pod = state.pod(vehicle)?;
        let lane = self.shared.intersection.lane(pod.lane())?;
        Some(PodView::capture(pod, lane))
    }

    /// Collect vehicles that finished crossing since the last call.
    pub fn take_exited(&self) -> Vec<Vehicle> {
        lock_or_recover(&self.shared.state).take_exited()
    }

    /// Stop if running and hand back every vehicle the controller still
    /// owns: exited, mid-crossing (supervision flag cleared, not marked
    /// exited), and never admitted, in that order.
    pub fn drain(mut self) -> Vec<Vehicle> {
        if self.is_running() {
            let _ = self.stop();
        }
        let mut released = {
            let mut state = lock_or_recover(&self.shared.state);
            let mut out = state.take_exited();
            for pod in state.pods.drain(..) {
                let mut vehicle = pod.into_vehicle();
                vehicle.set_controlled(false);
                out.push(vehicle);
            }
            for queue in state.lane_queues.values_mut() {
                queue.clear();
            }
            state.world_queue.clear();
            out
        };
        released.extend(lock_or_recover(&self.shared.entry).drain(..));
        released
    }
}

impl<P: ControlPolicy> Drop for Controller<P> {
    fn drop(&mut self) {
        if self.shared.active.load(Ordering::SeqCst) {
            let _ = self.stop();
        }
    }
}
