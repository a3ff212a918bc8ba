//! The `ControlPolicy` trait and its three implementations.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;

use xing_core::VehicleId;
use xing_topology::Lane;

use crate::pod::{Motion, Pod};
use crate::state::ControlState;

mod auto;
mod light;
mod stop;

pub use auto::AutoPolicy;
pub use light::{LightPolicy, Phase, SignalBoard, SignalColor};
pub use stop::StopPolicy;

/// How one intersection sequences its traffic.
///
/// A policy contributes two decisions and never owns state of its own beyond
/// immutable configuration: the per-admission placement of a new pod into the
/// world queue, and the per-pod per-tick [`Motion`].
///
/// # Thread safety
///
/// [`pod_action`][Self::pod_action] may be called for many pods in parallel
/// via Rayon, so implementations must be `Send + Sync`.  Anything that varies
/// per pod lives in the [`Pod`] itself or in [`ControlState`], both handed in
/// read-only; mutable policy-side state would race.
///
/// # Calling contract
///
/// `admit` runs after the shared admission steps: the pod already sits in the
/// controlled set and at the back of its origin's lane queue (reranked when
/// [`uses_ranks`][Self::uses_ranks] is true).  `pod_action` runs in the
/// read-only phase of a tick; every queue mutation it wants must go through
/// the deferred [`Motion`] flags, never through `ControlState` directly.
pub trait ControlPolicy: Send + Sync + 'static {
    /// Short human-readable policy name for logs.
    fn name(&self) -> &'static str;

    /// Whether queued pods stack behind the stop line by lane-queue rank.
    /// When true, the engine reassigns ranks on every admission and every
    /// lane-queue pop.
    fn uses_ranks(&self) -> bool {
        false
    }

    /// Place a freshly admitted pod into the world queue and apply any
    /// policy-specific scheduling (the vehicle is identified by `vehicle`,
    /// its pod already in `state`).
    fn admit(&self, state: &mut ControlState, lane: &Lane, vehicle: VehicleId);

    /// Decide one pod's motion for this tick.  Read-only: runs concurrently
    /// with the same call for every other pod.
    fn pod_action(&self, pod: &Pod, lane: &Lane, state: &ControlState) -> Motion;

    /// Spawn any policy-owned background tasks (e.g. a signal cycler).
    /// Called once at controller start; tasks must exit once `active` is
    /// false.  Default: none.
    fn start_background(&self, _active: &Arc<AtomicBool>) -> Vec<JoinHandle<()>> {
        Vec::new()
    }
}
