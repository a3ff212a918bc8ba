//! `xing-control` — intersection control core for the rust_xing engine.
//!
//! One [`Controller`] supervises every vehicle crossing one intersection.  A
//! submitted [`Vehicle`](xing_vehicle::Vehicle) is wrapped in a [`Pod`] at
//! admission, sequenced by the active [`ControlPolicy`], stepped once per
//! tick, and handed back through the exit stream once it clears its lane.
//!
//! # Tick anatomy
//!
//! ```text
//! lock state
//!   ① Fan-out — one read-only Motion per pod, via ControlPolicy::pod_action
//!               (parallel with the `parallel` feature).
//!   ② Fan-in  — apply sequentially:
//!                 move pods, step countdowns
//!                 pop claimed lane-queue / world-queue heads
//!                 evict pods past their lane end (wait time recorded)
//!                 reassign lane ranks where queues shrank
//!   ③ globalTime += 1
//! unlock, sleep tick_interval
//! ```
//!
//! Concurrently, the admission task polls the entry queue and admits at most
//! one vehicle per origin per tick (see [`Controller`]).
//!
//! # Policies
//!
//! | Policy                     | Sequencing                                        |
//! |----------------------------|---------------------------------------------------|
//! | [`AutoPolicy`]             | conflict-free entry intervals assigned at admission |
//! | [`LightPolicy`]            | fixed signal phases on a wall-clock cycle         |
//! | [`StopPolicy`]             | global admission FIFO with a mandatory stop hold  |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                          |
//! |------------|-------------------------------------------------|
//! | `parallel` | Runs the motion fan-out on Rayon's thread pool. |

pub mod controller;
mod engine;
pub mod error;
pub mod pod;
pub mod policy;
pub mod state;
pub mod view;

#[cfg(test)]
mod tests;

pub use controller::Controller;
pub use error::{ControlError, ControlResult};
pub use pod::{Motion, Pod, Zone};
pub use policy::{AutoPolicy, ControlPolicy, LightPolicy, Phase, SignalBoard, SignalColor, StopPolicy};
pub use state::{ControlState, WorldSlot};
pub use view::PodView;
