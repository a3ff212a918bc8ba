//! `xing-vehicle` — the vehicle handle exchanged between the external
//! spawner and the controller.
//!
//! A [`Vehicle`] is plain owned data: the spawner constructs it, submits it
//! to a controller, and receives it back through the exit stream with its
//! wait time recorded.  All movement decisions happen in `xing-control`;
//! this crate only keeps the per-vehicle state those decisions read and
//! write.

pub mod vehicle;


pub use vehicle::{SpeedAdvice, Vehicle};
