//! `xing-topology` — the static intersection graph consumed by the
//! controller.
//!
//! # Crate layout
//!
//! | Module           | Contents                                            |
//! |------------------|-----------------------------------------------------|
//! | [`lane`]         | `Node`, `Lane`, `LaneKind`, `LaneGeometry`          |
//! | [`intersection`] | `Intersection` lookup surface + `IntersectionBuilder` |
//! | [`error`]        | `TopologyError`, `TopologyResult<T>`                |
//!
//! # Design notes
//!
//! The controller treats the topology as opaque immutable data: it resolves
//! a lane from a `(source, destination)` node pair at admission and asks
//! `Lane::allows` when scheduling.  Concrete geometries (which lanes exist,
//! which may cross together) are the business of whoever builds the
//! [`Intersection`] — application code and tests, never the engine.

pub mod error;
pub mod intersection;
pub mod lane;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{TopologyError, TopologyResult};
pub use intersection::{Intersection, IntersectionBuilder};
pub use lane::{Lane, LaneGeometry, LaneKind, Node};
