//! `xing-core` — foundational types for the `rust_xing` intersection-control
//! engine.
//!
//! This crate is a dependency of every other `xing-*` crate.  It has no
//! `xing-*` dependencies and no required external ones (optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                   |
//! |------------|--------------------------------------------|
//! | [`ids`]    | `NodeId`, `LaneId`, `VehicleId`            |
//! | [`time`]   | `Tick`                                     |
//! | [`config`] | `ControlConfig`                            |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod config;
pub mod ids;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::ControlConfig;
pub use ids::{LaneId, NodeId, VehicleId};
pub use time::Tick;
