//! Approach nodes and directed lanes.
//!
//! A lane is a straight, fixed-length path from one approach node to another
//! that passes through the shared intersection square.  Positions along a
//! lane are scalar distances from its start:
//!
//! ```text
//! 0 ─────────── begin_intersection ═══════ end_intersection ─────────── length
//!    approach        │        intersection zone       │        exit leg
//! ```
//!
//! Which lanes may occupy the zone at the same time is pure data: each lane
//! carries an `allowed` set filled in by the topology builder, and the
//! controller only ever asks [`Lane::allows`].  Nothing in the engine knows
//! about turn geometry beyond the [`LaneKind`] tag the builder used to derive
//! those sets.

use rustc_hash::FxHashSet;
use xing_core::{LaneId, NodeId};

// ── Node ──────────────────────────────────────────────────────────────────────

/// An approach point of an intersection — one end of a set of lanes.
///
/// Immutable once the topology is built.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,

    /// Identifier of the intersection this node belongs to.  Single-
    /// intersection runs leave it at the builder default.
    pub intersection: u32,

    /// Speed limit for traffic departing this node, in distance units per
    /// tick.  Strictly positive (enforced by the builder).
    pub speed_limit: f64,
}

// ── LaneKind ──────────────────────────────────────────────────────────────────

/// Turn geometry of a lane through the intersection.
///
/// The engine never branches on this; it exists so topology constructors can
/// derive compatibility sets and so views can label lanes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneKind {
    Right,
    Straight,
    Left,
}

// ── LaneGeometry ──────────────────────────────────────────────────────────────

/// Scalar geometry of a lane: total length and the sub-interval occupied by
/// the intersection zone.  Validated by the builder:
/// `0 ≤ begin ≤ end ≤ length`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneGeometry {
    pub length: f64,
    pub begin_intersection: f64,
    pub end_intersection: f64,
}

impl LaneGeometry {
    pub fn new(length: f64, begin_intersection: f64, end_intersection: f64) -> Self {
        Self { length, begin_intersection, end_intersection }
    }

    /// True iff the zone bounds are ordered and inside the lane.
    pub(crate) fn is_valid(&self) -> bool {
        self.begin_intersection >= 0.0
            && self.begin_intersection <= self.end_intersection
            && self.end_intersection <= self.length
            && self.length.is_finite()
    }
}

// ── Lane ──────────────────────────────────────────────────────────────────────

/// A directed lane between two nodes, immutable after construction.
///
/// Endpoint speed limits are copied out of the nodes at build time: the graph
/// never changes afterwards, and the controller reads them once per pod per
/// tick, so chasing a `NodeId` through the topology on that path buys
/// nothing.
#[derive(Clone, Debug)]
pub struct Lane {
    pub id: LaneId,
    pub source: NodeId,
    pub destination: NodeId,
    pub kind: LaneKind,

    pub length: f64,
    pub begin_intersection: f64,
    pub end_intersection: f64,

    /// Speed limit of the source node — approach speed.
    pub source_speed: f64,
    /// Speed limit of the destination node — crossing and exit speed.
    pub destination_speed: f64,

    /// Lanes permitted to occupy the intersection zone concurrently with
    /// this one.  Not necessarily symmetric; the builder offers
    /// `allow_mutual` for the common case.
    pub(crate) allowed: FxHashSet<LaneId>,
}

impl Lane {
    /// The compatibility oracle: may `other` occupy the zone while this lane
    /// does?  A lane never lists itself.
    #[inline]
    pub fn allows(&self, other: LaneId) -> bool {
        self.allowed.contains(&other)
    }

    /// Ticks a vehicle needs to traverse the intersection zone at the
    /// destination speed limit, truncated to whole ticks.
    #[inline]
    pub fn crossing_ticks(&self) -> u64 {
        ((self.end_intersection - self.begin_intersection) / self.destination_speed) as u64
    }

    /// Ticks from the lane start to the intersection zone at the source
    /// speed limit, truncated to whole ticks.
    #[inline]
    pub fn approach_ticks(&self) -> u64 {
        (self.begin_intersection / self.source_speed) as u64
    }

    /// Nominal ticks under control with zero congestion: approach + zone +
    /// exit leg, plus the tick in which the controller detects the vehicle
    /// past the lane end and evicts it.
    pub fn free_flow_ticks(&self) -> u64 {
        let exit_leg = ((self.length - self.end_intersection) / self.destination_speed) as u64;
        self.approach_ticks() + self.crossing_ticks() + exit_leg + 1
    }
}
