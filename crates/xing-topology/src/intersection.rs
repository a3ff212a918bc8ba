//! Intersection graph and builder.
//!
//! The [`Intersection`] owns every [`Node`] and [`Lane`] and answers the four
//! lookups the controller consumes: node by id, lane by id, lane by endpoint
//! pair, and the table sizes.  It is immutable after [`IntersectionBuilder`]
//! validates and seals it, so the controller can share it freely across its
//! admission and update tasks without locking.

use rustc_hash::{FxHashMap, FxHashSet};
use xing_core::{LaneId, NodeId};

use crate::error::{TopologyError, TopologyResult};
use crate::lane::{Lane, LaneGeometry, LaneKind, Node};

// ── Intersection ──────────────────────────────────────────────────────────────

/// A sealed intersection topology: node table, lane table, and an
/// endpoint-pair index for admission-time lane resolution.
///
/// Construct through [`IntersectionBuilder`].
pub struct Intersection {
    id: u32,
    nodes: Vec<Node>,
    lanes: Vec<Lane>,
    by_endpoints: FxHashMap<(NodeId, NodeId), LaneId>,
}

impl Intersection {
    /// Identifier of this intersection (carried by every node).
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Look up a node; `None` for an id outside the table.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Look up a lane; `None` for an id outside the table.
    #[inline]
    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id.index())
    }

    /// Resolve the lane connecting `source` to `destination`, if one exists.
    /// This is the lookup admission performs for every arriving vehicle.
    #[inline]
    pub fn lane_between(&self, source: NodeId, destination: NodeId) -> Option<LaneId> {
        self.by_endpoints.get(&(source, destination)).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// All lanes, in id order.
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    /// All nodes, in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

// ── IntersectionBuilder ───────────────────────────────────────────────────────

/// Assemble an [`Intersection`] incrementally, then seal it with
/// [`build`](Self::build).
///
/// Nodes and lanes may be added in any order; compatibility edges are
/// declared between lane ids returned by [`add_lane`](Self::add_lane).
/// `build()` validates node references, zone bounds, speed limits, and
/// endpoint-pair uniqueness.
///
/// # Example
///
/// ```
/// use xing_topology::{IntersectionBuilder, LaneGeometry, LaneKind};
///
/// let mut b = IntersectionBuilder::new();
/// let north = b.add_node(10.0);
/// let south = b.add_node(10.0);
/// let geom = LaneGeometry::new(100.0, 40.0, 60.0);
/// let ns = b.add_lane(north, south, LaneKind::Straight, geom);
/// let sn = b.add_lane(south, north, LaneKind::Straight, geom);
/// b.allow_mutual(ns, sn);
/// let x = b.build().unwrap();
/// assert_eq!(x.lane_between(north, south), Some(ns));
/// assert!(x.lane(ns).unwrap().allows(sn));
/// ```
pub struct IntersectionBuilder {
    id: u32,
    speed_limits: Vec<f64>,
    raw_lanes: Vec<RawLane>,
    allow_edges: Vec<(LaneId, LaneId)>,
}

struct RawLane {
    source: NodeId,
    destination: NodeId,
    kind: LaneKind,
    geometry: LaneGeometry,
}

impl IntersectionBuilder {
    pub fn new() -> Self {
        Self::with_id(0)
    }

    /// Builder for an intersection with an explicit identifier.
    pub fn with_id(id: u32) -> Self {
        Self {
            id,
            speed_limits: Vec::new(),
            raw_lanes: Vec::new(),
            allow_edges: Vec::new(),
        }
    }

    /// Add an approach node with the given speed limit (distance units per
    /// tick) and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, speed_limit: f64) -> NodeId {
        let id = NodeId(self.speed_limits.len() as u32);
        self.speed_limits.push(speed_limit);
        id
    }

    /// Add a directed lane and return its `LaneId` (sequential from 0).
    pub fn add_lane(
        &mut self,
        source: NodeId,
        destination: NodeId,
        kind: LaneKind,
        geometry: LaneGeometry,
    ) -> LaneId {
        let id = LaneId(self.raw_lanes.len() as u32);
        self.raw_lanes.push(RawLane { source, destination, kind, geometry });
        id
    }

    /// Permit `other` to occupy the intersection zone concurrently with
    /// `lane`.  One-directional; see [`allow_mutual`](Self::allow_mutual).
    pub fn allow(&mut self, lane: LaneId, other: LaneId) {
        self.allow_edges.push((lane, other));
    }

    /// Permit `a` and `b` to occupy the zone concurrently with each other.
    pub fn allow_mutual(&mut self, a: LaneId, b: LaneId) {
        self.allow(a, b);
        self.allow(b, a);
    }

    pub fn node_count(&self) -> usize {
        self.speed_limits.len()
    }

    pub fn lane_count(&self) -> usize {
        self.raw_lanes.len()
    }

    /// Validate and seal the topology.
    pub fn build(self) -> TopologyResult<Intersection> {
        let node_count = self.speed_limits.len();
        let lane_count = self.raw_lanes.len();

        for (i, &limit) in self.speed_limits.iter().enumerate() {
            if !(limit > 0.0) || !limit.is_finite() {
                return Err(TopologyError::BadSpeedLimit(NodeId(i as u32)));
            }
        }

        let nodes: Vec<Node> = self
            .speed_limits
            .iter()
            .enumerate()
            .map(|(i, &speed_limit)| Node {
                id: NodeId(i as u32),
                intersection: self.id,
                speed_limit,
            })
            .collect();

        let mut by_endpoints = FxHashMap::default();
        let mut lanes = Vec::with_capacity(lane_count);
        for (i, raw) in self.raw_lanes.iter().enumerate() {
            let id = LaneId(i as u32);
            if raw.source.index() >= node_count {
                return Err(TopologyError::UnknownNode(raw.source));
            }
            if raw.destination.index() >= node_count {
                return Err(TopologyError::UnknownNode(raw.destination));
            }
            if raw.source == raw.destination {
                return Err(TopologyError::SelfLoop(raw.source));
            }
            if !raw.geometry.is_valid() {
                return Err(TopologyError::InvalidZone {
                    from: raw.source,
                    destination: raw.destination,
                });
            }
            if by_endpoints.insert((raw.source, raw.destination), id).is_some() {
                return Err(TopologyError::DuplicateLane {
                    from: raw.source,
                    destination: raw.destination,
                });
            }
            lanes.push(Lane {
                id,
                source: raw.source,
                destination: raw.destination,
                kind: raw.kind,
                length: raw.geometry.length,
                begin_intersection: raw.geometry.begin_intersection,
                end_intersection: raw.geometry.end_intersection,
                source_speed: self.speed_limits[raw.source.index()],
                destination_speed: self.speed_limits[raw.destination.index()],
                allowed: FxHashSet::default(),
            });
        }

        for &(lane, other) in &self.allow_edges {
            if other.index() >= lane_count {
                return Err(TopologyError::UnknownLane(other));
            }
            let entry = lanes
                .get_mut(lane.index())
                .ok_or(TopologyError::UnknownLane(lane))?;
            if lane != other {
                entry.allowed.insert(other);
            }
        }

        Ok(Intersection { id: self.id, nodes, lanes, by_endpoints })
    }
}

impl Default for IntersectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
