//! The classic four-way single-lane intersection.
//!
//! Four entry/exit nodes under one speed limit and one lane per ordered node
//! pair, twelve in all, each 100 units long with the conflict zone at
//! [40, 60].  Turn kind and the concurrency whitelist follow from node
//! arithmetic: from node `i`, node `i+1` (mod 4) is the right-turn exit,
//! `i+2` the straight-across exit, `i+3` the left-turn exit.

use std::time::Duration;

use xing_control::Phase;
use xing_core::{LaneId, NodeId};
use xing_topology::{Intersection, IntersectionBuilder, LaneGeometry, LaneKind, TopologyResult};

pub const LANE_LENGTH: f64 = 100.0;
pub const ZONE_BEGIN:  f64 = 40.0;
pub const ZONE_END:    f64 = 60.0;

/// Signal dwells: the turn phases get a short window, the straight phases a
/// long one.
const TURN_GREEN:      Duration = Duration::from_secs(3);
const TURN_YELLOW:     Duration = Duration::from_secs(2);
const STRAIGHT_GREEN:  Duration = Duration::from_secs(7);
const STRAIGHT_YELLOW: Duration = Duration::from_secs(3);

/// Build the intersection.
///
/// Returns it together with the lane id for every ordered `(source,
/// destination)` node pair; the diagonal stays `None`.
pub fn four_way(speed_limit: f64) -> TopologyResult<(Intersection, [[Option<LaneId>; 4]; 4])> {
    let mut b = IntersectionBuilder::new();
    let nodes: [NodeId; 4] = std::array::from_fn(|_| b.add_node(speed_limit));
    let geometry = LaneGeometry::new(LANE_LENGTH, ZONE_BEGIN, ZONE_END);

    let mut lanes = [[None; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            if i == j {
                continue;
            }
            let kind = match (j + 4 - i) % 4 {
                1 => LaneKind::Right,
                2 => LaneKind::Straight,
                _ => LaneKind::Left,
            };
            lanes[i][j] = Some(b.add_lane(nodes[i], nodes[j], kind, geometry));
        }
    }

    for i in 0..4 {
        for j in 0..4 {
            let Some(lane) = lanes[i][j] else { continue };
            match (j + 4 - i) % 4 {
                // A right turn hugs its corner: everything not sharing its
                // source or its destination may run concurrently.
                1 => {
                    for k in 0..4 {
                        for l in 0..4 {
                            if k != l && k != i && l != j {
                                if let Some(other) = lanes[k][l] {
                                    b.allow(lane, other);
                                }
                            }
                        }
                    }
                }
                // A straight admits the opposing straight and the two right
                // turns that stay clear of its path.
                2 => {
                    for (k, l) in [
                        ((i + 2) % 4, (j + 2) % 4),
                        ((i + 2) % 4, (j + 1) % 4),
                        ((i + 3) % 4, (j + 2) % 4),
                    ] {
                        if let Some(other) = lanes[k][l] {
                            b.allow(lane, other);
                        }
                    }
                }
                // A left admits the opposing left and the two clear rights.
                _ => {
                    for (k, l) in [
                        ((i + 1) % 4, (j + 3) % 4),
                        ((i + 2) % 4, (j + 2) % 4),
                        ((i + 3) % 4, (j + 1) % 4),
                    ] {
                        if let Some(other) = lanes[k][l] {
                            b.allow(lane, other);
                        }
                    }
                }
            }
        }
    }

    Ok((b.build()?, lanes))
}

/// The four-phase signal plan: turns then straights, axis by axis.
///
/// Each phase greens one compatible set — two opposing turns plus the two
/// right turns clear of them, or two opposing straights plus theirs.  Right
/// turns appear in two phases each.
pub fn light_phases(lanes: &[[Option<LaneId>; 4]; 4]) -> Vec<Phase> {
    let set = |pairs: [(usize, usize); 4]| -> Vec<LaneId> {
        pairs.iter().filter_map(|&(i, j)| lanes[i][j]).collect()
    };
    vec![
        Phase::new(set([(0, 3), (2, 1), (3, 0), (1, 2)]), TURN_GREEN, TURN_YELLOW),
        Phase::new(set([(0, 2), (2, 0), (0, 1), (2, 3)]), STRAIGHT_GREEN, STRAIGHT_YELLOW),
        Phase::new(set([(1, 0), (3, 2), (0, 1), (2, 3)]), TURN_GREEN, TURN_YELLOW),
        Phase::new(set([(1, 3), (3, 1), (1, 2), (3, 0)]), STRAIGHT_GREEN, STRAIGHT_YELLOW),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_lanes_with_symmetric_compatibility() {
        let (topo, lanes) = four_way(10.0).unwrap();
        assert_eq!(topo.node_count(), 4);
        assert_eq!(topo.lane_count(), 12);

        // Every listed compatibility is mutual.
        for lane in topo.lanes() {
            for other in topo.lanes() {
                if lane.allows(other.id) {
                    assert!(other.allows(lane.id), "{} vs {}", lane.id, other.id);
                }
            }
        }

        // Opposing straights may share the zone; same-origin lanes never do.
        let l02 = lanes[0][2].unwrap();
        let l20 = lanes[2][0].unwrap();
        let l03 = lanes[0][3].unwrap();
        assert!(topo.lane(l02).unwrap().allows(l20));
        assert!(!topo.lane(l02).unwrap().allows(l03));
    }

    #[test]
    fn every_lane_gets_a_green() {
        let (_, lanes) = four_way(10.0).unwrap();
        let phases = light_phases(&lanes);
        assert_eq!(phases.len(), 4);

        for i in 0..4 {
            for j in 0..4 {
                let Some(lane) = lanes[i][j] else { continue };
                assert!(
                    phases.iter().any(|p| p.go.contains(&lane)),
                    "lane {i}->{j} never green"
                );
            }
        }
    }
}
