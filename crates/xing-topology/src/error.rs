//! Topology construction and lookup error type.

use thiserror::Error;

use xing_core::{LaneId, NodeId};

/// Errors produced by `xing-topology`.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("node {0} not found in topology")]
    UnknownNode(NodeId),

    #[error("lane {0} not found in topology")]
    UnknownLane(LaneId),

    #[error("lane from {0} back to itself is not a crossing")]
    SelfLoop(NodeId),

    #[error("duplicate lane {from} -> {destination}")]
    DuplicateLane { from: NodeId, destination: NodeId },

    #[error("lane {from} -> {destination} has an invalid intersection zone")]
    InvalidZone { from: NodeId, destination: NodeId },

    #[error("node {0} has a non-positive speed limit")]
    BadSpeedLimit(NodeId),
}

pub type TopologyResult<T> = Result<T, TopologyError>;
