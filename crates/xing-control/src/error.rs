use thiserror::Error;
use xing_core::{NodeId, VehicleId};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no lane connects {from} to {destination}")]
    UnknownLane {
        from:        NodeId,
        destination: NodeId,
    },

    #[error("vehicle {0} is already under intersection control")]
    AlreadyControlled(VehicleId),

    #[error("controller is already running")]
    AlreadyRunning,

    #[error("controller is not running")]
    NotRunning,
}

pub type ControlResult<T> = Result<T, ControlError>;
