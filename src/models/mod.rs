//! Typed records shared by both channels (spec §3).

mod egm;
mod motion;
mod rapid;

pub use egm::EgmRobotState;
pub use motion::{JointTarget, RobTarget, RobTargetConfig};
pub use rapid::{
    LogMessageType, RapidEventLogEntry, RapidExecutionState, RapidIpcMessage, RapidSignal,
};
