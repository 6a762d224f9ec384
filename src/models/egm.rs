/// Decoded EGM feedback, spec §3.
///
/// `joint_angles` is in radians, length 6 or 7 depending on what the
/// message carried (spec §9: "accept and preserve whatever the message
/// carries; the caller selects"). `raw` is the undecoded protobuf message,
/// retained for diagnostics.
#[derive(Debug, Clone)]
pub struct EgmRobotState {
    pub joint_angles: Option<Vec<f64>>,
    pub rapid_running: bool,
    pub motors_on: bool,
    pub raw: egm_proto::EgmRobot,
}
