//! Stateless EGM codec, spec §4 component 1: "encodes a correction message
//! and decodes a feedback message from byte buffers".
//!
//! The protobuf wire format itself comes from `egm-proto` (an external
//! collaborator per spec §1); this module only converts between the
//! generated types and the library's radian/metre records.

use crate::error::EgmError;
use crate::models::EgmRobotState;
use egm_proto::{
    egm_header::MessageType, egm_motor_state::MotorStateType,
    egm_rapid_ctrl_exec_state::RapidCtrlExecState, EgmHeader, EgmJoints, EgmPlanned, EgmRobot,
    EgmSensor,
};
use prost::Message;

/// Decode a feedback datagram received from the controller.
///
/// Absent optional fields map to `None`/`false` per spec §4.1. Joint
/// angles are converted degrees → radians.
pub fn decode_feedback(buf: &[u8]) -> Result<EgmRobotState, EgmError> {
    let robot_message = EgmRobot::decode(buf)?;

    let joint_angles = robot_message
        .feed_back
        .as_ref()
        .and_then(|fb| fb.joints.as_ref())
        .map(|j| j.joints.iter().map(|deg| crate::units::deg_to_rad(*deg)).collect());

    let rapid_running = robot_message
        .rapid_exec_state
        .as_ref()
        .and_then(|s| s.state)
        == Some(RapidCtrlExecState::RapidRunning as i32);

    let motors_on = robot_message
        .motor_state
        .as_ref()
        .and_then(|s| s.state)
        == Some(MotorStateType::MotorsOn as i32);

    Ok(EgmRobotState {
        joint_angles,
        rapid_running,
        motors_on,
        raw: robot_message,
    })
}

/// Build and serialize a correction message.
///
/// `joint_angles` (radians) are converted radians → degrees exactly once
/// per spec §4.1/§9 — the source's double-`rad2deg` bug is not reproduced.
pub fn encode_correction(seqno: u32, joint_angles: &[f64]) -> Vec<u8> {
    let joints_deg = joint_angles
        .iter()
        .map(|rad| crate::units::rad_to_deg(*rad))
        .collect();

    let msg = EgmSensor {
        header: Some(EgmHeader {
            seqno: Some(seqno),
            tm: None,
            mtype: Some(MessageType::MsgtypeCorrection as i32),
        }),
        planned: Some(EgmPlanned {
            joints: Some(EgmJoints {
                joints: joints_deg,
            }),
            cartesian: None,
        }),
    };

    let mut buf = Vec::new();
    msg.encode(&mut buf).expect("encoding to a Vec<u8> cannot fail");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use egm_proto::{EgmFeedBack, EgmMotorState, EgmRapidCtrlExecState};
    use std::f64::consts::PI;

    #[test]
    fn decode_applies_deg_to_rad_once_and_maps_flags() {
        let robot = EgmRobot {
            header: None,
            feed_back: Some(EgmFeedBack {
                joints: Some(EgmJoints {
                    joints: vec![0.0, 90.0, -45.0, 0.0, 180.0, 0.0],
                }),
                cartesian: None,
            }),
            rapid_exec_state: Some(EgmRapidCtrlExecState {
                state: Some(RapidCtrlExecState::RapidRunning as i32),
            }),
            motor_state: Some(EgmMotorState {
                state: Some(MotorStateType::MotorsOn as i32),
            }),
        };
        let mut buf = Vec::new();
        robot.encode(&mut buf).unwrap();

        let state = decode_feedback(&buf).unwrap();
        let angles = state.joint_angles.unwrap();
        assert!((angles[0] - 0.0).abs() < 1e-9);
        assert!((angles[1] - PI / 2.0).abs() < 1e-9);
        assert!((angles[2] - (-PI / 4.0)).abs() < 1e-9);
        assert!((angles[4] - PI).abs() < 1e-9);
        assert!(state.rapid_running);
        assert!(state.motors_on);
    }

    #[test]
    fn decode_absent_fields_map_to_none_and_false() {
        let robot = EgmRobot {
            header: None,
            feed_back: None,
            rapid_exec_state: None,
            motor_state: None,
        };
        let mut buf = Vec::new();
        robot.encode(&mut buf).unwrap();

        let state = decode_feedback(&buf).unwrap();
        assert!(state.joint_angles.is_none());
        assert!(!state.rapid_running);
        assert!(!state.motors_on);
    }

    #[test]
    fn encode_applies_single_rad_to_deg_conversion() {
        let buf = encode_correction(1, &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let sensor = EgmSensor::decode(buf.as_slice()).unwrap();
        assert_eq!(sensor.header.unwrap().seqno, Some(1));
        let joints = sensor.planned.unwrap().joints.unwrap().joints;
        assert_eq!(joints, vec![0.0; 6]);
    }
}
