use egm_proto::{
    egm_header::MessageType, egm_motor_state::MotorStateType,
    egm_rapid_ctrl_exec_state::RapidCtrlExecState, EgmFeedBack, EgmHeader, EgmJoints,
    EgmMotorState, EgmRapidCtrlExecState, EgmRobot, EgmSensor,
};
use prost::Message;
use std::time::Duration;
use tokio::net::UdpSocket;

/// A UDP peer standing in for the controller's side of the EGM channel:
/// sends feedback datagrams and can receive the correction datagrams the
/// endpoint under test emits.
pub struct FakeEgmPeer {
    socket: UdpSocket,
    endpoint_addr: std::net::SocketAddr,
}

impl FakeEgmPeer {
    pub async fn connect(endpoint_addr: std::net::SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        FakeEgmPeer {
            socket,
            endpoint_addr,
        }
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// Send one feedback datagram with the given joint angles (degrees).
    pub async fn send_feedback(&self, joints_deg: &[f64], rapid_running: bool, motors_on: bool) {
        let msg = EgmRobot {
            header: Some(EgmHeader {
                seqno: Some(1),
                tm: Some(0),
                mtype: Some(MessageType::MsgtypeCorrection as i32),
            }),
            feed_back: Some(EgmFeedBack {
                joints: Some(EgmJoints {
                    joints: joints_deg.to_vec(),
                }),
                cartesian: None,
            }),
            rapid_exec_state: Some(EgmRapidCtrlExecState {
                state: Some(if rapid_running {
                    RapidCtrlExecState::RapidRunning as i32
                } else {
                    RapidCtrlExecState::RapidStopped as i32
                }),
            }),
            motor_state: Some(EgmMotorState {
                state: Some(if motors_on {
                    MotorStateType::MotorsOn as i32
                } else {
                    MotorStateType::MotorsOff as i32
                }),
            }),
        };
        let mut buf = Vec::new();
        msg.encode(&mut buf).unwrap();
        self.socket.send_to(&buf, self.endpoint_addr).await.unwrap();
    }

    /// Receive the next correction datagram, decoded, with a timeout.
    pub async fn recv_correction(&self, timeout: Duration) -> Option<EgmSensor> {
        let mut buf = [0u8; 4096];
        let (n, _addr) = tokio::time::timeout(timeout, self.socket.recv_from(&mut buf))
            .await
            .ok()?
            .ok()?;
        EgmSensor::decode(&buf[..n]).ok()
    }
}
