//! EGM realtime channel scenarios, spec §8 scenarios 1–2.

use irc5_client::egm::EgmEndpoint;
use rws_test_utils::FakeEgmPeer;
use std::time::Duration;

#[tokio::test]
async fn feedback_decodes_joints_and_running_flag() {
    let endpoint = EgmEndpoint::bind(0).await.unwrap();
    let local_addr = endpoint.local_addr().unwrap();

    let peer = FakeEgmPeer::connect(local_addr).await;
    peer.send_feedback(&[0.0, 90.0, -45.0, 0.0, 180.0, 0.0], true, false)
        .await;

    let (ready, state) = endpoint.receive(Duration::from_secs(1)).await.unwrap();
    assert!(ready);
    let state = state.unwrap();

    let joints = state.joint_angles.expect("joints present");
    let expected = [
        0.0,
        std::f64::consts::FRAC_PI_2,
        -std::f64::consts::FRAC_PI_4,
        0.0,
        std::f64::consts::PI,
        0.0,
    ];
    for (got, want) in joints.iter().zip(expected.iter()) {
        assert!((got - want).abs() < 1e-9, "{got} vs {want}");
    }
    assert!(state.rapid_running);
    assert!(!state.motors_on);
}

#[tokio::test]
async fn send_after_first_receive_emits_seqno_one_to_observed_peer() {
    let endpoint = EgmEndpoint::bind(0).await.unwrap();
    let local_addr = endpoint.local_addr().unwrap();

    let peer = FakeEgmPeer::connect(local_addr).await;
    peer.send_feedback(&[0.0; 6], false, false).await;
    let (ready, _) = endpoint.receive(Duration::from_secs(1)).await.unwrap();
    assert!(ready);

    assert!(endpoint.send(&[0.0; 6]).await);
    let correction = peer
        .recv_correction(Duration::from_secs(1))
        .await
        .expect("correction datagram arrives");

    assert_eq!(correction.header.unwrap().seqno, Some(1));
    let planned_joints = correction.planned.unwrap().joints.unwrap().joints;
    assert_eq!(planned_joints, vec![0.0; 6]);
}
