//! RWS start/error scenario, spec §8 scenario 3.

use irc5_client::{RwsClient, RwsError};
use reqwest::{Method, StatusCode};
use rws_test_utils::FakeController;

#[tokio::test]
async fn start_once_succeeds_on_204() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(
        Method::POST,
        "rw/rapid/execution?action=start",
        StatusCode::NO_CONTENT,
        "",
    );

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    client.start("once").await.unwrap();

    let auth = controller.last_authorization().expect("digest auth sent");
    assert!(auth.starts_with("Digest "));
}

#[tokio::test]
async fn start_once_surfaces_controller_error() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(
        Method::POST,
        "rw/rapid/execution?action=start",
        StatusCode::BAD_REQUEST,
        r#"<span class="code">-600</span><span class="msg">Start rejected</span>"#,
    );

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    let err = client.start("once").await.unwrap_err();

    match err {
        RwsError::ControllerError { code, message } => {
            assert_eq!(code, -600);
            assert_eq!(message, "Start rejected");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn internal_server_error_maps_to_controller_internal() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(
        Method::POST,
        "rw/rapid/execution?action=stop",
        StatusCode::INTERNAL_SERVER_ERROR,
        "",
    );

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    let err = client.stop().await.unwrap_err();
    assert!(matches!(err, RwsError::ControllerInternal));
}
