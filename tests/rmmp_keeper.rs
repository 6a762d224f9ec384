//! RMMP request/poll scenario, spec §8 scenario 5.

use irc5_client::rws::{RmmpKeeper, RwsClient};
use reqwest::{Method, StatusCode};
use rws_test_utils::FakeController;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn request_completes_after_pending_then_granted() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(Method::POST, "users/rmmp", StatusCode::OK, "");
    controller.queue_rmmp_poll(&["PENDING", "PENDING", "GRANTED"]);

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    let keeper = RmmpKeeper::new(&client);

    keeper.request(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn request_times_out_when_never_granted() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(Method::POST, "users/rmmp", StatusCode::OK, "");
    // Every poll defaults to PENDING (empty queue), so the deadline elapses.

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    let keeper = RmmpKeeper::new(&client);

    let err = keeper.request(Duration::from_millis(600)).await.unwrap_err();
    assert!(matches!(err, irc5_client::RwsError::PrivilegeDenied));
}

#[tokio::test(start_paused = true)]
async fn poll_rolls_the_session_after_thirty_seconds() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(Method::POST, "users/rmmp", StatusCode::OK, "");
    controller.queue_rmmp_poll(&["PENDING", "PENDING", "GRANTED"]);

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    let keeper = RmmpKeeper::new(&client);
    keeper.request(Duration::from_secs(5)).await.unwrap();

    // Age the keeper session past the 30s ceiling, then poll again: this
    // forces the fork-and-swap path rather than reusing the same session.
    controller.queue_rmmp_poll(&["GRANTED"]);
    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(keeper.poll().await.unwrap());
}
