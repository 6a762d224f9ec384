//! Digital-signal subscription scenario, spec §8 scenario 6.

use irc5_client::rws::{ResourceKind, RwsClient, SubscriptionEvent, SubscriptionManager};
use reqwest::{Method, StatusCode};
use rws_test_utils::FakeController;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn digital_signal_subscription_delivers_decoded_event() {
    let controller = FakeController::start("user", "pass").await;
    controller.set_response(
        Method::POST,
        "subscription",
        StatusCode::CREATED,
        r#"<html><body><a rel="self" href="/subscription/ws"></a></body></html>"#,
    );

    let client = RwsClient::new(controller.base_url(), "user", "pass");
    let manager = SubscriptionManager::new(&client);

    let (tx, mut rx) = mpsc::unbounded_channel::<SubscriptionEvent>();
    let subscription = manager
        .subscribe(
            "/rw/iosystem/signals/EtherNetIP1/DRV_1/DO_1",
            ResourceKind::DigitalSignal,
            move |event| {
                let _ = tx.send(event);
            },
            None::<fn()>,
        )
        .await
        .unwrap();

    // Let the WebSocket finish its upgrade handshake before pushing a frame.
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.push_subscription_frame(r#"<li title="DO_1"><span class="lvalue">1</span></li>"#);

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event delivered in time")
        .expect("channel open");

    match event {
        SubscriptionEvent::DigitalSignals(signals) => {
            assert_eq!(signals.len(), 1);
            assert_eq!(signals[0].name, "DO_1");
            assert_eq!(signals[0].lvalue, 1.0);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    subscription.close().await;
}
