//! Subscription manager, spec §4.5: POST a subscription, upgrade to a
//! WebSocket, and dispatch decoded events to a per-subscription task —
//! directly generalizing `services/forwarder/src/uplink.rs`'s
//! `UplinkSession` read/dispatch loop from a fixed message enum to RWS's
//! per-resource decoder dispatch.

use super::client::RwsClient;
use super::decode;
use crate::error::RwsError;
use crate::models::RapidSignal;
use futures_util::{SinkExt, StreamExt};
use reqwest::Method;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

const QUEUE_CAPACITY: usize = 64;

/// Which controller resource a subscription is watching, and therefore
/// which decoder dispatches its frames (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ControllerState,
    OperationMode,
    ExecutionState,
    RapidVariableList,
    IpcQueue,
    EventLog,
    DigitalSignal,
}

/// A decoded subscription event, tagged by the resource it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    ControllerState(String),
    OperationMode(String),
    ExecutionState(String),
    RapidVariableNames(Vec<String>),
    IpcPayloads(Vec<String>),
    EventLogSeqnums(Vec<i64>),
    DigitalSignals(Vec<RapidSignal>),
}

fn decode_event(resource: ResourceKind, html: &str) -> Result<SubscriptionEvent, RwsError> {
    Ok(match resource {
        ResourceKind::ControllerState => {
            SubscriptionEvent::ControllerState(decode::decode_controller_state(html)?)
        }
        ResourceKind::OperationMode => {
            SubscriptionEvent::OperationMode(decode::decode_operation_mode(html)?)
        }
        ResourceKind::ExecutionState => {
            SubscriptionEvent::ExecutionState(decode::decode_execution_state(html)?.ctrlexecstate)
        }
        ResourceKind::RapidVariableList => {
            SubscriptionEvent::RapidVariableNames(decode::decode_rapid_variable_names(html)?)
        }
        ResourceKind::IpcQueue => SubscriptionEvent::IpcPayloads(
            decode::decode_ipc_messages(html)?
                .into_iter()
                .map(|m| m.payload)
                .collect(),
        ),
        ResourceKind::EventLog => {
            SubscriptionEvent::EventLogSeqnums(decode::decode_event_log_seqnums(html)?)
        }
        ResourceKind::DigitalSignal => {
            SubscriptionEvent::DigitalSignals(decode::decode_signal_events(html)?)
        }
    })
}

/// An open subscription: owns the receiver task, closes exactly once.
pub struct Subscription {
    close_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl Subscription {
    /// Close the subscription: signal the receiver task to stop, let it
    /// drain its queue and invoke `on_close`, then wait for it to exit.
    pub async fn close(self) {
        let _ = self.close_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Creates subscriptions against one controller, each on its own
/// independent session (spec §3 lifecycle: "independent session, with
/// copied cookies").
pub struct SubscriptionManager<'a> {
    client: &'a RwsClient,
}

impl<'a> SubscriptionManager<'a> {
    pub fn new(client: &'a RwsClient) -> Self {
        SubscriptionManager { client }
    }

    /// `subscribe(resource_url, resource, on_event, on_close)`, spec §4.5.
    pub async fn subscribe<F, C>(
        &self,
        resource_url: &str,
        resource: ResourceKind,
        on_event: F,
        on_close: Option<C>,
    ) -> Result<Subscription, RwsError>
    where
        F: Fn(SubscriptionEvent) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let session = self.client.session().fork().await?;

        let raw = session
            .request(
                Method::POST,
                "subscription",
                Some(&[("resources", "1"), ("1", resource_url), ("1-p", "1")]),
            )
            .await?;
        let body = RwsClient::decode_response(raw.status, raw.body.clone())?;

        let location = raw
            .location
            .or_else(|| extract_self_href(&body))
            .ok_or_else(|| RwsError::protocol("subscription", "no Location or rel=self href in response"))?;

        let ws_url = resolve_ws_url(session.base_url(), &location);
        let ws_path = ws_request_uri(&location);
        let authorization = session.digest_authorization_for_get(&ws_path);
        let cookie = session.cookie_header();

        let mut request = ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| RwsError::Transport(e.to_string()))?;
        request.headers_mut().insert(
            "sec-websocket-protocol",
            "robapi2_subscription".parse().expect("static header value"),
        );
        if let Some(cookie) = cookie {
            request.headers_mut().insert(
                "cookie",
                cookie
                    .parse()
                    .map_err(|_| RwsError::protocol("subscription", "cookie value not a valid header"))?,
            );
        }
        if let Some(auth) = authorization {
            request.headers_mut().insert(
                "authorization",
                auth.parse()
                    .map_err(|_| RwsError::protocol("subscription", "authorization value not a valid header"))?,
            );
        }

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RwsError::Transport(e.to_string()))?;

        let (close_tx, close_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_receiver(
            ws_stream,
            resource,
            Box::new(on_event),
            on_close.map(|c| Box::new(c) as Box<dyn FnOnce() + Send>),
            close_rx,
        ));

        Ok(Subscription { close_tx, task })
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn run_receiver(
    mut ws: WsStream,
    resource: ResourceKind,
    on_event: Box<dyn Fn(SubscriptionEvent) + Send>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
    mut close_rx: mpsc::Receiver<()>,
) {
    let mut queue: VecDeque<String> = VecDeque::new();

    loop {
        tokio::select! {
            _ = close_rx.recv() => break,
            frame = ws.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if queue.len() >= QUEUE_CAPACITY {
                            tracing::warn!("subscription queue full, dropping oldest frame");
                            queue.pop_front();
                        }
                        queue.push_back(text.to_string());
                    }
                    Some(Ok(_)) => {
                        tracing::debug!("ignoring non-text subscription frame");
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "subscription websocket error, closing");
                        break;
                    }
                    None => break,
                }
            }
        }
        drain(&mut queue, resource, &on_event);
    }

    drain(&mut queue, resource, &on_event);
    let _ = ws.close(None).await;
    if let Some(cb) = on_close {
        cb();
    }
}

fn drain(queue: &mut VecDeque<String>, resource: ResourceKind, on_event: &(dyn Fn(SubscriptionEvent) + Send)) {
    while let Some(text) = queue.pop_front() {
        match decode_event(resource, &text) {
            Ok(event) => on_event(event),
            Err(e) => tracing::warn!(error = %e, "failed to decode subscription frame"),
        }
    }
}

fn extract_self_href(html: &str) -> Option<String> {
    let re = regex::Regex::new(r#"<a[^>]*rel="self"[^>]*href="([^"]*)""#).ok()?;
    re.captures(html)
        .map(|c| c.get(1).unwrap().as_str().to_owned())
}

fn resolve_ws_url(base_url: &str, location: &str) -> String {
    if location.starts_with("ws://") || location.starts_with("wss://") {
        return location.to_owned();
    }
    let ws_base = base_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    if location.starts_with('/') {
        format!("{}{}", ws_base.trim_end_matches('/'), location)
    } else {
        format!("{}/{}", ws_base.trim_end_matches('/'), location)
    }
}

fn ws_request_uri(location: &str) -> String {
    if let Some(idx) = location.find("://") {
        match location[idx + 3..].find('/') {
            Some(slash) => location[idx + 3 + slash..].to_owned(),
            None => "/".to_owned(),
        }
    } else if location.starts_with('/') {
        location.to_owned()
    } else {
        format!("/{location}")
    }
}
