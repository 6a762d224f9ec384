//! In-process fake IRC5 controller for integration tests.
//!
//! Provides [`FakeController`], a small axum server that speaks just enough
//! HTTP Digest + XHTML + WebSocket-subscription to drive the RWS client
//! under test without a real robot, and [`FakeEgmPeer`], a UDP loopback
//! peer standing in for the controller's EGM endpoint. Mirrors the shape of
//! `MockWsServer`/`MockWsClient` from the forwarding suite's test-utils
//! crate: a real server bound to a random local port, driven by channels
//! the test holds onto.

mod fake_controller;
mod fake_egm_peer;

pub use fake_controller::{FakeController, RouteKey};
pub use fake_egm_peer::FakeEgmPeer;
