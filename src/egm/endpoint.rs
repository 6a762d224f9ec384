//! EGM endpoint, spec §4.1: owns a bound UDP socket, the last observed
//! peer address, and an outbound sequence counter.

use super::codec::{decode_feedback, encode_correction};
use crate::error::EgmError;
use crate::models::EgmRobotState;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Default EGM UDP port, spec §6.
pub const DEFAULT_PORT: u16 = 6510;

/// The realtime EGM channel: bind once, `receive` feedback, `send`
/// corrections back to whichever peer last sent feedback.
///
/// The sequence counter is strictly monotonically increasing across the
/// endpoint's lifetime (spec §3 invariant); the spec's double-increment bug
/// is not reproduced — exactly one increment happens per `send`.
pub struct EgmEndpoint {
    socket: UdpSocket,
    peer_addr: std::sync::Mutex<Option<SocketAddr>>,
    next_seqno: AtomicU32,
}

impl EgmEndpoint {
    /// Bind to `port` on all interfaces (0.0.0.0).
    pub async fn bind(port: u16) -> Result<Self, EgmError> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(EgmEndpoint {
            socket,
            peer_addr: std::sync::Mutex::new(None),
            next_seqno: AtomicU32::new(0),
        })
    }

    /// Bind to the default port, 6510.
    pub async fn bind_default() -> Result<Self, EgmError> {
        Self::bind(DEFAULT_PORT).await
    }

    /// The address actually bound, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, EgmError> {
        self.socket.local_addr().map_err(EgmError::Transport)
    }

    /// Wait up to `timeout` for a feedback datagram.
    ///
    /// Returns `(false, None)` on timeout. Records the sender as the peer
    /// on success. An interrupted wait is treated as "no data" per spec
    /// §4.1/§7; any other I/O error surfaces.
    pub async fn receive(
        &self,
        timeout: std::time::Duration,
    ) -> Result<(bool, Option<EgmRobotState>), EgmError> {
        let mut buf = [0u8; 65536];
        let recv = match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Err(_) => return Ok((false, None)), // timed out waiting, no data
            Ok(Err(e)) => {
                if e.kind() == std::io::ErrorKind::Interrupted {
                    return Ok((false, None));
                }
                return Err(EgmError::Transport(e));
            }
            Ok(Ok(recv)) => recv,
        };
        let (n, addr) = recv;

        let previous = self.peer_addr.lock().unwrap().replace(addr);
        if previous != Some(addr) {
            debug!(peer = %addr, "egm peer observed");
        }

        let state = decode_feedback(&buf[..n])?;
        Ok((true, Some(state)))
    }

    /// Send a correction datagram to the last observed peer.
    ///
    /// Returns `false` (not an error) if no peer has been observed, or if
    /// the send fails at the socket layer — spec §4.1 treats both as a
    /// non-fatal send failure.
    pub async fn send(&self, joint_angles: &[f64]) -> bool {
        let Some(peer) = *self.peer_addr.lock().unwrap() else {
            warn!("send() called before any peer observed");
            return false;
        };

        let seqno = self.next_seqno.fetch_add(1, Ordering::SeqCst) + 1;
        let buf = encode_correction(seqno, joint_angles);

        let sent = self.socket.send_to(&buf, peer).await;
        if let Err(ref e) = sent {
            warn!(error = %e, peer = %peer, "egm correction send failed");
        }
        sent.is_ok()
    }

    /// Release the socket. Dropping the endpoint has the same effect; this
    /// exists for callers that want an explicit lifecycle boundary.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn send_fails_before_any_peer_observed() {
        let endpoint = EgmEndpoint::bind(0).await.unwrap();
        assert!(!endpoint.send(&[0.0; 6]).await);
    }

    #[tokio::test]
    async fn receive_times_out_with_no_data() {
        let endpoint = EgmEndpoint::bind(0).await.unwrap();
        let (ready, state) = endpoint.receive(Duration::from_millis(20)).await.unwrap();
        assert!(!ready);
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn sequence_numbers_strictly_increase_and_no_double_increment() {
        let endpoint = EgmEndpoint::bind(0).await.unwrap();
        let local_addr = endpoint.socket.local_addr().unwrap();

        let peer = rws_test_utils::FakeEgmPeer::connect(local_addr).await;
        peer.send_feedback(&[0.0; 6], true, true).await;
        let (ready, _) = endpoint.receive(Duration::from_secs(1)).await.unwrap();
        assert!(ready);

        assert!(endpoint.send(&[0.0; 6]).await);
        let first = peer
            .recv_correction(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(first.header.unwrap().seqno, Some(1));

        assert!(endpoint.send(&[0.0; 6]).await);
        let second = peer
            .recv_correction(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(second.header.unwrap().seqno, Some(2));
    }
}
