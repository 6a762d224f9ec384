//! RMMP keeper, spec §4.4: requests and maintains remote manual-mode
//! privilege across a rolling pair of parallel HTTP sessions.
//!
//! Modeled as the small state machine spec §9 calls for —
//! `Idle → Granted(primary) → Granted(primary, shadow) → Granted(shadow)` —
//! with an explicit age check and swap, no hidden globals. `Granted` here
//! stores `active: None` while still riding the client's primary session,
//! and `active: Some(session)` once the first rolled/forked session takes
//! over.
use crate::error::RwsError;
use crate::rws::client::RwsClient;
use crate::rws::decode;
use reqwest::Method;
use std::time::Duration;
use tokio::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const SESSION_MAX_AGE: Duration = Duration::from_secs(30);

enum KeeperState {
    Idle,
    Granted {
        active: Option<super::auth::RwsSession>,
        birth: Instant,
    },
}

/// Owns the rolling-session state for one client's RMMP grant.
pub struct RmmpKeeper<'a> {
    client: &'a RwsClient,
    state: Mutex<KeeperState>,
}

impl<'a> RmmpKeeper<'a> {
    pub fn new(client: &'a RwsClient) -> Self {
        RmmpKeeper {
            client,
            state: Mutex::new(KeeperState::Idle),
        }
    }

    /// `request(timeout)`, spec §4.4: POST the privilege request, then poll
    /// every 250 ms until granted or the deadline passes. Per §4.4 step 3,
    /// a deadline elapsing with no grant is reported the same as an explicit
    /// controller refusal — `PrivilegeDenied`.
    pub async fn request(&self, timeout: Duration) -> Result<(), RwsError> {
        let raw = self
            .client
            .session()
            .request(Method::POST, "users/rmmp", Some(&[("privilege", "modify")]))
            .await?;
        RwsClient::decode_response(raw.status, raw.body)?;

        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() >= deadline {
                warn!("rmmp privilege request timed out with no grant");
                return Err(RwsError::PrivilegeDenied);
            }
            tokio::time::sleep(POLL_INTERVAL).await;

            let raw = self
                .client
                .session()
                .request(Method::GET, "users/rmmp/poll", None)
                .await?;
            let body = RwsClient::decode_response(raw.status, raw.body)?;
            let status = decode::decode_rmmp_status(&body)?;
            match status.as_str() {
                "GRANTED" => {
                    info!("rmmp privilege granted");
                    self.poll().await?;
                    return Ok(());
                }
                "PENDING" => continue,
                other => {
                    warn!(status = other, "rmmp privilege denied");
                    return Err(RwsError::PrivilegeDenied);
                }
            }
        }
    }

    /// `poll()`, spec §4.4: maintain the rolling session and return whether
    /// the privilege is still granted.
    pub async fn poll(&self) -> Result<bool, RwsError> {
        let mut guard = self.state.lock().await;
        let current = std::mem::replace(&mut *guard, KeeperState::Idle);

        let (body, next_state) = match current {
            KeeperState::Idle => {
                let raw = self
                    .client
                    .session()
                    .request(Method::GET, "users/rmmp/poll", None)
                    .await?;
                let body = RwsClient::decode_response(raw.status, raw.body)?;
                let shadow = self.client.session().fork().await?;
                let next = KeeperState::Granted {
                    active: Some(shadow),
                    birth: Instant::now(),
                };
                (body, next)
            }
            KeeperState::Granted { active, birth } if birth.elapsed() > SESSION_MAX_AGE => {
                debug!(age_secs = birth.elapsed().as_secs(), "rolling rmmp keeper session");
                let source = active.as_ref().unwrap_or_else(|| self.client.session());
                let fresh = source.fork().await?;
                let raw = fresh.request(Method::GET, "users/rmmp/poll", None).await?;
                let body = RwsClient::decode_response(raw.status, raw.body)?;
                // The old session (`active`, or the primary) is simply
                // dropped here when `active`/`fresh` go out of scope after
                // this match — best-effort close, no explicit teardown call
                // exists on the controller side either.
                let next = KeeperState::Granted {
                    active: Some(fresh),
                    birth: Instant::now(),
                };
                (body, next)
            }
            KeeperState::Granted { active, birth } => {
                let source = active.as_ref().unwrap_or_else(|| self.client.session());
                let raw = source.request(Method::GET, "users/rmmp/poll", None).await?;
                let body = RwsClient::decode_response(raw.status, raw.body)?;
                let next = KeeperState::Granted { active, birth };
                (body, next)
            }
        };

        *guard = next_state;
        let status = decode::decode_rmmp_status(&body)?;
        Ok(status == "GRANTED")
    }
}
