//! RWS client, spec §4.2: a persistent HTTP session with digest auth,
//! mapping each documented controller path to a typed operation.

use super::auth::RwsSession;
use super::decode;
use super::value;
use crate::error::{RwsError, IPC_QUEUE_ALREADY_EXISTS};
use crate::models::{
    JointTarget, RapidEventLogEntry, RapidExecutionState, RapidIpcMessage, RobTarget,
};
use reqwest::{Method, StatusCode};
use tracing::warn;

/// A persistent RWS session against one controller, spec §4.2.
pub struct RwsClient {
    session: RwsSession,
}

impl RwsClient {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        RwsClient {
            session: RwsSession::new(base_url, username, password),
        }
    }

    pub(super) fn session(&self) -> &RwsSession {
        &self.session
    }

    /// Response policy from spec §4.2: 500 → `ControllerInternal`;
    /// 200/201/202/204 → success; other statuses with a parseable error
    /// body → `ControllerError`; otherwise `Transport`.
    fn apply_response_policy(status: StatusCode, body: String) -> Result<String, RwsError> {
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                warn!("controller reported internal error (HTTP 500)");
                Err(RwsError::ControllerInternal)
            }
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                Ok(body)
            }
            other => match decode::decode_error_body(&body) {
                Some((code, message)) => {
                    warn!(code, status = %other, "controller error");
                    Err(RwsError::ControllerError {
                        code,
                        message: message.unwrap_or_default(),
                    })
                }
                None => {
                    warn!(status = %other, "unparseable error response");
                    Err(RwsError::Transport(format!("unexpected status {other}")))
                }
            },
        }
    }

    async fn get(&self, path: &str) -> Result<String, RwsError> {
        let raw = self.session.request(Method::GET, path, None).await?;
        Self::apply_response_policy(raw.status, raw.body)
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<String, RwsError> {
        let raw = self.session.request(Method::POST, path, Some(form)).await?;
        Self::apply_response_policy(raw.status, raw.body)
    }

    /// Used by `rws::rmmp` and `rws::subscription`, which issue requests
    /// through their own rolling/forked sessions but share this client's
    /// response policy.
    pub(super) fn decode_response(status: StatusCode, body: String) -> Result<String, RwsError> {
        Self::apply_response_policy(status, body)
    }

    /// `start(cycle)`, spec §4.2: `cycle ∈ {asis, once, forever}`.
    pub async fn start(&self, cycle: &str) -> Result<(), RwsError> {
        self.post(
            "rw/rapid/execution?action=start",
            &[
                ("regain", "continue"),
                ("execmode", "continue"),
                ("cycle", cycle),
                ("condition", "none"),
                ("stopatbp", "disabled"),
                ("alltaskbytsp", "false"),
            ],
        )
        .await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), RwsError> {
        self.post("rw/rapid/execution?action=stop", &[("stopmode", "stop")])
            .await?;
        Ok(())
    }

    pub async fn resetpp(&self) -> Result<(), RwsError> {
        self.post("rw/rapid/execution?action=resetpp", &[]).await?;
        Ok(())
    }

    pub async fn get_execution_state(&self) -> Result<RapidExecutionState, RwsError> {
        let body = self.get("rw/rapid/execution").await?;
        decode::decode_execution_state(&body)
    }

    pub async fn get_controller_state(&self) -> Result<String, RwsError> {
        let body = self.get("rw/panel/ctrlstate").await?;
        decode::decode_controller_state(&body)
    }

    pub async fn get_operation_mode(&self) -> Result<String, RwsError> {
        let body = self.get("rw/panel/opmode").await?;
        decode::decode_operation_mode(&body)
    }

    pub async fn get_digital_io(&self, net: &str, unit: &str, sig: &str) -> Result<i64, RwsError> {
        let path = format!("rw/iosystem/signals/{net}/{unit}/{sig}");
        let body = self.get(&path).await?;
        decode::decode_digital_io(&body)
    }

    /// Digital I/O string encoding is `"1"`/`"0"` for true/false, spec §6.
    pub async fn set_digital_io(&self, net: &str, unit: &str, sig: &str, value: bool) -> Result<(), RwsError> {
        let path = format!("rw/iosystem/signals/{net}/{unit}/{sig}?action=set");
        let lvalue = if value { "1" } else { "0" };
        self.post(&path, &[("lvalue", lvalue)]).await?;
        Ok(())
    }

    pub async fn get_rapid_variable(&self, var: &str) -> Result<String, RwsError> {
        let path = format!("rw/rapid/symbol/data/RAPID/T_ROB1/{var}");
        let body = self.get(&path).await?;
        decode::decode_rapid_variable(&body)
    }

    pub async fn set_rapid_variable(&self, var: &str, value: &str) -> Result<(), RwsError> {
        let path = format!("rw/rapid/symbol/data/RAPID/T_ROB1/{var}?action=set");
        self.post(&path, &[("value", value)]).await?;
        Ok(())
    }

    pub async fn read_event_log(&self, n: &str) -> Result<Vec<RapidEventLogEntry>, RwsError> {
        let path = format!("rw/elog/{n}/?lang=en");
        let body = self.get(&path).await?;
        decode::decode_event_log(&body)
    }

    pub async fn get_jointtarget(&self, mu: &str) -> Result<JointTarget, RwsError> {
        let path = format!("rw/motionsystem/mechunits/{mu}/jointtarget");
        let body = self.get(&path).await?;
        decode::decode_jointtarget(&body)
    }

    pub async fn get_robtarget(&self, mu: &str, tool: &str, wobj: &str, coordinate: &str) -> Result<RobTarget, RwsError> {
        let path = format!(
            "rw/motionsystem/mechunits/{mu}/robtarget?tool={tool}&wobj={wobj}&coordinate={coordinate}"
        );
        let body = self.get(&path).await?;
        decode::decode_robtarget(&body)
    }

    pub async fn read_ipc_message(&self, queue: &str, timeout: Option<&str>) -> Result<Vec<RapidIpcMessage>, RwsError> {
        let path = match timeout {
            Some(t) => format!("rw/dipc/{queue}/?action=dipc-read&timeout={t}"),
            None => format!("rw/dipc/{queue}/?action=dipc-read"),
        };
        let body = self.get(&path).await?;
        decode::decode_ipc_messages(&body)
    }

    pub async fn send_ipc_message(&self, queue: &str, userdef: i64, msgtype: i64, payload: &str) -> Result<(), RwsError> {
        let path = format!("rw/dipc/{queue}?action=dipc-send");
        self.post(
            &path,
            &[
                ("userdef", &userdef.to_string()),
                ("msgtype", &msgtype.to_string()),
                ("data", payload),
            ],
        )
        .await?;
        Ok(())
    }

    /// `true` on success; `false` iff the controller reports the queue
    /// already exists (code `-1073445879`); any other error surfaces.
    pub async fn try_create_ipc_queue(&self, queue: &str) -> Result<bool, RwsError> {
        match self
            .post("rw/dipc?action=dipc-create", &[("dipc-queue-name", queue)])
            .await
        {
            Ok(_) => Ok(true),
            Err(RwsError::ControllerError { code, .. }) if code == IPC_QUEUE_ALREADY_EXISTS => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Render a [`JointTarget`] value for embedding in a rapid-variable write,
/// reusing the jointtarget text codec shared with the value module.
pub fn encode_jointtarget(jt: &JointTarget) -> String {
    value::encode_jointtarget_text(jt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rws_test_utils::FakeController;

    #[tokio::test]
    async fn start_posts_cycle_and_succeeds_on_204() {
        let controller = FakeController::start("user", "pass").await;
        controller.set_response(
            Method::POST,
            "rw/rapid/execution?action=start",
            StatusCode::NO_CONTENT,
            "",
        );

        let client = RwsClient::new(controller.base_url(), "user", "pass");
        client.start("once").await.unwrap();
    }

    #[tokio::test]
    async fn start_surfaces_controller_error_body() {
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
    async fn try_create_ipc_queue_swallows_already_exists() {
        let controller = FakeController::start("user", "pass").await;
        controller.set_response(
            Method::POST,
            "rw/dipc?action=dipc-create",
            StatusCode::BAD_REQUEST,
            r#"<span class="code">-1073445879</span>"#,
        );

        let client = RwsClient::new(controller.base_url(), "user", "pass");
        assert!(!client.try_create_ipc_queue("Q1").await.unwrap());
    }
}
