//! HTTP Digest authentication for the persistent RWS session.
//!
//! `reqwest` has no built-in digest support (only the teacher's bearer-token
//! auth, see `services/forwarder/src/uplink.rs`), so this wraps a
//! `reqwest::Client` with the `digest_auth` crate: cache the controller's
//! challenge from the first 401, recompute an `Authorization` header per
//! request, and re-challenge once if the cached nonce goes stale.

use crate::error::RwsError;
use digest_auth::{AuthContext, HttpMethod, WwwAuthenticateHeader};
use reqwest::{Method, StatusCode};
use std::sync::Mutex;
use tracing::{debug, warn};

/// A persistent HTTP session against one controller base URL, authenticated
/// via HTTP Digest (spec §4.2/§6). Cookies set by the controller (notably
/// `ABBCX`) are retained across requests by `reqwest`'s cookie jar.
pub struct RwsSession {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
    challenge: Mutex<Option<WwwAuthenticateHeader>>,
    session_cookie: Mutex<Option<String>>,
}

/// The raw result of one request: status code, body text, and (when
/// present) the `Location` header — the subscription POST (spec §4.5) uses
/// this to learn the WebSocket URL without a dedicated response type.
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    pub location: Option<String>,
}

impl RwsSession {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("reqwest client construction with no custom TLS config cannot fail");
        RwsSession {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            client,
            challenge: Mutex::new(None),
            session_cookie: Mutex::new(None),
        }
    }

    /// Clone this session's cookie jar into a fresh, independent session
    /// (spec §4.4: the RMMP keeper's rolling shadow sessions, and spec
    /// §4.5: subscriptions run on an independent session).
    ///
    /// The digest challenge is intentionally NOT copied: the new session
    /// re-challenges on its first request, which is safe (just one extra
    /// round trip) and avoids reusing a nonce the controller may already
    /// consider stale for this peer connection.
    ///
    /// The session cookie is copied directly rather than primed with an
    /// outbound request: every RWS path requires digest auth, so an
    /// unauthenticated priming GET would just draw a bare 401 with no
    /// `Set-Cookie`, leaving the forked session's jar empty regardless of
    /// what was copied into its `Cookie:` header.
    pub async fn fork(&self) -> Result<Self, RwsError> {
        let forked = RwsSession::new(self.base_url.clone(), self.username.clone(), self.password.clone());
        forked.session_cookie = Mutex::new(self.session_cookie.lock().unwrap().clone());
        Ok(forked)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, &str)]>,
        authorization: Option<String>,
    ) -> Result<reqwest::Response, RwsError> {
        let mut req = self.client.request(method, url);
        if let Some(form) = form {
            req = req.form(form);
        }
        if let Some(auth) = authorization {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }
        req.send().await.map_err(RwsError::from)
    }

    /// Perform one request, transparently handling the digest challenge.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<RawResponse, RwsError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let request_uri = format!("/{}", path.trim_start_matches('/'));
        let http_method = if method == Method::POST {
            HttpMethod::POST
        } else {
            HttpMethod::GET
        };

        let cached_auth = self.build_authorization(&request_uri, http_method);
        let mut response = self
            .send_once(method.clone(), &url, form, cached_auth)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(header) = response
                .headers()
                .get(reqwest::header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
            {
                debug!(uri = %request_uri, "re-challenged on digest auth, retrying");
                let parsed = digest_auth::parse(header)
                    .map_err(|e| RwsError::protocol("www-authenticate", e.to_string()))?;
                *self.challenge.lock().unwrap() = Some(parsed);
                let auth = self.build_authorization(&request_uri, http_method);
                response = self.send_once(method, &url, form, auth).await?;
            } else {
                warn!(uri = %request_uri, "401 with no WWW-Authenticate header");
            }
        }

        self.remember_cookie(&response);
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let status = response.status();
        let body = response.text().await.map_err(RwsError::from)?;
        Ok(RawResponse { status, body, location })
    }

    fn build_authorization(&self, uri: &str, method: HttpMethod) -> Option<String> {
        let mut guard = self.challenge.lock().unwrap();
        let prompt = guard.as_mut()?;
        let context = AuthContext::new_with_method(&self.username, &self.password, uri, Some(method));
        let answer = prompt.respond(&context).ok()?;
        Some(answer.to_header_string())
    }

    /// A digest `Authorization` header for a GET on `uri`, computed from the
    /// session's currently cached challenge (spec §4.5/§6: the subscription
    /// WebSocket upgrade needs a digest header for a GET on the ws URL,
    /// without actually performing an HTTP GET first).
    pub(crate) fn digest_authorization_for_get(&self, uri: &str) -> Option<String> {
        self.build_authorization(uri, HttpMethod::GET)
    }

    /// The `ABBCX=...` cookie currently held, formatted for a raw `Cookie:`
    /// header (spec §4.5/§6: the WebSocket upgrade needs this explicitly,
    /// since it isn't a `reqwest` request the cookie jar can attach to).
    pub(crate) fn cookie_header(&self) -> Option<String> {
        self.session_cookie.lock().unwrap().clone()
    }

    fn remember_cookie(&self, response: &reqwest::Response) {
        if let Some(set_cookie) = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            if let Some(abbcx) = set_cookie.split(';').next() {
                if abbcx.trim_start().starts_with("ABBCX=") {
                    *self.session_cookie.lock().unwrap() = Some(abbcx.trim().to_owned());
                }
            }
        }
    }
}
