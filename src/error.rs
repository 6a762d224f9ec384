//! Error kinds for both channels, per spec §7.
//!
//! EGM's failure surface is tiny (a send before any peer is known, or a
//! transport error) so it gets its own enum rather than sharing RWS's much
//! larger controller-error vocabulary.

/// Errors from the EGM realtime channel.
#[derive(Debug, thiserror::Error)]
pub enum EgmError {
    #[error("no peer address observed yet; send() called before the first receive()")]
    PeerUnknown,
    #[error("socket I/O error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("malformed EGM datagram: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Errors from the RWS control channel.
#[derive(Debug, thiserror::Error)]
pub enum RwsError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("controller reported internal error (HTTP 500)")]
    ControllerInternal,
    #[error("controller error {code}: {message}")]
    ControllerError { code: i64, message: String },
    #[error("malformed response: {field}: {reason}")]
    Protocol { field: String, reason: String },
    #[error("RMMP privilege denied")]
    PrivilegeDenied,
    #[error("operation cancelled")]
    Cancelled,
}

impl RwsError {
    pub fn protocol(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RwsError::Protocol {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for RwsError {
    fn from(e: reqwest::Error) -> Self {
        RwsError::Transport(e.to_string())
    }
}

/// The controller's error code for "IPC queue already exists", per spec §4.2/§7.
pub const IPC_QUEUE_ALREADY_EXISTS: i64 = -1_073_445_879;
