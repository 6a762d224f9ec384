//! irc5-client: host-side driver for the ABB IRC5 controller family.
//!
//! Two independent channels, each its own module:
//!
//! - [`egm`]: the realtime UDP feedback/correction channel.
//! - [`rws`]: the HTTP/WebSocket control channel — digest-authenticated
//!   session, response/value codecs, the RMMP privilege keeper, and
//!   subscriptions.
//!
//! `models` holds the typed records shared by both; `units` holds the
//! degrees↔radians / millimetres↔metres conversions applied at codec
//! boundaries; `error` holds the two channels' error enums.
//!
//! The library installs no `tracing` subscriber itself — the embedding
//! binary owns that, same as the rest of this codebase.

pub mod egm;
pub mod error;
pub mod models;
pub mod rws;
pub mod units;

pub use egm::{EgmEndpoint, DEFAULT_PORT as EGM_DEFAULT_PORT};
pub use error::{EgmError, RwsError};
pub use models::{
    EgmRobotState, JointTarget, LogMessageType, RapidEventLogEntry, RapidExecutionState,
    RapidIpcMessage, RapidSignal, RobTarget, RobTargetConfig,
};
pub use rws::{ResourceKind, RmmpKeeper, RwsClient, Subscription, SubscriptionEvent, SubscriptionManager};
