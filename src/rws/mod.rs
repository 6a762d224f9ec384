//! The RWS control channel, spec §4.2–§4.5: digest-authenticated HTTP
//! session, response/value codecs, the RMMP privilege keeper, and the
//! subscription manager.

mod auth;
mod client;
mod decode;
mod rmmp;
mod subscription;
mod value;

pub use client::{encode_jointtarget, RwsClient};
pub use rmmp::RmmpKeeper;
pub use subscription::{ResourceKind, Subscription, SubscriptionEvent, SubscriptionManager};
pub use value::{
    encode_numeric_array, encode_numeric_array_i64, parse_jointtarget_array, parse_jointtarget_text,
    parse_numeric_array, parse_numeric_array_i64,
};
