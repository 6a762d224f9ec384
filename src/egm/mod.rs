//! The EGM realtime channel, spec §4.1.

mod codec;
mod endpoint;

pub use codec::{decode_feedback, encode_correction};
pub use endpoint::{EgmEndpoint, DEFAULT_PORT};
