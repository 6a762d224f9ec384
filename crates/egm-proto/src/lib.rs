//! Generated types for ABB's EGM wire protocol.
//!
//! This crate is intentionally thin: it owns the `.proto` definition and
//! the `prost` codegen, nothing else. The EGM codec in `irc5_client::egm`
//! is the only consumer and is responsible for all unit conversion and
//! field-presence handling.

include!(concat!(env!("OUT_DIR"), "/abb.egm.rs"));
