//! # MVMP Bridge Library
//!
//! Read telemetry from an MVMP solar charge controller over a serial link.
//!
//! This library provides the protocol codec (poll and set-clock commands,
//! response frame validation, telemetry decoding), a bounded poll session
//! over an owned serial port, and the mapping of decoded readings to
//! home-automation sensor updates.

pub mod config;
pub mod error;
pub mod mvmp;
pub mod serial;
pub mod session;
pub mod telemetry;
