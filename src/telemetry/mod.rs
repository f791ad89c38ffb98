//! # Telemetry Module
//!
//! Hands decoded readings to the home-automation side.
//!
//! This module handles:
//! - Mapping a `Telemetry` record to named sensor updates with unit metadata
//! - Rendering each update as a state-API JSON body
//! - Publishing updates through a `TelemetrySink`, fire-and-forget
//! - POSTing updates to an HTTP state API, or logging them when none is set

pub mod http;
pub mod sensors;
pub mod sink;

pub use http::HttpSink;
pub use sensors::{sensor_updates, SensorAttributes, SensorUpdate};
pub use sink::{publish_all, LogSink, TelemetrySink};
