//! # MVMP Protocol Module
//!
//! Implementation of the MVMP serial protocol spoken by the charge controller.
//!
//! This module handles:
//! - Poll and set-clock command encoding
//! - Response frame validation (magic header, length, additive checksum)
//! - Telemetry payload decoding at fixed byte offsets
//! - Status/warning/fault bit fields and two-register decimals

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod checksum;
pub mod bits;
pub mod fixed_point;
