//! # MVMP Command Encoder
//!
//! Builds the two commands the host can send to the controller.

use chrono::{Datelike, Timelike};

use super::protocol::*;

/// Encode the telemetry poll command
///
/// # Examples
///
/// ```
/// use mvmp_bridge::mvmp::encoder::encode_poll;
///
/// assert_eq!(encode_poll(), b"CMHB\x06MPPTHB".to_vec());
/// ```
pub fn encode_poll() -> Vec<u8> {
    MVMP_POLL_COMMAND.to_vec()
}

/// Encode a set-clock command
///
/// # Arguments
///
/// * `timestamp` - Calendar time to load into the controller clock
///
/// # Returns
///
/// * `Result<Vec<u8>, EncodeError>` - 18-byte command: preamble followed by
///   `[year_high, year_low, month, day, hour, minute, second]`
///
/// # Errors
///
/// Returns `EncodeError::YearOutOfRange` if the year is outside 0..=65535
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mvmp_bridge::mvmp::encoder::encode_set_clock;
///
/// let timestamp = NaiveDate::from_ymd_opt(2024, 3, 15)
///     .unwrap()
///     .and_hms_opt(9, 5, 30)
///     .unwrap();
/// let command = encode_set_clock(&timestamp).unwrap();
/// assert_eq!(&command[11..], &[7, 232, 3, 15, 9, 5, 30]);
/// ```
pub fn encode_set_clock<T>(timestamp: &T) -> std::result::Result<Vec<u8>, EncodeError>
where
    T: Datelike + Timelike,
{
    let year = u16::try_from(timestamp.year())
        .map_err(|_| EncodeError::YearOutOfRange(timestamp.year()))?;
    let [year_high, year_low] = year.to_be_bytes();

    let mut command = Vec::with_capacity(MVMP_SET_CLOCK_COMMAND_SIZE);
    command.extend_from_slice(MVMP_SET_CLOCK_PREAMBLE);
    command.extend_from_slice(&[
        year_high,
        year_low,
        timestamp.month() as u8,
        timestamp.day() as u8,
        timestamp.hour() as u8,
        timestamp.minute() as u8,
        timestamp.second() as u8,
    ]);

    Ok(command)
}
