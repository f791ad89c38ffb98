//! # Additive Checksum
//!
//! MVMP frames carry an 8-bit checksum equal to the sum of the payload bytes
//! modulo 256. The header and length byte are not included.

/// Sum all bytes, wrapping at 256
///
/// # Examples
///
/// ```
/// use mvmp_bridge::mvmp::checksum::sum8;
///
/// assert_eq!(sum8(&[0x01, 0x02, 0x03]), 0x06);
/// assert_eq!(sum8(&[0xFF, 0x02]), 0x01);
/// ```
pub fn sum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}
