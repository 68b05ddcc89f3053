//! CRC-32 trailer of Bluetooth reports.
//!
//! The checksum covers a one byte HID transaction header followed by the
//! report without its last 4 bytes, and is stored little-endian in them.

use std::convert::TryInto;

use crc32fast::Hasher as Crc32Hasher;

/// DATA | Input header.
pub const INPUT_SEED: u8 = 0xA1;
/// DATA | Output header.
pub const OUTPUT_SEED: u8 = 0xA2;
/// GET_REPORT | Feature header.
pub const FEATURE_SEED: u8 = 0xA3;

pub fn checksum(seed: u8, data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(&[seed]);
    hasher.update(data);
    hasher.finalize()
}

/// Writes the trailer of an outgoing report.
pub fn seal(report: &mut [u8]) {
    if report.len() < 4 {
        return;
    }
    let end = report.len() - 4;
    let crc = checksum(OUTPUT_SEED, &report[..end]);
    report[end..].copy_from_slice(&crc.to_le_bytes());
}

/// Checks the trailer of a report read with the given header.
pub fn verify(seed: u8, report: &[u8]) -> bool {
    if report.len() < 4 {
        return false;
    }
    let end = report.len() - 4;
    let stored = match report[end..].try_into() {
        Ok(bytes) => u32::from_le_bytes(bytes),
        Err(_) => return false,
    };
    stored == checksum(seed, &report[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_check_value() {
        // CRC-32/ISO-HDLC of "123456789".
        assert_eq!(checksum(b'1', b"23456789"), 0xCBF4_3926);
    }

    #[test]
    fn sealed_report_verifies() {
        let mut report = [0u8; 78];
        report[0] = 0x31;
        report[1] = 0x02;
        report[10] = 0x42;
        seal(&mut report);
        assert!(verify(OUTPUT_SEED, &report));
        assert!(!verify(INPUT_SEED, &report));
        report[10] = 0x43;
        assert!(!verify(OUTPUT_SEED, &report));
    }

    #[test]
    fn short_report() {
        assert!(!verify(INPUT_SEED, &[0, 1]));
    }
}
