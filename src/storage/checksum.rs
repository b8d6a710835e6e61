//! CRC32 checksums for journal lines
//!
//! Every line is verified on replay; a mismatch aborts startup.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

/// Formats a checksum as the fixed-width hex prefix of a journal line.
pub fn format_checksum(checksum: u32) -> String {
    format!("{:08x}", checksum)
}

/// Parses a journal line prefix produced by [`format_checksum`].
pub fn parse_checksum(prefix: &str) -> Option<u32> {
    if prefix.len() != 8 {
        return None;
    }
    u32::from_str_radix(prefix, 16).ok()
}
