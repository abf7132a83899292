//! Content checksum used for migration drift detection.

use sha2::{Digest, Sha256};

/// Length of a rendered checksum in hex characters.
pub const CHECKSUM_LEN: usize = 32;

/// Compute the checksum of raw migration content.
///
/// The digest is the first 128 bits of SHA-256 over the exact bytes, rendered
/// as 32 lowercase hex characters so it fits the fixed-width log column.
pub fn compute_checksum(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest[..CHECKSUM_LEN / 2]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
