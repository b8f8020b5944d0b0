//! SHA-256 checksum utility for drift detection.

use sha2::{Digest, Sha256};

/// Marker hashed in place of a missing reverse action, so that adding or
/// removing a `down` definition changes the checksum.
const NO_DOWN_MARKER: &str = "\u{0}strata:no-down\u{0}";

/// Checksum of a migration's forward and reverse definitions.
pub fn migration_checksum(up: &str, down: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"up\0");
    hasher.update(up.as_bytes());
    hasher.update(b"\0down\0");
    hasher.update(down.unwrap_or(NO_DOWN_MARKER).as_bytes());
    format!("{:x}", hasher.finalize())
}
