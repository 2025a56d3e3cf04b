//! Certificate fingerprints in the form tmsh prints them.
//!
//! `list /sys crypto cert <name>` shows `fingerprint SHA256/AA:BB:...`, so the
//! rendering here must match that text exactly for the substring check.

use sha2::{Digest, Sha256};

/// Algorithm name tmsh prefixes fingerprints with.
pub const ALGORITHM: &str = "SHA256";

/// Fingerprint a DER-encoded certificate.
pub fn fingerprint(der: &[u8]) -> String {
    let digest = Sha256::digest(der);
    let pairs: Vec<String> = digest.iter().map(|byte| format!("{byte:02X}")).collect();
    format!("{ALGORITHM}/{}", pairs.join(":"))
}
