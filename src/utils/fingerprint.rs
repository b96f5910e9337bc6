use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

const FINGERPRINT_LEN: usize = 16;

/// Stable, non-reversible tag for user text so log lines can be correlated
/// without recording the text itself. Case and surrounding whitespace are
/// ignored.
pub fn message_fingerprint(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.trim().to_lowercase().as_bytes());
    let digest = hasher.finalize();

    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}
