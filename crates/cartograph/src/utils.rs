#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Content hash used for change detection between index runs.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
