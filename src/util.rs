//! Shared utility functions for the Sellio application.

use axum::http::HeaderMap;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Storefront wall clock. Creators operate on Thailand time (UTC+7);
/// advance-notice windows are computed against this offset, not UTC.
pub const STORE_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Current wall-clock time in the storefront timezone.
pub fn now_store() -> NaiveDateTime {
    store_local(Utc::now())
}

/// Project an instant onto the storefront timezone as a naive local time.
pub fn store_local(instant: DateTime<Utc>) -> NaiveDateTime {
    let offset = FixedOffset::east_opt(STORE_UTC_OFFSET_SECS).expect("valid fixed offset");
    instant.with_timezone(&offset).naive_local()
}

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Hash an API key for storage/lookup (keys are never stored in clear).
pub fn hash_api_key(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"sellio-api-key-v1:");
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a URL-safe random token (download access, API keys).
pub fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn store_local_applies_utc7() {
        let utc = Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 0).unwrap();
        let local = store_local(utc);
        assert_eq!(local.to_string(), "2026-03-02 03:30:00");
    }

    #[test]
    fn api_key_hash_is_stable() {
        assert_eq!(hash_api_key("abc"), hash_api_key("abc"));
        assert_ne!(hash_api_key("abc"), hash_api_key("abd"));
    }
}
