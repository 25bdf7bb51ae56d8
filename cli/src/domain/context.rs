//! Context naming and identifiers.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ConfigError;

/// Context used when neither the caller nor the stored config names one.
pub const DEFAULT_CONTEXT: &str = "local";

static CONTEXT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // literal pattern
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("valid context regex")
});

/// Resolve the active context: explicit > stored > `local`.
#[must_use]
pub fn resolve_context(explicit: Option<&str>, stored: Option<&str>) -> String {
    explicit
        .filter(|s| !s.is_empty())
        .or(stored.filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_CONTEXT)
        .to_string()
}

/// Context names become directory names and colima profile suffixes.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidContextName`] for anything outside
/// lowercase alphanumerics and inner hyphens.
pub fn validate_context_name(name: &str) -> Result<(), ConfigError> {
    if name.len() > 63 || !CONTEXT_NAME.is_match(name) {
        return Err(ConfigError::InvalidContextName(name.to_string()));
    }
    Ok(())
}

/// A context identifier is `bc` followed by 14 lowercase hex characters.
#[must_use]
pub fn is_valid_context_id(id: &str) -> bool {
    id.len() == 16
        && id.starts_with("bc")
        && id[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Generate a fresh context identifier.
///
/// Entropy sources: nanosecond timestamp and two independent `RandomState` hashes.
#[must_use]
pub fn generate_context_id() -> String {
    format!("bc{}", &random_hex()[..14])
}

/// 16 lowercase hex characters of process-local randomness.
#[must_use]
pub fn random_hex() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("{:016x}", hasher.finish())
}
