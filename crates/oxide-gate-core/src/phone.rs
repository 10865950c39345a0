//! Phone number handling and session key derivation.

use sha2::{Digest, Sha256};
use std::fmt;

/// Quick format check used by the phone step: the input must start with a
/// digit, `+` or `8`.
#[must_use]
pub fn looks_like_phone(input: &str) -> bool {
    input
        .trim()
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '8')
}

/// Normalize a phone number to the `+<digits>` form.
///
/// Fallback order:
/// 1. leading `+`: keep the digits only, prefixed with `+`
/// 2. 11 digits starting with `8`: `+7` followed by the last 10 digits
/// 3. 11 digits starting with `7`: prefix `+`
/// 4. 10 digits: prefix `+7`
/// 5. any other non-empty digit run: prefix `+`
/// 6. no digits at all: the (trimmed) input is returned unchanged
///
/// # Examples
///
/// ```
/// use oxide_gate_core::phone::normalize_phone;
///
/// assert_eq!(normalize_phone("89161234567"), "+79161234567");
/// assert_eq!(normalize_phone("+7(916)123-45-67"), "+79161234567");
/// ```
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let raw = raw.trim();
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if raw.starts_with('+') {
        return format!("+{digits}");
    }
    if digits.len() == 11 && digits.starts_with('8') {
        return format!("+7{}", &digits[1..]);
    }
    if digits.len() == 11 && digits.starts_with('7') {
        return format!("+{digits}");
    }
    if digits.len() == 10 {
        return format!("+7{digits}");
    }
    if !digits.is_empty() {
        return format!("+{digits}");
    }
    raw.to_string()
}

/// Deterministic key of a remote session, derived by a one-way hash of the
/// normalized phone. Repeated logins for one phone collide on one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derive the key for an already normalized phone number.
    #[must_use]
    pub fn for_phone(normalized_phone: &str) -> Self {
        let digest = Sha256::digest(normalized_phone.as_bytes());
        Self(format!("{digest:x}"))
    }

    /// Hex digest backing this key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name prefix shared by every credential artifact of this session
    #[must_use]
    pub fn artifact_prefix(&self) -> String {
        format!("session_{}", self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to correlate log lines
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}
