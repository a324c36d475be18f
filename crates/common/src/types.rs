use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, platform-assigned chat identifier.
///
/// Telegram uses signed 64-bit integers while other platforms hand out
/// strings, so the key stores the canonical string form of either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatKey(String);

impl ChatKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form of the key, when the platform assigned an integer id.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for ChatKey {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ChatKey {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChatKey {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ids_round_trip_through_string_form() {
        let key = ChatKey::from(-1001234567890_i64);
        assert_eq!(key.as_str(), "-1001234567890");
        assert_eq!(key.as_i64(), Some(-1001234567890));
    }

    #[test]
    fn string_ids_have_no_numeric_form() {
        let key = ChatKey::from("@channel_name");
        assert_eq!(key.as_i64(), None);
        assert_eq!(key.to_string(), "@channel_name");
    }

    #[test]
    fn serializes_transparently() {
        let key = ChatKey::from(42_i64);
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"42\"");
    }
}
