//! Long-poll cursor.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Opaque position in the event feed (the `ts` value).
///
/// The server renders it as digits, sometimes as a JSON string and sometimes
/// as a number; both deserialize to the same cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for Cursor {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCursor {
    Text(String),
    Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawCursor::deserialize(deserializer)? {
            RawCursor::Text(text) => Self(text),
            RawCursor::Number(number) => Self(number.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_strings_and_numbers() {
        let text: Cursor = serde_json::from_str(r#""1715""#).unwrap();
        let number: Cursor = serde_json::from_str("1715").unwrap();
        assert_eq!(text, number);
        assert_eq!(text.as_str(), "1715");
    }

    #[test]
    fn rejects_other_json() {
        assert!(serde_json::from_str::<Cursor>("null").is_err());
        assert!(serde_json::from_str::<Cursor>("[1]").is_err());
    }

    #[test]
    fn serializes_as_string() {
        assert_eq!(serde_json::to_string(&Cursor::from(10)).unwrap(), r#""10""#);
    }
}
