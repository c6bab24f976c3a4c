//! Menu item identifiers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a menu item, add-on or promo record.
///
/// The backend hands out ids as numbers or strings depending on the sheet;
/// both are kept in their string form so `7` and `"7"` compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item ID from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use storefront_core::ItemId;
    ///
    /// let id = ItemId::new("M-01");
    /// assert_eq!(id.as_str(), "M-01");
    /// ```
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Builds an ID from a JSON scalar; `null` yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Bool(b) => Some(Self(b.to_string())),
            other => Some(Self(other.to_string())),
        }
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty ID.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value).unwrap_or_default())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_and_string_ids_match() {
        assert_eq!(ItemId::from_value(&json!(7)), Some(ItemId::new("7")));
        assert_eq!(ItemId::from_value(&json!("7")), Some(ItemId::new("7")));
        assert_eq!(ItemId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_deserialize_accepts_numbers() {
        let id: ItemId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");
        let id: ItemId = serde_json::from_str("\"A-9\"").unwrap();
        assert_eq!(id.as_str(), "A-9");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&ItemId::new("M-01")).unwrap();
        assert_eq!(json, "\"M-01\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(ItemId::from("x").to_string(), "x");
    }
}
