use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Document identifier. The nil UUID is the "absent" id of a freshly
/// constructed model and never a valid reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(Uuid);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id: {0:?}")]
pub struct InvalidId(pub String);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Parse an externally supplied id. Empty strings, malformed UUIDs and the
    /// nil UUID are all rejected.
    pub fn parse(s: &str) -> Result<Self, InvalidId> {
        let trimmed = s.trim();
        match Uuid::parse_str(trimmed) {
            Ok(uuid) if !uuid.is_nil() => Ok(Self(uuid)),
            _ => Err(InvalidId(s.to_string())),
        }
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// Ids travel as plain strings both on the wire and in stored documents. The
// nil id serializes as the empty string so "unset" round-trips.
impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_nil() {
            serializer.serialize_str("")
        } else {
            serializer.serialize_str(&self.0.to_string())
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(Self::nil());
        }
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_malformed_and_nil() {
        assert!(Id::parse("").is_err());
        assert!(Id::parse("not-an-id").is_err());
        assert!(Id::parse("00000000-0000-0000-0000-000000000000").is_err());
        assert!(Id::parse("6f9619ff-8b86-d011-b42d-00cf4fc964ff").is_ok());
    }

    #[test]
    fn nil_serializes_as_empty_string() {
        assert_eq!(serde_json::to_value(Id::nil()).unwrap(), serde_json::json!(""));
        let back: Id = serde_json::from_value(serde_json::json!("")).unwrap();
        assert!(back.is_nil());
    }

    #[test]
    fn fresh_ids_are_distinct() {
        let a = Id::new();
        let b = Id::new();
        assert_ne!(a, b);
        assert_eq!(Id::parse(&a.to_string()).unwrap(), a);
    }
}
