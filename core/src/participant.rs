use std::fmt;

use serde::{Deserialize, Serialize};

pub const ID_KEY_PREFIX: &str = "id:";
pub const INDEX_KEY_PREFIX: &str = "idx:";

/// Identity of a participant inside one registration.
///
/// Persisted participants (manage mode) carry the server id; fresh signups are
/// referenced by their position in the party list until the server saves them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParticipantKey {
    Id(String),
    Index(usize),
}

impl ParticipantKey {
    pub fn parse(value: &str) -> Result<Self, ParticipantKeyError> {
        let value = value.trim();
        if let Some(rest) = value.strip_prefix(ID_KEY_PREFIX) {
            let rest = rest.trim();
            if rest.is_empty() {
                return Err(ParticipantKeyError::EmptyId);
            }
            return Ok(Self::Id(rest.to_string()));
        }
        if let Some(rest) = value.strip_prefix(INDEX_KEY_PREFIX) {
            return rest
                .trim()
                .parse::<usize>()
                .map(Self::Index)
                .map_err(|_| ParticipantKeyError::InvalidIndex(rest.to_string()));
        }
        Err(ParticipantKeyError::UnknownScheme(value.to_string()))
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Id(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id.as_str()),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{ID_KEY_PREFIX}{id}"),
            Self::Index(index) => write!(f, "{INDEX_KEY_PREFIX}{index}"),
        }
    }
}

impl std::str::FromStr for ParticipantKey {
    type Err = ParticipantKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParticipantKeyError {
    #[error("participant key has an empty id")]
    EmptyId,
    #[error("participant key has invalid index '{0}'")]
    InvalidIndex(String),
    #[error("participant key '{0}' must start with id: or idx:")]
    UnknownScheme(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub key: ParticipantKey,
    pub name: String,
}

impl Participant {
    pub fn new(key: ParticipantKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }

    /// Name shown in pickers and notes. Unnamed rows fall back to their
    /// position so the UI never renders an empty label.
    pub fn display_name(&self, position: usize) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            format!("Participant {}", position + 1)
        } else {
            trimmed.to_string()
        }
    }
}

impl Serialize for ParticipantKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ParticipantKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_display_with_scheme_prefix() {
        assert_eq!(ParticipantKey::Id("42".into()).to_string(), "id:42");
        assert_eq!(ParticipantKey::Index(3).to_string(), "idx:3");
    }

    #[test]
    fn parse_accepts_both_schemes() {
        assert_eq!(
            "id:abc".parse::<ParticipantKey>(),
            Ok(ParticipantKey::Id("abc".into()))
        );
        assert_eq!(" idx:0 ".parse::<ParticipantKey>(), Ok(ParticipantKey::Index(0)));
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert_eq!(ParticipantKey::parse("id:"), Err(ParticipantKeyError::EmptyId));
        assert!(matches!(
            ParticipantKey::parse("idx:one"),
            Err(ParticipantKeyError::InvalidIndex(_))
        ));
        assert!(matches!(
            ParticipantKey::parse("7"),
            Err(ParticipantKeyError::UnknownScheme(_))
        ));
    }

    #[test]
    fn display_name_falls_back_to_position() {
        let unnamed = Participant::new(ParticipantKey::Index(1), "   ");
        assert_eq!(unnamed.display_name(1), "Participant 2");
        let named = Participant::new(ParticipantKey::Index(0), " Ada ");
        assert_eq!(named.display_name(0), "Ada");
    }
}
