//! Postal-format entity identifiers.
//!
//! An id is a fixed 4-character kind prefix (`USER`, `QUES`, `CHAR`, `SUMM`)
//! followed by a 6-character body matching `^[A-Z]\d[A-Z]\d[A-Z]\d$`. Legacy,
//! purely-numeric bodies are also accepted on read. This mirrors the way
//! `twilight_model::id::Id<Marker>` pairs a raw value with a zero-sized
//! marker type, so every entity id is a distinct Rust type even though they
//! all share one representation.

use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

fn postal_body_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]\d[A-Z]\d[A-Z]\d$").expect("valid regex"))
}

fn legacy_body_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("valid regex"))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("ID value cannot be empty")]
    Empty,
    #[error(
        "Invalid ID body '{0}'. Expected postal pattern (e.g., H3X1T7) or a legacy numeric string."
    )]
    InvalidBody(String),
}

/// A raw, not-yet-validated id as it might arrive from a command argument,
/// a stored document, or a structured API payload.
#[derive(Debug, Clone)]
pub enum RawId {
    /// A plain string, with or without its kind prefix already applied.
    Str(String),
    /// A legacy, purely numeric body.
    LegacyNumber(u64),
    /// A structured payload: either a full value, or a prefix + number pair.
    Structured {
        value: Option<String>,
        prefix: Option<String>,
        number: Option<u64>,
    },
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for RawId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<u64> for RawId {
    fn from(value: u64) -> Self {
        Self::LegacyNumber(value)
    }
}

impl RawId {
    /// Collapse the raw payload down to the text that should be normalized,
    /// regardless of which shape it arrived in.
    fn into_text(self) -> Result<String, IdError> {
        match self {
            RawId::Str(s) => Ok(s),
            RawId::LegacyNumber(n) => Ok(n.to_string()),
            RawId::Structured {
                value: Some(v), ..
            } => Ok(v),
            RawId::Structured {
                value: None,
                prefix,
                number: Some(n),
            } => Ok(format!("{}{n}", prefix.unwrap_or_default())),
            RawId::Structured { .. } => Err(IdError::Empty),
        }
    }
}

/// A zero-sized marker naming an entity kind and its postal prefix.
pub trait EntityKind: Copy + Clone + fmt::Debug + Send + Sync + 'static {
    const PREFIX: &'static str;
}

macro_rules! entity_kind {
    ($kind:ident, $alias:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $kind;

        impl EntityKind for $kind {
            const PREFIX: &'static str = $prefix;
        }

        pub type $alias = PostalId<$kind>;
    };
}

entity_kind!(UserKind, UserId, "USER");
entity_kind!(QuestKind, QuestId, "QUES");
entity_kind!(CharacterKind, CharacterId, "CHAR");
entity_kind!(SummaryKind, SummaryId, "SUMM");

/// A validated postal id for entity kind `K`. Stores only the 6-character
/// body; the kind prefix is reconstructed on demand from `K::PREFIX`.
pub struct PostalId<K> {
    body: String,
    _kind: PhantomData<K>,
}

impl<K: EntityKind> PostalId<K> {
    /// Parse a raw id. Accepts the value with or without the kind prefix
    /// already applied, and accepts legacy all-digit bodies.
    pub fn parse(raw: impl Into<RawId>) -> Result<Self, IdError> {
        let text = raw.into().into_text()?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }

        let cleaned = trimmed.to_uppercase();
        let body = cleaned
            .strip_prefix(K::PREFIX)
            .unwrap_or(cleaned.as_str())
            .to_string();

        if postal_body_pattern().is_match(&body) || legacy_body_pattern().is_match(&body) {
            Ok(Self {
                body,
                _kind: PhantomData,
            })
        } else {
            Err(IdError::InvalidBody(body))
        }
    }

    /// Generate a fresh, randomly chosen postal body. Does not check for
    /// collisions; callers that insert into a keyed store must retry on
    /// conflict (see [`generate_unique`](Self::generate_unique)).
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut body = String::with_capacity(6);
        for _ in 0..3 {
            body.push(rng.gen_range(b'A'..=b'Z') as char);
            body.push(rng.gen_range(b'0'..=b'9') as char);
        }
        Self {
            body,
            _kind: PhantomData,
        }
    }

    /// Generate ids until `exists` reports the candidate is free.
    pub fn generate_unique(mut exists: impl FnMut(&Self) -> bool) -> Self {
        loop {
            let candidate = Self::generate();
            if !exists(&candidate) {
                return candidate;
            }
        }
    }

    /// The 6-character body, without the kind prefix.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The legacy numeric value of this id's body, if it is all-digit.
    pub fn legacy_number(&self) -> Option<u64> {
        self.body.parse().ok()
    }

    /// The full, prefixed string representation (e.g. `USERA1B2C3`).
    pub fn value(&self) -> String {
        format!("{}{}", K::PREFIX, self.body)
    }
}

impl<K> Clone for PostalId<K> {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> PartialEq for PostalId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.body == other.body
    }
}

impl<K> Eq for PostalId<K> {}

impl<K> std::hash::Hash for PostalId<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.body.hash(state);
    }
}

impl<K: EntityKind> fmt::Debug for PostalId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl<K: EntityKind> fmt::Display for PostalId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl<K: EntityKind> std::str::FromStr for PostalId<K> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<K: EntityKind> Serialize for PostalId<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value())
    }
}

impl<'de, K: EntityKind> Deserialize<'de> for PostalId<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_postal_body() {
        let id = UserId::parse("USERA0B1C2").unwrap();
        assert_eq!(id.body(), "A0B1C2");
        assert_eq!(id.value(), "USERA0B1C2");
    }

    #[test]
    fn body_without_prefix_is_accepted() {
        let id = UserId::parse("A0B1C2").unwrap();
        assert_eq!(id.value(), "USERA0B1C2");
    }

    #[test]
    fn invalid_postal_body_is_rejected() {
        assert!(UserId::parse("A00B1C").is_err());
    }

    #[test]
    fn legacy_all_digit_body_is_accepted() {
        let id = UserId::parse("1234567").unwrap();
        assert_eq!(id.legacy_number(), Some(1_234_567));
    }

    #[test]
    fn empty_value_is_rejected() {
        assert_eq!(UserId::parse("").unwrap_err(), IdError::Empty);
        assert_eq!(UserId::parse("   ").unwrap_err(), IdError::Empty);
    }

    #[test]
    fn distinct_kinds_do_not_cross_parse_prefix() {
        // A user id's textual body should not swallow a different kind's prefix.
        let quest = QuestId::parse("QUESX1Y2Z3").unwrap();
        assert_eq!(quest.value(), "QUESX1Y2Z3");
    }

    #[test]
    fn structured_raw_id_with_legacy_number() {
        let raw = RawId::Structured {
            value: None,
            prefix: None,
            number: Some(42),
        };
        let id = CharacterId::parse(raw).unwrap();
        assert_eq!(id.legacy_number(), Some(42));
    }

    #[test]
    fn generate_produces_valid_postal_body() {
        let id: QuestId = QuestId::generate();
        assert!(postal_body_pattern().is_match(id.body()));
    }

    #[test]
    fn round_trip_through_serde() {
        let id = SummaryId::parse("SUMMA1B2C3").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"SUMMA1B2C3\"");
        let back: SummaryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
