//! The `Character` entity (spec §3).

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{CharacterId, QuestId, SummaryId, UserId};

fn sheet_url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The external character-sheet tool's URL shape: a path under /character/<id>.
    RE.get_or_init(|| {
        Regex::new(r"^https?://[^\s/]+/character/[A-Za-z0-9_-]+/?$").expect("valid regex")
    })
}

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 64;
pub const MAX_TAGS: usize = 20;
pub const DESCRIPTION_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterStatus {
    Active,
    Retired,
}

/// Coordinates of the public chat message announcing this entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementCoordinates {
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
    pub thread_id: Option<u64>,
}

impl AnnouncementCoordinates {
    pub fn is_published(&self) -> bool {
        self.channel_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub character_id: CharacterId,
    pub owner_id: UserId,
    pub guild_id: u64,
    pub name: String,
    pub sheet_url: String,
    pub thread_url: Option<String>,
    pub token_url: Option<String>,
    pub art_url: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    pub notes: String,
    pub status: CharacterStatus,
    pub announcement: AnnouncementCoordinates,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub played_with: Vec<UserId>,
    pub played_in: Vec<QuestId>,
    pub mentioned_in: Vec<SummaryId>,
}

impl Character {
    pub fn new(owner_id: UserId, guild_id: u64, name: String, sheet_url: String) -> Self {
        let now = Utc::now();
        Self {
            character_id: CharacterId::generate(),
            owner_id,
            guild_id,
            name,
            sheet_url,
            thread_url: None,
            token_url: None,
            art_url: None,
            tags: Vec::new(),
            description: String::new(),
            notes: String::new(),
            status: CharacterStatus::Active,
            announcement: AnnouncementCoordinates::default(),
            created_at: now,
            updated_at: now,
            played_with: Vec::new(),
            played_in: Vec::new(),
            mentioned_in: Vec::new(),
        }
    }

    pub fn activate(&mut self) {
        self.status = CharacterStatus::Active;
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.status = CharacterStatus::Retired;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == CharacterStatus::Active
    }

    /// Total, side-effect-free validation, run before any persistence (§4.5).
    pub fn validate(&self) -> DomainResult<()> {
        let len = self.name.chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "Character name must be {NAME_MIN_LEN}-{NAME_MAX_LEN} characters long, got {len}."
            )));
        }
        if !sheet_url_pattern().is_match(&self.sheet_url) {
            return Err(DomainError::validation(
                "Character sheet URL does not match the expected character-sheet link format.",
            ));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(DomainError::validation(format!(
                "A character may have at most {MAX_TAGS} tags."
            )));
        }
        if self.description.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(DomainError::validation(format!(
                "Character description must be {DESCRIPTION_MAX_LEN} characters or fewer."
            )));
        }
        if self.notes.chars().count() > DESCRIPTION_MAX_LEN {
            return Err(DomainError::validation(format!(
                "Character notes must be {DESCRIPTION_MAX_LEN} characters or fewer."
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Character {
        Character::new(
            UserId::generate(),
            1,
            "Aleksi".to_string(),
            "https://sheets.example.com/character/abc123".to_string(),
        )
    }

    #[test]
    fn valid_character_passes() {
        base().validate().unwrap();
    }

    #[test]
    fn name_length_boundaries() {
        let mut c = base();
        c.name = "ab".to_string();
        c.validate().unwrap();
        c.name = "a".repeat(64);
        c.validate().unwrap();

        c.name = "a".to_string();
        assert!(c.validate().is_err());
        c.name = "a".repeat(65);
        assert!(c.validate().is_err());
    }

    #[test]
    fn sheet_url_scheme_is_enforced() {
        let mut c = base();
        c.sheet_url = "ftp://sheets.example.com/character/abc123".to_string();
        assert!(c.validate().is_err());

        c.sheet_url = "not a url".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn activate_and_deactivate_flip_status() {
        let mut c = base();
        c.deactivate();
        assert_eq!(c.status, CharacterStatus::Retired);
        assert!(!c.is_active());
        c.activate();
        assert!(c.is_active());
    }

    #[test]
    fn too_many_tags_is_rejected() {
        let mut c = base();
        c.tags = (0..21).map(|i| i.to_string()).collect();
        assert!(c.validate().is_err());
    }
}
