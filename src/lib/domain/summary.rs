//! The `Summary` entity: a player- or referee-authored write-up of a quest
//! (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::character::AnnouncementCoordinates;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{CharacterId, QuestId, SummaryId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryKind {
    Player,
    Referee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicationStatus {
    Draft,
    Posted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub summary_id: SummaryId,
    pub guild_id: u64,
    pub kind: SummaryKind,
    pub author_id: UserId,
    pub character_id: Option<CharacterId>,
    pub quest_id: Option<QuestId>,
    pub status: PublicationStatus,
    pub title: String,
    pub content: String,
    pub linked_characters: Vec<CharacterId>,
    pub announcement: AnnouncementCoordinates,
    pub edited_at: DateTime<Utc>,
}

impl Summary {
    pub fn new_draft(guild_id: u64, kind: SummaryKind, author_id: UserId) -> Self {
        Self {
            summary_id: SummaryId::generate(),
            guild_id,
            kind,
            author_id,
            character_id: None,
            quest_id: None,
            status: PublicationStatus::Draft,
            title: String::new(),
            content: String::new(),
            linked_characters: Vec::new(),
            announcement: AnnouncementCoordinates::default(),
            edited_at: Utc::now(),
        }
    }

    pub fn is_posted(&self) -> bool {
        self.status == PublicationStatus::Posted
    }

    /// Mark the summary posted and record its announcement coordinates.
    /// Idempotent if already posted at the same coordinates.
    pub fn publish(&mut self, coordinates: AnnouncementCoordinates) {
        self.status = PublicationStatus::Posted;
        self.announcement = coordinates;
        self.edited_at = Utc::now();
    }

    pub fn edit_content(&mut self, content: String) {
        self.content = content;
        self.edited_at = Utc::now();
    }

    /// A REFEREE-kind summary requires a linked quest; a PLAYER-kind summary
    /// requires a linked character (spec §3: "optional `character_id`/`quest_id`").
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("A summary must have a title."));
        }
        match self.kind {
            SummaryKind::Player if self.character_id.is_none() => {
                return Err(DomainError::validation(
                    "A player summary must reference a character.",
                ));
            }
            SummaryKind::Referee if self.quest_id.is_none() => {
                return Err(DomainError::validation(
                    "A referee summary must reference a quest.",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_summary_requires_character() {
        let s = Summary::new_draft(1, SummaryKind::Player, UserId::generate());
        assert!(s.validate().is_err());
    }

    #[test]
    fn referee_summary_requires_quest() {
        let mut s = Summary::new_draft(1, SummaryKind::Referee, UserId::generate());
        assert!(s.validate().is_err());
        s.quest_id = Some(QuestId::generate());
        s.title = "Session 3 recap".to_string();
        s.validate().unwrap();
    }

    #[test]
    fn publish_sets_status_and_coordinates() {
        let mut s = Summary::new_draft(1, SummaryKind::Referee, UserId::generate());
        s.publish(AnnouncementCoordinates {
            channel_id: Some(1),
            message_id: Some(2),
            thread_id: None,
        });
        assert!(s.is_posted());
        assert_eq!(s.announcement.channel_id, Some(1));
    }
}
