//! The `User` entity, its `Player`/`Referee` sub-profiles, and the role
//! invariants that tie them together (spec §3, "User").

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{CharacterId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Member,
    Player,
    Referee,
}

/// A player's collaboration tally with one character: how many quests they
/// played together and for how long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CollabStat {
    pub count: u32,
    pub hours: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Player {
    pub characters: Vec<CharacterId>,
    /// Number of quests played and cumulative hours played.
    pub play_history: CollabStat,
    pub collab_with_characters: HashMap<String, CollabStat>,
}

impl Player {
    pub fn owns(&self, character_id: &CharacterId) -> bool {
        self.characters.iter().any(|c| c == character_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Referee {
    pub hosted_quests: u32,
    pub collab_with_users: HashMap<String, CollabStat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub messages: u64,
    pub reactions_given: u64,
    pub reactions_received: u64,
    pub voice_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub discord_id: Option<u64>,
    pub guild_id: u64,
    pub roles: HashSet<Role>,
    pub has_server_tag: bool,
    pub dm_opt_in: bool,
    pub joined_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub engagement: EngagementCounters,
    pub player: Option<Player>,
    pub referee: Option<Referee>,
}

impl User {
    /// Build a default user for a freshly scraped guild member.
    pub fn from_member(guild_id: u64, discord_id: u64) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::generate(),
            discord_id: Some(discord_id),
            guild_id,
            roles: HashSet::from([Role::Member]),
            has_server_tag: false,
            dm_opt_in: true,
            joined_at: now,
            last_active_at: now,
            engagement: EngagementCounters::default(),
            player: None,
            referee: None,
        }
    }

    pub fn is_player(&self) -> bool {
        self.roles.contains(&Role::Player)
    }

    pub fn is_referee(&self) -> bool {
        self.roles.contains(&Role::Referee)
    }

    pub fn is_character_owner(&self, character_id: &CharacterId) -> bool {
        self.player
            .as_ref()
            .is_some_and(|p| p.owns(character_id))
    }

    /// Grant the PLAYER role and ensure a `Player` sub-profile exists.
    /// Idempotent: does nothing if PLAYER is already enabled.
    pub fn enable_player(&mut self) {
        self.roles.insert(Role::Player);
        self.player.get_or_insert_with(Player::default);
    }

    /// Revoke the PLAYER role. Fails if REFEREE is currently enabled, per
    /// spec invariant: disabling PLAYER while REFEREE is active is rejected.
    pub fn disable_player(&mut self) -> DomainResult<()> {
        if self.is_referee() {
            return Err(DomainError::validation(
                "Cannot disable the player role while the referee role is active.",
            ));
        }
        self.roles.remove(&Role::Player);
        self.player = None;
        Ok(())
    }

    /// Grant the REFEREE role. Implies PLAYER, per spec invariant
    /// ("enable_referee() MUST imply enable_player()").
    pub fn enable_referee(&mut self) {
        self.enable_player();
        self.roles.insert(Role::Referee);
        self.referee.get_or_insert_with(Referee::default);
    }

    /// Revoke the REFEREE role. Idempotent.
    pub fn disable_referee(&mut self) {
        self.roles.remove(&Role::Referee);
        self.referee = None;
    }

    pub fn touch_active(&mut self) {
        self.last_active_at = Utc::now();
    }

    pub fn record_message(&mut self) {
        self.engagement.messages += 1;
        self.touch_active();
    }

    pub fn record_reaction_given(&mut self) {
        self.engagement.reactions_given += 1;
    }

    pub fn record_reaction_received(&mut self) {
        self.engagement.reactions_received += 1;
    }

    pub fn record_voice_seconds(&mut self, seconds: u64) {
        self.engagement.voice_seconds += seconds;
    }

    /// Total, side-effect-free validation, run before any persistence (§4.5).
    pub fn validate(&self) -> DomainResult<()> {
        if self.roles.contains(&Role::Player) && self.player.is_none() {
            return Err(DomainError::validation(
                "User has the player role but no player profile.",
            ));
        }
        if self.roles.contains(&Role::Referee) && self.referee.is_none() {
            return Err(DomainError::validation(
                "User has the referee role but no referee profile.",
            ));
        }
        if self.roles.contains(&Role::Referee) && !self.roles.contains(&Role::Player) {
            return Err(DomainError::validation(
                "A referee must also hold the player role.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> User {
        User::from_member(1, 42)
    }

    #[test]
    fn enable_referee_implies_player() {
        let mut u = new_user();
        u.enable_referee();
        assert!(u.is_player());
        assert!(u.is_referee());
        assert!(u.player.is_some());
        assert!(u.referee.is_some());
        u.validate().unwrap();
    }

    #[test]
    fn disable_player_while_referee_fails() {
        let mut u = new_user();
        u.enable_referee();
        let err = u.disable_player().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(u.is_player());
    }

    #[test]
    fn disable_player_without_referee_succeeds() {
        let mut u = new_user();
        u.enable_player();
        u.disable_player().unwrap();
        assert!(!u.is_player());
        assert!(u.player.is_none());
    }

    #[test]
    fn enable_player_is_idempotent() {
        let mut u = new_user();
        u.enable_player();
        u.enable_player();
        assert_eq!(u.roles.iter().filter(|r| **r == Role::Player).count(), 1);
    }

    #[test]
    fn validate_rejects_inconsistent_roles() {
        let mut u = new_user();
        u.roles.insert(Role::Player);
        assert!(u.validate().is_err());
    }

    #[test]
    fn user_id_decodes_with_user_prefix() {
        let u = new_user();
        assert_eq!(u.user_id.value().get(..4), Some("USER"));
    }
}
