//! The `Quest` entity, its lifecycle state machine, and the sign-up
//! sub-machine (spec §3, §4.2).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::character::AnnouncementCoordinates;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ids::{CharacterId, QuestId, SummaryId, UserId};
use crate::utils::consts::NUDGE_COOLDOWN_HOURS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestStatus {
    Draft,
    Announced,
    Started,
    Completed,
    Cancelled,
}

impl QuestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignupStatus {
    Applied,
    Selected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSignUp {
    pub user_id: UserId,
    pub character_id: CharacterId,
    pub status: SignupStatus,
}

impl PlayerSignUp {
    fn new(user_id: UserId, character_id: CharacterId) -> Self {
        Self {
            user_id,
            character_id,
            status: SignupStatus::Applied,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub quest_id: QuestId,
    pub guild_id: u64,
    pub referee_id: UserId,
    pub announcement: AnnouncementCoordinates,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub raw_markdown: Option<String>,
    pub starting_at: DateTime<Utc>,
    pub duration: Duration,
    pub status: QuestStatus,
    pub announce_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_nudged_at: Option<DateTime<Utc>>,
    pub signups_open: bool,
    pub signups: Vec<PlayerSignUp>,
    pub linked_characters: Vec<CharacterId>,
    pub linked_summaries: Vec<SummaryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quest {
    pub fn new_draft(
        guild_id: u64,
        referee_id: UserId,
        title: String,
        starting_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            quest_id: QuestId::generate(),
            guild_id,
            referee_id,
            announcement: AnnouncementCoordinates::default(),
            title,
            description: String::new(),
            tags: Vec::new(),
            image_url: None,
            raw_markdown: None,
            starting_at,
            duration,
            status: QuestStatus::Draft,
            announce_at: None,
            started_at: None,
            ended_at: None,
            last_nudged_at: None,
            signups_open: false,
            signups: Vec::new(),
            linked_characters: Vec::new(),
            linked_summaries: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True while signups may be accepted: status is ANNOUNCED and signups
    /// have not been explicitly closed (§3).
    pub fn is_signup_open(&self) -> bool {
        self.status == QuestStatus::Announced && self.signups_open
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn ensure_not_terminal(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::conflict(
                "This quest has already ended and can no longer be changed.",
            ));
        }
        Ok(())
    }

    fn ensure_referee(&self, caller: &UserId) -> DomainResult<()> {
        if &self.referee_id != caller {
            return Err(DomainError::authorization(
                "Only this quest's referee can do that.",
            ));
        }
        Ok(())
    }

    /// DRAFT → ANNOUNCED, publishing the announcement now. Guarded on the
    /// caller being the referee; channel assignment is the caller's job
    /// (the scheduler or command handler sets `announcement` beforehand).
    pub fn publish_now(&mut self, caller: &UserId, coordinates: AnnouncementCoordinates) -> DomainResult<()> {
        self.ensure_referee(caller)?;
        self.ensure_not_terminal()?;
        if self.status != QuestStatus::Draft {
            return Err(DomainError::conflict("This quest has already been announced."));
        }
        self.announcement = coordinates;
        self.status = QuestStatus::Announced;
        self.signups_open = true;
        self.announce_at = None;
        self.touch();
        Ok(())
    }

    /// System-driven publish, used by the deferred announcement scheduler
    /// (spec §4.3) which acts on the referee's behalf rather than in
    /// response to a live command, so it skips the referee guard.
    pub fn publish_scheduled(&mut self, coordinates: AnnouncementCoordinates) -> DomainResult<()> {
        self.ensure_not_terminal()?;
        if self.status != QuestStatus::Draft {
            return Err(DomainError::conflict("This quest has already been announced."));
        }
        self.announcement = coordinates;
        self.status = QuestStatus::Announced;
        self.signups_open = true;
        self.announce_at = None;
        self.touch();
        Ok(())
    }

    /// DRAFT → DRAFT, setting a future `announce_at` for the scheduler to
    /// later promote.
    pub fn schedule(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_not_terminal()?;
        if self.status != QuestStatus::Draft {
            return Err(DomainError::conflict(
                "Only a draft quest can be scheduled for later announcement.",
            ));
        }
        if at <= Utc::now() {
            return Err(DomainError::validation(
                "The scheduled announcement time must be in the future.",
            ));
        }
        self.announce_at = Some(at);
        self.touch();
        Ok(())
    }

    /// ANNOUNCED → STARTED.
    pub fn start(&mut self, caller: &UserId) -> DomainResult<()> {
        self.ensure_referee(caller)?;
        self.ensure_not_terminal()?;
        if self.status != QuestStatus::Announced {
            return Err(DomainError::conflict(
                "A quest must be announced before it can be started.",
            ));
        }
        self.status = QuestStatus::Started;
        self.started_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    /// STARTED or ANNOUNCED → COMPLETED.
    pub fn complete(&mut self, caller: &UserId) -> DomainResult<()> {
        self.ensure_referee(caller)?;
        self.ensure_not_terminal()?;
        if !matches!(self.status, QuestStatus::Started | QuestStatus::Announced) {
            return Err(DomainError::conflict(
                "Only an announced or started quest can be completed.",
            ));
        }
        self.status = QuestStatus::Completed;
        self.ended_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    /// Any non-terminal status → CANCELLED. Idempotent if already cancelled.
    pub fn cancel(&mut self, caller: &UserId, is_staff: bool) -> DomainResult<()> {
        if self.status == QuestStatus::Cancelled {
            return Ok(());
        }
        if &self.referee_id != caller && !is_staff {
            return Err(DomainError::authorization(
                "Only this quest's referee or staff can cancel it.",
            ));
        }
        if self.status == QuestStatus::Completed {
            return Err(DomainError::conflict(
                "This quest has already ended and can no longer be changed.",
            ));
        }
        self.status = QuestStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// Re-announce a published quest, gated by a 48h cooldown since the last
    /// nudge (spec §4.2, §8 invariant 6).
    pub fn nudge(&mut self, caller: &UserId) -> DomainResult<()> {
        self.ensure_referee(caller)?;
        if self.announcement.channel_id.is_none() {
            return Err(DomainError::conflict(
                "This quest has not been announced yet.",
            ));
        }
        let now = Utc::now();
        if let Some(last) = self.last_nudged_at {
            let cooldown = Duration::hours(NUDGE_COOLDOWN_HOURS);
            let ready_at = last + cooldown;
            if now < ready_at {
                let remaining_seconds = (ready_at - now).num_seconds().max(0);
                let hours = (remaining_seconds + 3599) / 3600;
                return Err(DomainError::conflict(format!(
                    "This quest was nudged recently; try again in about {hours}h."
                )));
            }
        }
        self.last_nudged_at = Some(now);
        self.touch();
        Ok(())
    }

    fn find_signup(&self, user_id: &UserId) -> Option<&PlayerSignUp> {
        self.signups.iter().find(|s| &s.user_id == user_id)
    }

    fn find_signup_mut(&mut self, user_id: &UserId) -> Option<&mut PlayerSignUp> {
        self.signups.iter_mut().find(|s| &s.user_id == user_id)
    }

    /// `add_signup` fails with "already signed up" if the user already has
    /// an entry for this quest (spec §3, invariant 2).
    pub fn add_signup(&mut self, user_id: UserId, character_id: CharacterId) -> DomainResult<()> {
        if !self.is_signup_open() {
            return Err(DomainError::conflict(
                "Sign-ups are not open for this quest.",
            ));
        }
        if self.find_signup(&user_id).is_some() {
            return Err(DomainError::already_signed_up());
        }
        self.signups.push(PlayerSignUp::new(user_id, character_id));
        self.touch();
        Ok(())
    }

    /// Promote an existing signup to SELECTED. Order of other signups is
    /// unaffected.
    pub fn select_signup(&mut self, user_id: &UserId) -> DomainResult<()> {
        let signup = self
            .find_signup_mut(user_id)
            .ok_or_else(|| DomainError::not_found("No sign-up from that user was found."))?;
        signup.status = SignupStatus::Selected;
        self.touch();
        Ok(())
    }

    pub fn remove_signup(&mut self, user_id: &UserId) -> DomainResult<()> {
        let before = self.signups.len();
        self.signups.retain(|s| &s.user_id != user_id);
        if self.signups.len() == before {
            return Err(DomainError::not_found("No sign-up from that user was found."));
        }
        self.touch();
        Ok(())
    }

    /// Idempotent: flips `signups_open` to false without enqueueing a dirty
    /// write if it was already closed (spec §8, Idempotence).
    pub fn close_signups(&mut self) {
        if self.signups_open {
            self.signups_open = false;
            self.touch();
        }
    }

    /// Pending signups (not yet SELECTED), in insertion order, for the
    /// adjudication panel (spec §4.2).
    pub fn pending_signups(&self) -> impl Iterator<Item = &PlayerSignUp> {
        self.signups
            .iter()
            .filter(|s| s.status == SignupStatus::Applied)
    }

    /// Total, side-effect-free validation run before persistence (§4.5).
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("A quest must have a title."));
        }
        if self.duration <= Duration::zero() {
            return Err(DomainError::validation(
                "A quest's duration must be positive.",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for signup in &self.signups {
            if !seen.insert(&signup.user_id) {
                return Err(DomainError::validation(
                    "A quest cannot have more than one sign-up per user.",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Quest {
        Quest::new_draft(
            1,
            UserId::generate(),
            "Expedition".to_string(),
            Utc::now() + Duration::days(30),
            Duration::hours(3),
        )
    }

    fn announced() -> Quest {
        let mut q = draft();
        let referee = q.referee_id.clone();
        q.publish_now(
            &referee,
            AnnouncementCoordinates {
                channel_id: Some(1),
                message_id: Some(2),
                thread_id: None,
            },
        )
        .unwrap();
        q
    }

    #[test]
    fn publish_now_requires_referee() {
        let mut q = draft();
        let other = UserId::generate();
        assert!(matches!(
            q.publish_now(&other, AnnouncementCoordinates::default()),
            Err(DomainError::Authorization(_))
        ));
    }

    #[test]
    fn full_lifecycle_s1() {
        let mut q = announced();
        let referee = q.referee_id.clone();
        let player = UserId::generate();
        let character = CharacterId::generate();

        q.add_signup(player.clone(), character.clone()).unwrap();
        assert_eq!(q.signups.len(), 1);
        assert_eq!(q.signups[0].status, SignupStatus::Applied);

        q.select_signup(&player).unwrap();
        assert_eq!(q.signups[0].status, SignupStatus::Selected);

        q.close_signups();
        assert!(!q.is_signup_open());

        q.start(&referee).unwrap();
        assert_eq!(q.status, QuestStatus::Started);

        q.complete(&referee).unwrap();
        assert_eq!(q.status, QuestStatus::Completed);
        assert!(q.ended_at.is_some());
    }

    #[test]
    fn duplicate_signup_is_rejected_s2() {
        let mut q = announced();
        let player = UserId::generate();
        q.add_signup(player.clone(), CharacterId::generate()).unwrap();
        let err = q
            .add_signup(player, CharacterId::generate())
            .unwrap_err();
        assert_eq!(err, DomainError::already_signed_up());
        assert_eq!(q.signups.len(), 1);
    }

    #[test]
    fn nudge_cooldown_s3() {
        let mut q = announced();
        let referee = q.referee_id.clone();
        q.nudge(&referee).unwrap();
        let t0 = q.last_nudged_at.unwrap();

        // Simulate t0+47h: still inside cooldown.
        q.last_nudged_at = Some(t0 - Duration::hours(1));
        let err = q.nudge(&referee).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Simulate t0+48h+1s: cooldown has elapsed.
        q.last_nudged_at = Some(t0 - Duration::hours(48) - Duration::seconds(1));
        q.nudge(&referee).unwrap();
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut q = announced();
        let referee = q.referee_id.clone();
        q.cancel(&referee, false).unwrap();
        assert_eq!(q.status, QuestStatus::Cancelled);
        assert!(q.start(&referee).is_err());
        assert!(q
            .add_signup(UserId::generate(), CharacterId::generate())
            .is_err());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut q = announced();
        let referee = q.referee_id.clone();
        q.cancel(&referee, false).unwrap();
        q.cancel(&referee, false).unwrap();
        assert_eq!(q.status, QuestStatus::Cancelled);
    }

    #[test]
    fn close_signups_is_idempotent() {
        let mut q = announced();
        q.close_signups();
        let updated_at = q.updated_at;
        q.close_signups();
        assert_eq!(q.updated_at, updated_at);
    }

    #[test]
    fn select_and_remove_require_existing_signup() {
        let mut q = announced();
        let stranger = UserId::generate();
        assert!(q.select_signup(&stranger).is_err());
        assert!(q.remove_signup(&stranger).is_err());
    }
}
