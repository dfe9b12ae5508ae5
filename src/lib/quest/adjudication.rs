//! The referee's decision panel over pending sign-ups: HTTP-then-local
//! fallback, read-back-after-write, announcement sync, and a best-effort DM
//! to the affected player (spec §4.2 "Adjudication flow").

use std::sync::Arc;

use async_trait::async_trait;

use crate::api_client::QuestApiClient;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{Quest, QuestId, UserId};
use crate::quest::service::QuestService;
use crate::utils::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
    Close,
}

/// Re-renders the quest's embed (and optional view) in its announcement
/// channel. A no-op implementation is acceptable when the gateway side is
/// unavailable (tests, dry runs).
#[async_trait]
pub trait AnnouncementSync: Send + Sync {
    async fn sync(&self, guild_id: u64, quest: &Quest) -> AnyResult<()>;
}

/// Sends the affected player a DM describing the decision. Failures here
/// are swallowed by the caller, never surfaced to the referee.
#[async_trait]
pub trait PlayerNotifier: Send + Sync {
    async fn notify(&self, guild_id: u64, user_id: &UserId, decision: Decision) -> AnyResult<()>;
}

pub struct AdjudicationPanel {
    service: Arc<QuestService>,
    api_client: Option<Arc<QuestApiClient>>,
    announcements: Arc<dyn AnnouncementSync>,
    notifier: Arc<dyn PlayerNotifier>,
}

impl AdjudicationPanel {
    pub fn new(
        service: Arc<QuestService>,
        api_client: Option<Arc<QuestApiClient>>,
        announcements: Arc<dyn AnnouncementSync>,
        notifier: Arc<dyn PlayerNotifier>,
    ) -> Self {
        Self {
            service,
            api_client,
            announcements,
            notifier,
        }
    }

    /// Apply one decision to a pending sign-up. Steps 1-4 of spec §4.2.
    pub async fn decide(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        applicant_id: &UserId,
        decision: Decision,
    ) -> DomainResult<Quest> {
        let quest = self.apply_remote_then_local(guild_id, quest_id, applicant_id, decision).await?;

        if let Err(e) = self.announcements.sync(guild_id, &quest).await {
            warn!(guild_id, quest_id = %quest_id, "failed to sync announcement: {}", e.oneliner());
        }

        info!(
            guild_id,
            quest_id = %quest_id,
            applicant = %applicant_id,
            decision = ?decision,
            "quest sign-up decision applied",
        );

        // Best-effort: DM failures (e.g. the player has DMs closed) never
        // surface to the referee (spec §4.2 step 4).
        if let Err(e) = self.notifier.notify(guild_id, applicant_id, decision).await {
            debug!(guild_id, applicant = %applicant_id, "DM notification failed: {}", e.oneliner());
        }

        Ok(quest)
    }

    async fn apply_remote_then_local(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        applicant_id: &UserId,
        decision: Decision,
    ) -> DomainResult<Quest> {
        if let Some(client) = self.api_client.as_ref().filter(|c| c.is_enabled()) {
            let remote = match decision {
                Decision::Accept => client.select_signup(guild_id, quest_id, applicant_id).await,
                Decision::Decline => client.remove_signup(guild_id, quest_id, applicant_id).await,
                Decision::Close => client.close_signups(guild_id, quest_id).await,
            };
            match remote {
                Ok(_) => {
                    // Read back the canonical post-write view rather than
                    // trusting the response body verbatim (spec §9, "Dual
                    // persistence paths").
                    return self.refetch(guild_id, quest_id).await;
                }
                Err(crate::api_client::ApiError::Validation(m)) => return Err(DomainError::validation(m)),
                Err(crate::api_client::ApiError::NotFound(m)) => return Err(DomainError::not_found(m)),
                Err(e @ crate::api_client::ApiError::Transient(_)) => {
                    warn!(guild_id, quest_id = %quest_id, "remote adjudication failed, falling back to local: {e}");
                }
            }
        }

        match decision {
            Decision::Accept => self.service.select_signup(guild_id, quest_id, applicant_id).await,
            Decision::Decline => self.service.remove_signup(guild_id, quest_id, applicant_id).await,
            Decision::Close => self.service.close_signups(guild_id, quest_id).await,
        }
    }

    async fn refetch(&self, guild_id: u64, quest_id: &QuestId) -> DomainResult<Quest> {
        self.service.get(guild_id, quest_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GuildCacheEngine;
    use crate::domain::character::AnnouncementCoordinates;
    use crate::domain::user::User as DomainUser;
    use crate::domain::{Character, CharacterId};
    use crate::repository::memory::InMemoryRepository;
    use chrono::{Duration, Utc};

    struct NoopSync;
    #[async_trait]
    impl AnnouncementSync for NoopSync {
        async fn sync(&self, _guild_id: u64, _quest: &Quest) -> AnyResult<()> {
            Ok(())
        }
    }

    struct NoopNotifier;
    #[async_trait]
    impl PlayerNotifier for NoopNotifier {
        async fn notify(&self, _guild_id: u64, _user_id: &UserId, _decision: Decision) -> AnyResult<()> {
            Ok(())
        }
    }

    async fn setup() -> (AdjudicationPanel, Arc<InMemoryRepository>, Quest, UserId) {
        let repo = Arc::new(InMemoryRepository::new());
        let (engine, _rx) = GuildCacheEngine::new();
        let cache = Arc::new(engine);
        let service = Arc::new(QuestService::new(
            cache,
            repo.clone(),
            repo.clone(),
            repo.clone(),
        ));

        let mut referee = DomainUser::from_member(1, 1);
        referee.enable_referee();
        repo.upsert(&referee).await.unwrap();

        let mut player = DomainUser::from_member(1, 2);
        player.enable_player();
        let character = Character::new(
            player.user_id.clone(),
            1,
            "Aleksi".to_string(),
            "https://sheets.example.com/character/abc123".to_string(),
        );
        player
            .player
            .as_mut()
            .unwrap()
            .characters
            .push(character.character_id.clone());
        repo.upsert(&player).await.unwrap();
        repo.upsert(&character).await.unwrap();

        let quest = service
            .create_draft(
                1,
                referee.user_id.clone(),
                "Expedition".to_string(),
                Utc::now() + Duration::days(1),
                Duration::hours(3),
            )
            .await
            .unwrap();
        let quest = service
            .publish_now(
                1,
                &quest.quest_id,
                &referee.user_id,
                AnnouncementCoordinates {
                    channel_id: Some(1),
                    message_id: Some(2),
                    thread_id: None,
                },
            )
            .await
            .unwrap();
        let quest = service
            .add_signup(1, &quest.quest_id, player.user_id.clone(), character.character_id.clone())
            .await
            .unwrap();

        let panel = AdjudicationPanel::new(service, None, Arc::new(NoopSync), Arc::new(NoopNotifier));
        (panel, repo, quest, player.user_id)
    }

    #[tokio::test]
    async fn accept_selects_the_signup() {
        let (panel, _repo, quest, player_id) = setup().await;
        let quest = panel
            .decide(1, &quest.quest_id, &player_id, Decision::Accept)
            .await
            .unwrap();
        assert_eq!(
            quest.signups[0].status,
            crate::domain::quest::SignupStatus::Selected
        );
    }

    #[tokio::test]
    async fn decline_removes_the_signup() {
        let (panel, _repo, quest, player_id) = setup().await;
        let quest = panel
            .decide(1, &quest.quest_id, &player_id, Decision::Decline)
            .await
            .unwrap();
        assert!(quest.signups.is_empty());
    }

    #[tokio::test]
    async fn decide_on_missing_signup_fails() {
        let (panel, _repo, quest, _player_id) = setup().await;
        let stranger = CharacterId::generate();
        let _ = stranger;
        let err = panel
            .decide(1, &quest.quest_id, &UserId::generate(), Decision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
