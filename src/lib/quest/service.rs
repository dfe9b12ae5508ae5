//! Quest use-cases: validate against the cached entity, apply the state
//! transition, then persist (spec §4.2), grounded on the original service's
//! `quest_unit` module. Quest mutations persist immediately rather than
//! going through the dirty queue, which is reserved for user telemetry
//! (spec §4.1).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::cache::GuildCacheEngine;
use crate::domain::character::AnnouncementCoordinates;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{CharacterId, Quest, QuestId, UserId};
use crate::repository::{CharactersRepo, QuestsRepo, RepositoryError, UsersRepo};

pub struct QuestService {
    cache: Arc<GuildCacheEngine>,
    quests: Arc<dyn QuestsRepo>,
    users: Arc<dyn UsersRepo>,
    characters: Arc<dyn CharactersRepo>,
}

impl QuestService {
    pub fn new(
        cache: Arc<GuildCacheEngine>,
        quests: Arc<dyn QuestsRepo>,
        users: Arc<dyn UsersRepo>,
        characters: Arc<dyn CharactersRepo>,
    ) -> Self {
        Self {
            cache,
            quests,
            users,
            characters,
        }
    }

    fn cache_get(&self, guild_id: u64, quest_id: &QuestId) -> Option<Quest> {
        self.cache
            .with_guild(guild_id, |entry| entry.quests.get(quest_id).cloned())
            .flatten()
    }

    fn cache_put(&self, quest: Quest) {
        self.cache.ensure_guild_entry(quest.guild_id);
        self.cache.with_guild_mut(quest.guild_id, |entry| {
            entry.quests.insert(quest.quest_id.clone(), quest);
        });
    }

    async fn persist(&self, quest: &Quest) -> DomainResult<()> {
        self.quests
            .upsert(quest)
            .await
            .map_err(|e| map_repo_error(e, "quest"))
    }

    /// Fetch a quest, preferring the cache; falls through to the repository
    /// on a cache miss and re-populates the cache.
    pub async fn get(&self, guild_id: u64, quest_id: &QuestId) -> DomainResult<Quest> {
        if let Some(quest) = self.cache_get(guild_id, quest_id) {
            return Ok(quest);
        }
        let quest = self
            .quests
            .get(guild_id, quest_id)
            .await
            .map_err(|e| map_repo_error(e, "quest"))?;
        self.cache_put(quest.clone());
        Ok(quest)
    }

    pub async fn create_draft(
        &self,
        guild_id: u64,
        referee_id: UserId,
        title: String,
        starting_at: DateTime<Utc>,
        duration: Duration,
    ) -> DomainResult<Quest> {
        if !self
            .users
            .exists(guild_id, &referee_id)
            .await
            .map_err(|e| map_repo_error(e, "referee"))?
        {
            return Err(DomainError::not_found(format!(
                "Referee {referee_id} does not exist."
            )));
        }
        let quest = Quest::new_draft(guild_id, referee_id, title, starting_at, duration);
        quest.validate()?;
        self.persist(&quest).await?;
        self.cache_put(quest.clone());
        Ok(quest)
    }

    async fn mutate(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        f: impl FnOnce(&mut Quest) -> DomainResult<()>,
    ) -> DomainResult<Quest> {
        let mut quest = self.get(guild_id, quest_id).await?;
        f(&mut quest)?;
        quest.validate()?;
        self.persist(&quest).await?;
        self.cache_put(quest.clone());
        Ok(quest)
    }

    pub async fn publish_now(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        caller: &UserId,
        coordinates: AnnouncementCoordinates,
    ) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.publish_now(caller, coordinates))
            .await
    }

    /// Used by the announcement scheduler (spec §4.3); does not require a
    /// caller since the system is acting on the referee's earlier schedule
    /// request.
    pub async fn publish_scheduled(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        coordinates: AnnouncementCoordinates,
    ) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.publish_scheduled(coordinates))
            .await
    }

    pub async fn schedule(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        at: DateTime<Utc>,
    ) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.schedule(at)).await
    }

    pub async fn start(&self, guild_id: u64, quest_id: &QuestId, caller: &UserId) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.start(caller)).await
    }

    pub async fn complete(&self, guild_id: u64, quest_id: &QuestId, caller: &UserId) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.complete(caller)).await
    }

    pub async fn cancel(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        caller: &UserId,
        is_staff: bool,
    ) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.cancel(caller, is_staff))
            .await
    }

    pub async fn nudge(&self, guild_id: u64, quest_id: &QuestId, caller: &UserId) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.nudge(caller)).await
    }

    pub async fn close_signups(&self, guild_id: u64, quest_id: &QuestId) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| {
            q.close_signups();
            Ok(())
        })
        .await
    }

    /// Requires the user to hold the PLAYER role and own the character
    /// (spec §4.2, grounded on `add_player_signup`).
    pub async fn add_signup(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        user_id: UserId,
        character_id: CharacterId,
    ) -> DomainResult<Quest> {
        let user = self
            .users
            .get(guild_id, &user_id)
            .await
            .map_err(|e| map_repo_error(e, "user"))?;
        if !user.is_player() {
            return Err(DomainError::authorization(format!(
                "User {user_id} is not a player."
            )));
        }
        if !user.is_character_owner(&character_id) {
            return Err(DomainError::authorization(format!(
                "Character {character_id} does not belong to user {user_id}."
            )));
        }
        if !self
            .characters
            .exists(guild_id, &character_id)
            .await
            .map_err(|e| map_repo_error(e, "character"))?
        {
            return Err(DomainError::not_found(format!(
                "Character {character_id} does not exist."
            )));
        }
        self.mutate(guild_id, quest_id, |q| {
            q.add_signup(user_id, character_id)
        })
        .await
    }

    pub async fn select_signup(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        user_id: &UserId,
    ) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.select_signup(user_id))
            .await
    }

    pub async fn remove_signup(
        &self,
        guild_id: u64,
        quest_id: &QuestId,
        user_id: &UserId,
    ) -> DomainResult<Quest> {
        self.mutate(guild_id, quest_id, |q| q.remove_signup(user_id))
            .await
    }
}

fn map_repo_error(err: RepositoryError, what: &str) -> DomainError {
    match err {
        RepositoryError::NotFound(_) => DomainError::not_found(format!("{what} not found")),
        RepositoryError::Transient(m) => DomainError::transient(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::User as DomainUser;
    use crate::domain::Character;
    use crate::repository::memory::InMemoryRepository;

    fn service() -> (QuestService, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let (engine, _rx) = GuildCacheEngine::new();
        let cache = Arc::new(engine);
        (
            QuestService::new(cache, repo.clone(), repo.clone(), repo.clone()),
            repo,
        )
    }

    #[tokio::test]
    async fn create_draft_requires_existing_referee() {
        let (service, _repo) = service();
        let err = service
            .create_draft(
                1,
                UserId::generate(),
                "Expedition".to_string(),
                Utc::now() + Duration::days(1),
                Duration::hours(3),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn full_lifecycle_via_service() {
        let (service, repo) = service();

        let mut referee = DomainUser::from_member(1, 1);
        referee.enable_referee();
        repo.upsert(&referee).await.unwrap();

        let mut player = DomainUser::from_member(1, 2);
        player.enable_player();
        let mut character = Character::new(
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
        character.owner_id = player.user_id.clone();
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
                    channel_id: Some(10),
                    message_id: Some(20),
                    thread_id: None,
                },
            )
            .await
            .unwrap();

        let quest = service
            .add_signup(
                1,
                &quest.quest_id,
                player.user_id.clone(),
                character.character_id.clone(),
            )
            .await
            .unwrap();
        assert_eq!(quest.signups.len(), 1);

        let quest = service
            .select_signup(1, &quest.quest_id, &player.user_id)
            .await
            .unwrap();

        let quest = service.close_signups(1, &quest.quest_id).await.unwrap();
        assert!(!quest.is_signup_open());

        let quest = service
            .start(1, &quest.quest_id, &referee.user_id)
            .await
            .unwrap();
        let quest = service
            .complete(1, &quest.quest_id, &referee.user_id)
            .await
            .unwrap();

        let persisted = repo.get(1, &quest.quest_id).await.unwrap();
        assert_eq!(persisted.status, quest.status);
    }
}
