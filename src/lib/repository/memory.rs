//! An in-memory [`Repository`](super::Repository) adapter. Used by tests and
//! as the default durable backing when no external database is wired up.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{Character, CharacterId, Quest, QuestId, Summary, SummaryId, User, UserId};
use crate::repository::{CharactersRepo, QuestsRepo, RepoResult, RepositoryError, SummariesRepo, UsersRepo};

#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<HashMap<(u64, UserId), User>>,
    quests: RwLock<HashMap<(u64, QuestId), Quest>>,
    characters: RwLock<HashMap<(u64, CharacterId), Character>>,
    summaries: RwLock<HashMap<(u64, SummaryId), Summary>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepository {
    async fn get(&self, guild_id: u64, user_id: &UserId) -> RepoResult<User> {
        self.users
            .read()
            .unwrap()
            .get(&(guild_id, user_id.clone()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("user {user_id}")))
    }

    async fn get_by_discord_id(&self, guild_id: u64, discord_id: u64) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.guild_id == guild_id && u.discord_id == Some(discord_id))
            .cloned())
    }

    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .filter(|u| u.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn exists(&self, guild_id: u64, user_id: &UserId) -> RepoResult<bool> {
        Ok(self
            .users
            .read()
            .unwrap()
            .contains_key(&(guild_id, user_id.clone())))
    }

    async fn upsert(&self, user: &User) -> RepoResult<()> {
        self.users
            .write()
            .unwrap()
            .insert((user.guild_id, user.user_id.clone()), user.clone());
        Ok(())
    }

    async fn delete(&self, guild_id: u64, user_id: &UserId) -> RepoResult<bool> {
        Ok(self
            .users
            .write()
            .unwrap()
            .remove(&(guild_id, user_id.clone()))
            .is_some())
    }
}

#[async_trait]
impl QuestsRepo for InMemoryRepository {
    async fn get(&self, guild_id: u64, quest_id: &QuestId) -> RepoResult<Quest> {
        self.quests
            .read()
            .unwrap()
            .get(&(guild_id, quest_id.clone()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("quest {quest_id}")))
    }

    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<Quest>> {
        Ok(self
            .quests
            .read()
            .unwrap()
            .values()
            .filter(|q| q.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn list_pending_announcements(&self, guild_id: u64) -> RepoResult<Vec<Quest>> {
        let now = chrono::Utc::now();
        Ok(self
            .quests
            .read()
            .unwrap()
            .values()
            .filter(|q| {
                q.guild_id == guild_id
                    && q.announcement.channel_id.is_none()
                    && q.announce_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, guild_id: u64, quest_id: &QuestId) -> RepoResult<bool> {
        Ok(self
            .quests
            .read()
            .unwrap()
            .contains_key(&(guild_id, quest_id.clone())))
    }

    async fn upsert(&self, quest: &Quest) -> RepoResult<()> {
        self.quests
            .write()
            .unwrap()
            .insert((quest.guild_id, quest.quest_id.clone()), quest.clone());
        Ok(())
    }

    async fn delete(&self, guild_id: u64, quest_id: &QuestId) -> RepoResult<bool> {
        Ok(self
            .quests
            .write()
            .unwrap()
            .remove(&(guild_id, quest_id.clone()))
            .is_some())
    }
}

#[async_trait]
impl CharactersRepo for InMemoryRepository {
    async fn get(&self, guild_id: u64, character_id: &CharacterId) -> RepoResult<Character> {
        self.characters
            .read()
            .unwrap()
            .get(&(guild_id, character_id.clone()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("character {character_id}")))
    }

    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<Character>> {
        Ok(self
            .characters
            .read()
            .unwrap()
            .values()
            .filter(|c| c.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn exists(&self, guild_id: u64, character_id: &CharacterId) -> RepoResult<bool> {
        Ok(self
            .characters
            .read()
            .unwrap()
            .contains_key(&(guild_id, character_id.clone())))
    }

    async fn upsert(&self, character: &Character) -> RepoResult<()> {
        self.characters.write().unwrap().insert(
            (character.guild_id, character.character_id.clone()),
            character.clone(),
        );
        Ok(())
    }

    async fn delete(&self, guild_id: u64, character_id: &CharacterId) -> RepoResult<bool> {
        Ok(self
            .characters
            .write()
            .unwrap()
            .remove(&(guild_id, character_id.clone()))
            .is_some())
    }
}

#[async_trait]
impl SummariesRepo for InMemoryRepository {
    async fn get(&self, guild_id: u64, summary_id: &SummaryId) -> RepoResult<Summary> {
        self.summaries
            .read()
            .unwrap()
            .get(&(guild_id, summary_id.clone()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("summary {summary_id}")))
    }

    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<Summary>> {
        Ok(self
            .summaries
            .read()
            .unwrap()
            .values()
            .filter(|s| s.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, summary: &Summary) -> RepoResult<()> {
        self.summaries.write().unwrap().insert(
            (summary.guild_id, summary.summary_id.clone()),
            summary.clone(),
        );
        Ok(())
    }

    async fn delete(&self, guild_id: u64, summary_id: &SummaryId) -> RepoResult<bool> {
        Ok(self
            .summaries
            .write()
            .unwrap()
            .remove(&(guild_id, summary_id.clone()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::User as DomainUser;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let repo = InMemoryRepository::new();
        let user = DomainUser::from_member(1, 42);
        repo.upsert(&user).await.unwrap();
        let fetched = repo.get(1, &user.user_id).await.unwrap();
        assert_eq!(fetched.user_id, user.user_id);
    }

    #[tokio::test]
    async fn get_missing_user_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get(1, &UserId::generate()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn pending_announcements_filters_by_channel_and_time() {
        let repo = InMemoryRepository::new();
        let referee = UserId::generate();
        let mut due = Quest::new_draft(
            1,
            referee.clone(),
            "Due".to_string(),
            chrono::Utc::now() + chrono::Duration::days(1),
            chrono::Duration::hours(1),
        );
        due.announce_at = Some(chrono::Utc::now() - chrono::Duration::seconds(1));
        repo.upsert(&due).await.unwrap();

        let mut not_due = Quest::new_draft(
            1,
            referee,
            "Not due".to_string(),
            chrono::Utc::now() + chrono::Duration::days(1),
            chrono::Duration::hours(1),
        );
        not_due.announce_at = Some(chrono::Utc::now() + chrono::Duration::days(1));
        repo.upsert(&not_due).await.unwrap();

        let pending = repo.list_pending_announcements(1).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].quest_id, due.quest_id);
    }
}
