//! Persistence ports: trait-abstracted collections per entity kind, with an
//! in-memory adapter (tests, demos) and an HTTP adapter (spec §6.3, §6.4).

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Character, CharacterId, Quest, QuestId, Summary, SummaryId, User, UserId};

#[derive(Debug, Error, Clone)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Transient(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// One collection per entity kind, keyed by `guild_id` and the entity's own
/// postal ID (spec §6.4: "each document carries its own entity ID").
#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn get(&self, guild_id: u64, user_id: &UserId) -> RepoResult<User>;
    async fn get_by_discord_id(&self, guild_id: u64, discord_id: u64) -> RepoResult<Option<User>>;
    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<User>>;
    async fn exists(&self, guild_id: u64, user_id: &UserId) -> RepoResult<bool>;
    async fn upsert(&self, user: &User) -> RepoResult<()>;
    async fn delete(&self, guild_id: u64, user_id: &UserId) -> RepoResult<bool>;
}

#[async_trait]
pub trait QuestsRepo: Send + Sync {
    async fn get(&self, guild_id: u64, quest_id: &QuestId) -> RepoResult<Quest>;
    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<Quest>>;
    /// Quests whose `announce_at` has not yet fired and are unpublished, for
    /// the deferred-announcement scheduler (spec §4.3).
    async fn list_pending_announcements(&self, guild_id: u64) -> RepoResult<Vec<Quest>>;
    async fn exists(&self, guild_id: u64, quest_id: &QuestId) -> RepoResult<bool>;
    async fn upsert(&self, quest: &Quest) -> RepoResult<()>;
    async fn delete(&self, guild_id: u64, quest_id: &QuestId) -> RepoResult<bool>;
}

#[async_trait]
pub trait CharactersRepo: Send + Sync {
    async fn get(&self, guild_id: u64, character_id: &CharacterId) -> RepoResult<Character>;
    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<Character>>;
    async fn exists(&self, guild_id: u64, character_id: &CharacterId) -> RepoResult<bool>;
    async fn upsert(&self, character: &Character) -> RepoResult<()>;
    async fn delete(&self, guild_id: u64, character_id: &CharacterId) -> RepoResult<bool>;
}

#[async_trait]
pub trait SummariesRepo: Send + Sync {
    async fn get(&self, guild_id: u64, summary_id: &SummaryId) -> RepoResult<Summary>;
    async fn list_by_guild(&self, guild_id: u64) -> RepoResult<Vec<Summary>>;
    async fn upsert(&self, summary: &Summary) -> RepoResult<()>;
    async fn delete(&self, guild_id: u64, summary_id: &SummaryId) -> RepoResult<bool>;
}

/// Bundles the four collection ports behind one handle, mirroring the way
/// the guild cache entry groups its four maps (spec §4.1).
pub trait Repository: UsersRepo + QuestsRepo + CharactersRepo + SummariesRepo {}

impl<T: UsersRepo + QuestsRepo + CharactersRepo + SummariesRepo> Repository for T {}
