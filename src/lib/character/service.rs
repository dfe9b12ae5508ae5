//! Character create/update/activate-deactivate use-cases, grounded on
//! `quest::service::QuestService` (same cache-then-repository shape, same
//! validate-before-persist discipline per spec §4.5).

use std::sync::Arc;

use crate::cache::GuildCacheEngine;
use crate::domain::character::AnnouncementCoordinates;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{Character, CharacterId, UserId};
use crate::repository::{CharactersRepo, RepositoryError, UsersRepo};

pub struct CharacterService {
    cache: Arc<GuildCacheEngine>,
    characters: Arc<dyn CharactersRepo>,
    users: Arc<dyn UsersRepo>,
}

impl CharacterService {
    pub fn new(
        cache: Arc<GuildCacheEngine>,
        characters: Arc<dyn CharactersRepo>,
        users: Arc<dyn UsersRepo>,
    ) -> Self {
        Self {
            cache,
            characters,
            users,
        }
    }

    fn cache_put(&self, character: Character) {
        self.cache.ensure_guild_entry(character.guild_id);
        self.cache.with_guild_mut(character.guild_id, |entry| {
            entry
                .characters
                .insert(character.character_id.clone(), character);
        });
    }

    async fn persist(&self, character: &Character) -> DomainResult<()> {
        self.characters
            .upsert(character)
            .await
            .map_err(|e| map_repo_error(e, "character"))
    }

    pub async fn get(&self, guild_id: u64, character_id: &CharacterId) -> DomainResult<Character> {
        if let Some(character) = self
            .cache
            .with_guild(guild_id, |entry| entry.characters.get(character_id).cloned())
            .flatten()
        {
            return Ok(character);
        }
        let character = self
            .characters
            .get(guild_id, character_id)
            .await
            .map_err(|e| map_repo_error(e, "character"))?;
        self.cache_put(character.clone());
        Ok(character)
    }

    /// Create a character for `owner_id` and grant them the PLAYER role if
    /// they don't already hold it (spec §3, "Character" is always owned by
    /// a player).
    pub async fn create(
        &self,
        guild_id: u64,
        owner_id: UserId,
        name: String,
        sheet_url: String,
    ) -> DomainResult<Character> {
        let mut owner = self
            .users
            .get(guild_id, &owner_id)
            .await
            .map_err(|e| map_repo_error(e, "owner"))?;
        if !owner.is_player() {
            owner.enable_player();
            owner.validate()?;
            self.users
                .upsert(&owner)
                .await
                .map_err(|e| map_repo_error(e, "owner"))?;
        }

        let mut character = Character::new(owner_id.clone(), guild_id, name, sheet_url);
        character.validate()?;
        self.persist(&character).await?;

        owner
            .player
            .get_or_insert_with(Default::default)
            .characters
            .push(character.character_id.clone());
        self.users
            .upsert(&owner)
            .await
            .map_err(|e| map_repo_error(e, "owner"))?;

        self.cache_put(character.clone());
        character.announcement = AnnouncementCoordinates::default();
        Ok(character)
    }

    async fn mutate(
        &self,
        guild_id: u64,
        character_id: &CharacterId,
        f: impl FnOnce(&mut Character) -> DomainResult<()>,
    ) -> DomainResult<Character> {
        let mut character = self.get(guild_id, character_id).await?;
        f(&mut character)?;
        character.validate()?;
        self.persist(&character).await?;
        self.cache_put(character.clone());
        Ok(character)
    }

    pub async fn set_announcement(
        &self,
        guild_id: u64,
        character_id: &CharacterId,
        coordinates: AnnouncementCoordinates,
    ) -> DomainResult<Character> {
        self.mutate(guild_id, character_id, |c| {
            c.announcement = coordinates;
            Ok(())
        })
        .await
    }

    pub async fn activate(&self, guild_id: u64, character_id: &CharacterId, caller: &UserId) -> DomainResult<Character> {
        self.mutate(guild_id, character_id, |c| {
            require_owner(c, caller)?;
            c.activate();
            Ok(())
        })
        .await
    }

    pub async fn deactivate(&self, guild_id: u64, character_id: &CharacterId, caller: &UserId) -> DomainResult<Character> {
        self.mutate(guild_id, character_id, |c| {
            require_owner(c, caller)?;
            c.deactivate();
            Ok(())
        })
        .await
    }
}

fn require_owner(character: &Character, caller: &UserId) -> DomainResult<()> {
    if &character.owner_id != caller {
        return Err(DomainError::authorization(
            "Only the character's owner may do that.",
        ));
    }
    Ok(())
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
    use crate::repository::memory::InMemoryRepository;

    fn service() -> (CharacterService, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let (engine, _rx) = GuildCacheEngine::new();
        let cache = Arc::new(engine);
        (
            CharacterService::new(cache, repo.clone(), repo.clone()),
            repo,
        )
    }

    #[tokio::test]
    async fn create_grants_player_role_and_links_character() {
        let (service, repo) = service();
        let owner = DomainUser::from_member(1, 1);
        repo.upsert(&owner).await.unwrap();

        let character = service
            .create(
                1,
                owner.user_id.clone(),
                "Aleksi".to_string(),
                "https://sheets.example.com/character/abc123".to_string(),
            )
            .await
            .unwrap();

        let owner = repo.get(1, &owner.user_id).await.unwrap();
        assert!(owner.is_player());
        assert!(owner.is_character_owner(&character.character_id));
    }

    #[tokio::test]
    async fn deactivate_requires_owner() {
        let (service, repo) = service();
        let owner = DomainUser::from_member(1, 1);
        repo.upsert(&owner).await.unwrap();
        let character = service
            .create(
                1,
                owner.user_id.clone(),
                "Aleksi".to_string(),
                "https://sheets.example.com/character/abc123".to_string(),
            )
            .await
            .unwrap();

        let err = service
            .deactivate(1, &character.character_id, &UserId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Authorization(_)));
    }
}
