#![allow(dead_code)]

use std::collections::HashSet;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::prelude::*;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker};
use twilight_model::id::Id;

use crate::utils::prelude::*;

pub const GUILD_CONFIG_DIR: &str = "./data/guilds/";

/// Per-tenant dynamic settings: classic command prefix plus every channel
/// and role a guild can wire up for quest/character flows. All ids are
/// optional because a freshly-joined guild has none of them configured yet.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GuildSettings {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub announcement_channel: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub ping_role: Option<Id<RoleMarker>>,
    #[serde(default)]
    pub referee_role: Option<Id<RoleMarker>>,
    #[serde(default)]
    pub summary_channel: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub character_channel: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub logging_channel: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub player_role: Option<Id<RoleMarker>>,
    #[serde(default)]
    pub staff_roles: HashSet<Id<RoleMarker>>,
    #[serde(default)]
    pub server_tag_role: Option<Id<RoleMarker>>,
    #[serde(default)]
    pub server_tag_pattern: Option<String>,
    #[serde(default)]
    pub booster_role: Option<Id<RoleMarker>>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            announcement_channel: None,
            ping_role: None,
            referee_role: None,
            summary_channel: None,
            character_channel: None,
            logging_channel: None,
            player_role: None,
            staff_roles: HashSet::new(),
            server_tag_role: None,
            server_tag_pattern: None,
            booster_role: None,
        }
    }
}

impl GuildSettings {
    /// `true` if `role_id` is either the configured referee role or a staff role.
    pub fn is_referee_or_staff(&self, role_ids: &[Id<RoleMarker>]) -> bool {
        role_ids.iter().any(|r| {
            self.referee_role == Some(*r) || self.staff_roles.contains(r)
        })
    }
}

/// Persisted per-guild settings, serialized one file per guild under
/// [`GUILD_CONFIG_DIR`].
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
struct GuildStore {
    #[serde(skip_serializing, default)]
    guilds: std::collections::HashMap<Id<GuildMarker>, GuildSettings>,
}

/// Process-wide bot configuration: environment-backed connection and
/// crypto settings, plus a per-guild settings store persisted as JSON
/// files under `./data/guilds/`.
pub struct BotConfig {
    /// Default fallback quest-board announcement channel, if no per-guild
    /// override is configured.
    pub quest_board_channel_id: Option<Id<ChannelMarker>>,
    /// Flush the dirty cache queue through the HTTP/GraphQL adapter
    /// instead of the in-process repository directly.
    pub flush_via_adapter: bool,
    /// Interval between dirty-queue flush passes.
    pub flush_interval_seconds: u64,
    /// Base URL of the REST quest API, used by [`crate::api_client::QuestApiClient`].
    pub quest_api_base_url: String,
    /// GraphQL endpoint, if summaries/characters are synced through it.
    pub graphql_api_url: Option<String>,
    /// Bearer token sent with GraphQL requests.
    pub graphql_api_token: Option<String>,
    /// Per-guild settings store, loaded from and flushed to disk.
    guilds: RwLock<GuildStore>,
}

impl BotConfig {
    /// Build configuration from the environment and load the on-disk
    /// per-guild settings store, creating it if absent.
    pub fn new() -> AnyResult<Self> {
        info!("Loading bot configuration");

        let quest_board_channel_id = env::var("QUEST_BOARD_CHANNEL_ID")
            .ok()
            .and_then(|s| s.parse().ok());

        let flush_via_adapter = env::var("FLUSH_VIA_ADAPTER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);

        let flush_interval_seconds = env::var("FLUSH_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(crate::utils::consts::DEFAULT_FLUSH_INTERVAL_SECONDS);

        let quest_api_base_url = env::var("QUEST_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let graphql_api_url = env::var("GRAPHQL_API_URL").ok();
        let graphql_api_token = env::var("GRAPHQL_API_TOKEN").ok();

        let guilds = RwLock::new(Self::load_guild_store()?);

        Ok(Self {
            quest_board_channel_id,
            flush_via_adapter,
            flush_interval_seconds,
            quest_api_base_url,
            graphql_api_url,
            graphql_api_token,
            guilds,
        })
    }

    /// The classic command prefix in effect for `guild_id`, or `None` for
    /// a DM / an unconfigured guild (callers fall back to a hardcoded default).
    pub fn classic_prefix(&self, guild_id: Option<Id<GuildMarker>>) -> Option<String> {
        let guild_id = guild_id?;
        let guard = self.guilds.read().expect("guild settings lock poisoned");
        guard.guilds.get(&guild_id).map(|s| s.prefix.clone())
    }

    /// Clone of a guild's settings, if any were ever persisted for it.
    pub fn guild(&self, guild_id: Id<GuildMarker>) -> Option<GuildSettings> {
        let guard = self.guilds.read().expect("guild settings lock poisoned");
        guard.guilds.get(&guild_id).cloned()
    }

    /// Clone of a guild's settings, defaulting and persisting a fresh
    /// entry if the guild has never been configured before.
    pub fn guild_or_default(&self, guild_id: Id<GuildMarker>) -> AnyResult<GuildSettings> {
        {
            let guard = self.guilds.read().expect("guild settings lock poisoned");
            if let Some(settings) = guard.guilds.get(&guild_id) {
                return Ok(settings.clone());
            }
        }

        let settings = GuildSettings::default();
        self.set_guild(guild_id, settings.clone())?;
        Ok(settings)
    }

    /// Replace a guild's settings and flush just that guild's file to disk.
    pub fn set_guild(&self, guild_id: Id<GuildMarker>, settings: GuildSettings) -> AnyResult<()> {
        {
            let mut guard = self.guilds.write().expect("guild settings lock poisoned");
            guard.guilds.insert(guild_id, settings.clone());
        }

        Self::write_guild_settings(guild_id, &settings)
    }

    /// Mutate a guild's settings in place (creating a default first if
    /// needed) and persist the result.
    pub fn update_guild(
        &self,
        guild_id: Id<GuildMarker>,
        f: impl FnOnce(&mut GuildSettings),
    ) -> AnyResult<GuildSettings> {
        let mut settings = self.guild_or_default(guild_id)?;
        f(&mut settings);
        self.set_guild(guild_id, settings.clone())?;
        Ok(settings)
    }

    fn load_guild_store() -> AnyResult<GuildStore> {
        fs::create_dir_all(GUILD_CONFIG_DIR)
            .map_err(|e| anyhow::anyhow!("Failed to create guilds dir: {e}"))?;

        let mut store = GuildStore::default();
        let paths = fs::read_dir(GUILD_CONFIG_DIR)?.flatten().map(|p| p.path());

        for path in paths {
            let content = fs::read_to_string(&path)?;
            let settings = serde_json::from_str::<GuildSettings>(&content)?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid guild config file name"))?;

            match name.parse() {
                Ok(id) => {
                    store.guilds.insert(id, settings);
                },
                Err(e) => {
                    let path = path.display();
                    warn!("Could not parse guild config file name '{path}': {e}");
                },
            }
        }

        Ok(store)
    }

    fn write_guild_settings(guild_id: Id<GuildMarker>, settings: &GuildSettings) -> AnyResult<()> {
        fs::create_dir_all(GUILD_CONFIG_DIR)
            .map_err(|e| anyhow::anyhow!("Failed to create guilds dir: {e}"))?;

        let file_name = format!("{guild_id}.json");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(Path::new(GUILD_CONFIG_DIR).join(file_name))?;

        serde_json::to_writer_pretty(file, settings)?;

        Ok(())
    }

    /// Re-read every guild settings file from disk, discarding in-memory
    /// edits that were never flushed.
    pub fn reload(&self) -> AnyResult<()> {
        let fresh = Self::load_guild_store()?;
        let mut guard = self.guilds.write().expect("guild settings lock poisoned");
        *guard = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_settings_default_has_bang_prefix() {
        assert_eq!(GuildSettings::default().prefix, "!");
    }

    #[test]
    fn is_referee_or_staff_matches_either_set() {
        let referee = Id::<RoleMarker>::new(1);
        let staff = Id::<RoleMarker>::new(2);
        let other = Id::<RoleMarker>::new(3);

        let mut settings = GuildSettings {
            referee_role: Some(referee),
            ..GuildSettings::default()
        };
        settings.staff_roles.insert(staff);

        assert!(settings.is_referee_or_staff(&[referee]));
        assert!(settings.is_referee_or_staff(&[staff]));
        assert!(!settings.is_referee_or_staff(&[other]));
    }
}
