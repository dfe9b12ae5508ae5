#![feature(decl_macro)]
#![feature(iter_intersperse)]
#![feature(iterator_try_collect)]
#![feature(option_get_or_insert_default)]
#![feature(pattern)]
#![feature(trait_alias)]

use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::stream::ShardRef;
use twilight_gateway::{
    stream, ConfigBuilder, Event, EventTypeFlags, MessageSender, Shard, ShardId,
};
use twilight_http::client::InteractionClient;
use twilight_http::Client;
use twilight_model::channel::Channel;
use twilight_model::gateway::payload::incoming::{ChannelUpdate, RoleUpdate};
use twilight_model::gateway::payload::outgoing::update_presence::UpdatePresencePayload;
use twilight_model::gateway::presence::{ActivityType, MinimalActivity, Status};
use twilight_model::gateway::Intents;
use twilight_model::guild::Role;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};
use twilight_model::id::Id;
use twilight_model::oauth::Application;
use twilight_model::user::CurrentUser;
use twilight_standby::Standby;

use crate::api_client::QuestApiClient;
use crate::cache::{FlushPath, GuildCacheEngine};
use crate::character::service::CharacterService;
use crate::commands::Commands;
use crate::config::BotConfig;
use crate::quest::adjudication::{AdjudicationPanel, AnnouncementSync, PlayerNotifier};
use crate::quest::discord::{DiscordAnnouncementPublisher, DiscordAnnouncementSync, DiscordPlayerNotifier};
use crate::quest::scheduler::AnnouncementPublisher;
use crate::quest::service::QuestService;
use crate::repository::http::HttpRepository;
use crate::repository::memory::InMemoryRepository;
use crate::repository::{CharactersRepo, QuestsRepo, Repository, UsersRepo};
use crate::utils::prelude::*;
use crate::wizard::{SessionRegistry, WizardRouter};

pub mod api_client;
pub mod cache;
pub mod character;
pub mod commands;
pub mod config;
pub mod domain;
pub mod parser;
pub mod quest;
pub mod repository;
pub mod utils;
pub mod wizard;

pub type BotEventSender = UnboundedSender<BotEvent>;

/// Shard id and channel.
#[derive(Debug, Clone)]
pub struct PartialShard {
    pub id: ShardId,
    pub sender: MessageSender,
}

/// Common bot context that contains field for managing and operating the bot.
#[derive(Clone)]
pub struct Context {
    /// Bot configuration.
    pub config: Arc<BotConfig>,
    /// Bot commands list.
    pub commands: Arc<Commands>,
    /// Bot events channel.
    pub events_tx: BotEventSender,
    /// Application http client.
    pub http: Arc<Client>,
    /// Application information.
    pub application: Arc<Application>,
    /// Application bot user.
    pub user: Arc<CurrentUser>,
    /// Caching of twilight events.
    pub cache: Arc<InMemoryCache>,
    /// Standby twilight event system.
    pub standby: Arc<Standby>,
    /// Shard associated with the event.
    pub shard: Option<PartialShard>,
    /// Per-tenant entity cache and dirty-write queue (spec §4.1).
    pub guild_cache: Arc<GuildCacheEngine>,
    /// The bundled persistence port, for code that needs more than one
    /// entity kind at once (e.g. [`commands::support::resolve_user`]).
    pub repository: Arc<dyn Repository>,
    pub users_repo: Arc<dyn UsersRepo>,
    pub quests_repo: Arc<dyn QuestsRepo>,
    pub characters_repo: Arc<dyn CharactersRepo>,
    pub quest_service: Arc<QuestService>,
    pub character_service: Arc<CharacterService>,
    pub adjudication: Arc<AdjudicationPanel>,
    pub announcement_publisher: Arc<dyn AnnouncementPublisher>,
    pub announcement_sync: Arc<dyn AnnouncementSync>,
    pub wizard_router: Arc<WizardRouter>,
    pub session_registry: Arc<SessionRegistry>,
    /// `None` when `quest_api_base_url` is empty; the remote path is
    /// disabled entirely rather than dialled and retried (spec §6.5).
    pub api_client: Option<Arc<QuestApiClient>>,
    /// Open `(guild_id, discord_user_id) -> joined_at` voice sessions, used
    /// to accumulate `User::record_voice_seconds` on leave/switch (spec
    /// §6.1). In-process only: an in-flight session is lost across a
    /// restart, same as the upstream gateway's own voice state.
    pub voice_sessions: Arc<Mutex<HashMap<(u64, u64), DateTime<Utc>>>>,
}

impl Context {
    pub async fn new(
        events_tx: BotEventSender,
        commands: Commands,
    ) -> AnyResult<(Self, Vec<Shard>)> {
        let config = Arc::new(BotConfig::new()?);
        let commands = Arc::new(commands);
        let token = env::var("DISCORD_TOKEN").expect("Expected a token in the environment");
        let http = Arc::new(Client::new(token.to_owned()));
        let application = Arc::new(http.current_user_application().send().await?);
        let user = Arc::new(http.current_user().send().await?);
        let cache = Arc::new(InMemoryCache::new());
        let standby = Arc::new(Standby::new());

        let shards = stream::create_recommended(
            &http,
            ConfigBuilder::new(token, intents())
                .event_types(event_type_flags())
                .presence(UpdatePresencePayload::new(
                    vec![
                        MinimalActivity {
                            kind: ActivityType::Watching,
                            name: "you".into(),
                            url: None,
                        }
                        .into(),
                    ],
                    false,
                    None,
                    Status::Online,
                )?)
                .build(),
            |_, builder| builder.build(),
        )
        .await?
        .collect::<Vec<_>>();

        let (guild_cache_engine, dirty_rx) = GuildCacheEngine::new();
        let guild_cache = Arc::new(guild_cache_engine);

        // The quest sub-surface is remote-backed whenever a base URL is
        // configured; `HttpRepository` falls back to the in-memory adapter
        // on anything transient, so wrapping unconditionally is safe even
        // with the remote path disabled (spec §9, "Dual persistence paths").
        let api_client_concrete = QuestApiClient::new(config.quest_api_base_url.clone())
            .map_err(|e| anyhow::anyhow!(e))?;
        let api_client = Arc::new(api_client_concrete);
        let repo = Arc::new(HttpRepository::new((*api_client).clone(), InMemoryRepository::new()));

        let repository: Arc<dyn Repository> = repo.clone();
        let users_repo: Arc<dyn UsersRepo> = repo.clone();
        let quests_repo: Arc<dyn QuestsRepo> = repo.clone();
        let characters_repo: Arc<dyn CharactersRepo> = repo.clone();

        let quest_service = Arc::new(QuestService::new(
            guild_cache.clone(),
            quests_repo.clone(),
            users_repo.clone(),
            characters_repo.clone(),
        ));
        let character_service = Arc::new(CharacterService::new(
            guild_cache.clone(),
            characters_repo.clone(),
            users_repo.clone(),
        ));

        let config_for_channel = config.clone();
        let channel_for_guild: Arc<dyn Fn(u64) -> Option<Id<ChannelMarker>> + Send + Sync> =
            Arc::new(move |guild_id: u64| {
                config_for_channel
                    .guild(Id::<GuildMarker>::new(guild_id))
                    .and_then(|s| s.announcement_channel)
                    .or(config_for_channel.quest_board_channel_id)
            });

        let announcement_publisher: Arc<dyn AnnouncementPublisher> =
            Arc::new(DiscordAnnouncementPublisher::new(http.clone(), channel_for_guild));
        let announcement_sync: Arc<dyn AnnouncementSync> =
            Arc::new(DiscordAnnouncementSync::new(http.clone()));
        let player_notifier: Arc<dyn PlayerNotifier> =
            Arc::new(DiscordPlayerNotifier::new(http.clone(), users_repo.clone()));

        let api_client_for_panel = api_client.is_enabled().then(|| api_client.clone());
        let adjudication = Arc::new(AdjudicationPanel::new(
            quest_service.clone(),
            api_client_for_panel,
            announcement_sync.clone(),
            player_notifier,
        ));

        let wizard_router = Arc::new(WizardRouter::new());
        let session_registry = Arc::new(SessionRegistry::new());

        let flush_path = if config.flush_via_adapter {
            FlushPath::SyncAdapter
        } else {
            FlushPath::DirectUpsert
        };
        tokio::spawn(crate::cache::flush::run(
            guild_cache.clone(),
            users_repo.clone(),
            dirty_rx,
            config.flush_interval_seconds,
            flush_path,
        ));

        let cache_for_scheduler = cache.clone();
        let guild_ids_fn: Arc<dyn Fn() -> Vec<u64> + Send + Sync> = Arc::new(move || {
            cache_for_scheduler
                .iter()
                .guilds()
                .map(|g| g.key().get())
                .collect()
        });
        tokio::spawn(crate::quest::scheduler::run(
            guild_ids_fn,
            quests_repo.clone(),
            quest_service.clone(),
            announcement_publisher.clone(),
            crate::utils::consts::SCHEDULER_TICK_SECONDS,
        ));

        let api_client = api_client.is_enabled().then_some(api_client);

        Ok((
            Self {
                config,
                commands,
                events_tx,
                http,
                application,
                user,
                cache,
                standby,
                shard: None,
                guild_cache,
                repository,
                users_repo,
                quests_repo,
                characters_repo,
                quest_service,
                character_service,
                adjudication,
                announcement_publisher,
                announcement_sync,
                wizard_router,
                session_registry,
                api_client,
                voice_sessions: Arc::new(Mutex::new(HashMap::new())),
            },
            shards,
        ))
    }

    pub async fn handle<Fut>(
        &self,
        shard: ShardRef<'_>,
        event: Event,
        handler: fn(Self, Event) -> Fut,
    ) where
        Fut: Future<Output = AnyResult<()>> + Send + 'static,
    {
        // Update the cache with the event.
        self.cache.update(&event);

        // Update standby events.
        let processed = self.standby.process(&event);
        log_processed(processed);

        // Handle event.
        tokio::spawn(handler(
            self.clone().with_shard(shard.id(), shard.sender()),
            event,
        ));
    }

    /// Get role objects with `ids` from cache or fetch from client.
    pub async fn roles_from(
        &self,
        guild_id: Id<GuildMarker>,
        ids: &[Id<RoleMarker>],
    ) -> AnyResult<Vec<Role>> {
        let cached_roles = ids
            .iter()
            .map(|id| self.cache.role(*id).map(|r| r.resource().to_owned()))
            .try_collect();
        match cached_roles {
            Some(r) => Ok(r),
            None => self.fetch_roles_from(guild_id, ids).await,
        }
    }

    /// Fetch role objects with `ids` from client without cache.
    pub async fn fetch_roles_from(
        &self,
        guild_id: Id<GuildMarker>,
        ids: &[Id<RoleMarker>],
    ) -> AnyResult<Vec<Role>> {
        let mut fetch = self.http.roles(guild_id).send().await?;
        for role in fetch.iter().cloned() {
            self.cache.update(&RoleUpdate { guild_id, role });
        }
        fetch.retain(|r| ids.contains(&r.id));
        Ok(fetch)
    }

    /// Get the channel object from cache or fetch from client.
    pub async fn channel_from(&self, channel_id: Id<ChannelMarker>) -> AnyResult<Channel> {
        match self.cache.channel(channel_id) {
            Some(chan) => Ok(chan.to_owned()),
            None => {
                let chan = self.http.channel(channel_id).send().await?;
                self.cache.update(&ChannelUpdate(chan.clone()));
                Ok(chan)
            },
        }
    }

    /// Search for a voice channel that a user is connected to in a guild.
    pub async fn user_voice_channel(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> AnyResult<Id<ChannelMarker>> {
        match self.cache.voice_state(user_id, guild_id) {
            Some(s) => Some(s.channel_id()),
            None => {
                // `voice_states` is empty in some cases?
                let g = self.http.guild(guild_id).send().await?;
                g.voice_states
                    .into_iter()
                    .filter_map(|v| Some((v.member?.user.id, v.channel_id?)))
                    .find(|(u, _)| *u == user_id)
                    .map(|(_, c)| c)
            },
        }
        .with_context(|| {
            format!("User '{user_id}' was not found in voice channels of guild '{guild_id}'")
        })
    }

    /// This context with the provided shard id.
    pub fn with_shard(mut self, id: ShardId, sender: MessageSender) -> Self {
        self.shard = Some(PartialShard { id, sender });
        self
    }

    /// Shortcut for `self.http.interaction(self.application.id)`.
    pub fn interaction(&self) -> InteractionClient {
        self.http.interaction(self.application.id)
    }
}

#[derive(Debug)]
pub enum BotEvent {
    Shutdown,
}

fn log_processed(p: twilight_standby::ProcessResults) {
    if p.dropped() + p.fulfilled() + p.matched() + p.sent() > 0 {
        debug!(
            "Standby: {{ m: {}, d: {}, f: {}, s: {} }}",
            p.matched(),
            p.dropped(),
            p.fulfilled(),
            p.sent(),
        );
    }
}

/// Discord permission intents.
fn intents() -> Intents {
    #[cfg(feature = "all-intents")]
    {
        Intents::all()
    }

    #[cfg(not(feature = "all-intents"))]
    {
        Intents::MESSAGE_CONTENT
            | Intents::GUILDS
            | Intents::GUILD_MESSAGES
            | Intents::GUILD_MESSAGE_REACTIONS
            | Intents::GUILD_MEMBERS
            | Intents::GUILD_PRESENCES
            | Intents::GUILD_VOICE_STATES
            | Intents::DIRECT_MESSAGES
            | Intents::DIRECT_MESSAGE_REACTIONS
    }
}

/// Subscribed events from Discord.
fn event_type_flags() -> EventTypeFlags {
    EventTypeFlags::all()
        - EventTypeFlags::TYPING_START
        - EventTypeFlags::DIRECT_MESSAGE_TYPING
        - EventTypeFlags::GUILD_MESSAGE_TYPING
}
