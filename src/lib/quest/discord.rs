//! Discord-side adapters for the quest use-cases: posting and re-rendering
//! the announcement embed, DMing a decision to a player, and the preview
//! sink a wizard session writes through. Mirrors the repository module's
//! port/adapter split (`repository::http` is the persistence adapter; this
//! is the chat-gateway adapter).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use twilight_http::Client;
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, ImageSource};

use crate::domain::character::AnnouncementCoordinates;
use crate::domain::{Quest, UserId};
use crate::quest::adjudication::{AnnouncementSync, Decision, PlayerNotifier};
use crate::quest::scheduler::AnnouncementPublisher;
use crate::repository::UsersRepo;
use crate::utils::prelude::*;
use crate::wizard::PreviewSink;

fn quest_embed(quest: &Quest) -> twilight_model::channel::message::Embed {
    let mut builder = EmbedBuilder::new()
        .title(&quest.title)
        .description(if quest.description.is_empty() {
            "_No description._"
        } else {
            &quest.description
        })
        .field(EmbedFieldBuilder::new(
            "Starts",
            quest.starting_at.to_rfc3339(),
        ))
        .field(EmbedFieldBuilder::new(
            "Duration",
            format!("{:.1}h", quest.duration.num_minutes() as f64 / 60.0),
        ))
        .field(EmbedFieldBuilder::new(
            "Sign-ups",
            format!("{} open", quest.signups.len()),
        ));

    if !quest.tags.is_empty() {
        builder = builder.field(EmbedFieldBuilder::new("Tags", quest.tags.join(", ")));
    }
    if let Some(url) = quest.image_url.as_deref() {
        if let Ok(source) = ImageSource::url(url) {
            builder = builder.image(source);
        }
    }

    builder.validate().map(|b| b.build()).unwrap_or_else(|_| {
        EmbedBuilder::new()
            .title("Quest")
            .description("This quest's announcement could not be fully rendered.")
            .build()
    })
}

/// Posts or re-renders a quest's announcement in its guild's configured
/// channel (spec §4.2 publish-now path, §4.3 scheduled path).
pub struct DiscordAnnouncementPublisher {
    http: Arc<Client>,
    channel_for_guild: Arc<dyn Fn(u64) -> Option<Id<ChannelMarker>> + Send + Sync>,
}

impl DiscordAnnouncementPublisher {
    pub fn new(
        http: Arc<Client>,
        channel_for_guild: Arc<dyn Fn(u64) -> Option<Id<ChannelMarker>> + Send + Sync>,
    ) -> Self {
        Self {
            http,
            channel_for_guild,
        }
    }
}

#[async_trait]
impl AnnouncementPublisher for DiscordAnnouncementPublisher {
    async fn publish(&self, guild_id: u64, quest: &Quest) -> AnyResult<AnnouncementCoordinates> {
        let channel_id = (self.channel_for_guild)(guild_id)
            .with_context(|| format!("No announcement channel configured for guild {guild_id}"))?;

        let message = self
            .http
            .create_message(channel_id)
            .embeds(&[quest_embed(quest)])?
            .await?
            .model()
            .await?;

        Ok(AnnouncementCoordinates {
            channel_id: Some(channel_id.get()),
            message_id: Some(message.id.get()),
            thread_id: None,
        })
    }
}

/// Re-renders an already-published quest's embed in place, grounded on the
/// same "edit, don't repost" discipline as the wizard's preview message.
pub struct DiscordAnnouncementSync {
    http: Arc<Client>,
}

impl DiscordAnnouncementSync {
    pub fn new(http: Arc<Client>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AnnouncementSync for DiscordAnnouncementSync {
    async fn sync(&self, _guild_id: u64, quest: &Quest) -> AnyResult<()> {
        let (Some(channel_id), Some(message_id)) =
            (quest.announcement.channel_id, quest.announcement.message_id)
        else {
            return Ok(());
        };

        self.http
            .update_message(Id::new(channel_id), Id::new(message_id))
            .embeds(Some(&[quest_embed(quest)]))?
            .await?;

        Ok(())
    }
}

/// DMs the affected player once a referee decides their sign-up (spec §4.2
/// step 4). Failures are swallowed by the caller, not here.
pub struct DiscordPlayerNotifier {
    http: Arc<Client>,
    users: Arc<dyn UsersRepo>,
}

impl DiscordPlayerNotifier {
    pub fn new(http: Arc<Client>, users: Arc<dyn UsersRepo>) -> Self {
        Self { http, users }
    }
}

#[async_trait]
impl PlayerNotifier for DiscordPlayerNotifier {
    async fn notify(&self, guild_id: u64, user_id: &UserId, decision: Decision) -> AnyResult<()> {
        let user = self
            .users
            .get(guild_id, user_id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let discord_id = user
            .discord_id
            .with_context(|| format!("User {user_id} has no linked Discord account"))?;

        let text = match decision {
            Decision::Accept => "You've been selected for the quest you signed up for!",
            Decision::Decline => "Your sign-up for a quest was declined.",
            Decision::Close => "Sign-ups for a quest you applied to have closed.",
        };

        let channel = self
            .http
            .create_private_channel(Id::<UserMarker>::new(discord_id))
            .await?
            .model()
            .await?;

        self.http
            .create_message(channel.id)
            .content(text)?
            .await?;

        Ok(())
    }
}

/// The wizard's preview sink over a DM channel: sends the first preview,
/// edits it thereafter (spec §4.4 preview invariant).
pub struct DiscordPreviewSink {
    http: Arc<Client>,
    channel_id: Id<ChannelMarker>,
}

impl DiscordPreviewSink {
    pub fn new(http: Arc<Client>, channel_id: Id<ChannelMarker>) -> Self {
        Self { http, channel_id }
    }

    /// Opens (or resolves) the author's DM channel, for the caller to build
    /// a sink around.
    pub async fn open_dm(http: &Client, user_id: Id<UserMarker>) -> AnyResult<Id<ChannelMarker>> {
        let channel = http.create_private_channel(user_id).await?.model().await?;
        Ok(channel.id)
    }
}

#[async_trait]
impl PreviewSink for DiscordPreviewSink {
    async fn send(&self, content: String) -> AnyResult<u64> {
        let message = self
            .http
            .create_message(self.channel_id)
            .content(&content)?
            .await?
            .model()
            .await?;
        Ok(message.id.get())
    }

    async fn edit(&self, message_id: u64, content: String) -> AnyResult<()> {
        self.http
            .update_message(self.channel_id, Id::new(message_id))
            .content(Some(&content))?
            .await?;
        Ok(())
    }
}

/// Default DM-reply wait, used by callers that don't have a per-kind
/// timeout of their own (the wizards define their own via
/// `utils::consts::*_WIZARD_TIMEOUT_SECONDS`).
pub const DEFAULT_SESSION_TIMEOUT: StdDuration = StdDuration::from_secs(300);
