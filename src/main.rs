#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::significant_drop_in_scrutinee)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::{env, fs};

use chrono::Utc;
use questboard::commands::{handle, CommandError};
use questboard::domain::User;
use questboard::utils::prelude::*;
use questboard::{BotEvent, BotEventSender, Context};
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use twilight_gateway::stream::ShardEventStream;
use twilight_gateway::{CloseFrame, Event};
use twilight_model::application::interaction::{Interaction, InteractionData};
use twilight_model::channel::Message;
use twilight_model::gateway::payload::incoming::{
    GuildDelete, Hello, MemberAdd, MemberUpdate, MessageDelete, MessageDeleteBulk, MessageUpdate,
    Ready,
};
use twilight_model::gateway::GatewayReaction;
use twilight_model::guild::Guild;
use twilight_model::id::Id;
use twilight_model::voice::VoiceState;

mod bot;

#[tracing::instrument]
#[tokio::main]
async fn main() -> AnyResult<()> {
    // Load environment variables from `./.env` file, if any exists.
    simple_env_load::load_env_from([".env"]);

    // Create data folder if it doesn't exist yet.
    std::fs::create_dir_all("./data/")
        .map_err(|e| anyhow::anyhow!("Failed to create data folder: {}", e))?;

    // Create a log file or truncate an existing one.
    let logfile = fs::File::create("./data/log.log")
        .map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    // Initialize the logger to use `RUST_LOG` environment variable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::DEBUG.into())
                .try_from_env()
                .with_context(|| {
                    format!(
                        "Problem with `RUST_LOG={}`",
                        env::var("RUST_LOG").unwrap_or_default()
                    )
                })?,
        )
        .with_ansi(false)
        .with_writer(Mutex::new(logfile))
        .compact()
        .init();

    // Bot events channel.
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // Spawn ctrl-c shutdown task.
    tokio::spawn(shutdown_task(events_tx.clone()));

    let (ctx, mut shards) = connect_with_retry(events_tx, bot::create_commands()?).await;

    // Create an infinite stream over the shards' events.
    let mut stream = ShardEventStream::new(shards.iter_mut());

    loop {
        use futures::prelude::*;

        let (shard, event) = tokio::select! {
            Some(twilight_event) = stream.next() => twilight_event,
            Some(BotEvent::Shutdown) = events_rx.recv() => break,
            else => break,
        };

        // Process each event as they come in.
        let event = match event {
            Ok(event) => event,
            Err(source) => {
                eprintln!("Error receiving event: {:?}", source);
                if source.is_fatal() {
                    error!(?source, "Error receiving event");
                    break;
                } else {
                    warn!(?source, "Error receiving event");
                    continue;
                }
            },
        };

        ctx.handle(shard, event, handle_event).await;
    }

    drop(stream);

    for shard in shards.iter_mut() {
        let _ = shard
            .close(CloseFrame::NORMAL)
            .await
            .map_err(|e| warn!("{e}"));
    }

    Ok(())
}

/// Builds the bot's [`Context`] and gateway shards, retrying with backoff on
/// failure instead of exiting: a flaky token exchange or Discord outage at
/// boot shouldn't take the process down for good.
async fn connect_with_retry(
    events_tx: BotEventSender,
    commands: questboard::commands::Commands,
) -> (Context, Vec<twilight_gateway::Shard>) {
    let mut backoff_seconds = 1u64;
    loop {
        match Context::new(events_tx.clone(), commands.clone()).await {
            Ok(built) => return built,
            Err(e) => {
                error!("Failed to start up: {:?}", e.oneliner());
                tokio::time::sleep(std::time::Duration::from_secs(backoff_seconds)).await;
                backoff_seconds = (backoff_seconds * 2).min(60);
            },
        }
    }
}

/// Ctrl-C shutdown task.
async fn shutdown_task(events_tx: BotEventSender) -> AnyResult<()> {
    tokio::signal::ctrl_c()
        .await
        .expect("Could not register ctrl+c handler");
    info!("Shutting down by ctrl-c");
    events_tx.send(BotEvent::Shutdown)?;
    println!("Ctrl-C");
    Ok(())
}

/// Main events handler.
#[tracing::instrument(name = "events", skip_all, fields(event = event.kind().name()))]
async fn handle_event(ctx: Context, event: Event) -> AnyResult<()> {
    let result = match event {
        Event::Ready(r) => handle_ready(&ctx, *r).await,
        Event::GuildCreate(g) => handle_guild_create(&ctx, g.0).await,
        Event::GuildDelete(g) => handle_guild_delete(&ctx, *g).await,
        Event::MemberAdd(m) => handle_member_add(&ctx, *m).await,
        Event::MemberUpdate(m) => handle_member_update(&ctx, *m).await,
        Event::InteractionCreate(i) => handle_interaction_create(&ctx, i.0).await,
        Event::MessageCreate(mc) => handle_message_create(&ctx, mc.0).await,
        Event::MessageUpdate(mu) => handle_message_update(&ctx, *mu).await,
        Event::MessageDelete(md) => handle_message_delete(&ctx, md).await,
        Event::MessageDeleteBulk(mdb) => handle_message_delete_bulk(&ctx, mdb).await,
        Event::ReactionAdd(r) => handle_reaction_add(&ctx, r.0).await,
        Event::ReactionRemove(r) => handle_reaction_remove(&ctx, r.0).await,
        Event::VoiceStateUpdate(v) => handle_voice_state(&ctx, v.0).await,
        Event::CommandPermissionsUpdate(cpu) => {
            debug!(
                "Permissions update event: Command '{}' in guild '{}'",
                cpu.id, cpu.guild_id
            );
            Ok(())
        },

        // Gateway events.
        Event::GatewayHello(h) => handle_hello(&ctx, h).await,
        Event::GatewayHeartbeat(_)
        | Event::GatewayInvalidateSession(_)
        | Event::GatewayReconnect => {
            debug!("Gateway event: {:?}", event.kind());
            Ok(())
        },
        Event::GatewayHeartbeatAck => {
            trace!("Gateway event: {:?}", event.kind());
            Ok(())
        },

        Event::PresenceUpdate(p) => {
            trace!("Presence event: {:?}", p.user.id());
            Ok(())
        },

        // Other events here...
        event => {
            debug!("Event: {:?}", event.kind());
            Ok(())
        },
    };

    if let Err(e) = result {
        let chain = e.oneliner();
        eprintln!("Event error: {e:?}");
        error!("Event error: {chain}");

        if let Ok(id) = env::var("DISCORD_BOTDEV_CHANNEL") {
            // Send error as message on bot dev channel.
            let bot_dev = Id::new(id.parse()?);
            ctx.http
                .create_message(bot_dev)
                .content(&format!("{e:?}"))?
                .send()
                .await?;
        }
    }

    Ok(())
}

async fn handle_hello(ctx: &Context, h: Hello) -> AnyResult<()> {
    info!(
        "Connected on shard {} with a heartbeat of {}",
        ctx.shard
            .as_ref()
            .map(|s| s.id)
            .ok_or_else(|| anyhow::anyhow!("Missing shard id"))?,
        h.heartbeat_interval
    );
    Ok(())
}

async fn handle_ready(ctx: &Context, ready: Ready) -> AnyResult<()> {
    info!("Ready: '{}'", ready.user.name);

    let commands = ctx.commands.twilight_commands()?;

    debug!("Creating {} global commands", commands.len());

    // Set global application commands.
    ctx.http
        .interaction(ctx.application.id)
        .set_global_commands(&commands)
        .send()
        .await?;

    Ok(())
}

/// Finds or creates the domain [`User`] for a Discord member and populates
/// the guild cache, without needing a [`CommandError`] return type (spec
/// §4.1 "cache is the source of truth for in-flight reads").
async fn ensure_user(ctx: &Context, guild_id: u64, discord_id: u64) -> AnyResult<User> {
    ctx.guild_cache.ensure_guild_entry(guild_id);
    if let Some(user) = ctx
        .guild_cache
        .with_guild(guild_id, |entry| entry.users.get(&discord_id).cloned())
        .flatten()
    {
        return Ok(user);
    }

    let found = ctx
        .users_repo
        .get_by_discord_id(guild_id, discord_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let user = match found {
        Some(user) => user,
        None => {
            let user = User::from_member(guild_id, discord_id);
            ctx.users_repo
                .upsert(&user)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            user
        },
    };

    ctx.guild_cache.with_guild_mut(guild_id, |entry| {
        entry.users.insert(discord_id, user.clone());
    });

    Ok(user)
}

async fn handle_guild_create(ctx: &Context, guild: Guild) -> AnyResult<()> {
    let guild_id = guild.id.get();
    info!("Guild: '{}' ({} members)", guild.name, guild.members.len());

    ctx.guild_cache.ensure_guild_entry(guild_id);

    // Primary query: users already on file for this tenant. Empty means
    // this is the tenant's first sync, the legacy "no documents" case
    // (SPEC_FULL §4.1).
    let mut known_by_discord: HashMap<u64, User> = ctx
        .users_repo
        .list_by_guild(guild_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .into_iter()
        .filter_map(|u| u.discord_id.map(|d| (d, u)))
        .collect();

    // Populate the cache first; the write is best-effort after (SPEC_FULL
    // §4.1 [SUPPLEMENT]). Newly scraped members are collected here and
    // persisted in a single batch once the cache is fully populated.
    let mut scraped = Vec::new();
    for member in &guild.members {
        if member.user.bot {
            continue;
        }
        let discord_id = member.user.id.get();
        let user = match known_by_discord.remove(&discord_id) {
            Some(user) => user,
            None => {
                let user = User::from_member(guild_id, discord_id);
                scraped.push(user.clone());
                user
            },
        };
        ctx.guild_cache
            .with_guild_mut(guild_id, |entry| { entry.users.insert(discord_id, user.clone()); });
    }

    for user in &scraped {
        if let Err(e) = ctx.users_repo.upsert(user).await {
            error!(guild_id, discord_id = ?user.discord_id, "failed to persist scraped member: {e}");
        }
    }

    Ok(())
}

async fn handle_guild_delete(ctx: &Context, gd: GuildDelete) -> AnyResult<()> {
    info!("Guild removed: '{}'", gd.id);
    ctx.guild_cache.drop_guild(gd.id.get());
    Ok(())
}

async fn handle_member_add(ctx: &Context, member: MemberAdd) -> AnyResult<()> {
    if member.user.bot {
        return Ok(());
    }
    ensure_user(ctx, member.guild_id.get(), member.user.id.get()).await?;
    Ok(())
}

/// Mirrors configured "referee role" membership onto the domain user's
/// referee flag whenever a member's role set changes (spec §6.1).
async fn handle_member_update(ctx: &Context, mu: MemberUpdate) -> AnyResult<()> {
    if mu.user.bot {
        return Ok(());
    }

    let guild_id = mu.guild_id.get();
    let discord_id = mu.user.id.get();

    let Some(referee_role) = ctx.config.guild(mu.guild_id).and_then(|s| s.referee_role) else {
        return Ok(());
    };

    ensure_user(ctx, guild_id, discord_id).await?;
    let holds_role = mu.roles.contains(&referee_role);

    ctx.guild_cache.mutate_user(guild_id, discord_id, |user| {
        if holds_role && !user.is_referee() {
            user.enable_referee();
        } else if !holds_role && user.is_referee() {
            user.disable_referee();
        }
    });

    Ok(())
}

async fn handle_interaction_create(ctx: &Context, mut inter: Interaction) -> AnyResult<()> {
    // Take interaction data from the interaction,
    // so that both can be passed forward without matching again.
    match inter.data.take() {
        Some(InteractionData::ApplicationCommand(d)) => {
            handle::application_command(ctx, inter, *d)
                .await
                .context("Failed to handle application command")?;
        },
        Some(InteractionData::MessageComponent(d)) => {
            if let Some(discord_id) = interaction_author_id(&inter) {
                ctx.wizard_router.dispatch(
                    discord_id,
                    questboard::wizard::SessionInput::Button(d.custom_id),
                );
            }
        },
        Some(InteractionData::ModalSubmit(d)) => {
            if let Some(discord_id) = interaction_author_id(&inter) {
                let fields = d
                    .components
                    .into_iter()
                    .flat_map(|row| row.components)
                    .filter_map(|c| c.value.map(|v| (c.custom_id, v)))
                    .collect();
                ctx.wizard_router.dispatch(
                    discord_id,
                    questboard::wizard::SessionInput::Modal(fields),
                );
            }
        },
        _ => {},
    }

    Ok(())
}

fn interaction_author_id(inter: &Interaction) -> Option<u64> {
    inter
        .member
        .as_ref()
        .and_then(|m| m.user.as_ref())
        .or(inter.user.as_ref())
        .map(|u| u.id.get())
}

async fn handle_message_create(ctx: &Context, msg: Message) -> AnyResult<()> {
    // Ignore bot users.
    if msg.author.bot {
        trace!("Message sender is a bot '{}'", msg.author.name);
        return Ok(());
    }

    if let Some(guild_id) = msg.guild_id {
        ensure_user(ctx, guild_id.get(), msg.author.id.get()).await?;
        ctx.guild_cache
            .mutate_user(guild_id.get(), msg.author.id.get(), User::record_message);
    }

    let msg = Arc::new(msg);

    match handle::classic_command(ctx, Arc::clone(&msg)).await {
        Err(CommandError::NotPrefixed) => {
            // Message was not a classic command.

            if msg.mentions.iter().any(|mention| mention.id == ctx.user.id)
                && msg.referenced_message.is_none()
            {
                // Send bot help message.
                let prefix = ctx.config.classic_prefix(msg.guild_id).unwrap_or_default();
                let about_msg = format!(
                    "Try `/about` or `{prefix}about` for general info, or `/help` or \
                     `{prefix}help` for commands.",
                );

                ctx.http
                    .create_message(msg.channel_id)
                    .content(&about_msg)?
                    .reply(msg.id)
                    .await?;
            }
            Ok(())
        },
        res => res.context("Failed to handle classic command"),
    }
}

async fn handle_message_update(_ctx: &Context, _mu: MessageUpdate) -> AnyResult<()> {
    Ok(())
}

async fn handle_message_delete(_ctx: &Context, _md: MessageDelete) -> AnyResult<()> {
    Ok(())
}

async fn handle_message_delete_bulk(_ctx: &Context, _mdb: MessageDeleteBulk) -> AnyResult<()> {
    Ok(())
}

/// Counts engagement given/received on both ends of a reaction (spec §6.1);
/// no role-granting side effects.
async fn handle_reaction_add(ctx: &Context, reaction: GatewayReaction) -> AnyResult<()> {
    let Some(guild_id) = reaction.guild_id else {
        return Ok(());
    };
    let guild_id = guild_id.get();

    let reactor = match &reaction.member {
        Some(m) => m.user.clone(),
        None => match ctx.cache.user(reaction.user_id) {
            Some(u) => u.to_owned(),
            None => ctx.http.user(reaction.user_id).send().await?,
        },
    };

    if reactor.bot {
        return Ok(());
    }

    ensure_user(ctx, guild_id, reaction.user_id.get()).await?;
    ctx.guild_cache
        .mutate_user(guild_id, reaction.user_id.get(), User::record_reaction_given);

    if let Some(msg) = ctx.cache.message(reaction.message_id) {
        let author_id = msg.author().get();
        if author_id != reaction.user_id.get() {
            ensure_user(ctx, guild_id, author_id).await?;
            ctx.guild_cache
                .mutate_user(guild_id, author_id, User::record_reaction_received);
        }
    }

    Ok(())
}

async fn handle_reaction_remove(_ctx: &Context, _reaction: GatewayReaction) -> AnyResult<()> {
    Ok(())
}

/// Tracks per-member voice sessions in-process: on join/channel-switch a
/// session starts, on leave/switch the elapsed time is added to the domain
/// user's voice total (spec §6.1).
async fn handle_voice_state(ctx: &Context, voice: VoiceState) -> AnyResult<()> {
    let Some(guild_id) = voice.guild_id else {
        return Ok(());
    };
    let guild_id = guild_id.get();
    let user_id = voice.user_id.get();
    let now = Utc::now();

    let elapsed_seconds = {
        let mut sessions = ctx
            .voice_sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("voice session tracker poisoned"))?;

        match (sessions.remove(&(guild_id, user_id)), voice.channel_id) {
            (Some(started_at), Some(_)) => {
                // Switched channels without fully leaving: close the old
                // session and immediately open a new one.
                sessions.insert((guild_id, user_id), now);
                Some((now - started_at).num_seconds().max(0) as u64)
            },
            (Some(started_at), None) => Some((now - started_at).num_seconds().max(0) as u64),
            (None, Some(_)) => {
                sessions.insert((guild_id, user_id), now);
                None
            },
            (None, None) => None,
        }
    };

    if let Some(seconds) = elapsed_seconds {
        if seconds > 0 {
            ensure_user(ctx, guild_id, user_id).await?;
            ctx.guild_cache.mutate_user(guild_id, user_id, |user| {
                user.record_voice_seconds(seconds);
            });
        }
    }

    Ok(())
}
