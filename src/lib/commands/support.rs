//! Glue shared by the quest and character command modules: resolving a
//! Discord member to its domain [`User`], and pulling the calling guild
//! and author ids out of either request shape.

use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::commands::{ClassicRequest, CommandError, SlashRequest};
use crate::domain::error::DomainError;
use crate::domain::User;
use crate::utils::prelude::*;
use crate::Context;

pub fn classic_guild_id(req: &ClassicRequest) -> Result<Id<GuildMarker>, CommandError> {
    req.message
        .guild_id
        .ok_or_else(|| CommandError::UnexpectedArgs("This command only works in a server.".to_string()))
}

pub fn slash_guild_id(req: &SlashRequest) -> Result<Id<GuildMarker>, CommandError> {
    req.interaction
        .guild_id
        .ok_or_else(|| CommandError::UnexpectedArgs("This command only works in a server.".to_string()))
}

pub fn slash_author_id(req: &SlashRequest) -> Result<Id<UserMarker>, CommandError> {
    req.interaction
        .member
        .as_ref()
        .and_then(|m| m.user.as_ref())
        .or(req.interaction.user.as_ref())
        .map(|u| u.id)
        .ok_or_else(|| CommandError::UnexpectedArgs("Could not identify the calling user.".to_string()))
}

/// Finds or creates the domain [`User`] for a Discord member, populating the
/// guild cache on the way (spec §4.1 "cache is the source of truth for
/// in-flight reads").
pub async fn resolve_user(
    ctx: &Context,
    guild_id: Id<GuildMarker>,
    discord_id: Id<UserMarker>,
) -> Result<User, CommandError> {
    let guild_id = guild_id.get();
    let discord_id = discord_id.get();

    ctx.guild_cache.ensure_guild_entry(guild_id);
    if let Some(user) = ctx
        .guild_cache
        .with_guild(guild_id, |entry| entry.users.get(&discord_id).cloned())
        .flatten()
    {
        return Ok(user);
    }

    let found = ctx
        .repository
        .get_by_discord_id(guild_id, discord_id)
        .await
        .map_err(|e| CommandError::Other(anyhow::anyhow!(e.to_string())))?;

    let user = match found {
        Some(user) => user,
        None => {
            let user = User::from_member(guild_id, discord_id);
            ctx.repository
                .upsert(&user)
                .await
                .map_err(|e| CommandError::Other(anyhow::anyhow!(e.to_string())))?;
            user
        },
    };

    ctx.guild_cache.with_guild_mut(guild_id, |entry| {
        entry.users.insert(discord_id, user.clone());
    });

    Ok(user)
}

/// Role ids held by the interaction's invoking member, used for the
/// referee-or-staff authorization check (spec §4.2 transition table).
pub fn slash_caller_role_ids(req: &SlashRequest) -> Vec<twilight_model::id::Id<twilight_model::id::marker::RoleMarker>> {
    req.interaction
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default()
}

pub fn classic_caller_role_ids(
    req: &ClassicRequest,
) -> Vec<twilight_model::id::Id<twilight_model::id::marker::RoleMarker>> {
    req.message
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default()
}

pub fn domain_err_to_command(e: DomainError) -> CommandError {
    CommandError::Domain(e)
}
