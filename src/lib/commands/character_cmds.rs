//! Character commands (spec §4.3): create via the DM wizard, then
//! activate/deactivate. Grounded on `commands::quest_cmds`'s classic/slash
//! split, wired to `character::service::CharacterService`.

use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

use crate::commands::prelude::*;
use crate::commands::support::{classic_guild_id, domain_err_to_command, resolve_user, slash_author_id, slash_guild_id};
use crate::domain::CharacterId;
use crate::wizard::character_wizard::run_character_wizard;
use crate::wizard::WizardOutcome;

fn parse_character_id(raw: &str) -> Result<CharacterId, CommandError> {
    raw.parse()
        .map_err(|e| CommandError::UnexpectedArgs(format!("Invalid character id: {e}")))
}

async fn group_placeholder_classic(_ctx: Context, _req: ClassicRequest) -> CommandResponse {
    Ok(Response::CreateMessage("Specify a subcommand, e.g. `character create`.".to_string()))
}

async fn group_placeholder_slash(_ctx: Context, _req: SlashRequest) -> CommandResponse {
    Ok(Response::CreateMessage("Specify a subcommand, e.g. `/character create`.".to_string()))
}

pub struct CharacterCmds;

impl CharacterCmds {
    pub fn command() -> impl Into<BaseCommand> {
        use crate::commands::builder::*;

        command("character", "Manage your characters.")
            .attach(group_placeholder_classic)
            .attach(group_placeholder_slash)
            .option(
                sub("create", "Start the character creation wizard in your DMs.")
                    .attach(Self::create_classic)
                    .attach(Self::create_slash),
            )
            .option(
                sub("activate", "Mark a character of yours as active.")
                    .attach(Self::activate_classic)
                    .attach(Self::activate_slash)
                    .option(string("character-id", "The character's id.").required()),
            )
            .option(
                sub("deactivate", "Mark a character of yours as retired.")
                    .attach(Self::deactivate_classic)
                    .attach(Self::deactivate_slash)
                    .option(string("character-id", "The character's id.").required()),
            )
    }

    async fn create(ctx: &Context, guild_id: u64, discord_id: Id<UserMarker>) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;

        let channel_id = crate::quest::discord::DiscordPreviewSink::open_dm(&ctx.http, discord_id)
            .await
            .map_err(CommandError::Other)?;
        let sink = crate::quest::discord::DiscordPreviewSink::new(ctx.http.clone(), channel_id);
        let rx = ctx.wizard_router.open(discord_id.get());

        let outcome = run_character_wizard(&ctx.session_registry, user.user_id.clone(), rx, &sink).await;
        ctx.wizard_router.close(discord_id.get());

        match outcome {
            WizardOutcome::Completed(draft) => {
                let name = draft.name.expect("wizard enforces required fields");
                let sheet_url = draft.sheet_url.expect("wizard enforces required fields");
                let character = ctx
                    .character_service
                    .create(guild_id, user.user_id, name, sheet_url)
                    .await
                    .map_err(domain_err_to_command)?;
                Ok(Response::CreateMessage(format!(
                    "Character `{}` created.",
                    character.character_id
                )))
            },
            WizardOutcome::Failed { reason } => Ok(Response::CreateMessage(reason)),
        }
    }

    async fn create_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        Self::create(&ctx, guild_id.get(), req.message.author.id).await
    }

    async fn create_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        Self::create(&ctx, guild_id.get(), author).await
    }

    async fn activate(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        character_id: &CharacterId,
    ) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let character = ctx
            .character_service
            .activate(guild_id, character_id, &user.user_id)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!(
            "Character `{}` activated.",
            character.character_id
        )))
    }

    async fn activate_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let character_id = parse_character_id(&req.args.string("character-id")?)?;
        Self::activate(&ctx, guild_id.get(), req.message.author.id, &character_id).await
    }

    async fn activate_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let character_id = parse_character_id(&req.args.string("character-id")?)?;
        Self::activate(&ctx, guild_id.get(), author, &character_id).await
    }

    async fn deactivate(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        character_id: &CharacterId,
    ) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let character = ctx
            .character_service
            .deactivate(guild_id, character_id, &user.user_id)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!(
            "Character `{}` deactivated.",
            character.character_id
        )))
    }

    async fn deactivate_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let character_id = parse_character_id(&req.args.string("character-id")?)?;
        Self::deactivate(&ctx, guild_id.get(), req.message.author.id, &character_id).await
    }

    async fn deactivate_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let character_id = parse_character_id(&req.args.string("character-id")?)?;
        Self::deactivate(&ctx, guild_id.get(), author, &character_id).await
    }
}
