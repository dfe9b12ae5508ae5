//! Quest lifecycle commands (spec §4.2): create via the DM wizard, publish,
//! schedule, start, complete, cancel, nudge, and the referee's sign-up
//! decision panel. Grounded on `meta::Ping`'s classic/slash split, wired to
//! `quest::service::QuestService` and `quest::adjudication::AdjudicationPanel`.

use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

use crate::commands::prelude::*;
use crate::commands::support::{
    classic_caller_role_ids, classic_guild_id, domain_err_to_command, resolve_user,
    slash_author_id, slash_caller_role_ids, slash_guild_id,
};
use crate::domain::QuestId;
use crate::quest::adjudication::Decision;
use crate::utils::prelude::*;
use crate::utils::IdExt;
use crate::wizard::quest_wizard::run_quest_wizard;

fn parse_quest_id(raw: &str) -> Result<QuestId, CommandError> {
    raw.parse()
        .map_err(|e| CommandError::UnexpectedArgs(format!("Invalid quest id: {e}")))
}

fn is_staff_or_referee(ctx: &Context, guild_id: u64, role_ids: &[Id<twilight_model::id::marker::RoleMarker>]) -> bool {
    ctx.config
        .guild(Id::new(guild_id))
        .is_some_and(|s| s.is_referee_or_staff(role_ids))
}

async fn group_placeholder_classic(_ctx: Context, _req: ClassicRequest) -> CommandResponse {
    Ok(Response::CreateMessage("Specify a subcommand, e.g. `quest create`.".to_string()))
}

async fn group_placeholder_slash(_ctx: Context, _req: SlashRequest) -> CommandResponse {
    Ok(Response::CreateMessage("Specify a subcommand, e.g. `/quest create`.".to_string()))
}

pub struct QuestCmds;

impl QuestCmds {
    pub fn command() -> impl Into<BaseCommand> {
        use crate::commands::builder::*;

        command("quest", "Manage quests.")
            .attach(group_placeholder_classic)
            .attach(group_placeholder_slash)
            .option(sub("create", "Start the quest creation wizard in your DMs.").attach(Self::create_classic).attach(Self::create_slash))
            .option(
                sub("publish", "Publish a draft quest now.")
                    .attach(Self::publish_classic)
                    .attach(Self::publish_slash)
                    .option(string("quest-id", "The quest's id.").required()),
            )
            .option(
                sub("schedule", "Schedule a draft quest's announcement for later.")
                    .attach(Self::schedule_classic)
                    .attach(Self::schedule_slash)
                    .option(string("quest-id", "The quest's id.").required())
                    .option(integer("at", "Unix seconds to announce at.").required()),
            )
            .option(
                sub("start", "Mark an announced quest as started.")
                    .attach(Self::start_classic)
                    .attach(Self::start_slash)
                    .option(string("quest-id", "The quest's id.").required()),
            )
            .option(
                sub("complete", "Mark a quest as completed.")
                    .attach(Self::complete_classic)
                    .attach(Self::complete_slash)
                    .option(string("quest-id", "The quest's id.").required()),
            )
            .option(
                sub("cancel", "Cancel a quest.")
                    .attach(Self::cancel_classic)
                    .attach(Self::cancel_slash)
                    .option(string("quest-id", "The quest's id.").required()),
            )
            .option(
                sub("nudge", "Re-announce a published quest.")
                    .attach(Self::nudge_classic)
                    .attach(Self::nudge_slash)
                    .option(string("quest-id", "The quest's id.").required()),
            )
            .option(
                sub("signup", "Apply to join a quest with one of your characters.")
                    .attach(Self::signup_classic)
                    .attach(Self::signup_slash)
                    .option(string("quest-id", "The quest's id.").required())
                    .option(string("character-id", "Your character's id.").required()),
            )
            .option(
                sub("accept", "Accept a pending sign-up.")
                    .attach(Self::accept_classic)
                    .attach(Self::accept_slash)
                    .option(string("quest-id", "The quest's id.").required())
                    .option(user("applicant", "The applying player.").required()),
            )
            .option(
                sub("decline", "Decline a pending sign-up.")
                    .attach(Self::decline_classic)
                    .attach(Self::decline_slash)
                    .option(string("quest-id", "The quest's id.").required())
                    .option(user("applicant", "The applying player.").required()),
            )
            .option(
                sub("close-signups", "Stop accepting new sign-ups for a quest.")
                    .attach(Self::close_signups_classic)
                    .attach(Self::close_signups_slash)
                    .option(string("quest-id", "The quest's id.").required()),
            )
    }

    async fn create(ctx: &Context, guild_id: u64, discord_id: Id<UserMarker>) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id)
            .await?;
        if !user.is_referee() {
            return Err(CommandError::UnexpectedArgs(
                "Only referees can create quests.".to_string(),
            ));
        }

        let channel_id = crate::quest::discord::DiscordPreviewSink::open_dm(&ctx.http, discord_id)
            .await
            .map_err(CommandError::Other)?;
        let sink = crate::quest::discord::DiscordPreviewSink::new(ctx.http.clone(), channel_id);
        let rx = ctx.wizard_router.open(discord_id.get());

        let outcome = run_quest_wizard(&ctx.session_registry, user.user_id.clone(), rx, &sink).await;
        ctx.wizard_router.close(discord_id.get());

        match outcome {
            crate::wizard::WizardOutcome::Completed(draft) => {
                let title = draft.title.expect("wizard enforces required fields");
                let starting_at = draft.starting_at.expect("wizard enforces required fields");
                let duration = draft.duration.expect("wizard enforces required fields");
                let quest = ctx
                    .quest_service
                    .create_draft(guild_id, user.user_id, title, starting_at, duration)
                    .await
                    .map_err(domain_err_to_command)?;
                Ok(Response::CreateMessage(format!(
                    "Quest draft `{}` created. Use `/quest publish` when you're ready to announce it.",
                    quest.quest_id
                )))
            },
            crate::wizard::WizardOutcome::Failed { reason } => Ok(Response::CreateMessage(reason)),
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

    async fn publish(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        quest_id: &QuestId,
    ) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let draft = ctx
            .quest_service
            .get(guild_id, quest_id)
            .await
            .map_err(domain_err_to_command)?;

        let coordinates = ctx
            .announcement_publisher
            .publish(guild_id, &draft)
            .await
            .map_err(CommandError::Other)?;

        let quest = ctx
            .quest_service
            .publish_now(guild_id, quest_id, &user.user_id, coordinates)
            .await
            .map_err(domain_err_to_command)?;

        Ok(Response::CreateMessage(format!(
            "Quest `{}` announced.",
            quest.quest_id
        )))
    }

    async fn publish_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::publish(&ctx, guild_id.get(), req.message.author.id, &quest_id).await
    }

    async fn publish_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::publish(&ctx, guild_id.get(), author, &quest_id).await
    }

    async fn schedule(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        quest_id: &QuestId,
        at_epoch: i64,
    ) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let at = chrono::DateTime::from_timestamp(at_epoch, 0)
            .ok_or_else(|| CommandError::UnexpectedArgs("Invalid timestamp.".to_string()))?;
        // `schedule` itself only checks status/future-ness; referee ownership
        // was already established at quest creation, so re-check here too
        // since `mutate` doesn't take a caller for this one.
        let existing = ctx.quest_service.get(guild_id, quest_id).await.map_err(domain_err_to_command)?;
        if existing.referee_id != user.user_id {
            return Err(CommandError::Domain(crate::domain::error::DomainError::authorization(
                "Only this quest's referee can schedule it.",
            )));
        }
        let quest = ctx
            .quest_service
            .schedule(guild_id, quest_id, at)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!(
            "Quest `{}` will be announced at {}.",
            quest.quest_id,
            at.to_rfc3339()
        )))
    }

    async fn schedule_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let at = req.args.integer("at")?;
        Self::schedule(&ctx, guild_id.get(), req.message.author.id, &quest_id, at).await
    }

    async fn schedule_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let at = req.args.integer("at")?;
        Self::schedule(&ctx, guild_id.get(), author, &quest_id, at).await
    }

    async fn start(ctx: &Context, guild_id: u64, discord_id: Id<UserMarker>, quest_id: &QuestId) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let quest = ctx
            .quest_service
            .start(guild_id, quest_id, &user.user_id)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!("Quest `{}` started.", quest.quest_id)))
    }

    async fn start_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::start(&ctx, guild_id.get(), req.message.author.id, &quest_id).await
    }

    async fn start_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::start(&ctx, guild_id.get(), author, &quest_id).await
    }

    async fn complete(ctx: &Context, guild_id: u64, discord_id: Id<UserMarker>, quest_id: &QuestId) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let quest = ctx
            .quest_service
            .complete(guild_id, quest_id, &user.user_id)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!("Quest `{}` completed.", quest.quest_id)))
    }

    async fn complete_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::complete(&ctx, guild_id.get(), req.message.author.id, &quest_id).await
    }

    async fn complete_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::complete(&ctx, guild_id.get(), author, &quest_id).await
    }

    async fn cancel(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        role_ids: &[Id<twilight_model::id::marker::RoleMarker>],
        quest_id: &QuestId,
    ) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let is_staff = is_staff_or_referee(ctx, guild_id, role_ids);
        let quest = ctx
            .quest_service
            .cancel(guild_id, quest_id, &user.user_id, is_staff)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!("Quest `{}` cancelled.", quest.quest_id)))
    }

    async fn cancel_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let roles = classic_caller_role_ids(&req);
        Self::cancel(&ctx, guild_id.get(), req.message.author.id, &roles, &quest_id).await
    }

    async fn cancel_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let roles = slash_caller_role_ids(&req);
        Self::cancel(&ctx, guild_id.get(), author, &roles, &quest_id).await
    }

    async fn nudge(ctx: &Context, guild_id: u64, discord_id: Id<UserMarker>, quest_id: &QuestId) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let quest = ctx
            .quest_service
            .nudge(guild_id, quest_id, &user.user_id)
            .await
            .map_err(domain_err_to_command)?;
        if let Err(e) = ctx.announcement_sync.sync(guild_id, &quest).await {
            warn!(guild_id, quest_id = %quest.quest_id, "failed to sync announcement: {}", e.oneliner());
        }
        if let (Some(channel_id), Some(message_id)) =
            (quest.announcement.channel_id, quest.announcement.message_id)
        {
            ctx.http
                .create_message(Id::new(channel_id))
                .reply(Id::new(message_id))
                .content(&format!("Reminder: **{}** is still looking for players!", quest.title))?
                .await?;
        }
        Ok(Response::CreateMessage(format!("Quest `{}` nudged.", quest.quest_id)))
    }

    async fn nudge_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::nudge(&ctx, guild_id.get(), req.message.author.id, &quest_id).await
    }

    async fn nudge_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        Self::nudge(&ctx, guild_id.get(), author, &quest_id).await
    }

    async fn signup(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        quest_id: &QuestId,
        character_id: &str,
    ) -> CommandResponse {
        let user = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let character_id = character_id
            .parse()
            .map_err(|e| CommandError::UnexpectedArgs(format!("Invalid character id: {e}")))?;
        let quest = ctx
            .quest_service
            .add_signup(guild_id, quest_id, user.user_id, character_id)
            .await
            .map_err(domain_err_to_command)?;
        Ok(Response::CreateMessage(format!(
            "Sign-up request sent for quest `{}`.",
            quest.quest_id
        )))
    }

    async fn signup_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let character_id = req.args.string("character-id")?;
        Self::signup(&ctx, guild_id.get(), req.message.author.id, &quest_id, &character_id).await
    }

    async fn signup_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let character_id = req.args.string("character-id")?;
        Self::signup(&ctx, guild_id.get(), author, &quest_id, &character_id).await
    }

    async fn decide(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        role_ids: &[Id<twilight_model::id::marker::RoleMarker>],
        quest_id: &QuestId,
        applicant_discord_id: Id<UserMarker>,
        decision: Decision,
    ) -> CommandResponse {
        if !is_staff_or_referee(ctx, guild_id, role_ids) {
            return Err(CommandError::Domain(crate::domain::error::DomainError::authorization(
                "Only this quest's referee or staff can decide on sign-ups.",
            )));
        }
        let _caller = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        let applicant = resolve_user(ctx, Id::new(guild_id), applicant_discord_id).await?;

        let quest = ctx
            .adjudication
            .decide(guild_id, quest_id, &applicant.user_id, decision)
            .await
            .map_err(domain_err_to_command)?;

        Ok(Response::CreateMessage(format!(
            "Sign-up decision recorded for quest `{}`.",
            quest.quest_id
        )))
    }

    async fn accept_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let applicant = req.args.user("applicant")?.id();
        let roles = classic_caller_role_ids(&req);
        Self::decide(
            &ctx,
            guild_id.get(),
            req.message.author.id,
            &roles,
            &quest_id,
            applicant,
            Decision::Accept,
        )
        .await
    }

    async fn accept_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let applicant = req.args.user("applicant")?.id();
        let roles = slash_caller_role_ids(&req);
        Self::decide(&ctx, guild_id.get(), author, &roles, &quest_id, applicant, Decision::Accept).await
    }

    async fn decline_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let applicant = req.args.user("applicant")?.id();
        let roles = classic_caller_role_ids(&req);
        Self::decide(
            &ctx,
            guild_id.get(),
            req.message.author.id,
            &roles,
            &quest_id,
            applicant,
            Decision::Decline,
        )
        .await
    }

    async fn decline_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let applicant = req.args.user("applicant")?.id();
        let roles = slash_caller_role_ids(&req);
        Self::decide(&ctx, guild_id.get(), author, &roles, &quest_id, applicant, Decision::Decline).await
    }

    async fn close_signups(
        ctx: &Context,
        guild_id: u64,
        discord_id: Id<UserMarker>,
        role_ids: &[Id<twilight_model::id::marker::RoleMarker>],
        quest_id: &QuestId,
    ) -> CommandResponse {
        let _caller = resolve_user(ctx, Id::new(guild_id), discord_id).await?;
        if !is_staff_or_referee(ctx, guild_id, role_ids) {
            return Err(CommandError::Domain(crate::domain::error::DomainError::authorization(
                "Only this quest's referee or staff can close sign-ups.",
            )));
        }
        let quest = ctx
            .quest_service
            .close_signups(guild_id, quest_id)
            .await
            .map_err(domain_err_to_command)?;
        if let Err(e) = ctx.announcement_sync.sync(guild_id, &quest).await {
            warn!(guild_id, quest_id = %quest.quest_id, "failed to sync announcement: {}", e.oneliner());
        }
        Ok(Response::CreateMessage(format!(
            "Sign-ups closed for quest `{}`.",
            quest.quest_id
        )))
    }

    async fn close_signups_classic(ctx: Context, req: ClassicRequest) -> CommandResponse {
        let guild_id = classic_guild_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let roles = classic_caller_role_ids(&req);
        Self::close_signups(&ctx, guild_id.get(), req.message.author.id, &roles, &quest_id).await
    }

    async fn close_signups_slash(ctx: Context, req: SlashRequest) -> CommandResponse {
        let guild_id = slash_guild_id(&req)?;
        let author = slash_author_id(&req)?;
        let quest_id = parse_quest_id(&req.args.string("quest-id")?)?;
        let roles = slash_caller_role_ids(&req);
        Self::close_signups(&ctx, guild_id.get(), author, &roles, &quest_id).await
    }
}
