//! Dispatch: resolve an interaction or a classic message to its bound
//! functions, run them, and turn the result into a Discord response.
//! Adapted from the project's earlier `commands_v2` dispatcher.

use std::sync::Arc;

use tokio::task::JoinSet;
use twilight_model::application::command::CommandType;
use twilight_model::application::interaction::application_command::{
    CommandData, CommandOptionValue,
};
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::Message;
use twilight_model::http::interaction::{
    InteractionResponse, InteractionResponseData, InteractionResponseType,
};

use crate::commands::arg::{Arg, ArgValue, Args, Ref};
use crate::commands::builder::{ArgKind, BaseCommand, CommandFunction, CommandGroup, CommandOption};
use crate::commands::function::{Callable, ClassicFunction, SlashFunction};
use crate::commands::prelude::*;
use crate::utils::prelude::*;
use crate::{parser, Context};

/// Handle a slash-command interaction end to end: acknowledge, dispatch,
/// then resolve the deferred response.
pub async fn application_command(
    ctx: &Context,
    inter: Interaction,
    data: CommandData,
) -> Result<(), CommandError> {
    let interaction = ctx.interaction();

    let resp = InteractionResponse {
        kind: InteractionResponseType::DeferredChannelMessageWithSource,
        data: Some(InteractionResponseData::default()),
    };

    interaction
        .create_response(inter.id, &inter.token, &resp)
        .await?;

    let Some(base) = ctx.commands.get(data.name.as_str()) else {
        return Err(CommandError::NotFound(format!(
            "Command '{}' does not exist",
            data.name
        )));
    };

    let base = Arc::new(base.to_owned());
    let inter = Arc::new(inter);
    let data = Arc::new(data);

    let result = {
        let ctx = ctx.clone();
        let inter = Arc::clone(&inter);
        tokio::spawn(async move {
            match data.kind {
                CommandType::ChatInput => process_slash(&ctx, base, inter, data).await,
                CommandType::Message => process_message(&ctx, base, inter, data).await,
                CommandType::User => process_user(&ctx, base, inter, data).await,
                other => Err(CommandError::NotFound(format!(
                    "Unhandled command kind: {other:?}"
                ))),
            }
        })
        .await
    };

    let clear = || async {
        interaction
            .delete_response(&inter.token)
            .await
            .map_err(CommandError::from)
    };

    match result {
        Ok(Ok(Response::None | Response::Clear)) => {
            clear().await?;
        },
        Ok(Ok(Response::CreateMessage(text))) => {
            interaction
                .update_response(&inter.token)
                .content(Some(&text))?
                .await?;
        },
        Ok(Err(e)) => {
            clear().await?;
            return Err(e);
        },
        Err(join_err) => {
            clear().await?;
            return Err(CommandError::Other(anyhow::anyhow!(
                "Execution task error: {join_err}"
            )));
        },
    }

    Ok(())
}

async fn process_slash(
    ctx: &Context,
    base: Arc<BaseCommand>,
    inter: Arc<Interaction>,
    data: Arc<CommandData>,
) -> CommandResult {
    let mut args = Vec::new();
    let mut last = Lookup::Command(&base.command);
    let mut data_opts = data.options.to_vec();
    let mut lookup_opts;

    while let Some(opt) = data_opts.pop() {
        match opt.value {
            CommandOptionValue::SubCommand(next) | CommandOptionValue::SubCommandGroup(next) => {
                lookup_opts = match last {
                    Lookup::Command(c) => c.options.to_vec(),
                    Lookup::Group(g) => g.to_options(),
                };

                let found = lookup_opts
                    .iter()
                    .filter_map(Lookup::from_option)
                    .find(|s| s.name() == opt.name);

                match found {
                    Some(sub) => {
                        data_opts = next.to_vec();
                        last = sub;
                    },
                    None => {
                        return Err(CommandError::NotFound(format!(
                            "Subcommand or group not found: {}",
                            opt.name
                        )));
                    },
                }
            },
            arg => match ArgValue::try_from(arg) {
                Ok(arg) => args.push(Arg {
                    name: opt.name,
                    value: arg,
                }),
                Err(e) => {
                    return Err(CommandError::Other(anyhow::anyhow!(
                        "Could not process argument '{}': {e}",
                        opt.name
                    )));
                },
            },
        }
    }

    let funcs = last
        .slash_functions()
        .map_err(CommandError::Other)?;

    let req = SlashRequest::new(base, Arc::clone(&inter), data, Args::from(args));

    execute(ctx, funcs, req).await
}

async fn process_message(
    _ctx: &Context,
    base: Arc<BaseCommand>,
    _inter: Arc<Interaction>,
    _data: Arc<CommandData>,
) -> CommandResult {
    Err(CommandError::NotFound(format!(
        "Message commands are not implemented: '{}'",
        base.command.name
    )))
}

async fn process_user(
    _ctx: &Context,
    base: Arc<BaseCommand>,
    _inter: Arc<Interaction>,
    _data: Arc<CommandData>,
) -> CommandResult {
    Err(CommandError::NotFound(format!(
        "User commands are not implemented: '{}'",
        base.command.name
    )))
}

/// Parse and dispatch a classic (prefixed) text command.
pub async fn classic_command(ctx: &Context, msg: Arc<Message>) -> Result<(), CommandError> {
    let prefix = ctx.config.classic_prefix(msg.guild_id).unwrap_or_default();
    let Some((_, unprefixed)) = parser::unprefix_with([prefix.as_str()], &msg.content) else {
        return Err(CommandError::NotPrefixed);
    };

    let (name, mut rest) = parser::split_once_whitespace(unprefixed);

    let Some(base) = ctx.commands.get(name) else {
        return Err(CommandError::NotFound(format!(
            "Command '{name}' does not exist"
        )));
    };

    let base = Arc::new(base.to_owned());
    let mut lookup = Lookup::Command(&base.command);

    loop {
        let (name, next) = parser::split_once_whitespace(rest.unwrap_or(""));

        let found = match lookup {
            Lookup::Command(f) => f
                .options
                .iter()
                .filter_map(Lookup::from_option)
                .find(|t| t.name() == name),
            Lookup::Group(g) => g.subs.iter().find(|s| s.name == name).map(Lookup::Command),
        };

        if let Some(t) = found {
            lookup = t;
            rest = next;
            continue;
        }

        break;
    }

    let args = match lookup {
        Lookup::Command(c) => parse_classic_args(c, &msg, rest)?,
        Lookup::Group(g) => {
            return Err(CommandError::UnexpectedArgs(format!(
                "Expected command, found group '{}'",
                g.name
            )));
        },
    };

    let funcs = lookup.classic_functions().map_err(CommandError::Other)?;

    trace!(
        "Creating classic request for '{name}' by user '{}'",
        msg.author.id
    );

    let req = ClassicRequest::new(Arc::clone(&base), Arc::clone(&msg), args);

    debug!("Executing '{name}' by user '{}'", msg.author.id);

    let response = execute(ctx, funcs, req).await?;

    match response {
        Response::None => (),
        Response::Clear => {
            ctx.http.delete_message(msg.channel_id, msg.id).await?;
        },
        Response::CreateMessage(text) => {
            ctx.http
                .create_message(msg.channel_id)
                .reply(msg.id)
                .content(&format!("{text}\n"))?
                .await?;
        },
    }

    Ok(())
}

fn parse_classic_args(
    c: &CommandFunction,
    msg: &Message,
    mut rest: Option<&str>,
) -> Result<Args, CommandError> {
    let mut parsed = Vec::new();
    let mut args = c.args();

    'parse: while let Some(arg) = args.next().filter(|a| a.required) {
        'special: {
            let value = match arg.kind {
                ArgKind::Message => {
                    let Some(replied) = msg.referenced_message.as_ref() else {
                        break 'special;
                    };
                    ArgValue::Message(Ref::from_obj(replied.as_ref().to_owned()))
                },
                ArgKind::Attachment => {
                    let att = msg
                        .attachments
                        .first()
                        .ok_or(CommandError::MissingArgs)?;
                    ArgValue::Attachment(Ref::from_obj(att.to_owned()))
                },
                _ => break 'special,
            };

            parsed.push(Arg {
                name: arg.name.to_string(),
                value,
            });

            continue 'parse;
        }

        let unparsed = rest.ok_or(CommandError::MissingArgs)?;

        let (value, next) = parser::maybe_quoted_arg(unparsed)?;
        rest = next;

        parsed.push(
            Arg::from_desc(arg, value)
                .map_err(|e| CommandError::Other(e.context(format!("argument '{}'", arg.name))))?,
        );
    }

    Ok(Args::from(parsed))
}

enum Lookup<'a> {
    Command(&'a CommandFunction),
    Group(&'a CommandGroup),
}

impl<'a> Lookup<'a> {
    const fn from_option(opt: &'a CommandOption) -> Option<Self> {
        match opt {
            CommandOption::Sub(s) => Some(Self::Command(s)),
            CommandOption::Group(g) => Some(Self::Group(g)),
            _ => None,
        }
    }

    const fn name(&self) -> &str {
        match self {
            Lookup::Command(t) => t.name,
            Lookup::Group(t) => t.name,
        }
    }

    fn classic_functions(&self) -> AnyResult<Vec<ClassicFunction>> {
        match self {
            Lookup::Command(c) if c.has_classic() => Ok(c.classic().collect()),
            Lookup::Command(c) => {
                anyhow::bail!("No classic functions bound for command '{}'", c.name)
            },
            Lookup::Group(g) => {
                anyhow::bail!("Expected a subcommand, found group '{}'", g.name)
            },
        }
    }

    fn slash_functions(&self) -> AnyResult<Vec<SlashFunction>> {
        match self {
            Lookup::Command(c) if c.has_slash() => Ok(c.slash().collect()),
            Lookup::Command(c) => {
                anyhow::bail!("No slash functions bound for command '{}'", c.name)
            },
            Lookup::Group(g) => {
                anyhow::bail!("Expected a subcommand, found group '{}'", g.name)
            },
        }
    }
}

/// Run every bound function of the matched kind concurrently. All but the
/// last result must be `Ok`; the last one is returned regardless, so a
/// panel of handlers can share telemetry while one of them owns the reply.
async fn execute<F, R>(ctx: &Context, funcs: Vec<F>, req: R) -> CommandResult
where
    F: Callable<(Context, R)>,
    R: Clone,
{
    let mut set = JoinSet::new();
    let mut results = Vec::with_capacity(funcs.len());

    for func in funcs {
        let ctx = ctx.clone();
        let req = req.clone();
        set.spawn(async move { func.call((ctx, req)).await });
    }

    while let Some(task) = set.join_next().await {
        match task {
            Ok(result) => results.push(result),
            Err(e) => error!("Execution task join error: {e}"),
        }
    }

    let last = results
        .pop()
        .ok_or_else(|| CommandError::Other(anyhow::anyhow!("No results from command handlers")))?;

    for r in results {
        r?;
    }

    last
}
