//! Conversion from the generic [`BaseCommand`] builder tree into twilight's
//! wire format (spec §6.2, command registration), plus validation against
//! Discord's own command limits via `twilight-validate`.

use thiserror::Error;
use twilight_model::application::command::{Command, CommandOption as TwilightOption, CommandType};
use twilight_util::builder::command::{
    AttachmentBuilder, BooleanBuilder, ChannelBuilder, CommandBuilder, IntegerBuilder,
    MentionableBuilder, NumberBuilder, RoleBuilder, StringBuilder, SubCommandBuilder,
    SubCommandGroupBuilder, UserBuilder,
};

use crate::commands::builder::{ArgDesc, ArgKind, BaseCommand, CommandFunction, CommandGroup, CommandOption};

#[derive(Debug, Error)]
pub enum CommandValidationError {
    #[error("command '{name}' failed validation: {source}")]
    Twilight {
        name: String,
        #[source]
        source: twilight_validate::command::CommandValidationError,
    },
}

/// A twilight-ready command of any registrable kind (slash, message, user).
#[derive(Debug, Clone)]
pub struct TwilightCommand(pub Command);

#[derive(Debug, Clone)]
pub struct SlashCommand(Command);

#[derive(Debug, Clone)]
pub struct MessageCommand(Command);

#[derive(Debug, Clone)]
pub struct UserCommand(Command);

impl From<SlashCommand> for TwilightCommand {
    fn from(value: SlashCommand) -> Self {
        Self(value.0)
    }
}

impl From<MessageCommand> for TwilightCommand {
    fn from(value: MessageCommand) -> Self {
        Self(value.0)
    }
}

impl From<UserCommand> for TwilightCommand {
    fn from(value: UserCommand) -> Self {
        Self(value.0)
    }
}

fn arg_to_option(arg: &ArgDesc) -> TwilightOption {
    match &arg.kind {
        ArgKind::Bool => BooleanBuilder::new(arg.name, arg.description)
            .required(arg.required)
            .build(),
        ArgKind::Number(data) => {
            let mut b = NumberBuilder::new(arg.name, arg.description).required(arg.required);
            if let Some(min) = data.min {
                b = b.min_value(min);
            }
            if let Some(max) = data.max {
                b = b.max_value(max);
            }
            if !data.choices.is_empty() {
                b = b.choices(data.choices.clone());
            }
            b.build()
        }
        ArgKind::Integer(data) => {
            let mut b = IntegerBuilder::new(arg.name, arg.description).required(arg.required);
            if let Some(min) = data.min {
                b = b.min_value(min);
            }
            if let Some(max) = data.max {
                b = b.max_value(max);
            }
            if !data.choices.is_empty() {
                b = b.choices(data.choices.clone());
            }
            b.build()
        }
        ArgKind::String(data) => {
            let mut b = StringBuilder::new(arg.name, arg.description).required(arg.required);
            if let Some(min) = data.min_length {
                b = b.min_length(min);
            }
            if let Some(max) = data.max_length {
                b = b.max_length(max);
            }
            if !data.choices.is_empty() {
                b = b.choices(data.choices.clone());
            }
            b.build()
        }
        ArgKind::Channel(data) => {
            let mut b = ChannelBuilder::new(arg.name, arg.description).required(arg.required);
            if !data.channel_types.is_empty() {
                b = b.channel_types(data.channel_types.clone());
            }
            b.build()
        }
        ArgKind::Message | ArgKind::Attachment => {
            AttachmentBuilder::new(arg.name, arg.description).required(arg.required).build()
        }
        ArgKind::User => UserBuilder::new(arg.name, arg.description).required(arg.required).build(),
        ArgKind::Role => RoleBuilder::new(arg.name, arg.description).required(arg.required).build(),
        ArgKind::Mention => MentionableBuilder::new(arg.name, arg.description)
            .required(arg.required)
            .build(),
    }
}

fn sub_to_option(sub: &CommandFunction) -> TwilightOption {
    let mut builder = SubCommandBuilder::new(sub.name, sub.description);
    for opt in &sub.options {
        if let CommandOption::Arg(arg) = opt {
            builder = builder.option(arg_to_option(arg));
        }
    }
    builder.build()
}

fn group_to_option(group: &CommandGroup) -> TwilightOption {
    SubCommandGroupBuilder::new(group.name, group.description)
        .subcommands(group.subs.iter().map(sub_to_option))
        .build()
}

fn option_to_twilight(opt: &CommandOption) -> TwilightOption {
    match opt {
        CommandOption::Arg(arg) => arg_to_option(arg),
        CommandOption::Sub(sub) => sub_to_option(sub),
        CommandOption::Group(group) => group_to_option(group),
    }
}

fn build_command(base: &BaseCommand, kind: CommandType, with_options: bool) -> Result<Command, CommandValidationError> {
    let description = if kind == CommandType::ChatInput {
        base.command.description
    } else {
        ""
    };
    let mut builder = CommandBuilder::new(base.command.name, description, kind).dm_permission(base.dm_enabled);
    if let Some(perms) = base.member_permissions {
        builder = builder.default_member_permissions(perms);
    }
    if with_options {
        for opt in &base.command.options {
            builder = builder.option(option_to_twilight(opt));
        }
    }
    builder
        .validate()
        .map_err(|source| CommandValidationError::Twilight {
            name: base.command.name.to_string(),
            source,
        })
        .map(|b| b.build())
}

impl TryFrom<BaseCommand> for SlashCommand {
    type Error = CommandValidationError;

    fn try_from(base: BaseCommand) -> Result<Self, Self::Error> {
        build_command(&base, CommandType::ChatInput, true).map(Self)
    }
}

impl TryFrom<BaseCommand> for MessageCommand {
    type Error = CommandValidationError;

    fn try_from(base: BaseCommand) -> Result<Self, Self::Error> {
        build_command(&base, CommandType::Message, false).map(Self)
    }
}

impl TryFrom<BaseCommand> for UserCommand {
    type Error = CommandValidationError;

    fn try_from(base: BaseCommand) -> Result<Self, Self::Error> {
        build_command(&base, CommandType::User, false).map(Self)
    }
}
