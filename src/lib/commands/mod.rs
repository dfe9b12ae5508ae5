//! Command framework: the argument model, the builder DSL, and dispatch
//! from both slash interactions and classic prefixed messages.

pub mod arg;
pub mod builder;
pub mod character_cmds;
pub mod function;
pub mod handle;
pub mod meta;
pub mod quest_cmds;
pub mod support;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use twilight_model::application::command::Command as TwilightCommandModel;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::application::interaction::Interaction;
use twilight_model::channel::Message;

use crate::commands::builder::BaseCommand;
use crate::commands::builder::twilight::CommandValidationError;
use crate::domain::DomainError;
use crate::utils::prelude::*;

pub mod prelude {
    pub use crate::commands::arg::{Arg, ArgValue, ArgValueExt, Args};
    pub use crate::commands::builder::BaseCommand;
    pub use crate::commands::{
        ClassicRequest, CommandError, CommandResponse, CommandResult, MessageRequest, Response,
        SlashRequest, UserRequest,
    };
    pub use crate::utils::prelude::AnyResult;
    pub use crate::Context;
}

/// Errors from parsing a command invocation or running its handlers.
///
/// Distinct from [`DomainError`] (a use-case outcome): this enum is about
/// the shape of the *invocation* itself. Handlers surface `DomainError`
/// through the [`DomainError`] variant so a user-facing message still
/// reaches the caller without handlers needing their own error plumbing.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Message is not prefixed")]
    NotPrefixed,

    #[error("{0}")]
    NotFound(String),

    #[error("Missing required arguments")]
    MissingArgs,

    #[error("Argument type does not match")]
    ArgsMismatch,

    #[error("{0}")]
    UnexpectedArgs(String),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Validation(#[from] CommandValidationError),

    #[error(transparent)]
    Message(#[from] twilight_validate::message::MessageValidationError),

    #[error(transparent)]
    Http(#[from] twilight_http::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),

    #[error(transparent)]
    Parse(#[from] crate::parser::ParseError),
}

impl CommandError {
    /// The text shown to the caller. Domain errors carry their own
    /// user-safe message; everything else gets a generic one so internals
    /// never leak into a Discord channel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(e) => e.user_message(),
            Self::NotFound(m) | Self::UnexpectedArgs(m) => m.clone(),
            Self::MissingArgs => "Missing required arguments.".to_string(),
            Self::ArgsMismatch => "One or more arguments are the wrong type.".to_string(),
            Self::NotPrefixed => "Message is not a command.".to_string(),
            Self::Validation(_) | Self::Message(_) | Self::Http(_) | Self::Other(_)
            | Self::Parse(_) => "Something went wrong running that command.".to_string(),
        }
    }
}

/// The dispatcher's response to a handled command: whether and how to
/// reply to the triggering message or interaction.
#[derive(Debug, Clone)]
pub enum Response {
    /// Handler already sent its own reply; nothing more to do.
    None,
    /// Delete the deferred response or the triggering classic command
    /// message, leaving no trace.
    Clear,
    /// Send `text` as the follow-up (slash) or reply (classic).
    CreateMessage(String),
}

impl Response {
    /// Shorthand for the common case: handler replied itself already.
    pub const fn none() -> Self {
        Self::None
    }
}

pub type CommandResponse = Result<Response, CommandError>;
pub type CommandResult = Result<Response, CommandError>;
pub type AsyncResponse = Pin<Box<dyn Future<Output = CommandResponse> + Send>>;

/// Bound satisfied by every handler's return future.
pub trait ResponseFuture: Future<Output = CommandResponse> + Send {}
impl<T> ResponseFuture for T where T: Future<Output = CommandResponse> + Send {}

/// A classic (prefixed text) command invocation.
#[derive(Debug, Clone)]
pub struct ClassicRequest {
    pub base: std::sync::Arc<BaseCommand>,
    pub message: std::sync::Arc<Message>,
    pub args: arg::Args,
}

impl ClassicRequest {
    pub const fn new(
        base: std::sync::Arc<BaseCommand>,
        message: std::sync::Arc<Message>,
        args: arg::Args,
    ) -> Self {
        Self { base, message, args }
    }
}

/// A slash (application) command invocation.
#[derive(Debug, Clone)]
pub struct SlashRequest {
    pub base: std::sync::Arc<BaseCommand>,
    pub interaction: std::sync::Arc<Interaction>,
    pub data: std::sync::Arc<CommandData>,
    pub args: arg::Args,
}

impl SlashRequest {
    pub const fn new(
        base: std::sync::Arc<BaseCommand>,
        interaction: std::sync::Arc<Interaction>,
        data: std::sync::Arc<CommandData>,
        args: arg::Args,
    ) -> Self {
        Self {
            base,
            interaction,
            data,
            args,
        }
    }
}

/// A message-context menu command invocation.
#[derive(Debug, Clone)]
pub struct MessageRequest {
    pub base: std::sync::Arc<BaseCommand>,
    pub interaction: std::sync::Arc<Interaction>,
    pub data: std::sync::Arc<CommandData>,
}

/// A user-context menu command invocation.
#[derive(Debug, Clone)]
pub struct UserRequest {
    pub base: std::sync::Arc<BaseCommand>,
    pub interaction: std::sync::Arc<Interaction>,
    pub data: std::sync::Arc<CommandData>,
}

/// The registered command set. Keyed by name, in registration order so
/// `/help` lists commands the way they were added.
#[derive(Default, Clone)]
pub struct Commands {
    order: Vec<String>,
    by_name: HashMap<String, BaseCommand>,
}

pub struct CommandsBuilder {
    inner: Commands,
}

impl CommandsBuilder {
    pub fn new() -> Self {
        Self {
            inner: Commands::default(),
        }
    }

    /// Register a command, panicking on a duplicate name: a programmer
    /// error caught at startup, not something to recover from at runtime.
    pub fn bind(mut self, command: impl Into<BaseCommand>) -> Self {
        let command = command.into();
        let name = command.command.name.to_string();
        if self.inner.by_name.insert(name.clone(), command).is_some() {
            panic!("Duplicate command registered: '{name}'");
        }
        self.inner.order.push(name);
        self
    }

    pub fn build(self) -> Commands {
        self.inner
    }
}

impl Default for CommandsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Commands {
    pub fn get(&self, name: &str) -> Option<&BaseCommand> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BaseCommand> {
        self.order.iter().filter_map(|n| self.by_name.get(n))
    }

    /// Validate every registered command and convert it to the twilight
    /// wire format, for bulk (re-)registration at startup.
    pub fn twilight_commands(&self) -> Result<Vec<TwilightCommandModel>, CommandValidationError> {
        let mut out = Vec::with_capacity(self.by_name.len());
        for base in self.iter() {
            for cmd in base.twilight_commands() {
                out.push(cmd?.0);
            }
        }
        Ok(out)
    }

    /// `/help` (and classic `help`) listing: one line per command.
    pub fn display(&self) -> AnyResult<String> {
        let mut out = String::new();
        for base in self.iter() {
            out.push_str(&base.generate_help());
            out.push('\n');
        }
        Ok(out)
    }
}
