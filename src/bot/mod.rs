/*!
Command template:
```
use questboard::commands::prelude::*;

pub struct Command;

impl Command {
    pub fn command() -> impl Into<BaseCommand> {
        use questboard::commands::builder::*;

        command("cmd", "Thing.")
            .attach(Self::classic)
            .attach(Self::slash)
    }

    async fn classic(_ctx: Context, _req: ClassicRequest) -> CommandResponse {
        todo!();
    }

    async fn slash(_ctx: Context, _req: SlashRequest) -> CommandResponse {
        todo!();
    }
}
```
*/

use questboard::commands::meta::{About, Help, Ping};
use questboard::commands::{character_cmds::CharacterCmds, quest_cmds::QuestCmds};
use questboard::commands::{Commands, CommandsBuilder};
use questboard::utils::prelude::*;

/// Create the list of bot commands.
pub fn create_commands() -> AnyResult<Commands> {
    let commands = CommandsBuilder::new()
        // Generic info.
        .bind(Ping::command())
        .bind(About::command())
        .bind(Help::command())
        // Quest-board functionality.
        .bind(QuestCmds::command())
        .bind(CharacterCmds::command())
        .build();

    for base in commands.iter() {
        base.validate().context("Failed to validate commands list")?;
    }

    Ok(commands)
}
