//! Everyday commands available to every chatter.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tchat_commands::{
    ArgValue, Args, Bot, BoxError, BucketType, Cog, Command, CommandResult, Context, Cooldown,
    Module, Param,
};

/// Loads the [`General`] cog.
pub struct GeneralModule;

impl Module for GeneralModule {
    fn prepare(&self, bot: &Bot) -> Result<(), BoxError> {
        bot.add_cog(Arc::new(General::new()))?;
        Ok(())
    }
}

/// `ping`, `echo`, `help` and `uptime`.
pub struct General {
    started: DateTime<Utc>,
}

impl General {
    /// Starts the uptime clock now.
    pub fn new() -> Self {
        Self {
            started: Utc::now(),
        }
    }
}

impl Default for General {
    fn default() -> Self {
        Self::new()
    }
}

impl Cog for General {
    fn name(&self) -> &str {
        "general"
    }

    fn commands(self: Arc<Self>) -> Vec<Command> {
        let started = self.started;
        vec![
            Command::new("ping", ping).description("Checks that the bot is alive"),
            Command::new("echo", echo)
                .alias("say")
                .param(Param::rest_required("text"))
                .cooldown(Cooldown::new(1, Duration::from_secs(3), [BucketType::User]))
                .description("Repeats the given text"),
            Command::new("help", help)
                .alias("commands")
                .param(Param::optional("command"))
                .description("Lists commands or shows how to use one"),
            Command::new("uptime", move |ctx: Context, _args: Args| async move {
                let elapsed = (Utc::now() - started).to_std().unwrap_or_default();
                ctx.reply(format!("up for {}", format_uptime(elapsed)))
            })
            .description("Shows how long the bot has been running"),
        ]
    }
}

async fn ping(ctx: Context, _args: Args) -> CommandResult {
    ctx.reply("pong")
}

async fn echo(ctx: Context, args: Args) -> CommandResult {
    let text = args
        .kwarg("text")
        .and_then(ArgValue::as_str)
        .unwrap_or_default();
    ctx.send(text)
}

async fn help(ctx: Context, args: Args) -> CommandResult {
    if let Some(name) = args.str(0) {
        let Some(command) = ctx.bot().get_command(name) else {
            return ctx.reply(format!("no command named '{name}'"));
        };
        let prefix = ctx.prefix.as_deref().unwrap_or_default();
        let line = match command.help() {
            Some(help) => format!("{prefix}{}: {help}", command.usage_line()),
            None => format!("{prefix}{}", command.usage_line()),
        };
        return ctx.reply(line);
    }

    let names: Vec<String> = ctx
        .bot()
        .commands()
        .iter()
        .map(|command| command.name().to_string())
        .collect();
    ctx.reply(format!("commands: {}", names.join(", ")))
}

/// Renders `elapsed` as `1d 2h 3m 4s`, leaving out leading zero units.
pub fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let units = [
        (total / 86_400, "d"),
        ((total / 3_600) % 24, "h"),
        ((total / 60) % 60, "m"),
    ];

    let mut parts: Vec<String> = units
        .iter()
        .skip_while(|(value, _)| *value == 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();
    parts.push(format!("{}s", total % 60));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
        assert_eq!(format_uptime(Duration::from_secs(3_605)), "1h 0m 5s");
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_general_cog_commands_validate() {
        let commands = Arc::new(General::new()).commands();
        let names: Vec<&str> = commands.iter().map(Command::name).collect();
        assert_eq!(names, vec!["ping", "echo", "help", "uptime"]);
        for command in &commands {
            command.validate().unwrap();
        }
        assert_eq!(commands[1].usage_line(), "echo [text]");
    }
}
