//! Moderator and owner commands for running the bot from chat.

use tchat_commands::events::names;
use tchat_commands::{
    Args, Bot, BoxError, Check, Command, CommandResult, Context, Event, FrameworkError, Module,
    Param, Permission,
};
use tracing::{debug, info};

/// Registers the moderation commands and a MODE listener.
pub struct ModerationModule;

impl Module for ModerationModule {
    fn prepare(&self, bot: &Bot) -> Result<(), BoxError> {
        bot.add_command(
            Command::new("resetcooldown", reset_cooldown)
                .alias("resetcd")
                .param(Param::required("command"))
                .check(Check::permission(Permission::Moderator))
                .description("Clears every cooldown of a command"),
        )?;
        bot.add_command(
            Command::new("modules", list_modules)
                .check(Check::permission(Permission::Moderator))
                .description("Lists loaded and available modules"),
        )?;
        for (name, description) in [
            ("load", "Loads a module"),
            ("unload", "Unloads a module"),
            ("reload", "Reloads a module, keeping the old one if it fails"),
        ] {
            bot.add_command(
                Command::new(name, manage_module)
                    .param(Param::required("module"))
                    .check(Check::permission(Permission::Owner))
                    .description(description),
            )?;
        }

        bot.listen(names::MODE, |event| async move {
            if let Event::Mode {
                channel,
                mode,
                user,
            } = event
            {
                info!(channel = %channel, mode = %mode, user = %user, "Moderator status changed");
            }
            Ok(())
        });
        Ok(())
    }

    fn breakdown(&self, _bot: &Bot) {
        debug!("Moderation module unloading");
    }
}

async fn reset_cooldown(ctx: Context, args: Args) -> CommandResult {
    let name = args.str(0).unwrap_or_default();
    let Some(command) = ctx.bot().get_command(name) else {
        return ctx.reply(format!("no command named '{name}'"));
    };
    ctx.bot().cooldowns().reset_command(command.name());
    ctx.reply(format!("cooldowns for '{}' cleared", command.name()))
}

async fn list_modules(ctx: Context, _args: Args) -> CommandResult {
    let modules = ctx.bot().modules();
    ctx.reply(format!(
        "loaded: {} | available: {}",
        modules.loaded().join(", "),
        modules.available().join(", ")
    ))
}

async fn manage_module(ctx: Context, args: Args) -> CommandResult {
    let module = args.str(0).unwrap_or_default();
    let bot = ctx.bot();
    let (result, done): (Result<(), FrameworkError>, &str) = match ctx.command_name() {
        Some("load") => (bot.load_module(module), "loaded"),
        Some("unload") => (bot.unload_module(module), "unloaded"),
        _ => (bot.reload_module(module), "reloaded"),
    };

    match result {
        Ok(()) => ctx.reply(format!("{done} '{module}'")),
        Err(err) => ctx.reply(format!("could not change '{module}': {err}")),
    }
}
