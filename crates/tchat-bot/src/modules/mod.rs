//! Built-in modules shipped with the binary.

pub mod general;
pub mod moderation;

use tchat_commands::Bot;

/// Name of the [`general::GeneralModule`].
pub const GENERAL: &str = "general";

/// Name of the [`moderation::ModerationModule`].
pub const MODERATION: &str = "moderation";

/// Makes every built-in module loadable by name.
pub fn register_builtin(bot: &Bot) {
    bot.register_module(GENERAL, || general::GeneralModule);
    bot.register_module(MODERATION, || moderation::ModerationModule);
}
