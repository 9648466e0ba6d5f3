//! Main entry point for TChat Bot.

use tchat_bot::{BotResult, ConsoleConnection, TChatBot};
use tchat_common::{init_default_logging, init_logging, ChannelName};
use tchat_config::{Config, ConfigLoader, ConfigValidator};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> BotResult<()> {
    let config = match ConfigLoader::discover() {
        Ok(config) => config,
        Err(e) => {
            let _guard = init_default_logging()?;
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    let _guard = init_logging(&config.logging)?;

    info!("Starting TChat Bot");
    for warning in ConfigValidator::warnings(&config) {
        warn!("{warning}");
    }

    let connection = console_connection(&config);
    let bot = TChatBot::new(config)?;

    if let Err(e) = bot.run(connection).await {
        error!("Bot stopped with an error: {}", e);
        return Err(e);
    }

    info!("TChat Bot stopped");
    Ok(())
}

/// Chat from stdin lands in the first configured channel, sent by the first owner.
fn console_connection(config: &Config) -> ConsoleConnection {
    let channel = config
        .bot
        .initial_channels
        .first()
        .cloned()
        .unwrap_or_else(|| ChannelName::new("console"));
    let user = config.bot.owners.first().map_or("console", String::as_str);
    ConsoleConnection::new(channel, user)
}
