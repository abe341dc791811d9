//! Discord bot setup and event handling.

use log::{debug, error, info, warn};
use poise::{
    Framework, FrameworkError, FrameworkOptions, PrefixFrameworkOptions, builtins,
    serenity_prelude::{ClientBuilder, Context, FullEvent, GatewayIntents},
};
use tokio::sync::RwLock;

use crate::commands::keyword_commands;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::keyword_reply::handle_keyword_reply;
use crate::registry::KeywordStore;
use crate::retraction::RetractionScheduler;

/// Shared state handed to every command and event.
pub struct Data {
    store: RwLock<KeywordStore>,
    retraction: RetractionScheduler,
    command_prefix: String,
}

impl Data {
    #[must_use]
    pub fn new(store: KeywordStore, retraction: RetractionScheduler, command_prefix: String) -> Self {
        Self {
            store: RwLock::new(store),
            retraction,
            command_prefix,
        }
    }

    #[must_use]
    pub fn store(&self) -> &RwLock<KeywordStore> {
        &self.store
    }

    #[must_use]
    pub fn retraction(&self) -> &RetractionScheduler {
        &self.retraction
    }

    #[must_use]
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }
}

/// Run the Discord bot.
pub async fn run() -> Result<()> {
    info!("Initializing bot");
    let config = Config::from_env()?;

    let store = KeywordStore::open(config.registry_path.clone());
    let data = Data::new(
        store,
        RetractionScheduler::new(config.retraction_delay),
        config.command_prefix.clone(),
    );

    debug!("Setting up gateway intents");
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    debug!("Building framework");
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: keyword_commands(),
            prefix_options: PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            event_handler: |ctx, event, _framework, data| Box::pin(event_handler(ctx, event, data)),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready and connected to Discord");
                debug!("Registering commands globally");
                builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully");
                Ok(data)
            })
        })
        .build();

    debug!("Creating Discord client");
    let mut client = ClientBuilder::new(config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client");

    tokio::select! {
        result = client.start() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
        }
    }

    Ok(())
}

async fn event_handler(ctx: &Context, event: &FullEvent, data: &Data) -> Result<()> {
    if let FullEvent::Message { new_message } = event
        && let Err(e) = handle_keyword_reply(ctx, new_message, data).await
    {
        error!(
            "Keyword reply failed for message from {} in channel {}: {}",
            new_message.author.tag(),
            new_message.channel_id,
            e
        );
    }
    Ok(())
}

async fn on_error(error: FrameworkError<'_, Data, BotError>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            if error.is_user_facing() {
                debug!("Command `{}` rejected: {}", ctx.command().name, error);
            } else {
                error!("Command `{}` failed: {}", ctx.command().name, error);
            }
            if let Err(e) = ctx.say(error.user_message()).await {
                warn!("Failed to send error reply: {e}");
            }
        }
        other => {
            if let Err(e) = builtins::on_error(other).await {
                error!("Error while handling framework error: {e}");
            }
        }
    }
}
