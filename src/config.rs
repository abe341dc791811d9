use std::{env, path::PathBuf, time::Duration};

use log::{debug, error, info};

use crate::error::{BotError, Result};
use crate::retraction::RETRACTION_DELAY;

const DEFAULT_REGISTRY_PATH: &str = "data/keyword_reply_config.json";
const DEFAULT_COMMAND_PREFIX: &str = "!";

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub registry_path: PathBuf,
    pub retraction_delay: Duration,
    pub command_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN").map_err(|e| {
            error!("Failed to load DISCORD_TOKEN from environment: {e}");
            e
        })?;

        let registry_path = env::var("KEYWORD_REPLY_PATH")
            .map_or_else(|_| PathBuf::from(DEFAULT_REGISTRY_PATH), PathBuf::from);

        let retraction_delay = match env::var("RETRACTION_DELAY_SECS") {
            Ok(raw) => parse_delay(&raw)?,
            Err(_) => RETRACTION_DELAY,
        };

        let command_prefix = env::var("COMMAND_PREFIX")
            .ok()
            .filter(|prefix| !prefix.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        info!("Configuration loaded successfully");
        debug!("Discord token length: {} characters", discord_token.len());
        debug!("Keyword registry path: {}", registry_path.display());
        debug!("Retraction delay: {}s", retraction_delay.as_secs());
        debug!("Command prefix: {command_prefix}");

        Ok(Self {
            discord_token,
            registry_path,
            retraction_delay,
            command_prefix,
        })
    }
}

fn parse_delay(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            error!("Invalid RETRACTION_DELAY_SECS '{raw}': {e}");
            BotError::Config(format!("RETRACTION_DELAY_SECS must be whole seconds: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_seconds() {
        assert!(matches!(parse_delay(" 30 "), Ok(d) if d == Duration::from_secs(30)));
    }

    #[test]
    fn rejects_negative_delay() {
        assert!(matches!(parse_delay("-5"), Err(BotError::Config(_))));
    }
}
