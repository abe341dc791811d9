use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Serenity error: {0}")]
    Serenity(Box<poise::serenity_prelude::Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Failed to load keyword registry from {}: {reason}", path.display())]
    RegistryLoad { path: PathBuf, reason: String },

    #[error("Failed to save keyword registry to {}: {reason}", path.display())]
    RegistrySave { path: PathBuf, reason: String },

    #[error("Keyword cannot be empty")]
    EmptyKeyword,

    #[error("Reply cannot be empty")]
    EmptyReply,

    #[error("Reply is {len} characters, the limit is {limit}")]
    ReplyTooLong { len: usize, limit: usize },

    #[error("Invalid add format, expected `keyword|reply`")]
    InvalidAddFormat,

    #[error("Keyword not found: {keyword}")]
    KeywordNotFound {
        keyword: String,
        suggestion: Option<String>,
    },

    #[error("Fuzzy match error: {0}")]
    FuzzyMatch(String),

    #[error("Sent message carries no message id")]
    MissingMessageId,

    #[error("Failed to retract message {message_id}: {reason}")]
    Retraction { message_id: u64, reason: String },
}

impl From<poise::serenity_prelude::Error> for BotError {
    fn from(err: poise::serenity_prelude::Error) -> Self {
        BotError::Serenity(Box::new(err))
    }
}

impl BotError {
    /// Whether the error is the user's doing and should be echoed back verbatim.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            BotError::EmptyKeyword
                | BotError::EmptyReply
                | BotError::ReplyTooLong { .. }
                | BotError::InvalidAddFormat
                | BotError::KeywordNotFound { .. }
        )
    }

    /// Returns a user-friendly error message suitable for displaying in Discord
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            BotError::EmptyKeyword => "❌ Keyword cannot be empty.".to_string(),
            BotError::EmptyReply => "❌ Reply cannot be empty.".to_string(),
            BotError::ReplyTooLong { len, limit } => {
                format!("❌ Reply is too long ({len} characters, the limit is {limit}).")
            }
            BotError::InvalidAddFormat => {
                "❌ Invalid format. Usage: add_reply keyword|reply".to_string()
            }
            BotError::KeywordNotFound {
                keyword,
                suggestion: Some(suggestion),
            } => format!("❌ Keyword not found: {keyword} (did you mean `{suggestion}`?)"),
            BotError::KeywordNotFound { keyword, .. } => {
                format!("❌ Keyword not found: {keyword}")
            }
            BotError::Serenity(_) => {
                "Sorry, I'm having trouble communicating with Discord right now. Please try again later.".to_string()
            }
            BotError::Config(_) | BotError::EnvVar(_) => {
                "Sorry, there's a configuration issue on my end. Please contact the bot administrator.".to_string()
            }
            BotError::RegistryLoad { .. } | BotError::RegistrySave { .. } => {
                "Sorry, I couldn't access the keyword registry. Please contact the bot administrator.".to_string()
            }
            BotError::FuzzyMatch(_)
            | BotError::MissingMessageId
            | BotError::Retraction { .. } => {
                "Sorry, something went wrong. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
