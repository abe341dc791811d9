//! Administrator commands for managing keyword replies.

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use log::info;

use crate::{
    bot::Data,
    error::{BotError, Result},
    registry::{KeywordRegistry, normalize_keyword},
};

/// Context type for keyword commands.
type Context<'a> = poise::Context<'a, Data, BotError>;

const AUTOCOMPLETE_LIMIT: usize = 25;
const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split `keyword|reply` on the first `|`.
///
/// The keyword is trimmed; the reply is returned exactly as written. Replies
/// Discord could never send are rejected.
///
/// # Errors
///
/// Returns [`BotError::InvalidAddFormat`] without a `|`, or
/// [`BotError::ReplyTooLong`] when the reply exceeds one Discord message.
pub fn parse_add_args(args: &str) -> Result<(&str, &str)> {
    let (keyword, reply) = args.split_once('|').ok_or(BotError::InvalidAddFormat)?;

    let len = reply.chars().count();
    if len > DISCORD_MESSAGE_LIMIT {
        return Err(BotError::ReplyTooLong {
            len,
            limit: DISCORD_MESSAGE_LIMIT,
        });
    }
    Ok((keyword.trim(), reply))
}

/// Cut `text` to at most `limit` chars, marking the cut with an ellipsis.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Render the registry as numbered lines, split into messages Discord will accept.
pub fn format_listing<'a, I>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut lines = vec!["Current keyword replies:".to_string()];
    lines.extend(
        entries
            .into_iter()
            .enumerate()
            .map(|(idx, (keyword, reply))| format!("{}. [{keyword}] -> {reply}", idx + 1)),
    );

    if lines.len() == 1 {
        return vec!["No custom replies yet.".to_string()];
    }

    chunk_lines(lines, DISCORD_MESSAGE_LIMIT)
}

fn chunk_lines(lines: Vec<String>, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in lines {
        for piece in split_long(&line, limit) {
            let piece_len = piece.chars().count();
            if !current.is_empty() && current_len + 1 + piece_len > limit {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_long(line: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= limit {
        return vec![line.to_string()];
    }
    chars.chunks(limit).map(|chunk| chunk.iter().collect()).collect()
}

/// Keywords ranked by fuzzy relevance to `partial`, best first.
#[must_use]
pub fn suggest_keywords(registry: &KeywordRegistry, partial: &str, limit: usize) -> Vec<String> {
    let partial = partial.trim();
    if partial.is_empty() {
        return registry.keywords().take(limit).map(str::to_string).collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(&str, i64)> = registry
        .keywords()
        .filter_map(|keyword| {
            matcher
                .fuzzy_match(keyword, partial)
                .map(|score| (keyword, score))
        })
        .collect();

    scored.sort_by(|(left_keyword, left_score), (right_keyword, right_score)| {
        right_score
            .cmp(left_score)
            .then_with(|| left_keyword.cmp(right_keyword))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(keyword, _)| keyword.to_string())
        .collect()
}

async fn autocomplete_keyword(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let store = ctx.data().store().read().await;
    suggest_keywords(store.registry(), partial, AUTOCOMPLETE_LIMIT)
}

/// Add or replace a keyword reply. Usage: `keyword|reply`
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn add_reply(
    ctx: Context<'_>,
    #[description = "keyword|reply"]
    #[rest]
    entry: String,
) -> Result<()> {
    let (keyword, reply) = parse_add_args(&entry)?;
    ctx.data().store().write().await.put(keyword, reply)?;

    info!("{} added keyword reply [{keyword}]", ctx.author().tag());
    ctx.say(truncate_chars(
        &format!("✅ Added keyword reply: [{keyword}] -> {reply}"),
        DISCORD_MESSAGE_LIMIT,
    ))
    .await?;
    Ok(())
}

/// List all keyword replies.
#[poise::command(prefix_command, slash_command)]
pub async fn list_replies(ctx: Context<'_>) -> Result<()> {
    let chunks = {
        let store = ctx.data().store().read().await;
        format_listing(store.list())
    };

    for chunk in chunks {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Delete a keyword reply.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn delete_reply(
    ctx: Context<'_>,
    #[description = "Keyword to delete"]
    #[autocomplete = "autocomplete_keyword"]
    #[rest]
    keyword: String,
) -> Result<()> {
    ctx.data().store().write().await.remove(&keyword)?;

    let keyword = normalize_keyword(&keyword);
    info!("{} deleted keyword reply [{keyword}]", ctx.author().tag());
    ctx.say(truncate_chars(
        &format!("✅ Deleted keyword: {keyword}"),
        DISCORD_MESSAGE_LIMIT,
    ))
    .await?;
    Ok(())
}

/// Get available keyword commands.
#[must_use]
pub fn keyword_commands() -> Vec<poise::Command<Data, BotError>> {
    vec![add_reply(), list_replies(), delete_reply()]
}
